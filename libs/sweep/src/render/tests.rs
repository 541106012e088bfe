use rust_decimal_macros::dec;
use test_log::test;

use super::*;
use crate::{parse_directives, LibId, Temperature};

const INVERTER: &str = "* Inverter delay
** ngc_param vdd_p 2.7 3.3
** ngc_lib models.lib(mos_typ) tt ff
** ngc_temp -40 125
** ngc_out delay

.lib /path/to/libs/models.lib mos_typ
.lib /path/to/libs/models.lib res_typ
.param vdd_p=3.0 vss_p = 0
Vdd vdd 0 {vdd_p}
.tran 0.1n 100n
.end
";

fn first_corner(netlist: &str) -> String {
    let spec = parse_directives(netlist).spec;
    let corner = spec.corner(0).unwrap();
    Renderer::new(netlist, &spec).render(&corner)
}

#[test]
fn renders_every_substitution_point() {
    let spec = parse_directives(INVERTER).spec;
    let renderer = Renderer::new(INVERTER, &spec);
    let corner = spec.corners().unwrap().last().unwrap();
    assert_eq!(
        renderer.render(&corner),
        "* Inverter delay
** ngc_param vdd_p 2.7 3.3
** ngc_lib models.lib(mos_typ) tt ff
** ngc_temp -40 125
** ngc_out delay

.lib /path/to/libs/models.lib ff
.lib /path/to/libs/models.lib res_typ
.param vdd_p=3.3 vss_p = 0
Vdd vdd 0 {vdd_p}
.temp 125
.tran 0.1n 100n
.end
"
    );
}

#[test]
fn only_substitution_points_change() {
    let spec = parse_directives(INVERTER).spec;
    let renderer = Renderer::new(INVERTER, &spec);
    for corner in spec.corners().unwrap() {
        let rendered = renderer.render(&corner);
        let changed: Vec<_> = rendered
            .lines()
            .filter(|line| !INVERTER.lines().any(|orig| orig == *line))
            .collect();
        assert_eq!(changed.len(), 3, "{}", rendered);
        assert!(changed[0].starts_with(".lib "));
        assert!(changed[1].starts_with(".param "));
        assert!(changed[2].starts_with(".temp "));
    }
}

#[test]
fn rendered_param_reads_back() {
    let spec = parse_directives(INVERTER).spec;
    let renderer = Renderer::new(INVERTER, &spec);
    for corner in spec.corners().unwrap() {
        let rendered = renderer.render(&corner);
        let line = rendered
            .lines()
            .find(|line| line.starts_with(".param"))
            .unwrap();
        let caps = ASSIGNMENT.captures(line).unwrap();
        assert_eq!(&caps[1], "vdd_p");
        assert_eq!(&caps[3], corner.param("vdd_p").unwrap().as_str());
    }
}

#[test]
fn params_match_case_insensitively_and_keep_spacing() {
    let netlist = "** ngc_param VDD 1.8\n  .PARAM  Vdd  =  3.3 cl=1p\n";
    assert_eq!(
        first_corner(netlist),
        "** ngc_param VDD 1.8\n  .PARAM  Vdd  =  1.8 cl=1p\n.temp 25\n"
    );
}

#[test]
fn replaces_brace_expression_values() {
    let netlist = "** ngc_param vdd_p 2.7\n.param vdd_p = { 3.0 * 1.1 } cl={2*c0}\n.op\n";
    assert_eq!(
        first_corner(netlist),
        "** ngc_param vdd_p 2.7\n.param vdd_p = 2.7 cl={2*c0}\n.temp 25\n.op\n"
    );
}

#[test]
fn replaces_quoted_expression_values() {
    let netlist = "** ngc_param w 1u
** ngc_param l 90n
.param w = '2*lmin' lmin=45n
.param l=\"lmin + 5n\" m=2
.op
";
    assert_eq!(
        first_corner(netlist),
        "** ngc_param w 1u
** ngc_param l 90n
.param w = 1u lmin=45n
.param l=90n m=2
.temp 25
.op
"
    );
}

#[test]
fn replaces_lib_key() {
    let netlist = "** ngc_lib ptm45.lib(mos_typ) ff\n.lib /models/ptm45.lib mos_typ\n";
    assert_eq!(
        first_corner(netlist),
        "** ngc_lib ptm45.lib(mos_typ) ff\n.lib /models/ptm45.lib ff\n.temp 25\n"
    );
}

#[test]
fn lib_key_and_file_must_match() {
    let netlist = "** ngc_lib ptm45.lib(mos_typ) ff
.lib /models/ptm45.lib res_typ
.lib /models/notptm45.lib mos_typ
.lib \"/models/ptm45.lib\" MOS_TYP $ quoted
.lib mos_typ
";
    assert_eq!(
        first_corner(netlist),
        "** ngc_lib ptm45.lib(mos_typ) ff
.lib /models/ptm45.lib res_typ
.lib /models/notptm45.lib mos_typ
.lib \"/models/ptm45.lib\" ff $ quoted
.lib mos_typ
.temp 25
"
    );
}

#[test]
fn keyed_axes_take_precedence_over_keyless() {
    let mut spec = SweepSpec::new();
    spec.set_lib(LibId::new("models.lib", None), ["any"]);
    spec.set_lib(LibId::new("models.lib", Some("mos_typ")), ["ff"]);
    let netlist = ".lib models.lib mos_typ\n.lib lib/models.lib res_typ\n";
    let corner = spec.corner(0).unwrap();
    assert_eq!(
        Renderer::new(netlist, &spec).render(&corner),
        ".lib models.lib ff\n.lib lib/models.lib any\n.temp 25\n"
    );
}

#[test]
fn overwrites_every_existing_temp_line() {
    let netlist = "** ngc_temp 27.5\n  .TEMP 25\n.temp\n.tran 1n 10n\n";
    assert_eq!(
        first_corner(netlist),
        "** ngc_temp 27.5\n  .temp 27.5\n.temp 27.5\n.tran 1n 10n\n"
    );
}

#[test]
fn inserts_temp_before_first_analysis() {
    let netlist = "** ngc_temp -40\nR1 a 0 1k\n.control\nrun\n.endc\n.op\n.end\n";
    assert_eq!(
        first_corner(netlist),
        "** ngc_temp -40\nR1 a 0 1k\n.temp -40\n.control\nrun\n.endc\n.op\n.end\n"
    );
}

#[test]
fn inserts_temp_before_end() {
    let netlist = "** ngc_temp 0\nR1 a 0 1k\n.END\n";
    assert_eq!(first_corner(netlist), "** ngc_temp 0\nR1 a 0 1k\n.temp 0\n.END\n");
}

#[test]
fn appends_temp_without_analysis_or_end() {
    assert_eq!(
        first_corner("** ngc_temp 85\nR1 a 0 1k\n"),
        "** ngc_temp 85\nR1 a 0 1k\n.temp 85\n"
    );
    assert_eq!(
        first_corner("** ngc_temp 85\nR1 a 0 1k"),
        "** ngc_temp 85\nR1 a 0 1k\n.temp 85\n"
    );
}

#[test]
fn default_temperature_overwrites_netlist_temperature() {
    let netlist = "** ngc_param a 2\n.param a=1\n.temp 50\n.op\n.end\n";
    assert_eq!(
        first_corner(netlist),
        "** ngc_param a 2\n.param a=2\n.temp 25\n.op\n.end\n"
    );

    let mut spec = parse_directives(netlist).spec;
    spec.set_default_temperature(Temperature::new(dec!(-10)));
    let corner = spec.corner(0).unwrap();
    assert_eq!(
        Renderer::new(netlist, &spec).render(&corner),
        "** ngc_param a 2\n.param a=2\n.temp -10\n.op\n.end\n"
    );
}

#[test]
fn preserves_crlf_line_endings() {
    let netlist = "** ngc_param a 2\r\n** ngc_temp 27\r\n.param a=1\r\n.op\r\n.end";
    assert_eq!(
        first_corner(netlist),
        "** ngc_param a 2\r\n** ngc_temp 27\r\n.param a=2\r\n.temp 27\r\n.op\r\n.end"
    );
}

#[test]
fn unmatched_lines_are_byte_identical() {
    let netlist = "* title\n\n.subckt inv a y\n  M1 y a 0 0 nmos w=1u\n.ends\n.end\n";
    let spec = SweepSpec::new();
    let corner = spec.corner(0).unwrap();
    assert_eq!(
        Renderer::new(netlist, &spec).render(&corner),
        "* title\n\n.subckt inv a y\n  M1 y a 0 0 nmos w=1u\n.ends\n.temp 25\n.end\n"
    );
}

#[test]
fn renders_programmatic_temperature() {
    let mut spec = SweepSpec::new();
    spec.add_temperature(Temperature::new(dec!(-55.0)));
    let corner = spec.corner(0).unwrap();
    assert_eq!(
        Renderer::new(".tran 1n 10n\n", &spec).render(&corner),
        ".temp -55.0\n.tran 1n 10n\n"
    );
}
