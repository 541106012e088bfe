use diagnostics::Diagnostic;
use rust_decimal_macros::dec;
use test_log::test;

use super::*;

const INVERTER: &str = r#"* Inverter delay
** ngc_param vdd_p 2.7 3.0 3.3
** ngc_param vss_p 0
** ngc_lib models.lib(mos_typ) tt ff ss
** ngc_lib models.lib(res_typ) res_nom res_fast
** ngc_temp -40 27 125
** ngc_out delay_rise delay_fall power_total

.lib /path/to/libs/models.lib mos_typ
.param vdd_p=3.0
.param vss_p=0
Vdd vdd 0 {vdd_p}
.measure tran delay_rise TRIG v(in) VAL=1.65 RISE=1 TARG v(out) VAL=1.65 RISE=1
.tran 0.1n 100n
.end
"#;

fn causes(parsed: &ParsedDirectives) -> Vec<Cause> {
    parsed.issues.iter().map(|i| i.cause().clone()).collect()
}

#[test]
fn reads_all_directive_kinds() {
    let parsed = parse_directives(INVERTER);
    assert!(parsed.issues.is_empty());
    let spec = parsed.spec;

    let params: Vec<_> = spec.params().map(|p| p.name().as_str()).collect();
    assert_eq!(params, vec!["vdd_p", "vss_p"]);
    assert_eq!(spec.param("VDD_P").unwrap().values(), &["2.7", "3.0", "3.3"]);
    assert_eq!(spec.param("vss_p").unwrap().values(), &["0"]);

    let libs: Vec<_> = spec.libs().map(|l| l.id().to_string()).collect();
    assert_eq!(libs, vec!["models.lib(mos_typ)", "models.lib(res_typ)"]);
    let mos = spec.lib(&LibId::new("models.lib", Some("mos_typ"))).unwrap();
    assert_eq!(mos.corners(), &["tt", "ff", "ss"]);

    assert_eq!(
        spec.temperatures(),
        &[
            Temperature::new(dec!(-40)),
            Temperature::new(dec!(27)),
            Temperature::new(dec!(125))
        ]
    );
    assert_eq!(spec.measures(), &["delay_rise", "delay_fall", "power_total"]);
}

#[test]
fn ignores_non_comment_and_non_directive_lines() {
    let parsed = parse_directives(
        "ngc_param a 1 2\n* a plain comment\n* ngc is not a directive\n.param a=1\n",
    );
    assert!(parsed.spec.is_empty());
    assert!(parsed.issues.is_empty());
}

#[test]
fn accepts_any_number_of_stars_and_keyword_case() {
    let parsed = parse_directives("   *** NGC_PARAM w 1u 2u\n*ngc_Temp 0\n");
    assert!(parsed.issues.is_empty());
    assert_eq!(parsed.spec.param("w").unwrap().values(), &["1u", "2u"]);
    assert_eq!(parsed.spec.temperatures().len(), 1);
}

#[test]
fn param_without_values_is_skipped_with_warning() {
    let parsed = parse_directives("** ngc_param vdd_p\n** ngc_param\n** ngc_param vss_p 0\n");
    assert_eq!(parsed.spec.params().len(), 1);
    assert_eq!(parsed.issues.num_warnings(), 2);
    assert_eq!(
        causes(&parsed),
        vec![
            Cause::MissingValues {
                kind: DirectiveKind::Param,
                name: "vdd_p".into()
            },
            Cause::MissingName {
                kind: DirectiveKind::Param
            },
        ]
    );
    let lines: Vec<_> = parsed.issues.iter().map(|i| i.line()).collect();
    assert_eq!(lines, vec![1, 2]);
}

#[test]
fn lib_key_tolerates_whitespace() {
    let parsed = parse_directives("** ngc_lib models.lib ( mos_typ ) tt ff\n");
    assert!(parsed.issues.is_empty());
    let axis = parsed.spec.libs().next().unwrap();
    assert_eq!(axis.id(), &LibId::new("models.lib", Some("mos_typ")));
    assert_eq!(axis.corners(), &["tt", "ff"]);
}

#[test]
fn lib_without_key() {
    let parsed = parse_directives("** ngc_lib process.lib tt ff ss\n");
    let axis = parsed.spec.libs().next().unwrap();
    assert_eq!(axis.id().key(), None);
    assert_eq!(axis.id().column_name(), "lib_process.lib");
    assert_eq!(axis.corners().len(), 3);
}

#[test]
fn empty_lib_key_is_absent() {
    let parsed = parse_directives("** ngc_lib process.lib() tt\n");
    let axis = parsed.spec.libs().next().unwrap();
    assert_eq!(axis.id(), &LibId::new("process.lib", None));
}

#[test]
fn unbalanced_lib_spec_is_skipped() {
    let parsed = parse_directives(
        "** ngc_lib models.lib(mos_typ tt ff\n** ngc_lib models.lib) tt\n** ngc_lib a.lib((k)) tt\n",
    );
    assert!(parsed.spec.libs().next().is_none());
    assert_eq!(parsed.issues.num_warnings(), 3);
    assert!(parsed
        .issues
        .iter()
        .all(|i| matches!(i.cause(), Cause::UnbalancedParens { .. })));
}

#[test]
fn lib_without_corners_is_skipped() {
    let parsed = parse_directives("** ngc_lib models.lib(mos_typ)\n");
    assert!(parsed.spec.libs().next().is_none());
    assert_eq!(
        causes(&parsed),
        vec![Cause::MissingValues {
            kind: DirectiveKind::Lib,
            name: "models.lib(mos_typ)".into()
        }]
    );
}

#[test]
fn invalid_temperature_skips_only_that_directive() {
    let parsed = parse_directives("** ngc_temp -40 hot 125\n** ngc_temp 27 1e2\n");
    assert_eq!(
        parsed.spec.temperatures(),
        &[Temperature::new(dec!(27)), Temperature::new(dec!(100))]
    );
    assert_eq!(
        causes(&parsed),
        vec![Cause::InvalidTemperature {
            token: "hot".into()
        }]
    );
}

#[test]
fn temperatures_keep_their_written_form() {
    let parsed = parse_directives("** ngc_temp -40 27.50 0\n");
    let rendered: Vec<_> = parsed
        .spec
        .temperatures()
        .iter()
        .map(|t| t.to_string())
        .collect();
    assert_eq!(rendered, vec!["-40", "27.50", "0"]);
}

#[test]
fn duplicate_param_is_last_wins_in_first_position() {
    let parsed = parse_directives(
        "** ngc_param a 1 2\n** ngc_param b 5\n** ngc_param A 3 4 5\n",
    );
    let spec = &parsed.spec;
    let names: Vec<_> = spec.params().map(|p| p.name().as_str()).collect();
    assert_eq!(names, vec!["A", "b"]);
    assert_eq!(spec.param("a").unwrap().values(), &["3", "4", "5"]);
    assert_eq!(
        causes(&parsed),
        vec![Cause::DuplicateParam { name: "A".into() }]
    );
    assert_eq!(parsed.issues.iter().next().unwrap().line(), 3);
}

#[test]
fn duplicate_lib_is_last_wins() {
    let parsed = parse_directives(
        "** ngc_lib m.lib(k) tt\n** ngc_lib m.lib(other) x\n** ngc_lib m.lib( k ) ff ss\n",
    );
    let libs: Vec<_> = parsed.spec.libs().collect();
    assert_eq!(libs.len(), 2);
    assert_eq!(libs[0].corners(), &["ff", "ss"]);
    assert_eq!(
        causes(&parsed),
        vec![Cause::DuplicateLib {
            id: LibId::new("m.lib", Some("k"))
        }]
    );
}

#[test]
fn repeated_temperatures_and_measures_are_dropped() {
    let parsed = parse_directives("** ngc_temp 27 27.0 85\n** ngc_out a b\n** ngc_out B c\n");
    assert_eq!(parsed.spec.temperatures().len(), 2);
    assert_eq!(parsed.spec.measures(), &["a", "b", "c"]);
    assert_eq!(parsed.issues.len(), 2);
    assert!(!parsed.issues.has_warning());
}

#[test]
fn unknown_directive_is_reported() {
    let parsed = parse_directives("** ngc_sweep x 1 2\n");
    assert!(parsed.spec.is_empty());
    assert_eq!(
        causes(&parsed),
        vec![Cause::UnknownDirective {
            keyword: "ngc_sweep".into()
        }]
    );
    assert!(parsed.issues.iter().next().unwrap().help().is_some());
}

#[test]
fn split_directive_extracts_keyword_and_args() {
    assert_eq!(
        split_directive("** ngc_out  a   b "),
        Some(("ngc_out", "a   b"))
    );
    assert_eq!(split_directive("**ngc_temp"), Some(("ngc_temp", "")));
    assert_eq!(split_directive(".param a=1"), None);
    assert_eq!(split_directive("* ng"), None);
}
