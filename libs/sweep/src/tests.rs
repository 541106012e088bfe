use itertools::Itertools;
use rust_decimal_macros::dec;
use test_log::test;

use super::*;
use crate::error::Error;

fn inverter_spec() -> SweepSpec {
    let mut spec = SweepSpec::new();
    spec.set_param("vdd_p", ["2.7", "3.0", "3.3"]);
    spec.set_lib(LibId::new("models.lib", Some("mos_typ")), ["tt", "ff", "ss"]);
    spec.add_temperature(Temperature::new(dec!(-40)));
    spec.add_temperature(Temperature::new(dec!(27)));
    spec.add_measure("delay");
    spec.add_measure("power");
    spec
}

#[test]
fn corner_count_is_product_of_axes() {
    let spec = inverter_spec();
    assert_eq!(spec.num_corners(), Some(18));
    let corners = spec.corners().unwrap();
    assert_eq!(corners.len(), 18);

    let ids: Vec<_> = corners.map(|c| c.id().to_string()).collect();
    let expected: Vec<_> = (1..=18).map(|i| format!("c{:04}", i)).collect();
    assert_eq!(ids, expected);
}

#[test]
fn enumeration_is_deterministic() {
    let spec = inverter_spec();
    let first: Vec<_> = spec.corners().unwrap().collect();
    let second: Vec<_> = spec.corners().unwrap().collect();
    assert_eq!(first, second);
}

#[test]
fn last_axis_varies_fastest() {
    let spec = inverter_spec();
    let expected = spec
        .params()
        .map(|p| p.values().to_vec())
        .chain(spec.libs().map(|l| l.corners().to_vec()))
        .chain(std::iter::once(
            spec.temperatures()
                .iter()
                .map(|t| ArcStr::from(t.to_string()))
                .collect(),
        ))
        .multi_cartesian_product();

    for (corner, values) in spec.corners().unwrap().zip_eq(expected) {
        let actual = corner
            .params()
            .values()
            .chain(corner.libs().values())
            .cloned()
            .chain(std::iter::once(ArcStr::from(corner.temperature().to_string())))
            .collect::<Vec<_>>();
        assert_eq!(actual, values);
    }
}

#[test]
fn first_corners_in_order() {
    let spec = inverter_spec();
    let corners: Vec<_> = spec.corners().unwrap().take(3).map(|c| c.to_string()).collect();
    assert_eq!(
        corners,
        vec![
            "c0001 (vdd_p=2.7, models.lib(mos_typ)=tt, temp=-40)",
            "c0002 (vdd_p=2.7, models.lib(mos_typ)=tt, temp=27)",
            "c0003 (vdd_p=2.7, models.lib(mos_typ)=ff, temp=-40)",
        ]
    );
}

#[test]
fn random_access_matches_iteration() {
    let spec = inverter_spec();
    for (idx, corner) in spec.corners().unwrap().enumerate() {
        assert_eq!(spec.corner(idx).as_ref(), Some(&corner));
    }
    assert_eq!(spec.corner(18), None);

    let reversed: Vec<_> = spec.corners().unwrap().rev().map(|c| c.id()).collect();
    assert_eq!(reversed.first().map(|id| id.number()), Some(18));
    assert_eq!(spec.corners().unwrap().nth(17).map(|c| c.id().index()), Some(17));
    assert!(spec.corners().unwrap().nth(18).is_none());
}

#[test]
fn empty_spec_has_one_corner() {
    let spec = SweepSpec::new();
    assert!(spec.is_empty());
    let corners: Vec<_> = spec.corners().unwrap().collect();
    assert_eq!(corners.len(), 1);
    assert_eq!(corners[0].id().to_string(), "c0001");
    assert_eq!(corners[0].temperature(), Temperature::default());
    assert_eq!(corners[0].temperature().to_string(), "25");
    assert!(corners[0].params().is_empty());
}

#[test]
fn temperatures_only() {
    let mut spec = SweepSpec::new();
    spec.add_temperature(Temperature::new(dec!(0)));
    spec.add_temperature(Temperature::new(dec!(85)));
    assert!(!spec.add_temperature(Temperature::new(dec!(85.0))));
    let temps: Vec<_> = spec
        .corners()
        .unwrap()
        .map(|c| c.temperature().celsius())
        .collect();
    assert_eq!(temps, vec![dec!(0), dec!(85)]);
}

#[test]
fn empty_axis_yields_no_corners() {
    let mut spec = SweepSpec::new();
    spec.set_param("a", ["1", "2"]);
    spec.set_param("b", Vec::<&str>::new());
    assert_eq!(spec.num_corners(), Some(0));
    assert_eq!(spec.corners().unwrap().count(), 0);
    assert_eq!(spec.corner(0), None);
}

#[test]
fn overflowing_corner_space_is_an_error() {
    let mut spec = SweepSpec::new();
    let values: Vec<String> = (0..1 << 16).map(|v| v.to_string()).collect();
    for name in ["a", "b", "c", "d", "e"] {
        spec.set_param(name, values.iter().map(String::as_str));
    }
    assert_eq!(spec.num_corners(), None);
    assert!(matches!(spec.corners(), Err(Error::CornerSpaceOverflow)));
}

#[test]
fn corner_ids_widen_for_large_sweeps() {
    let mut spec = SweepSpec::new();
    let values: Vec<String> = (0..100).map(|v| v.to_string()).collect();
    spec.set_param("a", values.iter().map(String::as_str));
    spec.set_param("b", values.iter().map(String::as_str));
    spec.set_param("c", ["x", "y"]);

    let mut corners = spec.corners().unwrap();
    assert_eq!(corners.next().unwrap().id().to_string(), "c00001");
    assert_eq!(corners.next_back().unwrap().id().to_string(), "c20000");

    let ids: Vec<_> = spec.corners().unwrap().map(|c| c.id().to_string()).collect();
    assert!(ids.iter().tuple_windows().all(|(a, b)| a < b));
}

#[test]
fn param_lookup_is_case_insensitive() {
    let spec = inverter_spec();
    let corner = spec.corner(0).unwrap();
    assert_eq!(corner.param("VDD_P").map(ArcStr::as_str), Some("2.7"));
    assert_eq!(
        corner
            .lib(&LibId::new("models.lib", Some("mos_typ")))
            .map(ArcStr::as_str),
        Some("tt")
    );
}

#[test]
fn temperature_parsing() {
    assert_eq!("-40".parse::<Temperature>(), Ok(Temperature::new(dec!(-40))));
    assert_eq!("2.5e1".parse::<Temperature>(), Ok(Temperature::new(dec!(25))));
    assert_eq!(
        "27C".parse::<Temperature>(),
        Err(ParseTemperatureError("27C".into()))
    );
}

#[test]
fn report_header_follows_axes() {
    let mut spec = inverter_spec();
    spec.set_lib(LibId::new("res.lib", None), ["rnom"]);
    let report = Report::new(&spec);
    assert_eq!(
        report.header(),
        &[
            "corner_id",
            "temperature",
            "param_vdd_p",
            "lib_models.lib_mos_typ",
            "lib_res.lib",
            "delay",
            "power"
        ]
    );
}

#[test]
fn report_rows_must_increase() {
    let spec = inverter_spec();
    let mut report = Report::new(&spec);
    let c1 = spec.corner(1).unwrap();
    let c0 = spec.corner(0).unwrap();

    report.push(ResultRow::unavailable(c1.clone(), 2)).unwrap();
    assert!(matches!(
        report.push(ResultRow::unavailable(c0, 2)),
        Err(Error::RowOutOfOrder { .. })
    ));
    assert!(matches!(
        report.push(ResultRow::unavailable(c1, 2)),
        Err(Error::RowOutOfOrder { .. })
    ));
    assert!(matches!(
        report.push(ResultRow::unavailable(spec.corner(2).unwrap(), 1)),
        Err(Error::MeasurementCount {
            expected: 2,
            got: 1,
            ..
        })
    ));
    assert_eq!(report.len(), 1);
}

#[test]
fn writes_csv_with_sentinel() {
    let spec = inverter_spec();
    let mut report = Report::new(&spec).with_unavailable("NaN");
    let mut corners = spec.corners().unwrap();
    report
        .push(ResultRow::new(
            corners.next().unwrap(),
            vec![
                Measurement::Value("1.23e-10".into()),
                Measurement::Unavailable,
            ],
        ))
        .unwrap();
    report
        .push(ResultRow::new(
            corners.next().unwrap(),
            vec![
                Measurement::Value("1.5e-10".into()),
                Measurement::Value("2e-3".into()),
            ],
        ))
        .unwrap();

    let mut out = Vec::new();
    report.write_csv(&mut out).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "corner_id,temperature,param_vdd_p,lib_models.lib_mos_typ,delay,power
c0001,-40,2.7,tt,1.23e-10,NaN
c0002,27,2.7,tt,1.5e-10,2e-3
"
    );
    assert_eq!(
        report.summary(),
        ReportSummary {
            rows: 2,
            incomplete: 1
        }
    );
}

#[test]
fn unswept_temperature_reports_default() {
    let mut spec = SweepSpec::new();
    spec.set_param("a", ["1", "2"]);
    spec.add_measure("m");
    spec.set_default_temperature(Temperature::new(dec!(-12.5)));
    assert_eq!(spec.num_corners(), Some(2));
    let mut report = Report::new(&spec);
    for (i, corner) in spec.corners().unwrap().enumerate() {
        report.push(ResultRow::unavailable(corner, 1)).unwrap();
        assert_eq!(spec.corner(i).unwrap().temperature().celsius(), dec!(-12.5));
    }

    let mut out = Vec::new();
    report.write_csv(&mut out).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "corner_id,temperature,param_a,m\nc0001,-12.5,1,N/A\nc0002,-12.5,2,N/A\n"
    );
}

#[test]
fn swept_temperatures_ignore_default() {
    let mut spec = SweepSpec::new();
    spec.set_default_temperature(Temperature::new(dec!(100)));
    spec.add_temperature(Temperature::new(dec!(-40)));
    let temps: Vec<_> = spec.corners().unwrap().map(|c| c.temperature()).collect();
    assert_eq!(temps, vec![Temperature::new(dec!(-40))]);
}

#[test]
fn writes_report_file_in_new_directory() {
    let spec = inverter_spec();
    let report = Report::new(&spec);
    let dir = std::env::temp_dir().join(format!("sweep_report_{}", std::process::id()));
    let path = dir.join("nested").join("report.csv");
    report.write_to_file(&path).unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with("corner_id,temperature,"));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn report_file_under_regular_file_is_an_error() {
    let dir = std::env::temp_dir().join(format!("sweep_blocked_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let blocker = dir.join("blocker");
    std::fs::write(&blocker, "").unwrap();
    assert!(matches!(
        report::create_file(blocker.join("report.csv")),
        Err(Error::Io(_))
    ));
    std::fs::remove_dir_all(&dir).unwrap();
}
