//! Measurement extraction from simulator output.
//!
//! ngspice reports the result of each `.measure` statement on a line of the form
//!
//! ```text
//! delay_rise          =  1.234567e-10 targ=  2.734567e-09 trig=  2.500000e-09
//! ```
//!
//! or, when the measurement could not be evaluated, something like
//! `delay_rise = failed`.

use std::collections::HashMap;

use arcstr::ArcStr;
use lazy_static::lazy_static;
use regex::Regex;
use sweep::Measurement;
use unicase::UniCase;

lazy_static! {
    static ref MEASURE_LINE: Regex = Regex::new(r"^\s*([^\s=]+)\s*=\s*(\S+)").unwrap();
}

/// Extracts the named measurements from a simulator log, in the given order.
///
/// Names are matched case-insensitively, and the first line reporting a
/// measurement wins. A measurement is available only if its value is a
/// finite number; missing and non-numeric results are [`Measurement::Unavailable`].
pub fn extract(log: &str, measures: &[ArcStr]) -> Vec<Measurement> {
    let mut found: HashMap<UniCase<&str>, &str> = HashMap::new();
    for line in log.lines() {
        if let Some(caps) = MEASURE_LINE.captures(line) {
            if let (Some(name), Some(value)) = (caps.get(1), caps.get(2)) {
                found
                    .entry(UniCase::new(name.as_str()))
                    .or_insert(value.as_str());
            }
        }
    }

    measures
        .iter()
        .map(|name| match found.get(&UniCase::new(name.as_str())) {
            Some(value) if is_number(value) => Measurement::Value(ArcStr::from(*value)),
            Some(value) => {
                tracing::debug!(measure = %name, value, "measurement has no numeric value");
                Measurement::Unavailable
            }
            None => {
                tracing::debug!(measure = %name, "measurement not found in simulator output");
                Measurement::Unavailable
            }
        })
        .collect()
}

fn is_number(value: &str) -> bool {
    value.parse::<f64>().is_ok_and(f64::is_finite)
}
