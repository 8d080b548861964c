//! Name rules for branches, applications, and units.

use crate::error::{FleetError, Result};
use regex::Regex;
use std::cmp::Ordering;
use std::sync::LazyLock;

/// Name of the baseline configuration. No branch may use it.
pub const BASELINE_BRANCH: &str = "master";

static APPLICATION_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z][a-z0-9]*(-[a-z0-9]+)*$").expect("Invalid application name regex")
});

static UNIT_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z][a-z0-9]*(?:-[a-z0-9]+)*)/([0-9]+)$").expect("Invalid unit name regex")
});

/// Check that `name` may identify a new in-flight branch.
pub fn validate_branch_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(FleetError::InvalidArgument("empty branch name".to_string()));
    }
    if name == BASELINE_BRANCH {
        return Err(FleetError::InvalidArgument(format!(
            "branch name {:?} is reserved for the baseline configuration",
            BASELINE_BRANCH
        )));
    }
    Ok(())
}

/// Check an application name (`mysql`, `wordpress-cache`).
pub fn validate_application_name(name: &str) -> Result<()> {
    if APPLICATION_NAME_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(FleetError::InvalidArgument(format!(
            "application name {:?}",
            name
        )))
    }
}

/// Check a unit name (`mysql/0`).
pub fn validate_unit_name(name: &str) -> Result<()> {
    if split_unit_name(name).is_some() {
        Ok(())
    } else {
        Err(FleetError::InvalidArgument(format!("unit name {:?}", name)))
    }
}

/// Split `app/N` into its application and the digits of its number.
///
/// The number is kept as text, so it has no upper bound.
pub fn split_unit_name(name: &str) -> Option<(&str, &str)> {
    let caps = UNIT_NAME_REGEX.captures(name)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

/// The application a unit belongs to.
pub fn application_of(unit: &str) -> Option<&str> {
    split_unit_name(unit).map(|(app, _)| app)
}

/// Order units by application, then numerically (`a/2` before `a/10`).
/// Malformed names sort after well-formed ones, lexically.
pub fn compare_unit_names(a: &str, b: &str) -> Ordering {
    match (split_unit_name(a), split_unit_name(b)) {
        (Some((app_a, num_a)), Some((app_b, num_b))) => {
            app_a.cmp(app_b).then_with(|| compare_digits(num_a, num_b))
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

// Numeric order of two digit strings of any length.
fn compare_digits(a: &str, b: &str) -> Ordering {
    let short_a = a.trim_start_matches('0');
    let short_b = b.trim_start_matches('0');
    short_a
        .len()
        .cmp(&short_b.len())
        .then_with(|| short_a.cmp(short_b))
        .then_with(|| a.cmp(b))
}
