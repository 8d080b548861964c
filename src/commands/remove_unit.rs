//! Implementation of the `fleetctl remove-unit` command.

use super::Session;
use crate::cli::RemoveUnitArgs;
use crate::error::{FleetError, Result};
use crate::events::{Event, EventAction};
use crate::removal::{Outcome, RemovalOrchestrator, RemovalReport, UnitRemoval};
use serde_json::json;
use std::io::{self, Write};

pub fn cmd_remove_unit(args: RemoveUnitArgs) -> Result<()> {
    let session = Session::open()?;
    let report = RemovalOrchestrator::new(&session.store, &session.config).remove_units(&args.units)?;

    let removals = match report {
        RemovalReport::BatchBlocked(message) => return Err(FleetError::Blocked(message)),
        RemovalReport::Completed(removals) => removals,
    };

    session.record(
        Event::new(EventAction::RemoveUnit).with_details(json!({ "units": event_details(&removals) })),
    );

    write_report(&mut io::stderr().lock(), &removals).map_err(|e| {
        FleetError::Internal(format!("failed to write removal report: {}", e))
    })?;

    let failed = removals.iter().filter(|r| r.is_failure()).count();
    if failed == 0 {
        Ok(())
    } else {
        Err(FleetError::PartialFailure(format!(
            "{} of {} unit(s) could not be removed",
            failed,
            removals.len()
        )))
    }
}

/// One line (or block, with storage) per unit, in the order given.
fn write_report<W: Write>(out: &mut W, removals: &[UnitRemoval]) -> io::Result<()> {
    for removal in removals {
        writeln!(out, "{}", removal)?;
    }
    Ok(())
}

fn event_details(removals: &[UnitRemoval]) -> Vec<serde_json::Value> {
    removals
        .iter()
        .map(|r| match &r.outcome {
            Outcome::Removed => json!({ "unit": r.unit, "outcome": "removed" }),
            Outcome::RemovedWithStorage(ids) => {
                json!({ "unit": r.unit, "outcome": "removed", "storage": ids })
            }
            Outcome::Failed(reason) => {
                json!({ "unit": r.unit, "outcome": "failed", "reason": format!("{:?}", reason) })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::removal::FailureReason;

    #[test]
    fn test_report_keeps_input_order() {
        let removals = vec![
            UnitRemoval {
                unit: "missing/7".to_string(),
                outcome: Outcome::Failed(FailureReason::NotFound),
            },
            UnitRemoval {
                unit: "a/0".to_string(),
                outcome: Outcome::Removed,
            },
            UnitRemoval {
                unit: "s/0".to_string(),
                outcome: Outcome::RemovedWithStorage(vec!["data/0".to_string()]),
            },
        ];

        let mut out = Vec::new();
        write_report(&mut out, &removals).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "removing unit missing/7 failed: unit \"missing/7\" does not exist\n\
             removing unit a/0\n\
             removing unit s/0\n- will remove storage data/0\n"
        );
    }
}
