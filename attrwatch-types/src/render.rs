//! Fixed-width textual rendering of observation sets for log output.

use std::fmt;
use std::fmt::Write as _;

use crate::ObservationSet;

/// Minimum width of the name column.
const MIN_NAME_WIDTH: usize = 24;

/// Render an observation set as a fixed-width table.
///
/// One row per observation, sorted by canonical name, display name padded
/// to a common column width. Intended for human-readable logs, not for
/// machine consumption.
pub fn render_table(set: &ObservationSet) -> String {
    let width = set
        .iter()
        .map(|(_, o)| o.display_name.len())
        .max()
        .unwrap_or(0)
        .max(MIN_NAME_WIDTH);

    let mut out = String::new();
    match &set.instance_id {
        Some(id) => {
            let _ = writeln!(out, "[{}] window {}ms", id, set.duration_millis());
        }
        None => {
            let _ = writeln!(out, "window {}ms", set.duration_millis());
        }
    }
    for (_, obs) in set.iter() {
        let _ = writeln!(out, "  {:<width$}  {}", obs.display_name, obs.value);
    }
    out
}

impl fmt::Display for ObservationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_table(self))
    }
}
