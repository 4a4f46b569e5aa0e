//! Timeline resolution for sequential playback.
//!
//! Maps a global tick count onto the catalog's back-to-back durations.

use crate::scenarios::{ScenarioCatalog, ScenarioDefinition};

/// Result of resolving a tick count against the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution<'a> {
    /// Scenario active at the resolved tick
    pub scenario: &'a ScenarioDefinition,

    /// Index of `scenario` in the catalog
    pub index: usize,

    /// Seconds into `scenario`, in `[0, duration)` while running
    pub local_elapsed: u64,

    /// True once the tick count has run past the whole catalog
    pub finished: bool,
}

/// Resolves `elapsed_ticks` to the active scenario.
///
/// Windows are half-open, `[start, start + duration)`, so a tick landing
/// exactly on a boundary belongs to the scenario that begins there.
/// Past the end of the catalog the last entry is returned, held at its
/// final second, with `finished` set.
pub fn resolve(catalog: &ScenarioCatalog, elapsed_ticks: u64) -> Resolution<'_> {
    let mut running_total = 0u64;

    for (index, scenario) in catalog.iter().enumerate() {
        let duration = scenario.duration_secs as u64;
        running_total += duration;

        if elapsed_ticks < running_total {
            return Resolution {
                scenario,
                index,
                local_elapsed: elapsed_ticks - (running_total - duration),
                finished: false,
            };
        }
    }

    let last = catalog.last();
    Resolution {
        scenario: last,
        index: catalog.len() - 1,
        local_elapsed: last.duration_secs as u64,
        finished: true,
    }
}
