//! Stage 2: fold an hourly grid into a 24-hour daily profile.

use tracing::{debug, warn};

use crate::errors::RowRejection;
use crate::parser::HourlyRow;
use crate::series::{DailyProfile, HourlyGrid, Observation};
use crate::stats::GroupedMean;
use crate::timezone::{TargetZone, localize_utc};

/// Averages UTC instants by their local hour in a target zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct DailyProfiler {
    zone: TargetZone,
}

impl DailyProfiler {
    pub fn new(zone: TargetZone) -> Self {
        Self { zone }
    }

    pub fn zone(&self) -> TargetZone {
        self.zone
    }

    /// Profiles an in-memory grid.
    pub fn profile(&self, grid: &HourlyGrid) -> DailyProfile {
        self.profile_rows(grid.iter().map(|(at, v)| Ok(Observation::new(at, v))))
    }

    /// Profiles decoded rows; rejected rows and instants without a single
    /// UTC localization are left out.
    pub fn profile_rows<I>(&self, rows: I) -> DailyProfile
    where
        I: IntoIterator<Item = HourlyRow>,
    {
        let mut acc = GroupedMean::new();
        let mut rejected = 0usize;

        for row in rows {
            let obs = match row {
                Ok(obs) => obs,
                Err(rejection) => {
                    debug!(%rejection, "row skipped");
                    rejected += 1;
                    continue;
                }
            };

            let Some(instant) = localize_utc(obs.timestamp) else {
                let rejection = RowRejection::AmbiguousTime { at: obs.timestamp };
                debug!(%rejection, "row skipped");
                rejected += 1;
                continue;
            };

            acc.add(self.zone.local_hour(instant), obs.value);
        }

        if rejected > 0 {
            warn!(rejected, zone = %self.zone, "rows left out of daily profile");
        }

        DailyProfile::from_hours(acc.finish())
    }
}
