use std::time::Duration;

/// Periods driving the three timer classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Period of the station poll timer. Runs in every phase so an errored
    /// engine recovers on the next successful poll.
    pub station_poll: Duration,
    /// Period of the station rotation timer.
    pub station_rotation: Duration,
    /// Total time budget for cycling through all parts of one station.
    pub part_cycle_budget: Duration,
    /// Minimum time a single part stays on screen.
    pub part_floor: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Timing {
            station_poll: Duration::from_secs(3),
            station_rotation: Duration::from_secs(12),
            part_cycle_budget: Duration::from_secs(9),
            part_floor: Duration::from_secs(2),
        }
    }
}

impl Timing {
    /// Period of the part rotation timer for a station with `part_count`
    /// parts: the cycle budget split evenly, never below the floor. `None`
    /// when there is nothing to rotate through.
    pub fn part_period(&self, part_count: usize) -> Option<Duration> {
        if part_count <= 1 {
            return None;
        }
        let share = self.part_cycle_budget / part_count as u32;
        Some(share.max(self.part_floor))
    }
}
