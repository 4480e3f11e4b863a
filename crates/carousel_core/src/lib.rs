mod diff;
mod models;
mod timing;

pub use crate::models::*;
pub use crate::timing::Timing;

use std::time::Duration;

use thiserror::Error;

/// Failure of one remote fetch. A valid zero-length response is `Ok(vec![])`,
/// never an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("transport error: {message}")]
    Transport { message: String },
    #[error("remote returned status {code}")]
    Status { code: u16 },
}

/// Everything that can move the carousel. All mutation is serialized through
/// [`Carousel::apply`]; timers and fetch completions only ever produce events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Result of one station poll. `seq` is stamped when the poll is issued;
    /// a response arriving after a newer one has been applied is discarded.
    SnapshotReceived {
        seq: u64,
        result: Result<Vec<StationRecord>, FetchError>,
    },
    /// Result of one lazy part fetch for a tray.
    PartsReceived {
        tray_id: String,
        result: Result<Vec<Part>, FetchError>,
    },
    StationTimerFired,
    PartTimerFired,
}

/// Instruction to the driver for one timer class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerDirective {
    /// Leave the timer as it is.
    Keep,
    /// Cancel the timer.
    Stop,
    /// Cancel the timer and start a fresh one with the given period.
    Restart(Duration),
}

/// What the async driver must do after one applied event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Effects {
    /// Tray whose parts should be fetched lazily, if any.
    pub fetch_parts: Option<String>,
    pub station_timer: TimerDirective,
    pub part_timer: TimerDirective,
    /// Emitted to the renderer after every event.
    pub display: DisplayState,
}

/// The carousel state machine. Owns which station and which part are shown
/// and decides how the rotation timers must run; it performs no IO and knows
/// nothing about tokio.
#[derive(Debug, Clone)]
pub struct Carousel {
    timing: Timing,
    phase: Phase,
    stations: Vec<Station>,
    active_station_index: usize,
    active_part_index: usize,
    last_seq: Option<u64>,
    station_timer_running: bool,
    /// `(station id, part count)` the current part timer was sized for. The
    /// timer period is a function of the part count, so it is rebuilt rather
    /// than left running whenever this key changes.
    part_timer_key: Option<(String, usize)>,
}

impl Carousel {
    pub fn new(timing: Timing) -> Self {
        Carousel {
            timing,
            phase: Phase::Loading,
            stations: Vec::new(),
            active_station_index: 0,
            active_part_index: 0,
            last_seq: None,
            station_timer_running: false,
            part_timer_key: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// The single mutation path for the whole engine.
    pub fn apply(&mut self, event: Event) -> Effects {
        match event {
            Event::SnapshotReceived { seq, result } => self.apply_snapshot(seq, result),
            Event::PartsReceived { tray_id, result } => self.apply_parts(tray_id, result),
            Event::StationTimerFired => self.apply_station_tick(),
            Event::PartTimerFired => self.apply_part_tick(),
        }
    }

    /// The currently displayed station, with the index coerced against the
    /// active subsequence derived from the current station list.
    fn active_station(&self) -> Option<&Station> {
        let active = diff::active_indices(&self.stations);
        if active.is_empty() {
            return None;
        }
        let index = diff::coerce(self.active_station_index, active.len());
        self.stations.get(active[index])
    }

    /// Derive the renderer artifact from the current state.
    pub fn display(&self) -> DisplayState {
        let station = self.active_station().cloned();
        let part_index = station
            .as_ref()
            .map_or(0, |s| diff::coerce(self.active_part_index, s.parts.len().max(1)));
        let part = station
            .as_ref()
            .and_then(|s| s.parts.get(part_index).cloned());
        DisplayState {
            phase: self.phase,
            active_station_id: station.as_ref().map(|s| s.id.clone()),
            part,
            part_index,
            station,
            station_list: self.stations.clone(),
        }
    }

    /// Tray of the active station when its parts have not been fetched yet.
    fn lazy_fetch(&self) -> Option<String> {
        self.active_station().and_then(|station| {
            if station.parts.is_empty() {
                station.tray_id.clone()
            } else {
                None
            }
        })
    }

    fn apply_snapshot(
        &mut self,
        seq: u64,
        result: Result<Vec<StationRecord>, FetchError>,
    ) -> Effects {
        if self.last_seq.is_some_and(|last| seq <= last) {
            tracing::debug!(seq, "discarding stale station snapshot");
            return self.effects(None);
        }
        self.last_seq = Some(seq);

        let records = match result {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(%err, "station poll failed, discarding station list");
                self.phase = Phase::Error;
                self.stations.clear();
                self.active_station_index = 0;
                self.active_part_index = 0;
                return self.effects(None);
            }
        };

        let previous_active_id = self.active_station().map(|s| s.id.clone());

        // The snapshot replaces the station list wholesale. Parts fetched
        // earlier are carried over only while `(id, tray_id)` is unchanged;
        // a swapped tray starts over empty.
        let next: Vec<Station> = records
            .into_iter()
            .map(|record| {
                let carried = self
                    .stations
                    .iter()
                    .find(|s| s.id == record.id && s.tray_id == record.tray_id)
                    .map(|s| s.parts.clone())
                    .unwrap_or_default();
                let mut station = Station::from_record(record);
                station.parts = carried;
                station
            })
            .collect();
        let previous = std::mem::replace(&mut self.stations, next);

        let active = diff::active_indices(&self.stations);
        if active.is_empty() {
            self.phase = Phase::NoTray;
            self.active_station_index = 0;
            self.active_part_index = 0;
            return self.effects(None);
        }
        self.phase = Phase::Displaying;

        if let Some(position) = diff::first_new_active(&previous, &self.stations) {
            // A tray was inserted or swapped: the physical event preempts
            // whatever the rotation timers had selected.
            tracing::info!(
                station = %self.stations[active[position]].id,
                "new tray detected, preempting rotation"
            );
            self.active_station_index = position;
            self.active_part_index = 0;
        } else {
            // Follow the same station across snapshots where possible; a
            // station that vanished from the active subsequence leaves a
            // stale index behind, which coerces to 0.
            let relocated = previous_active_id
                .as_deref()
                .and_then(|id| active.iter().position(|&i| self.stations[i].id == id));
            match relocated {
                Some(position) => {
                    self.active_station_index = position;
                    let part_count = self.stations[active[position]].parts.len();
                    self.active_part_index =
                        diff::coerce(self.active_part_index, part_count.max(1));
                }
                None => {
                    self.active_station_index =
                        diff::coerce(self.active_station_index, active.len());
                    self.active_part_index = 0;
                }
            }
        }

        self.effects(self.lazy_fetch())
    }

    fn apply_parts(
        &mut self,
        tray_id: String,
        result: Result<Vec<Part>, FetchError>,
    ) -> Effects {
        let parts = match result {
            Ok(parts) => parts,
            Err(err) => {
                // Local failure: the tray stays empty and is retried on the
                // next natural poll cycle, not before.
                tracing::warn!(%err, %tray_id, "part fetch failed, tray stays empty");
                return self.effects(None);
            }
        };

        let mut matched = false;
        for station in &mut self.stations {
            if station.tray_id.as_deref() == Some(tray_id.as_str()) {
                station.parts = parts.clone();
                matched = true;
            }
        }
        if !matched {
            tracing::debug!(%tray_id, "dropping parts for a tray that is no longer present");
        }

        if let Some(count) = self.active_station().map(|s| s.parts.len()) {
            self.active_part_index = diff::coerce(self.active_part_index, count.max(1));
        }
        self.effects(None)
    }

    fn apply_station_tick(&mut self) -> Effects {
        let active = diff::active_indices(&self.stations);
        if self.phase != Phase::Displaying || active.len() <= 1 {
            return self.effects(None);
        }
        let index = diff::coerce(self.active_station_index, active.len());
        self.active_station_index = (index + 1) % active.len();
        self.active_part_index = 0;
        self.effects(self.lazy_fetch())
    }

    fn apply_part_tick(&mut self) -> Effects {
        if self.phase == Phase::Displaying {
            if let Some(count) = self.active_station().map(|s| s.parts.len()) {
                if count > 1 {
                    let index = diff::coerce(self.active_part_index, count);
                    self.active_part_index = (index + 1) % count;
                }
            }
        }
        self.effects(None)
    }

    /// Compute the timer directives and display for the state just reached.
    /// Directives are relative to what the driver is already running, so an
    /// unchanged situation yields `Keep` and never resets a timer's cadence.
    fn effects(&mut self, fetch_parts: Option<String>) -> Effects {
        let active_len = diff::active_indices(&self.stations).len();
        let station_wanted = self.phase == Phase::Displaying && active_len > 1;
        let station_timer = match (self.station_timer_running, station_wanted) {
            (false, true) => TimerDirective::Restart(self.timing.station_rotation),
            (true, false) => TimerDirective::Stop,
            _ => TimerDirective::Keep,
        };
        self.station_timer_running = station_wanted;

        let part_wanted: Option<(String, usize)> = if self.phase == Phase::Displaying {
            self.active_station().and_then(|station| {
                let count = station.parts.len();
                (count > 1).then(|| (station.id.clone(), count))
            })
        } else {
            None
        };
        let part_timer = if part_wanted == self.part_timer_key {
            TimerDirective::Keep
        } else {
            match part_wanted
                .as_ref()
                .and_then(|(_, count)| self.timing.part_period(*count))
            {
                Some(period) => TimerDirective::Restart(period),
                None => TimerDirective::Stop,
            }
        };
        self.part_timer_key = part_wanted;

        Effects {
            fetch_parts,
            station_timer,
            part_timer,
            display: self.display(),
        }
    }
}
