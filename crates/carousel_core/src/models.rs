use serde::{Deserialize, Serialize};

/// One station as reported by a station poll, before any parts are attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationRecord {
    pub id: String,
    pub label: String,
    pub tray_id: Option<String>,
}

/// One displayable item inside a tray. Immutable once fetched; a tray's part
/// list is always replaced wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub id: String,
    pub name: String,
    pub image_url: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A physical slot that may or may not currently hold a tray.
///
/// `parts` is populated lazily, only for the currently displayed station, and
/// is cleared whenever `tray_id` changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: String,
    pub label: String,
    pub tray_id: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Station {
    pub fn from_record(record: StationRecord) -> Self {
        Station {
            id: record.id,
            label: record.label,
            tray_id: record.tray_id,
            parts: Vec::new(),
        }
    }

    pub fn has_tray(&self) -> bool {
        self.tray_id.is_some()
    }
}

/// Top-level phase of the carousel engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    /// No snapshot has been applied yet.
    Loading,
    /// The last station poll failed; the station list has been discarded.
    Error,
    /// A snapshot was obtained but no station currently holds a tray.
    NoTray,
    /// At least one station holds a tray and a selection exists.
    Displaying,
}

/// The fully derived artifact handed to the renderer, re-emitted on every
/// state transition. Never persisted separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayState {
    pub phase: Phase,
    pub station: Option<Station>,
    pub part: Option<Part>,
    pub part_index: usize,
    pub station_list: Vec<Station>,
    pub active_station_id: Option<String>,
}

impl DisplayState {
    pub fn empty(phase: Phase) -> Self {
        DisplayState {
            phase,
            station: None,
            part: None,
            part_index: 0,
            station_list: Vec::new(),
            active_station_id: None,
        }
    }
}
