use std::time::Duration;

use carousel_core::Timing;
use serde::{Deserialize, Serialize};

/// Runtime configuration for the kiosk display, loaded from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KioskConfig {
    /// Base URL of the remote station service
    pub base_url: String,
    /// Opaque bearer credential passed through on every request
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Station poll period in seconds
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,
    /// Station rotation period in seconds
    #[serde(default = "default_station_rotation_secs")]
    pub station_rotation_secs: u64,
    /// Total budget in seconds for cycling all parts of one station
    #[serde(default = "default_part_cycle_budget_secs")]
    pub part_cycle_budget_secs: u64,
    /// Minimum seconds a single part stays on screen
    #[serde(default = "default_part_floor_secs")]
    pub part_floor_secs: u64,
}

fn default_poll_secs() -> u64 {
    3
}

fn default_station_rotation_secs() -> u64 {
    12
}

fn default_part_cycle_budget_secs() -> u64 {
    9
}

fn default_part_floor_secs() -> u64 {
    2
}

impl KioskConfig {
    pub fn timing(&self) -> Timing {
        Timing {
            station_poll: Duration::from_secs(self.poll_secs),
            station_rotation: Duration::from_secs(self.station_rotation_secs),
            part_cycle_budget: Duration::from_secs(self.part_cycle_budget_secs),
            part_floor: Duration::from_secs(self.part_floor_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_deserialization() {
        let json = r#"
        {
          "baseUrl": "https://kiosk.example/api",
          "authToken": "kiosk-secret",
          "pollSecs": 5,
          "stationRotationSecs": 15
        }
        "#;

        let config: KioskConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.base_url, "https://kiosk.example/api");
        assert_eq!(config.auth_token.as_deref(), Some("kiosk-secret"));
        assert_eq!(config.poll_secs, 5);
        assert_eq!(config.station_rotation_secs, 15);
        // Omitted fields fall back to defaults
        assert_eq!(config.part_cycle_budget_secs, 9);
        assert_eq!(config.part_floor_secs, 2);
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let json = r#"{ "baseUrl": "http://localhost:3000" }"#;
        let config: KioskConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.auth_token, None);

        let timing = config.timing();
        assert_eq!(timing.station_poll, Duration::from_secs(3));
        assert_eq!(timing.station_rotation, Duration::from_secs(12));
        assert_eq!(timing.part_cycle_budget, Duration::from_secs(9));
        assert_eq!(timing.part_floor, Duration::from_secs(2));
    }

    #[test]
    fn test_config_round_trips() {
        let config = KioskConfig {
            base_url: "http://localhost:3000".into(),
            auth_token: None,
            poll_secs: 3,
            station_rotation_secs: 12,
            part_cycle_budget_secs: 9,
            part_floor_secs: 2,
        };

        let json = serde_json::to_string_pretty(&config).unwrap();
        let deserialized: KioskConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.base_url, config.base_url);
        assert_eq!(deserialized.poll_secs, config.poll_secs);
    }
}
