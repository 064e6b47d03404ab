//! JSON models returned by the server's query entry points
//!
//! Every field is defaulted so that a server built from a different revision
//! (missing or extra fields) still decodes.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// TPS at or above this counts as healthy
pub const DEFAULT_TPS_HEALTHY_THRESHOLD: f32 = 18.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// An online player
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerInfo {
    pub uuid: String,
    pub username: String,
    pub ip_address: String,
    /// `Java` or `Bedrock`
    pub platform: String,
    pub gamemode: String,
    pub health: f32,
    pub food_level: i32,
    pub saturation: f32,
    pub exp_level: i32,
    pub exp_progress: f32,
    pub total_exp: i32,
    pub permission_level: i32,
    pub is_on_ground: bool,
    pub position: Vec3,
    pub rotation_yaw: f32,
    pub rotation_pitch: f32,
    pub dimension: String,
    pub is_sneaking: bool,
    pub is_sprinting: bool,
}

impl PlayerInfo {
    /// Block coordinates as `x, y, z`
    pub fn formatted_position(&self) -> String {
        format!(
            "{}, {}, {}",
            self.position.x.floor() as i64,
            self.position.y.floor() as i64,
            self.position.z.floor() as i64
        )
    }

    /// Operators have permission level 1 or higher
    pub fn is_operator(&self) -> bool {
        self.permission_level > 0
    }
}

/// Tick performance snapshot
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerMetrics {
    pub tps: f32,
    pub mspt: f32,
    pub tick_count: i64,
    pub loaded_chunks: u64,
    pub player_count: u64,
}

impl ServerMetrics {
    pub fn formatted_tps(&self) -> String {
        format!("{:.1}", self.tps)
    }

    pub fn formatted_mspt(&self) -> String {
        format!("{:.2}ms", self.mspt)
    }

    pub fn is_tps_healthy(&self) -> bool {
        self.is_tps_healthy_at(DEFAULT_TPS_HEALTHY_THRESHOLD)
    }

    pub fn is_tps_healthy_at(&self, threshold: f32) -> bool {
        self.tps >= threshold
    }
}

/// A tab-completion candidate
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSuggestion {
    pub text: String,
    pub tooltip: Option<String>,
}

pub fn decode_players(json: &str) -> Result<Vec<PlayerInfo>> {
    Ok(serde_json::from_str(json)?)
}

/// Decode a metrics snapshot. An empty object (server not yet up) is `None`.
pub fn decode_metrics(json: &str) -> Result<Option<ServerMetrics>> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    if value.as_object().is_some_and(|obj| obj.is_empty()) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(value)?))
}

pub fn decode_completions(json: &str) -> Result<Vec<CommandSuggestion>> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_players() {
        let json = r#"[{
            "uuid": "069a79f4-44e9-4726-a5be-fca90e38aaf5",
            "username": "Notch",
            "ip_address": "127.0.0.1:51234",
            "platform": "Java",
            "gamemode": "Survival",
            "health": 20.0,
            "food_level": 18,
            "saturation": 5.0,
            "exp_level": 3,
            "exp_progress": 0.5,
            "total_exp": 27,
            "permission_level": 4,
            "is_on_ground": true,
            "position": {"x": 10.7, "y": 64.0, "z": -3.2},
            "rotation_yaw": 90.0,
            "rotation_pitch": 0.0,
            "dimension": "Overworld",
            "is_sneaking": false,
            "is_sprinting": true
        }]"#;

        let players = decode_players(json).unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].username, "Notch");
        assert_eq!(players[0].food_level, 18);
        assert_eq!(players[0].formatted_position(), "10, 64, -4");
        assert!(players[0].is_operator());
    }

    #[test]
    fn test_decode_players_tolerates_missing_and_extra_fields() {
        let players = decode_players(r#"[{"username": "Alex", "ping": 12}]"#).unwrap();
        assert_eq!(players[0].username, "Alex");
        assert_eq!(players[0].health, 0.0);
        assert!(!players[0].is_operator());
    }

    #[test]
    fn test_decode_players_rejects_garbage() {
        assert!(decode_players("not json").is_err());
    }

    #[test]
    fn test_decode_metrics() {
        let metrics = decode_metrics(
            r#"{"tps": 19.87, "mspt": 12.345, "tick_count": 1200, "loaded_chunks": 441, "player_count": 2}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(metrics.formatted_tps(), "19.9");
        assert_eq!(metrics.formatted_mspt(), "12.35ms");
        assert!(metrics.is_tps_healthy());
        assert_eq!(metrics.player_count, 2);
    }

    #[test]
    fn test_decode_metrics_empty_object() {
        assert_eq!(decode_metrics("{}").unwrap(), None);
    }

    #[test]
    fn test_tps_health_threshold() {
        let metrics = ServerMetrics {
            tps: 17.9,
            ..Default::default()
        };
        assert!(!metrics.is_tps_healthy());
        assert!(metrics.is_tps_healthy_at(15.0));

        let metrics = ServerMetrics {
            tps: 18.0,
            ..Default::default()
        };
        assert!(metrics.is_tps_healthy());
    }

    #[test]
    fn test_decode_completions() {
        let suggestions =
            decode_completions(r#"[{"text": "gamemode", "tooltip": null}, {"text": "give"}]"#)
                .unwrap();
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].text, "gamemode");
        assert_eq!(suggestions[1].tooltip, None);
    }
}
