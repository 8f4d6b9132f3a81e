use serde::{Deserialize, Serialize};

/// One row of the backend's room table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct RoomRecord {
    pub project_id: i64,
    pub name: String,
    pub floor: i32,
    pub square_feet: Option<f64>,
    /// Initial condition on the backend's 1-5 scale.
    pub condition: Option<u8>,
    pub notes: Option<String>,
}

impl RoomRecord {
    pub fn display_size(&self) -> String {
        match self.square_feet {
            Some(sqft) => format!("{:.0} sq ft", sqft),
            None => "Not set".to_string(),
        }
    }
}

/// Payload for `room add`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRoom {
    pub name: String,
    pub floor: i32,
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub condition: Option<u8>,
    pub notes: Option<String>,
}
