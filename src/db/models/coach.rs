use serde::Serialize;
use serde_json::Value;

use super::user::Badge;
use super::{InputError, require_number, require_str};

/// One suggested habit change from the coaching assistant.
#[derive(Debug, Clone, Serialize)]
pub struct CoachAction {
    pub action: String,
    pub carbon_saved: f64,
    pub credits: i64,
    pub motivation: String,
}

/// Client claim that a coached action was completed.
#[derive(Debug, Clone)]
pub struct ConfirmRequest {
    pub action: String,
    pub credits: i64,
}

impl ConfirmRequest {
    pub fn parse(body: &Value) -> Result<Self, InputError> {
        let action = require_str(body, "action")?;
        let credits = require_number(body, "credits")?.round() as i64;

        Ok(Self { action, credits })
    }
}

/// Receipt for a confirmed action, in the shape the web client expects.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmReceipt {
    pub success: bool,
    pub new_credits: i64,
    pub badge: Badge,
}
