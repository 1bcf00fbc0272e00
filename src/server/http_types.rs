use crate::domain::BadgeState;
use crate::infrastructure::LiveAlert;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub(super) struct HealthResponse {
    pub(super) status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) error: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub(super) struct BadgeResponse {
    #[schema(example = "85")]
    pub(super) text: String,
    #[schema(example = "#D9534F")]
    pub(super) color: String,
    #[schema(example = "Work")]
    pub(super) title: String,
}

impl From<BadgeState> for BadgeResponse {
    fn from(badge: BadgeState) -> Self {
        Self {
            text: badge.text,
            color: badge.color,
            title: badge.title,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub(super) struct AlertResponse {
    #[schema(example = "quota-warning-acct-1")]
    pub(super) id: String,
    pub(super) icon: String,
    pub(super) title: String,
    pub(super) body: String,
    pub(super) shown_at: chrono::DateTime<chrono::Utc>,
}

impl From<LiveAlert> for AlertResponse {
    fn from(alert: LiveAlert) -> Self {
        Self {
            id: alert.id,
            icon: alert.payload.icon,
            title: alert.payload.title,
            body: alert.payload.body,
            shown_at: alert.shown_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub(super) struct StatusResponse {
    pub(super) badge: BadgeResponse,
    pub(super) alerts: Vec<AlertResponse>,
    /// Timer period in minutes; absent when periodic checks are disabled.
    pub(super) check_interval_minutes: Option<u64>,
}
