use crate::domain::{AlertPayload, BadgeState};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("Notification not found: {0}")]
    NotFound(String),
    #[error("Surface unavailable: {0}")]
    Unavailable(String),
}

/// Desktop-style notifications addressed by a stable id.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Shows `payload`, replacing any live notification with the same id.
    #[must_use]
    async fn notify(&self, id: &str, payload: &AlertPayload) -> Result<(), SurfaceError>;
    #[must_use]
    async fn clear(&self, id: &str) -> Result<(), SurfaceError>;
}

/// The single toolbar-wide indicator.
#[async_trait]
pub trait BadgeSurface: Send + Sync {
    #[must_use]
    async fn set_text(&self, text: &str) -> Result<(), SurfaceError>;
    #[must_use]
    async fn set_color(&self, color: &str) -> Result<(), SurfaceError>;
    #[must_use]
    async fn set_title(&self, title: &str) -> Result<(), SurfaceError>;
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LiveAlert {
    pub id: String,
    pub payload: AlertPayload,
    pub shown_at: DateTime<Utc>,
}

/// Keeps live alerts and the badge in memory so the server can expose them.
#[derive(Debug)]
pub struct InMemorySurface {
    alerts: RwLock<BTreeMap<String, LiveAlert>>,
    badge: RwLock<BadgeState>,
}

impl InMemorySurface {
    pub fn new(default_color: &str, default_title: &str) -> Self {
        Self {
            alerts: RwLock::new(BTreeMap::new()),
            badge: RwLock::new(BadgeState::cleared(default_color, default_title)),
        }
    }

    pub async fn alerts(&self) -> Vec<LiveAlert> {
        self.alerts.read().await.values().cloned().collect()
    }

    pub async fn badge(&self) -> BadgeState {
        self.badge.read().await.clone()
    }
}

#[async_trait]
impl Notifier for InMemorySurface {
    async fn notify(&self, id: &str, payload: &AlertPayload) -> Result<(), SurfaceError> {
        let replaced = self
            .alerts
            .write()
            .await
            .insert(
                id.to_string(),
                LiveAlert {
                    id: id.to_string(),
                    payload: payload.clone(),
                    shown_at: Utc::now(),
                },
            )
            .is_some();
        info!(id = %id, replaced, title = %payload.title, "Notification shown");
        Ok(())
    }

    async fn clear(&self, id: &str) -> Result<(), SurfaceError> {
        match self.alerts.write().await.remove(id) {
            Some(_) => {
                debug!(id = %id, "Notification cleared");
                Ok(())
            }
            None => Err(SurfaceError::NotFound(id.to_string())),
        }
    }
}

#[async_trait]
impl BadgeSurface for InMemorySurface {
    async fn set_text(&self, text: &str) -> Result<(), SurfaceError> {
        self.badge.write().await.text = text.to_string();
        Ok(())
    }

    async fn set_color(&self, color: &str) -> Result<(), SurfaceError> {
        self.badge.write().await.color = color.to_string();
        Ok(())
    }

    async fn set_title(&self, title: &str) -> Result<(), SurfaceError> {
        self.badge.write().await.title = title.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(title: &str) -> AlertPayload {
        AlertPayload {
            icon: "icon.svg".to_string(),
            title: title.to_string(),
            body: "body".to_string(),
        }
    }

    #[tokio::test]
    async fn notify_replaces_by_id() {
        let surface = InMemorySurface::new("#D9534F", "Quota Watch");
        surface.notify("quota-warning-a", &payload("first")).await.unwrap();
        surface.notify("quota-warning-a", &payload("second")).await.unwrap();

        let alerts = surface.alerts().await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].payload.title, "second");
    }

    #[tokio::test]
    async fn clearing_unknown_id_reports_not_found() {
        let surface = InMemorySurface::new("#D9534F", "Quota Watch");
        assert!(matches!(
            surface.clear("quota-warning-x").await,
            Err(SurfaceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn badge_starts_cleared() {
        let surface = InMemorySurface::new("#D9534F", "Quota Watch");
        let badge = surface.badge().await;
        assert_eq!(badge.text, "");
        assert_eq!(badge.title, "Quota Watch");

        surface.set_text("85").await.unwrap();
        surface.set_title("Work").await.unwrap();
        assert_eq!(surface.badge().await.text, "85");
        assert_eq!(surface.badge().await.title, "Work");
    }
}
