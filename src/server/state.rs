use crate::application::{Presentation, QuotaWatchService};
use crate::infrastructure::{
    AppConfig, HostMailClient, InMemoryKeyValueStore, InMemorySurface, PostgresKeyValueStore,
    SettingsBackend, SettingsStore,
};
use anyhow::Context;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

pub type QuotaWatchServiceType =
    QuotaWatchService<HostMailClient, SettingsBackend, InMemorySurface, InMemorySurface>;

#[derive(Clone)]
pub struct AppState {
    pub pool: Option<PgPool>,
    pub service: Arc<QuotaWatchServiceType>,
    pub surface: Arc<InMemorySurface>,
}

/// Wires the settings backend, host mail client, surfaces and service.
///
/// With `database_url` set, settings live in Postgres (migrations are run);
/// otherwise they are kept in memory for the life of the process.
pub async fn build_state(config: AppConfig) -> anyhow::Result<AppState> {
    let (backend, pool) = match &config.database_url {
        Some(url) => {
            let pool = PgPool::connect(url).await.context("connect database")?;
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("run migrations")?;
            (
                SettingsBackend::Postgres(PostgresKeyValueStore::new(pool.clone())),
                Some(pool),
            )
        }
        None => {
            info!("No database_url configured, keeping settings in memory");
            (SettingsBackend::Memory(InMemoryKeyValueStore::new()), None)
        }
    };

    let settings = Arc::new(SettingsStore::new(
        Arc::new(backend),
        config.default_interval_minutes,
    ));

    let mail = Arc::new(
        HostMailClient::new(&config.mail_api_url, &config.mail_api_token)
            .context("init mail store client")?,
    );

    let surface = Arc::new(InMemorySurface::new(&config.badge_color, &config.product_name));

    let service = Arc::new(QuotaWatchService::new(
        mail,
        settings,
        surface.clone(),
        surface.clone(),
        Presentation {
            icon: config.notification_icon,
            badge_color: config.badge_color,
            product_name: config.product_name,
        },
    ));

    Ok(AppState {
        pool,
        service,
        surface,
    })
}
