use super::commands::{AccountSettings, Command, CommandError, CommandResponse};
use super::monitor::{MonitorError, Presentation, QuotaMonitor};
use super::scheduler::Scheduler;
use crate::domain::{AccountConfig, PassReport, PassScope};
use crate::infrastructure::{BadgeSurface, KeyValueStore, MailProvider, Notifier, SettingsStore};
use std::sync::Arc;
use tracing::{error, info};
use validator::Validate;

pub const CHECK_TIMER_NAME: &str = "quota-check";

/// Entry points invoked by the host's event dispatcher: install, startup,
/// timer firings and settings-surface commands.
pub struct QuotaWatchService<M, K, N, B>
where
    M: MailProvider + 'static,
    K: KeyValueStore + 'static,
    N: Notifier + 'static,
    B: BadgeSurface + 'static,
{
    mail: Arc<M>,
    settings: Arc<SettingsStore<K>>,
    monitor: Arc<QuotaMonitor<M, K, N, B>>,
    scheduler: Scheduler,
}

impl<M, K, N, B> QuotaWatchService<M, K, N, B>
where
    M: MailProvider + 'static,
    K: KeyValueStore + 'static,
    N: Notifier + 'static,
    B: BadgeSurface + 'static,
{
    pub fn new(
        mail: Arc<M>,
        settings: Arc<SettingsStore<K>>,
        notifier: Arc<N>,
        badge: Arc<B>,
        presentation: Presentation,
    ) -> Self {
        let monitor = Arc::new(QuotaMonitor::new(
            mail.clone(),
            settings.clone(),
            notifier,
            badge,
            presentation,
        ));
        Self {
            mail,
            settings,
            monitor,
            scheduler: Scheduler::new(CHECK_TIMER_NAME),
        }
    }

    pub fn monitor(&self) -> &QuotaMonitor<M, K, N, B> {
        &self.monitor
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Seeds the default check interval on first install.
    pub async fn on_install(&self) -> Result<(), CommandError> {
        if !self.settings.has_interval().await? {
            let minutes = self
                .settings
                .set_interval_minutes(f64::from(self.settings.default_interval_minutes()))
                .await?;
            info!(minutes, "Seeded default check interval");
        }
        Ok(())
    }

    /// Arms the timer from the stored interval, then runs an initial pass.
    pub async fn on_startup(&self) -> Result<PassReport, MonitorError> {
        self.rearm().await;
        self.monitor.run_pass(PassScope::All, false).await
    }

    /// Timer firing: a forced pass over all accounts.
    pub async fn on_alarm(&self) -> Result<PassReport, MonitorError> {
        self.monitor.run_pass(PassScope::All, true).await
    }

    /// Re-arms the timer from the stored interval; failures are logged and leave
    /// the monitor running without a timer.
    pub async fn rearm(&self) -> bool {
        let minutes = match self.settings.interval_minutes().await {
            Ok(minutes) => minutes,
            Err(e) => {
                error!(error = %e, "Failed to read check interval");
                self.settings.default_interval_minutes()
            }
        };
        match self.scheduler.arm(minutes, self.monitor.clone()) {
            Ok(period) => period.is_some(),
            Err(e) => {
                error!(timer = %self.scheduler.name(), error = %e, "Failed to arm timer");
                false
            }
        }
    }

    pub async fn handle_command(&self, command: Command) -> Result<CommandResponse, CommandError> {
        info!(command = %command, "Handling command");
        match command {
            Command::GetAccountConfigs => {
                let accounts = self.mail.list_accounts().await?;
                let mut configs = self.settings.account_configs().await?;
                let accounts = accounts
                    .into_iter()
                    .map(|account| {
                        let config = configs
                            .remove(&account.id)
                            .unwrap_or_else(|| AccountConfig::new(account.id.clone()));
                        AccountSettings {
                            account_id: account.id,
                            name: account.name,
                            config,
                        }
                    })
                    .collect();
                Ok(CommandResponse::AccountConfigs { accounts })
            }
            Command::GetUsage => {
                let report = self.monitor.run_pass(PassScope::All, false).await?;
                Ok(CommandResponse::Usage { report })
            }
            Command::SaveAccountConfig { account_id, patch } => {
                if account_id.trim().is_empty() {
                    return Err(CommandError::Validation("account_id is required".to_string()));
                }
                patch.validate()?;
                let config = self.settings.save_account_config(&account_id, &patch).await?;
                info!(account_id = %account_id, active = config.active, limit_bytes = config.limit_bytes, threshold_pct = config.threshold_pct, "Account settings saved");
                Ok(CommandResponse::AccountConfigSaved { config })
            }
            Command::RunCheck { force, account_id } => {
                let scope = match account_id {
                    Some(id) => PassScope::Account(id),
                    None => PassScope::All,
                };
                let report = self.monitor.run_pass(scope, force).await?;
                Ok(CommandResponse::CheckCompleted { report })
            }
            Command::GetInterval => Ok(CommandResponse::Interval {
                minutes: self.settings.interval_minutes().await?,
                armed: self.scheduler.is_armed(),
            }),
            Command::SetInterval { minutes } => {
                let minutes = self.settings.set_interval_minutes(minutes).await?;
                let armed = self.rearm().await;
                Ok(CommandResponse::Interval { minutes, armed })
            }
        }
    }
}
