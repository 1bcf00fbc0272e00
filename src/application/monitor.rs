use super::aggregator::UsageAggregator;
use super::scheduler::Tick;
use crate::domain::{
    notification_id, round_pct, usage_pct, AccountConfig, AlertPayload, BadgeState, BadgeTally,
    MailAccount, PassReport, PassScope, UsageSnapshot, WorstAccount,
};
use crate::infrastructure::{
    BadgeSurface, KeyValueStore, MailProvider, Notifier, ProviderError, SettingsStore, StoreError,
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Mail provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("Settings store error: {0}")]
    Store(#[from] StoreError),
    #[error("Unknown account: {0}")]
    UnknownAccount(String),
}

/// How alerts and the badge look.
#[derive(Debug, Clone)]
pub struct Presentation {
    pub icon: String,
    pub badge_color: String,
    /// Badge tooltip when no account is over its threshold.
    pub product_name: String,
}

enum Evaluation {
    Skipped {
        cleared: bool,
    },
    Measured {
        used_bytes: u64,
        pct_used: f64,
        notified: bool,
        cleared: bool,
    },
}

/// Runs passes over the configured accounts and drives notifications and the badge.
pub struct QuotaMonitor<M, K, N, B>
where
    M: MailProvider,
    K: KeyValueStore,
    N: Notifier,
    B: BadgeSurface,
{
    mail: Arc<M>,
    usage: UsageAggregator<M>,
    settings: Arc<SettingsStore<K>>,
    notifier: Arc<N>,
    badge: Arc<B>,
    presentation: Presentation,
    pass_lock: Mutex<()>,
}

impl<M, K, N, B> QuotaMonitor<M, K, N, B>
where
    M: MailProvider,
    K: KeyValueStore,
    N: Notifier,
    B: BadgeSurface,
{
    pub fn new(
        mail: Arc<M>,
        settings: Arc<SettingsStore<K>>,
        notifier: Arc<N>,
        badge: Arc<B>,
        presentation: Presentation,
    ) -> Self {
        Self {
            usage: UsageAggregator::new(mail.clone()),
            mail,
            settings,
            notifier,
            badge,
            presentation,
            pass_lock: Mutex::new(()),
        }
    }

    /// One pass over the accounts in `scope`. Passes never overlap; a second
    /// caller waits for the running pass to finish.
    ///
    /// A forced pass re-announces every account still at or above its threshold.
    pub async fn run_pass(&self, scope: PassScope, force: bool) -> Result<PassReport, MonitorError> {
        let _guard = self.pass_lock.lock().await;
        let started_at = Utc::now();

        let accounts = self.mail.list_accounts().await?;
        if let PassScope::Account(id) = &scope {
            if !accounts.iter().any(|a| &a.id == id) {
                return Err(MonitorError::UnknownAccount(id.clone()));
            }
        }
        let configs = self.settings.account_configs().await?;

        let mut report = PassReport {
            started_at,
            finished_at: started_at,
            forced: force,
            snapshots: Vec::new(),
            notified: Vec::new(),
            cleared: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            worst: None,
        };
        let mut tally = BadgeTally::default();

        for account in &accounts {
            let config = configs
                .get(&account.id)
                .cloned()
                .unwrap_or_else(|| AccountConfig::new(account.id.clone()));

            if !scope.includes(&account.id) {
                if config.is_monitored() {
                    self.tally_last_recorded(&mut tally, account, &config).await;
                }
                continue;
            }

            let mut snapshot = UsageSnapshot {
                account_id: account.id.clone(),
                name: account.name.clone(),
                active: config.active,
                limit_bytes: config.limit_bytes,
                threshold_pct: config.threshold_pct,
                used_bytes: None,
                pct_used: None,
            };

            match self.evaluate(account, &config, force).await {
                Ok(Evaluation::Skipped { cleared }) => {
                    report.skipped.push(account.id.clone());
                    if cleared {
                        report.cleared.push(account.id.clone());
                    }
                }
                Ok(Evaluation::Measured {
                    used_bytes,
                    pct_used,
                    notified,
                    cleared,
                }) => {
                    snapshot.used_bytes = Some(used_bytes);
                    snapshot.pct_used = Some(pct_used);
                    if snapshot.is_over_threshold() {
                        tally.consider(&account.id, &account.name, pct_used);
                    }
                    if notified {
                        report.notified.push(account.id.clone());
                    }
                    if cleared {
                        report.cleared.push(account.id.clone());
                    }
                }
                Err(e) => {
                    warn!(account_id = %account.id, error = %e, "Usage check failed, skipping account for this pass");
                    report.failed.push(account.id.clone());
                    self.tally_last_recorded(&mut tally, account, &config).await;
                }
            }

            report.snapshots.push(snapshot);
        }

        report.worst = tally.finish();
        self.present_badge(report.worst.as_ref()).await;
        report.finished_at = Utc::now();

        info!(
            forced = force,
            checked = report.snapshots.len(),
            notified = report.notified.len(),
            cleared = report.cleared.len(),
            failed = report.failed.len(),
            badge = report.worst.as_ref().map(|w| w.pct),
            "Quota pass complete"
        );
        Ok(report)
    }

    async fn evaluate(
        &self,
        account: &MailAccount,
        config: &AccountConfig,
        force: bool,
    ) -> Result<Evaluation, MonitorError> {
        if !config.is_monitored() {
            let cleared = self.clear_alert(&account.id).await;
            self.settings.set_last_notified(&account.id, 0.0).await?;
            self.settings.set_last_usage(&account.id, 0.0).await?;
            return Ok(Evaluation::Skipped { cleared });
        }

        let used_bytes = self.usage.account_usage(&account.id).await?;
        let pct_used = usage_pct(used_bytes, config.limit_bytes);
        let threshold = f64::from(config.threshold_pct);
        let previous = self.settings.last_notified(&account.id).await?;

        let over = pct_used >= threshold;
        let crossed_up = over && previous < threshold;

        let cleared = if over {
            false
        } else {
            self.clear_alert(&account.id).await
        };

        let mut notified = false;
        if crossed_up || (force && over) {
            let payload = AlertPayload::quota_warning(
                &self.presentation.icon,
                &account.name,
                used_bytes,
                config.limit_bytes,
                pct_used,
                config.threshold_pct,
            );
            match self.notifier.notify(&notification_id(&account.id), &payload).await {
                Ok(()) => notified = true,
                Err(e) => error!(account_id = %account.id, error = %e, "Failed to show quota notification"),
            }
        }

        // The measurement stands even when it cannot be recorded.
        if let Err(e) = self
            .settings
            .set_last_notified(&account.id, round_pct(pct_used))
            .await
        {
            error!(account_id = %account.id, error = %e, "Failed to record notify state");
        }
        if let Err(e) = self.settings.set_last_usage(&account.id, pct_used).await {
            error!(account_id = %account.id, error = %e, "Failed to record last usage");
        }

        debug!(
            account_id = %account.id,
            used_bytes,
            pct_used,
            previous,
            crossed_up,
            notified,
            "Account evaluated"
        );

        Ok(Evaluation::Measured {
            used_bytes,
            pct_used,
            notified,
            cleared,
        })
    }

    /// Clears the account's notification; returns whether one was live.
    async fn clear_alert(&self, account_id: &str) -> bool {
        self.notifier
            .clear(&notification_id(account_id))
            .await
            .is_ok()
    }

    /// Badge contribution for an account this pass did not measure, judged on
    /// the unrounded percentage of its last measurement.
    async fn tally_last_recorded(
        &self,
        tally: &mut BadgeTally,
        account: &MailAccount,
        config: &AccountConfig,
    ) {
        match self.settings.last_usage(&account.id).await {
            Ok(last) if last >= f64::from(config.threshold_pct) => {
                tally.consider(&account.id, &account.name, last);
            }
            Ok(_) => {}
            Err(e) => {
                warn!(account_id = %account.id, error = %e, "Failed to read last recorded usage");
            }
        }
    }

    async fn present_badge(&self, worst: Option<&WorstAccount>) {
        let state = BadgeState::from_worst(
            worst,
            &self.presentation.badge_color,
            &self.presentation.product_name,
        );
        if let Err(e) = self.badge.set_text(&state.text).await {
            warn!(error = %e, "Failed to set badge text");
        }
        if let Err(e) = self.badge.set_color(&state.color).await {
            warn!(error = %e, "Failed to set badge color");
        }
        if let Err(e) = self.badge.set_title(&state.title).await {
            warn!(error = %e, "Failed to set badge title");
        }
    }
}

#[async_trait]
impl<M, K, N, B> Tick for QuotaMonitor<M, K, N, B>
where
    M: MailProvider + 'static,
    K: KeyValueStore + 'static,
    N: Notifier + 'static,
    B: BadgeSurface + 'static,
{
    /// Scheduled checks re-announce accounts that are still over threshold.
    async fn tick(&self) {
        if let Err(e) = self.run_pass(PassScope::All, true).await {
            error!(error = %e, "Scheduled quota pass failed");
        }
    }
}
