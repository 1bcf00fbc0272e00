use super::alert::WorstAccount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Percentage of `limit_bytes` used. Callers must ensure `limit_bytes > 0`.
pub fn usage_pct(used_bytes: u64, limit_bytes: u64) -> f64 {
    (used_bytes as f64 * 100.0) / limit_bytes as f64
}

/// One-decimal rounding used for the persisted notify state.
pub fn round_pct(pct: f64) -> f64 {
    (pct * 10.0).round() / 10.0
}

/// Accounts evaluated by a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "account_id", rename_all = "snake_case")]
pub enum PassScope {
    All,
    Account(String),
}

impl PassScope {
    pub fn includes(&self, account_id: &str) -> bool {
        match self {
            PassScope::All => true,
            PassScope::Account(id) => id == account_id,
        }
    }
}

/// Usage of one account as measured by a pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageSnapshot {
    pub account_id: String,
    pub name: String,
    pub active: bool,
    pub limit_bytes: u64,
    pub threshold_pct: u8,
    /// Absent when the account was skipped or its enumeration failed.
    pub used_bytes: Option<u64>,
    pub pct_used: Option<f64>,
}

impl UsageSnapshot {
    pub fn is_over_threshold(&self) -> bool {
        self.pct_used
            .map(|pct| pct >= f64::from(self.threshold_pct))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PassReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub forced: bool,
    pub snapshots: Vec<UsageSnapshot>,
    pub notified: Vec<String>,
    pub cleared: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
    pub worst: Option<WorstAccount>,
}
