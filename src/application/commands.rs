use super::monitor::MonitorError;
use crate::domain::{AccountConfig, AccountConfigPatch, PassReport};
use crate::infrastructure::{ProviderError, StoreError};
use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

/// Requests accepted from the settings surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Display)]
#[serde(tag = "type", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Command {
    GetAccountConfigs,
    /// Runs a non-forced pass over all accounts and returns its snapshots.
    GetUsage,
    SaveAccountConfig {
        account_id: String,
        #[serde(default)]
        patch: AccountConfigPatch,
    },
    RunCheck {
        #[serde(default)]
        force: bool,
        #[serde(default)]
        account_id: Option<String>,
    },
    GetInterval,
    /// Stores the interval and re-arms the timer.
    SetInterval { minutes: f64 },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AccountSettings {
    pub account_id: String,
    pub name: String,
    pub config: AccountConfig,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandResponse {
    AccountConfigs { accounts: Vec<AccountSettings> },
    Usage { report: PassReport },
    AccountConfigSaved { config: AccountConfig },
    CheckCompleted { report: PassReport },
    Interval { minutes: u32, armed: bool },
}

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Unknown account: {0}")]
    UnknownAccount(String),
    #[error("Mail provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("Settings store error: {0}")]
    Store(#[from] StoreError),
    #[error("Quota check failed: {0}")]
    Monitor(MonitorError),
}

impl From<MonitorError> for CommandError {
    fn from(err: MonitorError) -> Self {
        match err {
            MonitorError::UnknownAccount(id) => CommandError::UnknownAccount(id),
            other => CommandError::Monitor(other),
        }
    }
}

impl From<validator::ValidationErrors> for CommandError {
    fn from(err: validator::ValidationErrors) -> Self {
        CommandError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn commands_parse_from_tagged_json() {
        let cmd: Command = serde_json::from_value(json!({ "type": "run_check" })).unwrap();
        assert_eq!(
            cmd,
            Command::RunCheck {
                force: false,
                account_id: None
            }
        );

        let cmd: Command = serde_json::from_value(json!({
            "type": "save_account_config",
            "account_id": "acct-1",
            "patch": { "limit_bytes": 1024, "threshold_pct": 90 }
        }))
        .unwrap();
        assert_eq!(cmd.to_string(), "save_account_config");
        match cmd {
            Command::SaveAccountConfig { account_id, patch } => {
                assert_eq!(account_id, "acct-1");
                assert_eq!(patch.limit_bytes, Some(1024));
                assert_eq!(patch.threshold_pct, Some(90));
                assert_eq!(patch.active, None);
            }
            other => panic!("unexpected command {:?}", other),
        }

        let cmd: Command =
            serde_json::from_value(json!({ "type": "set_interval", "minutes": 0.5 })).unwrap();
        assert_eq!(cmd, Command::SetInterval { minutes: 0.5 });
    }

    #[test]
    fn unknown_account_maps_through() {
        let err: CommandError = MonitorError::UnknownAccount("x".into()).into();
        assert!(matches!(err, CommandError::UnknownAccount(id) if id == "x"));
    }
}
