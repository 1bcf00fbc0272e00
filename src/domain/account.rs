use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

/// Warning thresholds offered by the settings surface.
pub const ALLOWED_THRESHOLDS: [u8; 6] = [50, 60, 70, 80, 90, 95];
pub const DEFAULT_THRESHOLD_PCT: u8 = 80;

/// Per-account monitoring settings.
///
/// Stored values are read leniently: a malformed limit reads as 0 (unmonitored)
/// and a malformed threshold reads as [`DEFAULT_THRESHOLD_PCT`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountConfig {
    #[serde(default)]
    pub account_id: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, deserialize_with = "lenient_bytes")]
    pub limit_bytes: u64,
    #[serde(default = "default_threshold", deserialize_with = "lenient_threshold")]
    pub threshold_pct: u8,
}

impl AccountConfig {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            active: true,
            limit_bytes: 0,
            threshold_pct: DEFAULT_THRESHOLD_PCT,
        }
    }

    /// Only active accounts with a positive limit have a meaningful usage percentage.
    pub fn is_monitored(&self) -> bool {
        self.active && self.limit_bytes > 0
    }

    pub fn apply(&mut self, patch: &AccountConfigPatch) {
        if let Some(active) = patch.active {
            self.active = active;
        }
        if let Some(limit_bytes) = patch.limit_bytes {
            self.limit_bytes = limit_bytes;
        }
        if let Some(threshold_pct) = patch.threshold_pct {
            self.threshold_pct = threshold_pct;
        }
    }
}

/// Partial update merged onto the stored (or default) config of one account.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Validate)]
#[validate(schema(function = "validate_threshold"))]
pub struct AccountConfigPatch {
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub limit_bytes: Option<u64>,
    #[serde(default)]
    pub threshold_pct: Option<u8>,
}

fn validate_threshold(patch: &AccountConfigPatch) -> Result<(), ValidationError> {
    match patch.threshold_pct {
        Some(pct) if !ALLOWED_THRESHOLDS.contains(&pct) => {
            Err(ValidationError::new("threshold_not_allowed"))
        }
        _ => Ok(()),
    }
}

fn default_active() -> bool {
    true
}

fn default_threshold() -> u8 {
    DEFAULT_THRESHOLD_PCT
}

/// Reads a JSON number, or a string holding one.
pub fn value_as_number(value: &serde_json::Value) -> Option<f64> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Maps a raw threshold onto 1..=100, falling back to the default.
pub fn normalize_threshold(raw: f64) -> u8 {
    if raw.is_finite() && (1.0..=100.0).contains(&raw) {
        raw.round() as u8
    } else {
        DEFAULT_THRESHOLD_PCT
    }
}

fn lenient_threshold<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(value_as_number)
        .map(normalize_threshold)
        .unwrap_or(DEFAULT_THRESHOLD_PCT))
}

fn lenient_bytes<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(value_as_number)
        .filter(|v| *v > 0.0)
        .map(|v| v.floor() as u64)
        .unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_config_uses_defaults() {
        let config = AccountConfig::new("acct-1");
        assert!(config.active);
        assert_eq!(config.limit_bytes, 0);
        assert_eq!(config.threshold_pct, 80);
        assert!(!config.is_monitored());
    }

    #[test]
    fn patch_merges_only_present_fields() {
        let mut config = AccountConfig::new("acct-1");
        config.apply(&AccountConfigPatch {
            limit_bytes: Some(1024),
            ..Default::default()
        });
        assert_eq!(config.limit_bytes, 1024);
        assert_eq!(config.threshold_pct, 80);
        assert!(config.is_monitored());

        config.apply(&AccountConfigPatch {
            active: Some(false),
            threshold_pct: Some(95),
            ..Default::default()
        });
        assert!(!config.active);
        assert_eq!(config.threshold_pct, 95);
        assert_eq!(config.limit_bytes, 1024);
    }

    #[test]
    fn patch_rejects_thresholds_outside_the_offered_set() {
        let ok = AccountConfigPatch {
            threshold_pct: Some(90),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        let bad = AccountConfigPatch {
            threshold_pct: Some(85),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn stored_config_tolerates_malformed_values() {
        let config: AccountConfig = serde_json::from_value(json!({
            "account_id": "acct-1",
            "limit_bytes": "not a number",
            "threshold_pct": "NaN"
        }))
        .unwrap();
        assert!(config.active);
        assert_eq!(config.limit_bytes, 0);
        assert_eq!(config.threshold_pct, DEFAULT_THRESHOLD_PCT);

        let config: AccountConfig = serde_json::from_value(json!({
            "limit_bytes": "2048",
            "threshold_pct": 90.0,
            "active": false
        }))
        .unwrap();
        assert_eq!(config.limit_bytes, 2048);
        assert_eq!(config.threshold_pct, 90);
        assert!(!config.active);
    }

    #[test]
    fn normalize_threshold_falls_back_when_out_of_range() {
        assert_eq!(normalize_threshold(f64::INFINITY), 80);
        assert_eq!(normalize_threshold(0.0), 80);
        assert_eq!(normalize_threshold(250.0), 80);
        assert_eq!(normalize_threshold(70.0), 70);
    }
}
