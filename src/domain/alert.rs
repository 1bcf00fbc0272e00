use serde::{Deserialize, Serialize};

const NOTIFICATION_ID_PREFIX: &str = "quota-warning-";

/// Stable notification id for an account; a new alert replaces the old one.
pub fn notification_id(account_id: &str) -> String {
    format!("{}{}", NOTIFICATION_ID_PREFIX, account_id)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertPayload {
    pub icon: String,
    pub title: String,
    pub body: String,
}

impl AlertPayload {
    pub fn quota_warning(
        icon: &str,
        account_name: &str,
        used_bytes: u64,
        limit_bytes: u64,
        pct_used: f64,
        threshold_pct: u8,
    ) -> Self {
        Self {
            icon: icon.to_string(),
            title: format!("Mailbox almost full: {}", account_name),
            body: format!(
                "{} of {} used ({:.1}%)\nWarning threshold: {}%",
                format_bytes(used_bytes),
                format_bytes(limit_bytes),
                pct_used,
                threshold_pct
            ),
        }
    }
}

/// The account driving the badge: highest floored percentage at or above its threshold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorstAccount {
    pub account_id: String,
    pub account_name: String,
    pub pct: u32,
}

/// Running maximum over the accounts of a pass. Ties keep the first account seen.
#[derive(Debug, Default)]
pub struct BadgeTally {
    worst: Option<WorstAccount>,
}

impl BadgeTally {
    pub fn consider(&mut self, account_id: &str, account_name: &str, pct_used: f64) {
        let pct = pct_used.max(0.0).floor() as u32;
        let replace = match &self.worst {
            Some(current) => pct > current.pct,
            None => true,
        };
        if replace {
            self.worst = Some(WorstAccount {
                account_id: account_id.to_string(),
                account_name: account_name.to_string(),
                pct,
            });
        }
    }

    pub fn finish(self) -> Option<WorstAccount> {
        self.worst
    }
}

/// What the toolbar indicator should show.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BadgeState {
    pub text: String,
    pub color: String,
    pub title: String,
}

impl BadgeState {
    pub fn from_worst(worst: Option<&WorstAccount>, color: &str, default_title: &str) -> Self {
        match worst {
            Some(w) => Self {
                text: w.pct.to_string(),
                color: color.to_string(),
                title: w.account_name.clone(),
            },
            None => Self::cleared(color, default_title),
        }
    }

    pub fn cleared(color: &str, default_title: &str) -> Self {
        Self {
            text: String::new(),
            color: color.to_string(),
            title: default_title.to_string(),
        }
    }
}

/// Human readable size with binary units, e.g. `8.50 GiB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}
