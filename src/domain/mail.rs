use super::account::value_as_number;
use serde::{Deserialize, Serialize};

/// A mail account as reported by the host mail store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MailAccount {
    pub id: String,
    pub name: String,
    /// Root folders, when the host returned them with the account.
    #[serde(default)]
    pub folders: Option<Vec<MailFolder>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MailFolder {
    pub id: String,
    pub name: String,
    /// Eagerly populated children. `None` means they must be fetched.
    #[serde(default)]
    pub subfolders: Option<Vec<MailFolder>>,
}

impl MailFolder {
    pub fn leaf(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            subfolders: Some(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MessageHeader {
    #[serde(default)]
    pub size: Option<serde_json::Value>,
}

impl MessageHeader {
    pub fn with_size(size: u64) -> Self {
        Self {
            size: Some(serde_json::Value::from(size)),
        }
    }

    /// Size in bytes; missing, negative or non-numeric sizes count as zero.
    pub fn size_bytes(&self) -> u64 {
        self.size
            .as_ref()
            .and_then(value_as_number)
            .filter(|v| *v > 0.0)
            .map(|v| v.floor() as u64)
            .unwrap_or(0)
    }
}

/// One page of a folder's message listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MessagePage {
    pub messages: Vec<MessageHeader>,
    /// Token for the next page; `None` on the last page.
    #[serde(default)]
    pub continuation: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn size_bytes_ignores_unusable_values() {
        let page: MessagePage = serde_json::from_value(json!({
            "messages": [
                { "size": 1200 },
                { "size": "300" },
                { "size": null },
                {},
                { "size": -5 },
                { "size": "big" },
                { "size": 10.9 }
            ]
        }))
        .unwrap();

        let sizes: Vec<u64> = page.messages.iter().map(MessageHeader::size_bytes).collect();
        assert_eq!(sizes, vec![1200, 300, 0, 0, 0, 0, 10]);
        assert!(page.continuation.is_none());
    }

    #[test]
    fn folder_without_subfolder_array_is_lazy() {
        let folder: MailFolder = serde_json::from_value(json!({
            "id": "/Inbox",
            "name": "Inbox"
        }))
        .unwrap();
        assert!(folder.subfolders.is_none());
        assert_eq!(MailFolder::leaf("/Inbox", "Inbox").subfolders, Some(vec![]));
    }
}
