use crate::domain::{MailAccount, MailFolder, MessagePage};
use async_trait::async_trait;
use reqwest::{header, Client, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("API request failed: {0}")]
    RequestFailed(String),
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Folder not found: {0}")]
    FolderNotFound(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Account and folder enumeration offered by the host mail store.
#[async_trait]
pub trait MailProvider: Send + Sync {
    #[must_use]
    async fn list_accounts(&self) -> Result<Vec<MailAccount>, ProviderError>;
    /// The account, with its root folders when the host returns them eagerly.
    #[must_use]
    async fn get_account(&self, account_id: &str) -> Result<MailAccount, ProviderError>;
    #[must_use]
    async fn folder_children(
        &self,
        account_id: &str,
        folder: &MailFolder,
    ) -> Result<Vec<MailFolder>, ProviderError>;
    #[must_use]
    async fn list_messages(
        &self,
        account_id: &str,
        folder: &MailFolder,
        continuation: Option<&str>,
    ) -> Result<MessagePage, ProviderError>;
}

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;

fn is_retryable_status(status: u16) -> bool {
    (500..=599).contains(&status)
}

/// Client for the host mail store's JSON API.
pub struct HostMailClient {
    client: Client,
    base_url: Url,
}

impl HostMailClient {
    pub fn new(base_url: &str, api_token: &str) -> Result<Self, ProviderError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ProviderError::InvalidConfig(format!("Invalid API URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ProviderError::InvalidConfig(format!(
                "API URL cannot carry a path: {}",
                base_url
            )));
        }

        let mut headers = header::HeaderMap::new();
        if !api_token.is_empty() {
            let auth_value = header::HeaderValue::from_str(&format!("Bearer {}", api_token))
                .map_err(|e| {
                    ProviderError::InvalidConfig(format!("Invalid API token format: {}", e))
                })?;
            headers.insert(header::AUTHORIZATION, auth_value);
        }
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                ProviderError::InvalidConfig(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, base_url })
    }

    /// Base URL extended by `segments`, each percent-encoded as one path segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T, F>(
        &self,
        request_builder: F,
        not_found: ProviderError,
    ) -> Result<T, ProviderError>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut last_error: Option<String> = None;

        for attempt in 0..MAX_RETRIES {
            match request_builder().send().await {
                Ok(resp) => {
                    let status = resp.status().as_u16();

                    if status == 404 {
                        return Err(not_found);
                    }

                    if is_retryable_status(status) && attempt < MAX_RETRIES - 1 {
                        let backoff = INITIAL_BACKOFF_MS * 2_u64.pow(attempt);
                        sleep(Duration::from_millis(backoff)).await;
                        continue;
                    }

                    if !resp.status().is_success() {
                        let body = resp.text().await.unwrap_or_default();
                        return Err(ProviderError::RequestFailed(format!(
                            "status {}: {}",
                            status, body
                        )));
                    }

                    return resp
                        .json::<T>()
                        .await
                        .map_err(|e| ProviderError::InvalidResponse(e.to_string()));
                }
                Err(e) => {
                    last_error = Some(e.to_string());
                    if attempt < MAX_RETRIES - 1 {
                        let backoff = INITIAL_BACKOFF_MS * 2_u64.pow(attempt);
                        sleep(Duration::from_millis(backoff)).await;
                    }
                }
            }
        }

        Err(ProviderError::RequestFailed(
            last_error.unwrap_or_else(|| "Max retries exceeded".to_string()),
        ))
    }
}

#[async_trait]
impl MailProvider for HostMailClient {
    async fn list_accounts(&self) -> Result<Vec<MailAccount>, ProviderError> {
        let url = self.endpoint(&["accounts"]);
        self.get_json(
            || self.client.get(url.clone()),
            ProviderError::InvalidResponse("accounts endpoint missing".to_string()),
        )
        .await
    }

    async fn get_account(&self, account_id: &str) -> Result<MailAccount, ProviderError> {
        let url = self.endpoint(&["accounts", account_id]);
        self.get_json(
            || {
                self.client
                    .get(url.clone())
                    .query(&[("include_folders", "true")])
            },
            ProviderError::AccountNotFound(account_id.to_string()),
        )
        .await
    }

    async fn folder_children(
        &self,
        account_id: &str,
        folder: &MailFolder,
    ) -> Result<Vec<MailFolder>, ProviderError> {
        let url = self.endpoint(&["accounts", account_id, "folders", "children"]);
        self.get_json(
            || {
                self.client
                    .get(url.clone())
                    .query(&[("folder", folder.id.as_str())])
            },
            ProviderError::FolderNotFound(folder.id.clone()),
        )
        .await
    }

    async fn list_messages(
        &self,
        account_id: &str,
        folder: &MailFolder,
        continuation: Option<&str>,
    ) -> Result<MessagePage, ProviderError> {
        let url = self.endpoint(&["accounts", account_id, "messages"]);
        self.get_json(
            || {
                let request = self
                    .client
                    .get(url.clone())
                    .query(&[("folder", folder.id.as_str())]);
                match continuation {
                    Some(token) => request.query(&[("continuation", token)]),
                    None => request,
                }
            },
            ProviderError::FolderNotFound(folder.id.clone()),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(502));
        assert!(is_retryable_status(504));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(200));
    }

    #[test]
    fn endpoint_appends_to_base_path() {
        let client = HostMailClient::new("http://localhost:8900/api/", "").unwrap();
        assert_eq!(
            client.endpoint(&["accounts"]).as_str(),
            "http://localhost:8900/api/accounts"
        );

        let client = HostMailClient::new("http://localhost:8900/api", "").unwrap();
        assert_eq!(
            client.endpoint(&["accounts", "acct-1", "messages"]).as_str(),
            "http://localhost:8900/api/accounts/acct-1/messages"
        );
    }

    #[test]
    fn account_ids_are_encoded_as_one_segment() {
        let client = HostMailClient::new("http://localhost:8900/api/v1", "").unwrap();
        assert_eq!(
            client.endpoint(&["accounts", "team/ops box", "messages"]).as_str(),
            "http://localhost:8900/api/v1/accounts/team%2Fops%20box/messages"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            HostMailClient::new("not a url", ""),
            Err(ProviderError::InvalidConfig(_))
        ));
        assert!(matches!(
            HostMailClient::new("mailto:ops@example.org", ""),
            Err(ProviderError::InvalidConfig(_))
        ));
    }
}
