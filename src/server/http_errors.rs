use crate::application::{CommandError, MonitorError};
use crate::infrastructure::ProviderError;
use axum::http::StatusCode;

pub(super) fn map_command_error(err: &CommandError) -> (StatusCode, serde_json::Value) {
    match err {
        CommandError::Validation(msg) => (
            StatusCode::BAD_REQUEST,
            serde_json::json!({ "error": msg }),
        ),
        CommandError::UnknownAccount(id) => (
            StatusCode::NOT_FOUND,
            serde_json::json!({ "error": format!("Account {} not found", id) }),
        ),
        CommandError::Provider(ProviderError::AccountNotFound(id))
        | CommandError::Monitor(MonitorError::Provider(ProviderError::AccountNotFound(id))) => (
            StatusCode::NOT_FOUND,
            serde_json::json!({ "error": format!("Account {} not found", id) }),
        ),
        CommandError::Provider(_) | CommandError::Monitor(MonitorError::Provider(_)) => (
            StatusCode::BAD_GATEWAY,
            serde_json::json!({ "error": "Mail store unavailable" }),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({ "error": "Command failed" }),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::StoreError;

    #[test]
    fn validation_errors_are_bad_requests() {
        let (status, body) = map_command_error(&CommandError::Validation("bad".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad");
    }

    #[test]
    fn unknown_accounts_are_not_found() {
        let (status, _) = map_command_error(&CommandError::UnknownAccount("a".into()));
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn provider_failures_are_bad_gateway() {
        let err = CommandError::Provider(ProviderError::RequestFailed("down".into()));
        assert_eq!(map_command_error(&err).0, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn store_failures_are_internal() {
        let err = CommandError::Store(StoreError::InvalidData {
            key: "accounts".into(),
            reason: "bad".into(),
        });
        assert_eq!(map_command_error(&err).0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
