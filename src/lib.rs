//! Quota Watch
//!
//! Periodically estimates per-account mailbox usage against a user-defined
//! quota and raises a notification plus a toolbar badge when usage crosses the
//! account's warning threshold.
//!
//! ## Standalone
//!
//! Run the binary:
//! ```bash
//! quota-watch-server
//! ```
//!
//! ## Embedded (Axum)
//!
//! When the `server` feature is enabled, this crate can be embedded into a larger Axum app:
//! ```rust,ignore
//! use axum::Router;
//! use quota_watch::infrastructure::AppConfig;
//! use quota_watch::server::{build_state, router};
//!
//! let cfg = AppConfig::from_env()?;
//! let state = build_state(cfg).await?;
//! state.service.on_install().await?;
//! let app = Router::new().nest("/quota", router(state));
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;

// Standalone + embedded HTTP server support (Axum).
// Enabled behind the `server` feature so the monitor can be used without Axum.
#[cfg(feature = "server")]
pub mod server;

pub use application::*;
pub use domain::*;
pub use infrastructure::*;

#[cfg(feature = "server")]
pub use server::*;
