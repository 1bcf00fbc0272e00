pub mod config;
pub mod kv_store;
pub mod mail_client;
pub mod settings_store;
pub mod surfaces;

pub use config::*;
pub use kv_store::*;
pub use mail_client::*;
pub use settings_store::*;
pub use surfaces::*;
