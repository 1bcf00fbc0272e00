pub mod account;
pub mod alert;
pub mod mail;
pub mod settings;
pub mod usage;

pub use account::*;
pub use alert::*;
pub use mail::*;
pub use settings::*;
pub use usage::*;
