pub mod aggregator;
pub mod commands;
pub mod lifecycle;
pub mod monitor;
pub mod scheduler;

pub use aggregator::*;
pub use commands::*;
pub use lifecycle::*;
pub use monitor::*;
pub use scheduler::*;
