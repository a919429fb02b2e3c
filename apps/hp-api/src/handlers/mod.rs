//! Handlers 模块

pub mod control;
pub mod metrics;
pub mod status;

pub use control::*;
pub use metrics::*;
pub use status::*;
