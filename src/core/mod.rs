//! 核心基础：错误类型、停止信号

pub mod error;
pub mod shutdown;

pub use error::{ColonyError, Result};
pub use shutdown::{ShutdownManager, ShutdownReason};
