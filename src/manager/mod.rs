//! 任务管理：候选来源注册表与规划周期

pub mod source;
pub mod task_manager;

pub use source::{FnSource, SourceRegistry, TaskSource};
pub use task_manager::{CycleReport, TaskManager};
