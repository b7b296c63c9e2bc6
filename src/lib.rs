//! Colony - Rust 任务分配与协作执行引擎
//!
//! 模块划分：
//! - **behavior**: 可恢复的行为树（Status 协议、顺序/选择/并行、条件循环、tick 预算）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、停止信号
//! - **manager**: 任务来源注册表、规划周期、队列交付
//! - **observability**: tracing 日志初始化
//! - **planner**: 代价矩阵、匈牙利算法、精确/贪心分配求解
//! - **task**: Task 契约、Agent 与逐 tick 执行驱动

pub mod behavior;
pub mod config;
pub mod core;
pub mod manager;
pub mod observability;
pub mod planner;
pub mod task;

pub use manager::{CycleReport, TaskManager};
pub use planner::Solver;
pub use task::{Agent, AgentId, Task};
