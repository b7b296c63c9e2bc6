//! 引擎错误类型
//!
//! 规划与执行中的「失败」都以数据表达（Status::Fail、空分配），这里只收录真正的错误：
//! 配置加载/校验失败、直接传给匈牙利求解器的非法矩阵、未知 Agent、重复注册的任务来源。

use thiserror::Error;

use crate::task::AgentId;

#[derive(Error, Debug)]
pub enum ColonyError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Cost matrix is empty")]
    EmptyMatrix,

    /// 匈牙利算法只接受方阵
    #[error("Cost matrix is not square: row {row} has {len} columns, expected {expected}")]
    MatrixNotSquare {
        row: usize,
        len: usize,
        expected: usize,
    },

    #[error("Unknown agent: {0}")]
    UnknownAgent(AgentId),

    #[error("Task source already registered: {0}")]
    DuplicateSource(String),
}

pub type Result<T> = std::result::Result<T, ColonyError>;
