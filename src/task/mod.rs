//! 任务与 Agent 模型
//!
//! - [`Task`]：任务类型必须满足的契约（代价、可行性、克隆、生成行为脚本）
//! - [`Agent`]：持有任务队列与活跃任务列表的自主实体，由领域层创建

pub mod agent;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::behavior::Act;

pub use agent::{ActiveTask, Agent, AgentId, AgentState, TaskOutcome};

/// 任务优先级：候选任务在截断到 `max_tasks` 前按优先级降序排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum TaskPriority {
    Low = 0,
    #[default]
    Normal = 1,
    High = 2,
    Urgent = 3,
}

/// 可分配的工作单元
///
/// 任务以名称作为身份：名称相同即视为同一逻辑任务（去重、"已持有" 判断都按名称）。
/// `compute_cost` 与 `is_feasible` 不得有副作用，同一规划周期内会对同一 (任务, Agent)
/// 反复调用。
pub trait Task {
    /// 稳定的显示/身份名称
    fn name(&self) -> &str;

    fn priority(&self) -> TaskPriority {
        TaskPriority::Normal
    }

    /// 有限、非负的代价估计，越小越优先；不要求满足三角不等式
    fn compute_cost(&self, agent: &Agent) -> f64;

    /// 硬约束：不可行的配对在存在可行方案时绝不会被选中
    fn is_feasible(&self, agent: &Agent) -> bool;

    /// 生成独立副本，Agent 执行的总是私有副本
    fn clone_task(&self) -> Box<dyn Task>;

    /// 为指定 Agent 构建行为脚本，首次 tick 时调用
    ///
    /// 调用发生在 `Agent::tick` 内部，此时传入的 Agent 活跃列表为空，不要据此判断当前工作
    fn create_script(&self, agent: &Agent) -> Box<dyn Act>;
}

impl fmt::Debug for dyn Task + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name())
            .field("priority", &self.priority())
            .finish()
    }
}

impl Clone for Box<dyn Task> {
    fn clone(&self) -> Self {
        self.clone_task()
    }
}
