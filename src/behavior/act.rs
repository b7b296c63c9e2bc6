//! 行为协议：Status 三值结果与 Act trait
//!
//! 所有可执行单元（叶子动作、组合节点、任务脚本）都遵守同一个挂起/恢复约定：
//! `initialize` 重置进度，`tick` 只推进一步并返回当前状态，绝不阻塞。

use serde::{Deserialize, Serialize};

/// 行为节点的执行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// 仍在进行，调用方需在之后再次 tick
    Running,
    /// 终态：完成
    Success,
    /// 终态：无法完成
    Fail,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Status::Running)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Running => write!(f, "Running"),
            Status::Success => write!(f, "Success"),
            Status::Fail => write!(f, "Fail"),
        }
    }
}

/// 可恢复的行为节点
///
/// 节点的执行状态只在 `initialize` 之后、到达终态之前有效。
/// 副作用（如向世界发出动作）只能发生在 `tick` 内，`initialize` 不得产生副作用。
pub trait Act {
    /// 节点名称（日志与调试用）
    fn name(&self) -> &str;

    /// 将内部进度重置为起始状态；对已结束的节点再次调用必须是幂等的
    fn initialize(&mut self);

    /// 推进一个单位的工作并返回当前状态
    fn tick(&mut self) -> Status;
}

impl Act for Box<dyn Act> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn initialize(&mut self) {
        (**self).initialize()
    }

    fn tick(&mut self) -> Status {
        (**self).tick()
    }
}

/// 从头驱动一个节点直到终态，最多 `max_ticks` 次；超出预算返回 `None`
///
/// 供测试与一次性脚本使用，正常执行应由 Agent 每个周期 tick 一次。
pub fn run_to_completion(act: &mut dyn Act, max_ticks: usize) -> Option<(Status, usize)> {
    act.initialize();
    for ticks in 1..=max_ticks {
        let status = act.tick();
        if status.is_terminal() {
            return Some((status, ticks));
        }
    }
    None
}
