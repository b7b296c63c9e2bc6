//! Agent：任务队列、活跃任务列表与逐 tick 执行驱动
//!
//! 队列只由 TaskManager 写入（入队 / 交付），活跃列表只由 Agent 自身的执行驱动修改
//! （tick 结束移除 / 取消）。求解器只读取 Agent。

use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::behavior::{Act, Status};
use crate::task::Task;

/// Agent ID（进程内唯一）
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct AgentId(u64);

static NEXT_AGENT_ID: AtomicU64 = AtomicU64::new(0);

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentId {
    pub fn new() -> Self {
        Self(NEXT_AGENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

/// 领域暴露给可行性判断的 Agent 状态
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    /// 失能（睡眠、昏迷等）：求解时追加惩罚
    pub incapacitated: bool,
    /// 平面位置，任务常用来估计距离代价
    pub position: [f64; 2],
    /// 技能标签
    pub skills: BTreeSet<String>,
}

impl AgentState {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            position: [x, y],
            ..Default::default()
        }
    }

    pub fn with_skill(mut self, skill: impl Into<String>) -> Self {
        self.skills.insert(skill.into());
        self
    }

    pub fn has_skill(&self, skill: &str) -> bool {
        self.skills.contains(skill)
    }

    pub fn distance_to(&self, target: [f64; 2]) -> f64 {
        let dx = self.position[0] - target[0];
        let dy = self.position[1] - target[1];
        (dx * dx + dy * dy).sqrt()
    }
}

/// 已结束任务的报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub agent: AgentId,
    pub task: String,
    pub instance_id: Uuid,
    pub status: Status,
    pub ticks: usize,
}

/// Agent 私有的任务执行实例：克隆的任务 + 懒创建的行为脚本
pub struct ActiveTask {
    instance_id: Uuid,
    task: Box<dyn Task>,
    script: Option<Box<dyn Act>>,
    status: Option<Status>,
    ticks: usize,
    /// 首次 tick 的时间（毫秒时间戳）
    started_at: Option<i64>,
}

impl ActiveTask {
    pub fn new(task: Box<dyn Task>) -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            task,
            script: None,
            status: None,
            ticks: 0,
            started_at: None,
        }
    }

    pub fn name(&self) -> &str {
        self.task.name()
    }

    pub fn task(&self) -> &dyn Task {
        self.task.as_ref()
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// 尚未开始时为 None
    pub fn status(&self) -> Option<Status> {
        self.status
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn started_at(&self) -> Option<i64> {
        self.started_at
    }

    /// 推进一步；首次调用时为 Agent 生成脚本并初始化
    fn tick(&mut self, agent: &Agent) -> Status {
        let script = self.script.get_or_insert_with(|| {
            let mut script = self.task.create_script(agent);
            script.initialize();
            script
        });
        if self.started_at.is_none() {
            self.started_at = Some(chrono::Utc::now().timestamp_millis());
        }

        let status = script.tick();
        self.ticks += 1;
        self.status = Some(status);
        status
    }
}

impl fmt::Debug for ActiveTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveTask")
            .field("instance_id", &self.instance_id)
            .field("name", &self.task.name())
            .field("status", &self.status)
            .field("ticks", &self.ticks)
            .finish()
    }
}

/// 自主实体：有序任务队列 + 活跃任务列表 + 领域状态
#[derive(Debug)]
pub struct Agent {
    id: AgentId,
    pub name: String,
    pub state: AgentState,
    queue: VecDeque<Box<dyn Task>>,
    live: Vec<ActiveTask>,
}

impl Agent {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_state(name, AgentState::default())
    }

    pub fn with_state(name: impl Into<String>, state: AgentState) -> Self {
        Self {
            id: AgentId::new(),
            name: name.into(),
            state,
            queue: VecDeque::new(),
            live: Vec::new(),
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn queue(&self) -> &VecDeque<Box<dyn Task>> {
        &self.queue
    }

    pub fn live_tasks(&self) -> &[ActiveTask] {
        &self.live
    }

    /// 当前持有的任务数（排队 + 活跃），求解时作为负载平衡的附加代价
    pub fn load(&self) -> usize {
        self.queue.len() + self.live.len()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.live.is_empty()
    }

    pub fn is_live(&self, task_name: &str) -> bool {
        self.live.iter().any(|t| t.name() == task_name)
    }

    /// 是否已持有同名任务（队列或活跃列表中）
    pub fn holds(&self, task_name: &str) -> bool {
        self.is_live(task_name) || self.queue.iter().any(|t| t.name() == task_name)
    }

    /// 所有持有任务的名称
    pub fn held_task_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.queue
            .iter()
            .map(|t| t.name())
            .chain(self.live.iter().map(|t| t.name()))
    }

    pub(crate) fn enqueue(&mut self, task: Box<dyn Task>) {
        self.queue.push_back(task);
    }

    pub(crate) fn dequeue(&mut self) -> Option<Box<dyn Task>> {
        self.queue.pop_front()
    }

    /// 直接放入活跃列表（跳过队列），供领域层下达紧急任务
    pub fn push_live(&mut self, task: Box<dyn Task>) {
        self.live.push(ActiveTask::new(task));
    }

    /// 协作式取消：从活跃列表移除后不再被 tick
    pub fn cancel(&mut self, task_name: &str) -> bool {
        let before = self.live.len();
        self.live.retain(|t| t.name() != task_name);
        let removed = self.live.len() != before;
        if removed {
            tracing::debug!(agent = %self.id, task = task_name, "task cancelled");
        }
        removed
    }

    /// 丢弃队列中尚未交付的任务
    pub fn clear_queue(&mut self) -> usize {
        let dropped = self.queue.len();
        self.queue.clear();
        dropped
    }

    /// 对每个活跃任务 tick 一次，移除并返回到达终态的任务
    ///
    /// tick 期间活跃列表被临时移出：脚本创建（`Task::create_script`）时看到的 Agent
    /// `live_tasks()` 为空，队列、状态与 `load()` 中的排队部分照常可见。
    pub fn tick(&mut self) -> Vec<TaskOutcome> {
        let mut live = std::mem::take(&mut self.live);
        let mut outcomes = Vec::new();
        let agent: &Agent = self;

        live.retain_mut(|active| {
            let status = active.tick(agent);
            if !status.is_terminal() {
                return true;
            }
            tracing::debug!(
                agent = %agent.id,
                task = active.name(),
                %status,
                ticks = active.ticks,
                "task finished"
            );
            outcomes.push(TaskOutcome {
                agent: agent.id,
                task: active.name().to_string(),
                instance_id: active.instance_id,
                status,
                ticks: active.ticks,
            });
            false
        });

        self.live = live;
        outcomes
    }
}
