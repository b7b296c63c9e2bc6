//! 任务管理器：一个规划周期内的候选去重、可行性过滤、求解与入队，以及队列到活跃列表的交付
//!
//! 周期开始时对所有 Agent 持有的任务名做一次快照，之后的"已分配"判断都基于快照。

use std::cmp::Reverse;
use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::PlannerSection;
use crate::core::{ColonyError, Result};
use crate::manager::source::{SourceRegistry, TaskSource};
use crate::planner::Solver;
use crate::task::{Agent, AgentId, Task};

/// 一次规划周期的统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// 周期序号（从 1 开始）
    pub cycle: u64,
    pub timestamp_ms: i64,
    /// 收到的候选数
    pub candidates: usize,
    /// 因已被持有或同周期重复而丢弃
    pub duplicates: usize,
    /// 因所有 Agent 都不可行而丢弃
    pub infeasible: usize,
    /// 超出 max_tasks 被截断
    pub truncated: usize,
    /// 实际交给求解器的任务数
    pub solved: usize,
    pub assigned: usize,
    pub rounds: usize,
}

impl CycleReport {
    pub fn unassigned(&self) -> usize {
        self.solved - self.assigned
    }
}

pub struct TaskManager {
    solver: Solver,
    max_tasks: usize,
    max_per_goal: usize,
    sources: SourceRegistry,
    rng: StdRng,
    cycles: u64,
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::from_config(&PlannerSection::default())
    }
}

impl TaskManager {
    pub fn new(solver: Solver, max_tasks: usize, max_per_goal: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            solver,
            max_tasks,
            max_per_goal,
            sources: SourceRegistry::new(),
            rng,
            cycles: 0,
        }
    }

    pub fn from_config(cfg: &PlannerSection) -> Self {
        Self::new(
            Solver::from_config(cfg),
            cfg.max_tasks,
            cfg.max_per_goal,
            cfg.greedy_seed,
        )
    }

    pub fn solver(&self) -> &Solver {
        &self.solver
    }

    pub fn sources(&self) -> &SourceRegistry {
        &self.sources
    }

    /// 已完成的规划周期数
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn register_source(&mut self, source: impl TaskSource + 'static) -> Result<()> {
        let name = source.name().to_string();
        self.sources.register(source)?;
        debug!(source = %name, "task source registered");
        Ok(())
    }

    /// 是否有任一 Agent 已持有同名任务
    pub fn is_assigned(task_name: &str, agents: &[Agent]) -> bool {
        agents.iter().any(|agent| agent.holds(task_name))
    }

    /// 是否至少有一个 Agent 能执行
    pub fn is_feasible(task: &dyn Task, agents: &[Agent]) -> bool {
        agents.iter().any(|agent| task.is_feasible(agent))
    }

    /// 按 ID 查找 Agent
    pub fn agent_mut(agents: &mut [Agent], id: AgentId) -> Result<&mut Agent> {
        agents
            .iter_mut()
            .find(|agent| agent.id() == id)
            .ok_or(ColonyError::UnknownAgent(id))
    }

    /// 绕过求解器直接给指定 Agent 入队（如玩家手动下令）
    pub fn assign_to(&self, agents: &mut [Agent], id: AgentId, task: &dyn Task) -> Result<()> {
        let agent = Self::agent_mut(agents, id)?;
        agent.enqueue(task.clone_task());
        debug!(agent = %id, task = task.name(), "task assigned directly");
        Ok(())
    }

    /// 从所有已注册来源收集候选任务，然后执行一次规划
    pub fn run_cycle(&mut self, agents: &mut [Agent]) -> CycleReport {
        let candidates = self.sources.collect(agents);
        self.plan_cycle(candidates, agents)
    }

    /// 一次规划周期：去重 → 可行性过滤 → 按优先级截断 → 精确求解 → 克隆入队
    pub fn plan_cycle(&mut self, candidates: Vec<Box<dyn Task>>, agents: &mut [Agent]) -> CycleReport {
        self.cycles += 1;
        let mut report = CycleReport {
            cycle: self.cycles,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            candidates: candidates.len(),
            ..Default::default()
        };

        let mut seen: HashSet<String> = agents
            .iter()
            .flat_map(|agent| agent.held_task_names().map(str::to_string))
            .collect();

        let mut tasks: Vec<Box<dyn Task>> = Vec::with_capacity(candidates.len());
        for task in candidates {
            if !seen.insert(task.name().to_string()) {
                report.duplicates += 1;
                continue;
            }
            if !Self::is_feasible(task.as_ref(), agents) {
                debug!(task = task.name(), "no agent can perform task, skipped");
                report.infeasible += 1;
                continue;
            }
            tasks.push(task);
        }

        // 稳定排序，同优先级保持来源顺序
        tasks.sort_by_key(|task| Reverse(task.priority()));
        if tasks.len() > self.max_tasks {
            report.truncated = tasks.len() - self.max_tasks;
            tasks.truncate(self.max_tasks);
        }
        report.solved = tasks.len();

        let assignment = self.solver.solve_exact(&tasks, agents);
        report.rounds = assignment.rounds().len();
        for (agent, task) in assignment.pairs() {
            let target = &mut agents[agent];
            debug!(agent = %target.id(), task = tasks[task].name(), "task enqueued");
            target.enqueue(tasks[task].clone_task());
            report.assigned += 1;
        }

        info!(
            cycle = report.cycle,
            candidates = report.candidates,
            duplicates = report.duplicates,
            infeasible = report.infeasible,
            truncated = report.truncated,
            assigned = report.assigned,
            rounds = report.rounds,
            "planning cycle finished"
        );
        report
    }

    /// 贪心批量分配：同一任务可分给至多 `max_per_goal` 个 Agent（None 时用配置值）。
    /// 返回入队的任务数。
    pub fn assign_bulk(
        &mut self,
        candidates: Vec<Box<dyn Task>>,
        agents: &mut [Agent],
        max_per_goal: Option<usize>,
    ) -> usize {
        let cap = max_per_goal.unwrap_or(self.max_per_goal);
        let mut seen = HashSet::new();
        let tasks: Vec<Box<dyn Task>> = candidates
            .into_iter()
            .filter(|task| seen.insert(task.name().to_string()))
            .collect();

        let pairs = self.solver.solve_greedy(&tasks, agents, cap, &mut self.rng);
        for &(agent, task) in &pairs {
            agents[agent].enqueue(tasks[task].clone_task());
        }
        info!(
            tasks = tasks.len(),
            agents = agents.len(),
            max_per_goal = cap,
            assigned = pairs.len(),
            "bulk assignment finished"
        );
        pairs.len()
    }

    /// 每个 Agent 最多从队首取一个任务放入活跃列表；与活跃任务同名的直接丢弃。
    /// 返回交付的任务数。
    pub fn deliver(&self, agents: &mut [Agent]) -> usize {
        let mut delivered = 0;
        for agent in agents.iter_mut() {
            let Some(task) = agent.dequeue() else {
                continue;
            };
            if agent.is_live(task.name()) {
                debug!(agent = %agent.id(), task = task.name(), "duplicate of live task discarded");
                continue;
            }
            debug!(agent = %agent.id(), task = task.name(), "task delivered");
            agent.push_live(task);
            delivered += 1;
        }
        delivered
    }
}
