//! 分配求解器：精确模式（多轮匈牙利匹配）与贪心模式（随机顺序 + 每任务上限）
//!
//! 求解器只读取任务与 Agent，返回映射，从不修改任何状态，因此可安全重复调用。
//!
//! 精确模式的代价矩阵：
//! - 实际元素 = round(代价 × cost_scale)
//! - 不可行配对 + infeasible_penalty，失能 Agent + incapacitated_penalty，再加 Agent 当前负载作为平局打破
//! - 非方阵时用（最大实际元素 + 1）填充虚拟任务列或虚拟 Agent 行
//!
//! 匹配到虚拟列、或匹配到不可行配对，都视为该 Agent 本轮未分配。

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::PlannerSection;
use crate::planner::hungarian;
use crate::planner::matrix::CostMatrix;
use crate::task::{Agent, Task};

/// 贪心模式中不可行任务的排序惩罚
pub const GREEDY_INFEASIBLE_PENALTY: f64 = 1e10;

/// 缩放后单元素代价上限，防止异常大的代价在势函数累加时溢出
const MAX_SCALED_COST: i64 = 1_000_000_000_000;

/// 惩罚项上限；代价 + 两项惩罚 + 负载仍远小于匈牙利算法的哨兵值
pub const MAX_PENALTY: i64 = 1_000_000_000_000;

/// 一轮匹配结果：下标为 Agent，值为任务下标（None 表示本轮未分配）
pub type RoundAssignment = Vec<Option<usize>>;

/// 精确模式的完整结果：按轮次排列，任务下标指向传入的原始任务列表
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Assignment {
    rounds: Vec<RoundAssignment>,
}

impl Assignment {
    pub fn is_empty(&self) -> bool {
        self.rounds.iter().all(|r| r.iter().all(Option::is_none))
    }

    pub fn rounds(&self) -> &[RoundAssignment] {
        &self.rounds
    }

    /// 所有 (Agent 下标, 任务下标) 配对，按轮次、Agent 顺序
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rounds.iter().flat_map(|round| {
            round
                .iter()
                .enumerate()
                .filter_map(|(agent, task)| task.map(|t| (agent, t)))
        })
    }

    pub fn assigned_count(&self) -> usize {
        self.pairs().count()
    }

    /// 某个任务被分给了哪个 Agent
    pub fn agent_for(&self, task: usize) -> Option<usize> {
        self.pairs().find(|&(_, t)| t == task).map(|(a, _)| a)
    }

    /// 某个 Agent 分到的任务（按轮次顺序）
    pub fn tasks_for(&self, agent: usize) -> Vec<usize> {
        self.pairs()
            .filter(|&(a, _)| a == agent)
            .map(|(_, t)| t)
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Solver {
    cost_scale: i64,
    infeasible_penalty: i64,
    incapacitated_penalty: i64,
}

impl Default for Solver {
    fn default() -> Self {
        Self::from_config(&PlannerSection::default())
    }
}

impl Solver {
    /// 惩罚项截到 `[0, MAX_PENALTY]`
    pub fn new(cost_scale: i64, infeasible_penalty: i64, incapacitated_penalty: i64) -> Self {
        Self {
            cost_scale,
            infeasible_penalty: infeasible_penalty.clamp(0, MAX_PENALTY),
            incapacitated_penalty: incapacitated_penalty.clamp(0, MAX_PENALTY),
        }
    }

    pub fn from_config(cfg: &PlannerSection) -> Self {
        Self::new(
            cfg.cost_scale,
            cfg.infeasible_penalty,
            cfg.incapacitated_penalty,
        )
    }

    /// 单轮精确匹配：每个 Agent 至多一个任务，每个任务至多一个 Agent
    pub fn solve_round(&self, tasks: &[Box<dyn Task>], agents: &[Agent]) -> RoundAssignment {
        if tasks.is_empty() || agents.is_empty() {
            return vec![None; agents.len()];
        }
        let all: Vec<usize> = (0..tasks.len()).collect();
        self.round_over(tasks, &all, agents, &vec![0; agents.len()])
    }

    /// 多轮精确匹配：每轮去掉已认领的任务，对剩余任务重新匹配，
    /// 直到全部认领或某一轮没有任何新匹配
    pub fn solve_exact(&self, tasks: &[Box<dyn Task>], agents: &[Agent]) -> Assignment {
        let mut assignment = Assignment::default();
        if tasks.is_empty() || agents.is_empty() {
            return assignment;
        }

        let mut remaining: Vec<usize> = (0..tasks.len()).collect();
        // 本次求解内累计的负载，不回写 Agent
        let mut extra_load = vec![0usize; agents.len()];

        while !remaining.is_empty() {
            let round = self.round_over(tasks, &remaining, agents, &extra_load);
            let claimed: HashSet<usize> = round.iter().flatten().copied().collect();
            if claimed.is_empty() {
                debug!(
                    round = assignment.rounds.len() + 1,
                    unassigned = remaining.len(),
                    "no further matches possible"
                );
                break;
            }

            for (agent, task) in round.iter().enumerate() {
                if task.is_some() {
                    extra_load[agent] += 1;
                }
            }
            remaining.retain(|t| !claimed.contains(t));
            assignment.rounds.push(round);
        }

        assignment
    }

    /// 贪心模式：每轮随机打乱 Agent 顺序，每个 Agent 取代价最低且
    /// （a）自己尚未持有、（b）未达到 `max_per_goal` 的任务。
    ///
    /// 当每个任务都至少分出一次、轮数达到 `#tasks × #agents`、或一整轮没有新分配时停止。
    /// 返回 (Agent 下标, 任务下标) 列表，由调用方入队。
    pub fn solve_greedy<R>(
        &self,
        tasks: &[Box<dyn Task>],
        agents: &[Agent],
        max_per_goal: usize,
        rng: &mut R,
    ) -> Vec<(usize, usize)>
    where
        R: Rng + ?Sized,
    {
        let mut pairs = Vec::new();
        if tasks.is_empty() || agents.is_empty() || max_per_goal == 0 {
            return pairs;
        }

        let rankings: Vec<Vec<usize>> = agents
            .iter()
            .map(|agent| rank_by_cost(tasks, agent))
            .collect();
        let mut held: Vec<HashSet<String>> = agents
            .iter()
            .map(|agent| agent.held_task_names().map(str::to_string).collect())
            .collect();
        let mut counts = vec![0usize; tasks.len()];
        let mut order: Vec<usize> = (0..agents.len()).collect();

        let budget = tasks.len() * agents.len();
        let mut passes = 0;
        while passes < budget && counts.iter().any(|&c| c == 0) {
            passes += 1;
            order.shuffle(rng);

            let mut progressed = false;
            for &agent in &order {
                let pick = rankings[agent].iter().copied().find(|&t| {
                    counts[t] < max_per_goal && !held[agent].contains(tasks[t].name())
                });
                if let Some(task) = pick {
                    counts[task] += 1;
                    held[agent].insert(tasks[task].name().to_string());
                    pairs.push((agent, task));
                    progressed = true;
                }
            }

            if !progressed {
                break;
            }
        }

        debug!(
            passes,
            assigned = pairs.len(),
            uncovered = counts.iter().filter(|&&c| c == 0).count(),
            "greedy assignment finished"
        );
        pairs
    }

    /// 对任务子集（原始下标）做一轮匹配；返回值中的任务下标为原始下标
    fn round_over(
        &self,
        tasks: &[Box<dyn Task>],
        task_ids: &[usize],
        agents: &[Agent],
        extra_load: &[usize],
    ) -> RoundAssignment {
        let n_tasks = task_ids.len();
        let n_agents = agents.len();
        let size = n_tasks.max(n_agents);

        let mut matrix = CostMatrix::filled(size, 0);
        let mut feasible = vec![vec![false; n_tasks]; n_agents];

        for (row, agent) in agents.iter().enumerate() {
            let load = (agent.load() + extra_load[row]) as i64;
            for (col, &task_id) in task_ids.iter().enumerate() {
                let task = &tasks[task_id];
                let scaled = self.scaled_cost(task.as_ref(), agent);
                let ok = scaled.is_some() && task.is_feasible(agent);

                let mut cost = scaled.unwrap_or(0);
                if !ok {
                    cost += self.infeasible_penalty;
                }
                if agent.state.incapacitated {
                    cost += self.incapacitated_penalty;
                }
                cost += load;

                feasible[row][col] = ok;
                matrix.set(row, col, cost);
            }
        }

        if n_agents != n_tasks {
            let pad = matrix.max_in(n_agents, n_tasks).unwrap_or(0) + 1;
            for row in 0..size {
                for col in 0..size {
                    if row >= n_agents || col >= n_tasks {
                        matrix.set(row, col, pad);
                    }
                }
            }
        }

        let matched = hungarian::solve(&matrix);
        matched
            .into_iter()
            .take(n_agents)
            .enumerate()
            .map(|(row, col)| {
                if col < n_tasks && feasible[row][col] {
                    Some(task_ids[col])
                } else {
                    None
                }
            })
            .collect()
    }

    /// 缩放为整数代价；负数截为 0，非有限值视为不可行（返回 None）
    fn scaled_cost(&self, task: &dyn Task, agent: &Agent) -> Option<i64> {
        let raw = task.compute_cost(agent);
        if !raw.is_finite() {
            warn!(task = task.name(), agent = %agent.id(), cost = raw, "non-finite task cost");
            return None;
        }
        if raw < 0.0 {
            warn!(task = task.name(), agent = %agent.id(), cost = raw, "negative task cost clamped to zero");
        }
        let scaled = (raw.max(0.0) * self.cost_scale as f64).round();
        Some((scaled as i64).min(MAX_SCALED_COST))
    }
}

/// 按代价升序排列任务下标；不可行任务加上大额惩罚（排序稳定）
fn rank_by_cost(tasks: &[Box<dyn Task>], agent: &Agent) -> Vec<usize> {
    let mut costs: Vec<(usize, f64)> = tasks
        .iter()
        .enumerate()
        .map(|(i, task)| {
            let raw = task.compute_cost(agent);
            let mut cost = if raw.is_finite() {
                raw.max(0.0)
            } else {
                GREEDY_INFEASIBLE_PENALTY
            };
            if !task.is_feasible(agent) {
                cost += GREEDY_INFEASIBLE_PENALTY;
            }
            (i, cost)
        })
        .collect();
    costs.sort_by(|a, b| a.1.total_cmp(&b.1));
    costs.into_iter().map(|(i, _)| i).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::testing::TableTask;
    use crate::task::AgentState;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn agents(names: &[&str]) -> Vec<Agent> {
        names.iter().map(|n| Agent::new(*n)).collect()
    }

    #[test]
    fn test_empty_inputs_yield_empty_assignment() {
        let solver = Solver::default();
        let tasks: Vec<Box<dyn Task>> = Vec::new();
        let assignment = solver.solve_exact(&tasks, &agents(&["a"]));
        assert!(assignment.is_empty());
        assert!(assignment.rounds().is_empty());

        let tasks = vec![TableTask::new("t", 1.0).boxed()];
        assert!(solver.solve_exact(&tasks, &[]).is_empty());
        assert_eq!(solver.solve_round(&tasks, &[]), Vec::<Option<usize>>::new());

        let mut rng = StdRng::seed_from_u64(1);
        assert!(solver.solve_greedy(&tasks, &[], 3, &mut rng).is_empty());
    }

    #[test]
    fn test_single_agent_three_tasks_takes_cheapest_first() {
        let solver = Solver::default();
        let tasks = vec![
            TableTask::new("three", 3.0).boxed(),
            TableTask::new("one", 1.0).boxed(),
            TableTask::new("two", 2.0).boxed(),
        ];
        let pool = agents(&["solo"]);

        let first = solver.solve_round(&tasks, &pool);
        assert_eq!(first, vec![Some(1)]);

        let assignment = solver.solve_exact(&tasks, &pool);
        let rounds = assignment.rounds();
        assert_eq!(rounds[0], vec![Some(1)]);
        assert_eq!(rounds.len(), 3);
        assert_eq!(rounds[1], vec![Some(2)]);
        assert_eq!(assignment.tasks_for(0), vec![1, 2, 0]);
    }

    #[test]
    fn test_infeasible_pairing_is_routed_around() {
        let solver = Solver::default();
        let tasks = vec![
            TableTask::new("x", 5.0).infeasible_for("first").boxed(),
            TableTask::new("y", 1.0).boxed(),
        ];
        let pool = agents(&["first", "second"]);

        let round = solver.solve_round(&tasks, &pool);
        assert_eq!(round, vec![Some(1), Some(0)]);
    }

    #[test]
    fn test_task_infeasible_for_everyone_is_never_assigned() {
        let solver = Solver::default();
        let tasks = vec![
            TableTask::new("impossible", 0.0)
                .infeasible_for("a")
                .infeasible_for("b")
                .boxed(),
            TableTask::new("easy", 1.0).boxed(),
        ];
        let pool = agents(&["a", "b"]);

        let assignment = solver.solve_exact(&tasks, &pool);
        assert_eq!(assignment.agent_for(0), None);
        assert!(assignment.agent_for(1).is_some());
        assert_eq!(assignment.assigned_count(), 1);
    }

    #[test]
    fn test_round_never_exceeds_min_and_has_no_duplicates() {
        let solver = Solver::default();
        let tasks: Vec<Box<dyn Task>> = (0..5)
            .map(|i| TableTask::new(&format!("t{i}"), i as f64).boxed())
            .collect();
        let pool = agents(&["a", "b", "c"]);

        let assignment = solver.solve_exact(&tasks, &pool);
        for round in assignment.rounds() {
            let claimed: Vec<usize> = round.iter().flatten().copied().collect();
            assert!(claimed.len() <= tasks.len().min(pool.len()));
            let unique: HashSet<usize> = claimed.iter().copied().collect();
            assert_eq!(unique.len(), claimed.len());
        }
        assert_eq!(assignment.assigned_count(), 5);
    }

    #[test]
    fn test_more_agents_than_tasks_leaves_agents_unassigned() {
        let solver = Solver::default();
        let tasks = vec![TableTask::new("only", 1.0).cost_for("near", 0.5).boxed()];
        let pool = agents(&["far", "near", "other"]);

        let round = solver.solve_round(&tasks, &pool);
        assert_eq!(round, vec![None, Some(0), None]);
    }

    #[test]
    fn test_incapacitated_agent_is_avoided() {
        let solver = Solver::default();
        let tasks = vec![TableTask::new("job", 1.0).cost_for("sleepy", 0.0).boxed()];
        let mut pool = agents(&["sleepy", "awake"]);
        pool[0].state = AgentState {
            incapacitated: true,
            ..Default::default()
        };

        assert_eq!(solver.solve_round(&tasks, &pool), vec![None, Some(0)]);
    }

    #[test]
    fn test_load_breaks_ties() {
        let solver = Solver::default();
        let tasks = vec![TableTask::new("job", 1.0).boxed()];
        let mut pool = agents(&["busy", "free"]);
        pool[0].enqueue(TableTask::new("other", 1.0).boxed());

        assert_eq!(solver.solve_round(&tasks, &pool), vec![None, Some(0)]);
    }

    #[test]
    fn test_non_finite_cost_is_treated_as_infeasible() {
        let solver = Solver::default();
        let tasks = vec![TableTask::new("weird", f64::NAN).cost_for("sane", 2.0).boxed()];
        let pool = agents(&["broken", "sane"]);

        let assignment = solver.solve_exact(&tasks, &pool);
        assert_eq!(assignment.agent_for(0), Some(1));
    }

    #[test]
    fn test_oversized_penalties_are_clamped() {
        let solver = Solver::new(100, i64::MAX, i64::MAX);
        let tasks = vec![
            TableTask::new("x", 5.0).infeasible_for("first").boxed(),
            TableTask::new("y", 1.0).boxed(),
        ];
        let mut pool = agents(&["first", "second", "third"]);
        pool[2].state.incapacitated = true;

        let assignment = solver.solve_exact(&tasks, &pool);
        assert_eq!(assignment.rounds()[0], vec![Some(1), Some(0), None]);
    }

    #[test]
    fn test_second_round_prefers_less_loaded_agent() {
        let solver = Solver::default();
        let tasks: Vec<Box<dyn Task>> = (0..3)
            .map(|i| TableTask::new(&format!("t{i}"), 1.0).boxed())
            .collect();
        let mut pool = agents(&["busy", "free"]);
        pool[0].enqueue(TableTask::new("backlog", 1.0).boxed());

        let assignment = solver.solve_exact(&tasks, &pool);
        let rounds = assignment.rounds();
        assert_eq!(rounds.len(), 2);
        // 第一轮两人各拿一个，之后负载为 2 对 1，剩下的任务归空闲者
        assert!(rounds[0].iter().all(Option::is_some));
        assert_eq!(rounds[1][0], None);
        assert!(rounds[1][1].is_some());
        assert_eq!(assignment.tasks_for(0).len(), 1);
        assert_eq!(assignment.tasks_for(1).len(), 2);
    }

    #[test]
    fn test_solve_exact_is_idempotent() {
        let solver = Solver::default();
        let tasks: Vec<Box<dyn Task>> = (0..4)
            .map(|i| TableTask::new(&format!("t{i}"), 1.0).boxed())
            .collect();
        let pool = agents(&["a", "b"]);

        assert_eq!(solver.solve_exact(&tasks, &pool), solver.solve_exact(&tasks, &pool));
    }

    #[test]
    fn test_greedy_respects_cap() {
        let solver = Solver::default();
        let tasks = vec![
            TableTask::new("a", 1.0).boxed(),
            TableTask::new("b", 2.0).boxed(),
        ];
        let pool = agents(&["w1", "w2", "w3", "w4", "w5"]);
        let mut rng = StdRng::seed_from_u64(42);

        let pairs = solver.solve_greedy(&tasks, &pool, 2, &mut rng);
        for task in 0..tasks.len() {
            let count = pairs.iter().filter(|&&(_, t)| t == task).count();
            assert!(count <= 2, "task {task} assigned {count} times");
            assert!(count >= 1);
        }
        let unique_agents: HashSet<usize> = pairs.iter().map(|&(a, _)| a).collect();
        assert_eq!(unique_agents.len(), pairs.len());
    }

    #[test]
    fn test_greedy_is_deterministic_for_a_seed() {
        let solver = Solver::default();
        let tasks: Vec<Box<dyn Task>> = (0..3)
            .map(|i| TableTask::new(&format!("t{i}"), 1.0).boxed())
            .collect();
        let pool = agents(&["a", "b", "c", "d"]);

        let first = solver.solve_greedy(&tasks, &pool, 2, &mut StdRng::seed_from_u64(9));
        let second = solver.solve_greedy(&tasks, &pool, 2, &mut StdRng::seed_from_u64(9));
        assert_eq!(first, second);
    }

    #[test]
    fn test_greedy_skips_tasks_already_held() {
        let solver = Solver::default();
        let tasks = vec![
            TableTask::new("held", 0.0).boxed(),
            TableTask::new("fresh", 5.0).boxed(),
        ];
        let mut pool = agents(&["worker"]);
        pool[0].enqueue(TableTask::new("held", 0.0).boxed());

        let pairs = solver.solve_greedy(&tasks, &pool, 1, &mut StdRng::seed_from_u64(3));
        assert_eq!(pairs, vec![(0, 1)]);
    }

    #[test]
    fn test_greedy_prefers_feasible_tasks() {
        let solver = Solver::default();
        let tasks = vec![
            TableTask::new("cheap-but-impossible", 0.0).infeasible_for("worker").boxed(),
            TableTask::new("costly", 100.0).boxed(),
        ];
        let pool = agents(&["worker"]);

        let pairs = solver.solve_greedy(&tasks, &pool, 1, &mut StdRng::seed_from_u64(5));
        assert_eq!(pairs[0], (0, 1));
    }
}
