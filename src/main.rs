//! Colony - 演示模拟
//!
//! 入口：初始化日志、加载配置，在单线程运行时上按固定节奏推进一个简单的挖矿世界：
//! 每隔 `plan_every` 个 tick 生成新矿点并运行一次规划周期，每个 tick 交付排队任务并驱动各 Agent。
//! 结束时（tick 上限或 Ctrl+C）以 JSON 打印汇总。

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::time::Duration;

use anyhow::Context;
use colony::behavior::{Act, Condition, Sequence, Status, TickBudget, WhileLoop, Wrap};
use colony::config::{load_config, SimulationSection};
use colony::core::{ShutdownManager, ShutdownReason};
use colony::manager::{CycleReport, TaskManager, TaskSource};
use colony::observability;
use colony::task::{Agent, AgentId, AgentState, Task, TaskOutcome, TaskPriority};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// 每 tick 的移动距离
const WALK_SPEED: f64 = 1.0;
/// 单个挖矿任务允许的最长 tick 数
const DIG_BUDGET: usize = 300;
/// 矿量达到该值的矿点优先规划
const RICH_SITE: u32 = 4;

#[derive(Debug, Clone)]
struct DigSite {
    position: [f64; 2],
    remaining: u32,
}

/// 演示世界：矿点与 Agent 位置。任务脚本通过 Rc<RefCell<_>> 共享它
struct World {
    rng: StdRng,
    size: f64,
    next_site: u64,
    sites: BTreeMap<u64, DigSite>,
    positions: HashMap<AgentId, [f64; 2]>,
    mined: u64,
}

impl World {
    fn new(size: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            size,
            next_site: 0,
            sites: BTreeMap::new(),
            positions: HashMap::new(),
            mined: 0,
        }
    }

    fn random_point(&mut self) -> [f64; 2] {
        [
            self.rng.gen_range(0.0..self.size),
            self.rng.gen_range(0.0..self.size),
        ]
    }

    fn spawn_sites(&mut self, count: usize) {
        for _ in 0..count {
            let position = self.random_point();
            let remaining = self.rng.gen_range(1..=6);
            self.next_site += 1;
            self.sites.insert(self.next_site, DigSite { position, remaining });
        }
    }

    fn remaining(&self, site: u64) -> u32 {
        self.sites.get(&site).map_or(0, |s| s.remaining)
    }

    fn position(&self, agent: AgentId) -> Option<[f64; 2]> {
        self.positions.get(&agent).copied()
    }

    /// 向目标走一步，到达时 Success
    fn step_toward(&mut self, agent: AgentId, target: [f64; 2]) -> Status {
        let Some(pos) = self.positions.get_mut(&agent) else {
            return Status::Fail;
        };
        let dx = target[0] - pos[0];
        let dy = target[1] - pos[1];
        let dist = (dx * dx + dy * dy).sqrt();
        if dist <= WALK_SPEED {
            *pos = target;
            return Status::Success;
        }
        pos[0] += dx / dist * WALK_SPEED;
        pos[1] += dy / dist * WALK_SPEED;
        Status::Running
    }

    /// 挖一单位矿；矿点已空时 Fail
    fn dig(&mut self, site: u64) -> Status {
        let Some(entry) = self.sites.get_mut(&site) else {
            return Status::Fail;
        };
        if entry.remaining == 0 {
            return Status::Fail;
        }
        entry.remaining -= 1;
        self.mined += 1;
        if entry.remaining == 0 {
            self.sites.remove(&site);
        }
        Status::Success
    }
}

type SharedWorld = Rc<RefCell<World>>;

/// 挖空一个矿点：循环（走到矿点 → 挖一下），直到矿点为空
#[derive(Clone)]
struct DigTask {
    name: String,
    site: u64,
    position: [f64; 2],
    richness: u32,
    world: SharedWorld,
}

impl Task for DigTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> TaskPriority {
        if self.richness >= RICH_SITE {
            TaskPriority::High
        } else {
            TaskPriority::Normal
        }
    }

    fn compute_cost(&self, agent: &Agent) -> f64 {
        agent.state.distance_to(self.position)
    }

    fn is_feasible(&self, agent: &Agent) -> bool {
        agent.state.has_skill("mining") && self.world.borrow().remaining(self.site) > 0
    }

    fn clone_task(&self) -> Box<dyn Task> {
        Box::new(self.clone())
    }

    fn create_script(&self, agent: &Agent) -> Box<dyn Act> {
        let id = agent.id();
        let (site, target) = (self.site, self.position);

        let world = Rc::clone(&self.world);
        let walk = Wrap::new("walk", move || world.borrow_mut().step_toward(id, target));
        let world = Rc::clone(&self.world);
        let dig = Wrap::new("dig", move || world.borrow_mut().dig(site));
        let world = Rc::clone(&self.world);
        let has_ore = Condition::new("site has ore", move || world.borrow().remaining(site) > 0);

        let body = Sequence::new("walk then dig", vec![Box::new(walk), Box::new(dig)]);
        let dig_out = WhileLoop::new(Box::new(body), Box::new(has_ore));
        Box::new(TickBudget::new(Box::new(dig_out), DIG_BUDGET))
    }
}

/// 每个非空矿点生成一个挖矿候选
struct DigSiteSource {
    world: SharedWorld,
}

impl TaskSource for DigSiteSource {
    fn name(&self) -> &str {
        "dig-sites"
    }

    fn candidates(&mut self, _agents: &[Agent]) -> Vec<Box<dyn Task>> {
        let world = self.world.borrow();
        world
            .sites
            .iter()
            .map(|(&site, entry)| {
                Box::new(DigTask {
                    name: format!("dig site #{site}"),
                    site,
                    position: entry.position,
                    richness: entry.remaining,
                    world: Rc::clone(&self.world),
                }) as Box<dyn Task>
            })
            .collect()
    }
}

#[derive(Debug, Default, Serialize)]
struct AgentSummary {
    name: String,
    succeeded: usize,
    failed: usize,
}

#[derive(Debug, Serialize)]
struct Summary {
    ticks: u64,
    stop_reason: Option<ShutdownReason>,
    cycles: usize,
    assigned: usize,
    ore_mined: u64,
    sites_left: usize,
    agents: Vec<AgentSummary>,
    last_cycle: Option<CycleReport>,
}

fn spawn_agents(sim: &SimulationSection, world: &mut World) -> Vec<Agent> {
    (0..sim.agents)
        .map(|i| {
            let [x, y] = world.random_point();
            let mut state = AgentState::at(x, y);
            // 最后一个 Agent 不会挖矿，用来演示不可行配对
            if i + 1 < sim.agents || sim.agents == 1 {
                state = state.with_skill("mining");
            }
            let agent = Agent::with_state(format!("worker-{i}"), state);
            world.positions.insert(agent.id(), [x, y]);
            agent
        })
        .collect()
}

fn summarize(
    ticks: u64,
    reason: Option<ShutdownReason>,
    reports: &[CycleReport],
    outcomes: &[TaskOutcome],
    agents: &[Agent],
    world: &World,
) -> Summary {
    let per_agent = agents
        .iter()
        .map(|agent| {
            let mut s = AgentSummary {
                name: agent.name.clone(),
                ..Default::default()
            };
            for outcome in outcomes.iter().filter(|o| o.agent == agent.id()) {
                match outcome.status {
                    Status::Success => s.succeeded += 1,
                    Status::Fail => s.failed += 1,
                    Status::Running => {}
                }
            }
            s
        })
        .collect();

    Summary {
        ticks,
        stop_reason: reason,
        cycles: reports.len(),
        assigned: reports.iter().map(|r| r.assigned).sum(),
        ore_mined: world.mined,
        sites_left: world.sites.len(),
        agents: per_agent,
        last_cycle: reports.last().cloned(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    observability::init();

    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;
    let sim = cfg.simulation.clone();

    let world: SharedWorld = Rc::new(RefCell::new(World::new(sim.world_size, sim.seed)));
    let mut agents = spawn_agents(&sim, &mut world.borrow_mut());

    let mut manager = TaskManager::from_config(&cfg.planner);
    manager
        .register_source(DigSiteSource {
            world: Rc::clone(&world),
        })
        .context("Failed to register task source")?;

    let shutdown = ShutdownManager::new();
    shutdown.install_signal_handlers();
    let token = shutdown.token();

    tracing::info!(
        agents = agents.len(),
        ticks = sim.ticks,
        plan_every = sim.plan_every,
        "simulation started"
    );

    let mut interval = tokio::time::interval(Duration::from_millis(sim.tick_interval_ms.max(1)));
    let mut reports = Vec::new();
    let mut outcomes = Vec::new();
    let mut tick: u64 = 0;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {}
        }

        if tick % sim.plan_every == 0 {
            world.borrow_mut().spawn_sites(sim.sites_per_cycle);
            reports.push(manager.run_cycle(&mut agents));
        }
        tick += 1;

        manager.deliver(&mut agents);
        for agent in agents.iter_mut() {
            for outcome in agent.tick() {
                tracing::info!(
                    agent = %agent.name,
                    task = %outcome.task,
                    status = %outcome.status,
                    ticks = outcome.ticks,
                    "task finished"
                );
                outcomes.push(outcome);
            }
            if let Some(pos) = world.borrow().position(agent.id()) {
                agent.state.position = pos;
            }
        }

        if sim.ticks > 0 && tick >= sim.ticks {
            shutdown.shutdown(ShutdownReason::TickLimit);
        }
    }

    let summary = summarize(
        tick,
        shutdown.reason(),
        &reports,
        &outcomes,
        &agents,
        &world.borrow(),
    );
    let json = serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
    println!("{json}");

    Ok(())
}
