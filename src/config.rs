//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `COLONY__*` 覆盖（双下划线表示嵌套，如 `COLONY__PLANNER__MAX_TASKS=10`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::core::{ColonyError, Result};
use crate::planner::MAX_PENALTY;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub planner: PlannerSection,
    #[serde(default)]
    pub simulation: SimulationSection,
}

/// [planner] 段：代价缩放、惩罚项、每周期任务上限、贪心模式参数
#[derive(Debug, Clone, Deserialize)]
pub struct PlannerSection {
    /// 浮点代价转整数时的乘数
    #[serde(default = "default_cost_scale")]
    pub cost_scale: i64,
    /// 不可行配对的惩罚，必须压过任何实际代价差
    #[serde(default = "default_penalty")]
    pub infeasible_penalty: i64,
    /// 失能 Agent 的惩罚
    #[serde(default = "default_penalty")]
    pub incapacitated_penalty: i64,
    /// 每个规划周期最多交给求解器的候选任务数
    #[serde(default = "default_max_tasks")]
    pub max_tasks: usize,
    /// 贪心模式下每个任务最多分给几个 Agent
    #[serde(default = "default_max_per_goal")]
    pub max_per_goal: usize,
    /// 贪心洗牌的随机种子；不设置时使用系统熵
    pub greedy_seed: Option<u64>,
}

fn default_cost_scale() -> i64 {
    100
}

fn default_penalty() -> i64 {
    99_999
}

fn default_max_tasks() -> usize {
    30
}

fn default_max_per_goal() -> usize {
    1
}

impl Default for PlannerSection {
    fn default() -> Self {
        Self {
            cost_scale: default_cost_scale(),
            infeasible_penalty: default_penalty(),
            incapacitated_penalty: default_penalty(),
            max_tasks: default_max_tasks(),
            max_per_goal: default_max_per_goal(),
            greedy_seed: None,
        }
    }
}

/// [simulation] 段：演示模拟（src/main.rs）的规模与节奏
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationSection {
    #[serde(default = "default_agents")]
    pub agents: usize,
    /// 模拟总 tick 数；0 表示一直运行直到 Ctrl+C
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    /// 每个 tick 的间隔（毫秒）
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// 每隔多少个 tick 运行一次规划周期
    #[serde(default = "default_plan_every")]
    pub plan_every: u64,
    /// 世界边长（正方形）
    #[serde(default = "default_world_size")]
    pub world_size: f64,
    /// 每个规划周期新出现的挖掘点数量
    #[serde(default = "default_sites_per_cycle")]
    pub sites_per_cycle: usize,
    /// 世界随机种子
    pub seed: Option<u64>,
}

fn default_agents() -> usize {
    4
}

fn default_ticks() -> u64 {
    200
}

fn default_tick_interval_ms() -> u64 {
    20
}

fn default_plan_every() -> u64 {
    5
}

fn default_world_size() -> f64 {
    20.0
}

fn default_sites_per_cycle() -> usize {
    2
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            agents: default_agents(),
            ticks: default_ticks(),
            tick_interval_ms: default_tick_interval_ms(),
            plan_every: default_plan_every(),
            world_size: default_world_size(),
            sites_per_cycle: default_sites_per_cycle(),
            seed: None,
        }
    }
}

impl AppConfig {
    /// 校验取值范围，加载后调用
    pub fn validate(&self) -> Result<()> {
        let p = &self.planner;
        if p.cost_scale <= 0 {
            return Err(ColonyError::InvalidConfig(format!(
                "planner.cost_scale must be positive, got {}",
                p.cost_scale
            )));
        }
        for (key, value) in [
            ("infeasible_penalty", p.infeasible_penalty),
            ("incapacitated_penalty", p.incapacitated_penalty),
        ] {
            if !(0..=MAX_PENALTY).contains(&value) {
                return Err(ColonyError::InvalidConfig(format!(
                    "planner.{key} must be within 0..={MAX_PENALTY}, got {value}"
                )));
            }
        }
        if p.max_per_goal == 0 {
            return Err(ColonyError::InvalidConfig(
                "planner.max_per_goal must be at least 1".to_string(),
            ));
        }

        let s = &self.simulation;
        if s.plan_every == 0 {
            return Err(ColonyError::InvalidConfig(
                "simulation.plan_every must be at least 1".to_string(),
            ));
        }
        if !(s.world_size.is_finite() && s.world_size > 0.0) {
            return Err(ColonyError::InvalidConfig(format!(
                "simulation.world_size must be a positive number, got {}",
                s.world_size
            )));
        }
        Ok(())
    }
}

/// 从 config 目录加载配置，环境变量 COLONY__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 COLONY__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("COLONY")
            .separator("__")
            .try_parsing(true),
    );

    let cfg: AppConfig = builder.build()?.try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
}
