//! 候选任务来源注册表
//!
//! 每个来源根据领域状态生成本周期的候选任务。注册表由 TaskManager 显式持有，
//! 不存在进程级的全局任务类型列表。

use crate::core::{ColonyError, Result};
use crate::task::{Agent, Task};

/// 候选任务来源
pub trait TaskSource {
    /// 来源名称（注册表内唯一，用于日志）
    fn name(&self) -> &str;

    /// 生成本周期的候选任务；可读取 Agent 状态（如饥饿、疲劳）决定是否生成
    fn candidates(&mut self, agents: &[Agent]) -> Vec<Box<dyn Task>>;
}

/// 以闭包实现的来源
pub struct FnSource<F>
where
    F: FnMut(&[Agent]) -> Vec<Box<dyn Task>>,
{
    name: String,
    generate: F,
}

impl<F> FnSource<F>
where
    F: FnMut(&[Agent]) -> Vec<Box<dyn Task>>,
{
    pub fn new(name: impl Into<String>, generate: F) -> Self {
        Self {
            name: name.into(),
            generate,
        }
    }
}

impl<F> TaskSource for FnSource<F>
where
    F: FnMut(&[Agent]) -> Vec<Box<dyn Task>>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn candidates(&mut self, agents: &[Agent]) -> Vec<Box<dyn Task>> {
        (self.generate)(agents)
    }
}

/// 来源注册表：按注册顺序收集候选任务
#[derive(Default)]
pub struct SourceRegistry {
    sources: Vec<Box<dyn TaskSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, source: impl TaskSource + 'static) -> Result<()> {
        if self.sources.iter().any(|s| s.name() == source.name()) {
            return Err(ColonyError::DuplicateSource(source.name().to_string()));
        }
        self.sources.push(Box::new(source));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// 依次调用每个来源，拼接候选任务
    pub fn collect(&mut self, agents: &[Agent]) -> Vec<Box<dyn Task>> {
        let mut tasks = Vec::new();
        for source in &mut self.sources {
            let produced = source.candidates(agents);
            tracing::trace!(source = source.name(), count = produced.len(), "candidates generated");
            tasks.extend(produced);
        }
        tasks
    }
}
