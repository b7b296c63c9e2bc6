//! Tick 预算包装：子节点超过 `max_ticks` 次仍在运行时判定失败

use crate::behavior::act::{Act, Status};

pub struct TickBudget {
    name: String,
    child: Box<dyn Act>,
    max_ticks: usize,
    used: usize,
}

impl TickBudget {
    pub fn new(child: Box<dyn Act>, max_ticks: usize) -> Self {
        Self {
            name: format!("Budget({max_ticks}) : {}", child.name()),
            child,
            max_ticks,
            used: 0,
        }
    }

    pub fn ticks_used(&self) -> usize {
        self.used
    }
}

impl Act for TickBudget {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self) {
        self.child.initialize();
        self.used = 0;
    }

    fn tick(&mut self) -> Status {
        if self.used >= self.max_ticks {
            return Status::Fail;
        }
        self.used += 1;
        let status = self.child.tick();
        if status == Status::Running && self.used >= self.max_ticks {
            tracing::debug!(node = %self.name, "tick budget exhausted");
            return Status::Fail;
        }
        status
    }
}
