//! 组合节点：Sequence / Select / Parallel
//!
//! 每个节点用显式游标（当前子节点下标）记录进度，一次外部 tick 只推进当前子节点一步。

use crate::behavior::act::{Act, Status};

/// 顺序节点：依次执行子节点，任一失败即失败，全部成功才成功
pub struct Sequence {
    name: String,
    children: Vec<Box<dyn Act>>,
    current: usize,
    finished: Option<Status>,
}

impl Sequence {
    pub fn new(name: impl Into<String>, children: Vec<Box<dyn Act>>) -> Self {
        Self {
            name: name.into(),
            children,
            current: 0,
            finished: None,
        }
    }
}

impl Act for Sequence {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self) {
        for child in &mut self.children {
            child.initialize();
        }
        self.current = 0;
        self.finished = None;
    }

    fn tick(&mut self) -> Status {
        if let Some(status) = self.finished {
            return status;
        }
        let Some(child) = self.children.get_mut(self.current) else {
            self.finished = Some(Status::Success);
            return Status::Success;
        };

        match child.tick() {
            Status::Running => Status::Running,
            Status::Fail => {
                self.finished = Some(Status::Fail);
                Status::Fail
            }
            Status::Success => {
                self.current += 1;
                if self.current >= self.children.len() {
                    self.finished = Some(Status::Success);
                    Status::Success
                } else {
                    Status::Running
                }
            }
        }
    }
}

/// 选择节点：依次尝试子节点，第一个成功即成功，全部失败才失败
pub struct Select {
    name: String,
    children: Vec<Box<dyn Act>>,
    current: usize,
    finished: Option<Status>,
}

impl Select {
    pub fn new(name: impl Into<String>, children: Vec<Box<dyn Act>>) -> Self {
        Self {
            name: name.into(),
            children,
            current: 0,
            finished: None,
        }
    }
}

impl Act for Select {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self) {
        for child in &mut self.children {
            child.initialize();
        }
        self.current = 0;
        self.finished = None;
    }

    fn tick(&mut self) -> Status {
        if let Some(status) = self.finished {
            return status;
        }
        let Some(child) = self.children.get_mut(self.current) else {
            self.finished = Some(Status::Fail);
            return Status::Fail;
        };

        match child.tick() {
            Status::Running => Status::Running,
            Status::Success => {
                self.finished = Some(Status::Success);
                Status::Success
            }
            Status::Fail => {
                self.current += 1;
                if self.current >= self.children.len() {
                    self.finished = Some(Status::Fail);
                    Status::Fail
                } else {
                    Status::Running
                }
            }
        }
    }
}

/// 并行节点：每次 tick 推进所有未结束的子节点；任一失败即失败，全部成功才成功
pub struct Parallel {
    name: String,
    children: Vec<Box<dyn Act>>,
    done: Vec<bool>,
    finished: Option<Status>,
}

impl Parallel {
    pub fn new(name: impl Into<String>, children: Vec<Box<dyn Act>>) -> Self {
        let done = vec![false; children.len()];
        Self {
            name: name.into(),
            children,
            done,
            finished: None,
        }
    }
}

impl Act for Parallel {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self) {
        for child in &mut self.children {
            child.initialize();
        }
        self.done.iter_mut().for_each(|d| *d = false);
        self.finished = None;
    }

    fn tick(&mut self) -> Status {
        if let Some(status) = self.finished {
            return status;
        }

        for (child, done) in self.children.iter_mut().zip(self.done.iter_mut()) {
            if *done {
                continue;
            }
            match child.tick() {
                Status::Running => {}
                Status::Success => *done = true,
                Status::Fail => {
                    self.finished = Some(Status::Fail);
                    return Status::Fail;
                }
            }
        }

        if self.done.iter().all(|d| *d) {
            self.finished = Some(Status::Success);
            Status::Success
        } else {
            Status::Running
        }
    }
}
