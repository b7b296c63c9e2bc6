//! 条件循环节点（While）
//!
//! 每轮开始前对条件节点做一次门控检查（只 tick 一次，Running 视为通过），
//! 通过后重新初始化子节点并把它驱动到终态。子节点失败则整个循环立即失败；
//! 条件失败则循环正常结束并返回 Success。
//!
//! 子节点永不结束时循环也永不结束，需要上界时用 [`TickBudget`](crate::behavior::TickBudget) 包装。

use crate::behavior::act::{Act, Status};

/// 循环状态机
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    /// 下一次 tick 先检查条件
    CheckCondition,
    /// 子节点正在运行，下一次 tick 继续驱动它
    DrainingChild,
    /// 已到终态
    Done(Status),
}

pub struct WhileLoop {
    name: String,
    condition: Box<dyn Act>,
    child: Box<dyn Act>,
    state: LoopState,
    repeats: usize,
}

impl WhileLoop {
    pub fn new(child: Box<dyn Act>, condition: Box<dyn Act>) -> Self {
        Self {
            name: format!("While : {}", condition.name()),
            condition,
            child,
            state: LoopState::CheckCondition,
            repeats: 0,
        }
    }

    /// 本次运行中子节点成功完成的轮数
    pub fn repeats(&self) -> usize {
        self.repeats
    }

    /// 门控检查：只有 Fail 才算不满足。条件只在 `initialize` 时重置，
    /// 有状态的条件（计数器、检查序列）在各次检查之间保留进度
    fn check_condition(&mut self) -> bool {
        self.condition.tick() != Status::Fail
    }

    /// 驱动子节点一步；子节点成功时本轮结束，下一次 tick 重新检查条件
    fn drive_child(&mut self) -> Status {
        match self.child.tick() {
            Status::Running => {
                self.state = LoopState::DrainingChild;
                Status::Running
            }
            Status::Success => {
                self.repeats += 1;
                self.state = LoopState::CheckCondition;
                Status::Running
            }
            Status::Fail => {
                self.state = LoopState::Done(Status::Fail);
                Status::Fail
            }
        }
    }
}

impl Act for WhileLoop {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self) {
        self.child.initialize();
        self.condition.initialize();
        self.state = LoopState::CheckCondition;
        self.repeats = 0;
    }

    fn tick(&mut self) -> Status {
        match self.state {
            LoopState::Done(status) => status,
            LoopState::DrainingChild => self.drive_child(),
            LoopState::CheckCondition => {
                if !self.check_condition() {
                    self.state = LoopState::Done(Status::Success);
                    return Status::Success;
                }
                self.child.initialize();
                self.drive_child()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::act::run_to_completion;
    use crate::behavior::leaf::{Always, Condition, Wrap};
    use std::cell::Cell;
    use std::rc::Rc;

    /// 第 `fail_on` 次检查时返回 false 的条件，同时记录检查次数
    fn counting_condition(fail_on: usize, checks: Rc<Cell<usize>>) -> Box<dyn Act> {
        Box::new(Condition::new("counter", move || {
            checks.set(checks.get() + 1);
            checks.get() < fail_on
        }))
    }

    fn counting_child(runs: Rc<Cell<usize>>, result: Status) -> Box<dyn Act> {
        Box::new(Wrap::new("child", move || {
            runs.set(runs.get() + 1);
            result
        }))
    }

    #[test]
    fn test_condition_failing_on_nth_check_gives_n_minus_one_repeats() {
        for n in 1..=5 {
            let checks = Rc::new(Cell::new(0));
            let runs = Rc::new(Cell::new(0));
            let mut node = WhileLoop::new(
                counting_child(Rc::clone(&runs), Status::Success),
                counting_condition(n, Rc::clone(&checks)),
            );

            let (status, ticks) = run_to_completion(&mut node, 100).expect("loop should finish");
            assert_eq!(status, Status::Success);
            assert_eq!(runs.get(), n - 1);
            assert_eq!(node.repeats(), n - 1);
            assert_eq!(checks.get(), n);
            assert_eq!(ticks, n);
        }
    }

    #[test]
    fn test_child_failure_fails_loop_on_same_tick() {
        let checks = Rc::new(Cell::new(0));
        let runs = Rc::new(Cell::new(0));
        let mut node = WhileLoop::new(
            counting_child(Rc::clone(&runs), Status::Fail),
            counting_condition(usize::MAX, Rc::clone(&checks)),
        );

        node.initialize();
        assert_eq!(node.tick(), Status::Fail);
        assert_eq!(checks.get(), 1);
        assert_eq!(runs.get(), 1);

        // 终态之后不再检查条件
        assert_eq!(node.tick(), Status::Fail);
        assert_eq!(checks.get(), 1);
    }

    #[test]
    fn test_running_condition_counts_as_satisfied() {
        let runs = Rc::new(Cell::new(0));
        let runs_in_child = Rc::clone(&runs);
        let child = Box::new(Wrap::new("child", move || {
            runs_in_child.set(runs_in_child.get() + 1);
            if runs_in_child.get() >= 3 {
                Status::Fail
            } else {
                Status::Success
            }
        }));
        let mut node = WhileLoop::new(child, Box::new(Always::new(Status::Running)));

        assert_eq!(run_to_completion(&mut node, 100), Some((Status::Fail, 3)));
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn test_multi_tick_child_yields_running_between_steps() {
        let checks = Rc::new(Cell::new(0));
        let mut left = 2;
        let child = Box::new(Wrap::new("two-step", move || {
            left -= 1;
            if left == 0 {
                Status::Success
            } else {
                Status::Running
            }
        }));
        let mut node = WhileLoop::new(child, counting_condition(3, Rc::clone(&checks)));

        node.initialize();
        let trace: Vec<Status> = (0..5).map(|_| node.tick()).collect();
        assert_eq!(
            trace,
            vec![
                Status::Running,
                Status::Running,
                Status::Running,
                Status::Running,
                Status::Success,
            ]
        );
        assert_eq!(node.repeats(), 2);
        assert_eq!(checks.get(), 3);
    }

    /// 有状态的条件：initialize 时装入 `passes`，之后每次 tick 消耗一次，耗尽时失败
    struct Gate {
        passes: usize,
        left: usize,
        resets: Rc<Cell<usize>>,
    }

    impl Act for Gate {
        fn name(&self) -> &str {
            "gate"
        }

        fn initialize(&mut self) {
            self.left = self.passes;
            self.resets.set(self.resets.get() + 1);
        }

        fn tick(&mut self) -> Status {
            if self.left == 0 {
                return Status::Fail;
            }
            self.left -= 1;
            Status::Success
        }
    }

    #[test]
    fn test_stateful_condition_keeps_progress_between_checks() {
        let runs = Rc::new(Cell::new(0));
        let resets = Rc::new(Cell::new(0));
        let gate = Gate {
            passes: 2,
            left: 0,
            resets: Rc::clone(&resets),
        };
        let mut node = WhileLoop::new(counting_child(Rc::clone(&runs), Status::Success), Box::new(gate));

        assert_eq!(run_to_completion(&mut node, 1_000), Some((Status::Success, 3)));
        assert_eq!(runs.get(), 2);
        assert_eq!(node.repeats(), 2);
        assert_eq!(resets.get(), 1);
    }

    #[test]
    fn test_never_ending_child_keeps_loop_running() {
        let mut node = WhileLoop::new(
            Box::new(Always::new(Status::Running)),
            Box::new(Always::new(Status::Success)),
        );
        assert_eq!(run_to_completion(&mut node, 1_000), None);
    }

    #[test]
    fn test_reinitialize_restarts_loop() {
        let checks = Rc::new(Cell::new(0));
        let mut node = WhileLoop::new(
            Box::new(Always::new(Status::Success)),
            Box::new(Condition::new("never", {
                let checks = Rc::clone(&checks);
                move || {
                    checks.set(checks.get() + 1);
                    false
                }
            })),
        );

        assert_eq!(run_to_completion(&mut node, 10), Some((Status::Success, 1)));
        assert_eq!(run_to_completion(&mut node, 10), Some((Status::Success, 1)));
        assert_eq!(checks.get(), 2);
        assert_eq!(node.name(), "While : never");
    }
}
