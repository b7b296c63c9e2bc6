//! 叶子节点：闭包动作、谓词条件、常量状态
//!
//! 领域动作通过 `Wrap` 进入行为树；`Condition` 用于 WhileLoop 的门控检查。

use crate::behavior::act::{Act, Status};

/// 包装一个闭包作为叶子动作，每次 tick 调用一次闭包
///
/// 闭包捕获的状态就是动作的进度。构造时保留一份原始闭包，`initialize` 用它的克隆
/// 替换当前闭包，进度回到起点；需要跨运行共享的数据放进 `Rc<Cell<_>>` 等共享容器。
pub struct Wrap<F>
where
    F: FnMut() -> Status + Clone,
{
    name: String,
    pristine: F,
    func: F,
}

impl<F> Wrap<F>
where
    F: FnMut() -> Status + Clone,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            pristine: func.clone(),
            func,
        }
    }
}

impl<F> Act for Wrap<F>
where
    F: FnMut() -> Status + Clone,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self) {
        self.func = self.pristine.clone();
    }

    fn tick(&mut self) -> Status {
        (self.func)()
    }
}

/// 谓词节点：一次 tick 内给出 Success（真）或 Fail（假）
pub struct Condition<P>
where
    P: FnMut() -> bool,
{
    name: String,
    predicate: P,
}

impl<P> Condition<P>
where
    P: FnMut() -> bool,
{
    pub fn new(name: impl Into<String>, predicate: P) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }
}

impl<P> Act for Condition<P>
where
    P: FnMut() -> bool,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self) {}

    fn tick(&mut self) -> Status {
        if (self.predicate)() {
            Status::Success
        } else {
            Status::Fail
        }
    }
}

/// 始终返回同一状态
#[derive(Debug, Clone)]
pub struct Always {
    name: String,
    status: Status,
}

impl Always {
    pub fn new(status: Status) -> Self {
        Self {
            name: format!("Always : {status}"),
            status,
        }
    }
}

impl Act for Always {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self) {}

    fn tick(&mut self) -> Status {
        self.status
    }
}
