//! 行为组合引擎：Status 协议、叶子节点、组合节点、条件循环与 tick 预算
//!
//! 组合节点不依赖协程，而是各自维护显式状态机，每次外部 tick 只推进一步。

pub mod act;
pub mod budget;
pub mod composite;
pub mod leaf;
pub mod while_loop;

pub use act::{run_to_completion, Act, Status};
pub use budget::TickBudget;
pub use composite::{Parallel, Select, Sequence};
pub use leaf::{Always, Condition, Wrap};
pub use while_loop::WhileLoop;
