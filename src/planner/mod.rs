//! 分配求解：代价矩阵、匈牙利算法、精确/贪心求解器

pub mod hungarian;
pub mod matrix;
pub mod solver;

pub use matrix::CostMatrix;
pub use solver::{Assignment, RoundAssignment, Solver, GREEDY_INFEASIBLE_PENALTY, MAX_PENALTY};
