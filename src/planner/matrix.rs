//! 整数代价方阵（行 = Agent，列 = 任务）

use crate::core::{ColonyError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostMatrix {
    size: usize,
    cells: Vec<i64>,
}

impl CostMatrix {
    /// 创建 `size × size` 的方阵，所有元素为 `value`
    pub fn filled(size: usize, value: i64) -> Self {
        Self {
            size,
            cells: vec![value; size * size],
        }
    }

    /// 从行构建；空矩阵或非方阵返回错误
    pub fn from_rows(rows: Vec<Vec<i64>>) -> Result<Self> {
        let size = rows.len();
        if size == 0 {
            return Err(ColonyError::EmptyMatrix);
        }
        let mut cells = Vec::with_capacity(size * size);
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != size {
                return Err(ColonyError::MatrixNotSquare {
                    row,
                    len: values.len(),
                    expected: size,
                });
            }
            cells.extend(values);
        }
        Ok(Self { size, cells })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, row: usize, col: usize) -> i64 {
        self.cells[row * self.size + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: i64) {
        self.cells[row * self.size + col] = value;
    }

    /// 左上角 `rows × cols` 子矩阵的最大值；子矩阵为空时返回 None
    pub fn max_in(&self, rows: usize, cols: usize) -> Option<i64> {
        (0..rows.min(self.size))
            .flat_map(|r| (0..cols.min(self.size)).map(move |c| (r, c)))
            .map(|(r, c)| self.get(r, c))
            .max()
    }

    /// 某个分配（行 -> 列）的总代价
    pub fn total_cost(&self, assignment: &[usize]) -> i64 {
        assignment
            .iter()
            .enumerate()
            .map(|(row, &col)| self.get(row, col))
            .sum()
    }
}
