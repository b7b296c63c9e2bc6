//! 匈牙利算法（Kuhn–Munkres，带势函数，O(n³)）
//!
//! 求方阵的最小代价完美匹配。结果确定：相同输入总是给出相同匹配。

use crate::core::Result;
use crate::planner::matrix::CostMatrix;

const INF: i64 = i64::MAX / 4;

/// 返回每一行匹配到的列
pub fn solve(matrix: &CostMatrix) -> Vec<usize> {
    let n = matrix.size();
    if n == 0 {
        return Vec::new();
    }

    // 1 起始下标；下标 0 为哨兵列
    let mut u = vec![0i64; n + 1];
    let mut v = vec![0i64; n + 1];
    // col_owner[j]：匹配到第 j 列的行，0 表示未匹配
    let mut col_owner = vec![0usize; n + 1];
    let mut way = vec![0usize; n + 1];

    for row in 1..=n {
        col_owner[0] = row;
        let mut j0 = 0usize;
        let mut minv = vec![INF; n + 1];
        let mut used = vec![false; n + 1];

        loop {
            used[j0] = true;
            let i0 = col_owner[j0];
            let mut delta = INF;
            let mut j1 = 0usize;

            for j in 1..=n {
                if used[j] {
                    continue;
                }
                let reduced = matrix.get(i0 - 1, j - 1) - u[i0] - v[j];
                if reduced < minv[j] {
                    minv[j] = reduced;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }

            for j in 0..=n {
                if used[j] {
                    u[col_owner[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }

            j0 = j1;
            if col_owner[j0] == 0 {
                break;
            }
        }

        // 沿增广路回溯
        loop {
            let j1 = way[j0];
            col_owner[j0] = col_owner[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut row_to_col = vec![0usize; n];
    for (col, &row) in col_owner.iter().enumerate().skip(1) {
        row_to_col[row - 1] = col - 1;
    }
    row_to_col
}

/// 从原始行数据求解，先校验为非空方阵
pub fn solve_rows(rows: Vec<Vec<i64>>) -> Result<Vec<usize>> {
    let matrix = CostMatrix::from_rows(rows)?;
    Ok(solve(&matrix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn brute_force_min(matrix: &CostMatrix) -> i64 {
        fn permute(m: &CostMatrix, row: usize, used: &mut Vec<bool>, acc: i64, best: &mut i64) {
            if row == m.size() {
                *best = (*best).min(acc);
                return;
            }
            for col in 0..m.size() {
                if !used[col] {
                    used[col] = true;
                    permute(m, row + 1, used, acc + m.get(row, col), best);
                    used[col] = false;
                }
            }
        }
        let mut best = i64::MAX;
        permute(matrix, 0, &mut vec![false; matrix.size()], 0, &mut best);
        best
    }

    fn assert_is_permutation(assignment: &[usize]) {
        let mut seen = vec![false; assignment.len()];
        for &col in assignment {
            assert!(!seen[col], "column {col} assigned twice");
            seen[col] = true;
        }
    }

    #[test]
    fn test_known_three_by_three() {
        let assignment = solve_rows(vec![vec![4, 1, 3], vec![2, 0, 5], vec![3, 2, 2]]).unwrap();
        assert_eq!(assignment, vec![1, 0, 2]);
    }

    #[test]
    fn test_single_cell() {
        assert_eq!(solve_rows(vec![vec![42]]).unwrap(), vec![0]);
    }

    #[test]
    fn test_empty_matrix_is_an_error() {
        assert!(solve_rows(Vec::new()).is_err());
        assert!(solve(&CostMatrix::filled(0, 0)).is_empty());
    }

    #[test]
    fn test_matches_brute_force_on_random_matrices() {
        let mut rng = StdRng::seed_from_u64(7);
        for size in 1..=6 {
            for _ in 0..20 {
                let rows: Vec<Vec<i64>> = (0..size)
                    .map(|_| (0..size).map(|_| rng.gen_range(0..1_000)).collect())
                    .collect();
                let matrix = CostMatrix::from_rows(rows).unwrap();
                let assignment = solve(&matrix);
                assert_is_permutation(&assignment);
                assert_eq!(matrix.total_cost(&assignment), brute_force_min(&matrix));
            }
        }
    }

    #[test]
    fn test_large_penalties_do_not_overflow() {
        let big = 1_000_000_000_000i64;
        let matrix =
            CostMatrix::from_rows(vec![vec![big, 1, big], vec![1, big, big], vec![big, big, big]])
                .unwrap();
        let assignment = solve(&matrix);
        assert_eq!(assignment, vec![1, 0, 2]);
    }
}
