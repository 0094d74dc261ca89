//! Dense solver for the small normal-equation systems built by the fitter.

/// Solve the NxN system `a * x = b` by Gaussian elimination with partial pivoting.
///
/// Returns `None` when a pivot is negligible relative to the largest matrix
/// entry, i.e. the system is numerically singular.
#[allow(clippy::needless_range_loop)]
pub(super) fn solve<const N: usize>(a: &[[f64; N]; N], b: &[f64; N]) -> Option<[f64; N]> {
    let mut matrix = *a;
    let mut rhs = *b;

    let scale = matrix
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0f64, |acc, v| acc.max(v.abs()));
    if !scale.is_finite() || scale == 0.0 {
        return None;
    }
    let min_pivot = scale * f64::EPSILON;

    // Forward elimination with partial pivoting
    for col in 0..N {
        let mut max_row = col;
        let mut max_val = matrix[col][col].abs();
        for row in (col + 1)..N {
            if matrix[row][col].abs() > max_val {
                max_val = matrix[row][col].abs();
                max_row = row;
            }
        }

        if max_val <= min_pivot {
            return None;
        }

        if max_row != col {
            matrix.swap(col, max_row);
            rhs.swap(col, max_row);
        }

        for row in (col + 1)..N {
            let factor = matrix[row][col] / matrix[col][col];
            let pivot_row = matrix[col];
            for (j, m) in matrix[row].iter_mut().enumerate().skip(col) {
                *m -= factor * pivot_row[j];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    // Back substitution
    let mut x = [0.0f64; N];
    for i in (0..N).rev() {
        let mut sum = rhs[i];
        for (j, &xj) in x.iter().enumerate().skip(i + 1) {
            sum -= matrix[i][j] * xj;
        }
        x[i] = sum / matrix[i][i];
    }

    x.iter().all(|v| v.is_finite()).then_some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_identity() {
        let a = [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        let b = [1.0, 2.0, 3.0, 4.0];

        let x = solve(&a, &b).unwrap();
        for i in 0..4 {
            assert!((x[i] - b[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_solve_needs_pivoting() {
        let a = [
            [0.0, 1.0, 0.0, 0.0],
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 2.0, 0.0],
            [0.0, 0.0, 0.0, 4.0],
        ];
        let b = [2.0, 1.0, 6.0, 8.0];

        let x = solve(&a, &b).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-12);
        assert!((x[1] - 2.0).abs() < 1e-12);
        assert!((x[2] - 3.0).abs() < 1e-12);
        assert!((x[3] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_solve_symmetric_dense() {
        // [[4,1],[1,3]] x = [1,2] -> x = [1/11, 7/11]
        let a = [[4.0, 1.0], [1.0, 3.0]];
        let b = [1.0, 2.0];

        let x = solve(&a, &b).unwrap();
        assert!((x[0] - 1.0 / 11.0).abs() < 1e-12);
        assert!((x[1] - 7.0 / 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_solve_zero_matrix_returns_none() {
        let a = [[0.0; 3]; 3];
        assert!(solve(&a, &[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn test_solve_rank_deficient_returns_none() {
        // Second row is twice the first.
        let a = [[1.0, 2.0], [2.0, 4.0]];
        assert!(solve(&a, &[1.0, 2.0]).is_none());
    }

    #[test]
    fn test_solve_non_finite_returns_none() {
        let a = [[f64::NAN, 0.0], [0.0, 1.0]];
        assert!(solve(&a, &[1.0, 1.0]).is_none());
    }
}
