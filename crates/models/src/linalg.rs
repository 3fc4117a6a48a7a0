//! Small dense least-squares solver for the regression models.

use crate::error::TrainingError;

/// Ridge term added to the non-intercept diagonal of the normal equations.
///
/// Keeps a constant (all-zero after standardisation) feature column from
/// making the system singular; its weight then solves to zero.
pub const RIDGE: f64 = 1e-8;

/// Solves `min ||y - (b + X w)||^2` for intercept `b` and weights `w`.
///
/// Builds the normal equations `(A^T A) beta = A^T y` with a leading column
/// of ones and solves them by Gaussian elimination with partial pivoting.
///
/// # Errors
/// Returns [`TrainingError::Empty`] for no rows and
/// [`TrainingError::Singular`] if elimination meets a zero pivot.
pub fn least_squares<const N: usize>(
    rows: &[[f64; N]],
    targets: &[f64],
) -> Result<(f64, [f64; N]), TrainingError> {
    if rows.is_empty() || rows.len() != targets.len() {
        return Err(TrainingError::Empty);
    }

    let dim = N + 1;
    let mut ata = vec![vec![0.0; dim]; dim];
    let mut aty = vec![0.0; dim];

    for (row, &y) in rows.iter().zip(targets) {
        let augmented: Vec<f64> = std::iter::once(1.0).chain(row.iter().copied()).collect();
        for i in 0..dim {
            aty[i] += augmented[i] * y;
            for j in 0..dim {
                ata[i][j] += augmented[i] * augmented[j];
            }
        }
    }
    for (i, row) in ata.iter_mut().enumerate().skip(1) {
        row[i] += RIDGE;
    }

    let beta = solve(ata, aty)?;
    let mut weights = [0.0; N];
    weights.copy_from_slice(&beta[1..]);
    Ok((beta[0], weights))
}

/// Solves `a x = b` in place by Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, TrainingError> {
    let n = b.len();

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&x, &y| a[x][col].abs().total_cmp(&a[y][col].abs()))
            .ok_or(TrainingError::Singular)?;
        if a[pivot][col].abs() < f64::EPSILON * 1e-3 || !a[pivot][col].is_finite() {
            return Err(TrainingError::Singular);
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }

    if x.iter().all(|v| v.is_finite()) {
        Ok(x)
    } else {
        Err(TrainingError::Diverged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovers_exact_plane() {
        // y = 1 + 2a - 3b
        let rows = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [2.0, 1.0], [1.0, 3.0]];
        let targets: Vec<f64> = rows.iter().map(|r| 1.0 + 2.0 * r[0] - 3.0 * r[1]).collect();

        let (intercept, weights) = least_squares(&rows, &targets).unwrap();
        assert!((intercept - 1.0).abs() < 1e-6);
        assert!((weights[0] - 2.0).abs() < 1e-6);
        assert!((weights[1] + 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_constant_column_gets_zero_weight() {
        // Second column is all zero, as a constant feature is after standardisation.
        let rows = [[-1.0, 0.0], [0.0, 0.0], [1.0, 0.0]];
        let targets = [1.0, 3.0, 5.0];

        let (intercept, weights) = least_squares(&rows, &targets).unwrap();
        assert!((intercept - 3.0).abs() < 1e-6);
        assert!((weights[0] - 2.0).abs() < 1e-6);
        assert!(weights[1].abs() < 1e-6);
    }

    #[test]
    fn test_empty_rows() {
        assert_eq!(
            least_squares::<2>(&[], &[]),
            Err(TrainingError::Empty)
        );
    }
}
