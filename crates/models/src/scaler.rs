//! Per-feature standardisation.

/// Mean and scale of each feature column, fitted on training data.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler<const N: usize> {
    mean: [f64; N],
    scale: [f64; N],
}

impl<const N: usize> StandardScaler<N> {
    /// Fits mean and population standard deviation per column.
    ///
    /// Columns with zero variance get a scale of 1 so they standardise to 0
    /// instead of dividing by zero. Returns `None` for an empty sample set.
    #[must_use]
    pub fn fit(rows: &[[f64; N]]) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }
        let n = rows.len() as f64;

        let mut mean = [0.0; N];
        for row in rows {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut scale = [0.0; N];
        for row in rows {
            for ((s, x), m) in scale.iter_mut().zip(row).zip(&mean) {
                *s += (x - m).powi(2);
            }
        }
        for s in &mut scale {
            let std = (*s / n).sqrt();
            *s = if std > 0.0 && std.is_finite() { std } else { 1.0 };
        }

        Some(Self { mean, scale })
    }

    /// Standardises one feature vector.
    #[must_use]
    pub fn transform(&self, row: &[f64; N]) -> [f64; N] {
        std::array::from_fn(|i| (row[i] - self.mean[i]) / self.scale[i])
    }

    /// Fitted column means.
    #[must_use]
    pub fn mean(&self) -> &[f64; N] {
        &self.mean
    }

    /// Fitted column scales.
    #[must_use]
    pub fn scale(&self) -> &[f64; N] {
        &self.scale
    }

    /// Returns true if every fitted value is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.mean.iter().chain(&self.scale).all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_and_transform() {
        let rows = [[1.0, 10.0], [3.0, 10.0]];
        let scaler = StandardScaler::fit(&rows).unwrap();

        assert_eq!(scaler.mean(), &[2.0, 10.0]);
        assert_eq!(scaler.scale(), &[1.0, 1.0]);
        assert_eq!(scaler.transform(&[3.0, 10.0]), [1.0, 0.0]);
    }

    #[test]
    fn test_population_std() {
        let rows = [[2.0], [4.0], [4.0], [4.0], [5.0], [5.0], [7.0], [9.0]];
        let scaler = StandardScaler::fit(&rows).unwrap();

        assert_eq!(scaler.mean(), &[5.0]);
        assert_eq!(scaler.scale(), &[2.0]);
    }

    #[test]
    fn test_empty_fit() {
        assert!(StandardScaler::<3>::fit(&[]).is_none());
    }
}
