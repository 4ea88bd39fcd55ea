// ARIMA(p, d, 0) fitted by conditional least squares
use crate::domain::error::{ForecastError, Result};

/// Small ridge term keeping the normal equations solvable for flat series
const RIDGE: f64 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
}

impl ArimaOrder {
    /// Order used by the original daily dashboard forecast
    pub const DASHBOARD: ArimaOrder = ArimaOrder { p: 5, d: 1 };

    /// Observations required: `d` lost to differencing, then at least `p + 1`
    /// regression equations for `p` coefficients.
    pub fn min_observations(&self) -> usize {
        self.d + 2 * self.p + 1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArimaModel {
    order: ArimaOrder,
    ar_coefficients: Vec<f64>,
    /// Last value of the series at each differencing level (level 0 = original)
    level_tails: Vec<f64>,
    /// Last `p` values of the fully differenced series, oldest first
    diff_tail: Vec<f64>,
}

pub fn difference(series: &[f64]) -> Vec<f64> {
    series.windows(2).map(|w| w[1] - w[0]).collect()
}

impl ArimaModel {
    pub fn fit(values: &[f64], order: ArimaOrder) -> Result<Self> {
        let needed = order.min_observations();
        if values.len() < needed {
            return Err(ForecastError::InsufficientHistory {
                needed,
                got: values.len(),
            });
        }

        let mut level_tails = Vec::with_capacity(order.d);
        let mut diff = values.to_vec();
        for _ in 0..order.d {
            level_tails.push(diff[diff.len() - 1]);
            diff = difference(&diff);
        }

        let p = order.p;
        let ar_coefficients = if p == 0 {
            Vec::new()
        } else {
            // z_t = sum_i phi_i * z_{t-i}; no constant once differenced
            let mut xtx = vec![vec![0.0; p]; p];
            let mut xty = vec![0.0; p];
            for t in p..diff.len() {
                for i in 0..p {
                    let xi = diff[t - 1 - i];
                    xty[i] += xi * diff[t];
                    for j in 0..p {
                        xtx[i][j] += xi * diff[t - 1 - j];
                    }
                }
            }
            for (i, row) in xtx.iter_mut().enumerate() {
                row[i] += RIDGE;
            }
            solve(xtx, xty)?
        };

        let diff_tail = diff[diff.len() - p..].to_vec();
        Ok(Self {
            order,
            ar_coefficients,
            level_tails,
            diff_tail,
        })
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coefficients
    }

    /// Point forecasts on the original scale.
    pub fn forecast(&self, steps: usize) -> Vec<f64> {
        let p = self.order.p;
        let mut extended = self.diff_tail.clone();
        for _ in 0..steps {
            let t = extended.len();
            let next: f64 = (0..p)
                .map(|i| self.ar_coefficients[i] * extended[t - 1 - i])
                .sum();
            extended.push(next);
        }

        let mut forecast = extended[p..].to_vec();
        for &tail in self.level_tails.iter().rev() {
            let mut level = tail;
            forecast = forecast
                .into_iter()
                .map(|delta| {
                    level += delta;
                    level
                })
                .collect();
        }
        forecast
    }
}

/// Gaussian elimination with partial pivoting
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < f64::EPSILON {
            return Err(ForecastError::Computation(
                "singular system while fitting ARIMA".to_string(),
            ));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
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
        Err(ForecastError::Computation(
            "non-finite ARIMA coefficients".to_string(),
        ))
    }
}
