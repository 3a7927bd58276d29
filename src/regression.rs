use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

pub const FEATURE_COUNT: usize = 4;
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "seconds_played",
    "previous_game_points",
    "is_playoff",
    "is_home",
];

/// One modeling row: the four features against the points target.
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    pub x: [f64; FEATURE_COUNT],
    pub y: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinearFit {
    pub intercept: f64,
    pub coefficients: [f64; FEATURE_COUNT],
}

impl LinearFit {
    pub fn predict(&self, x: &[f64; FEATURE_COUNT]) -> f64 {
        let mut out = self.intercept;
        for (coeff, value) in self.coefficients.iter().zip(x) {
            out += coeff * value;
        }
        out
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct EvalMetrics {
    pub r2: f64,
    pub mse: f64,
    pub rmse: f64,
}

/// Deterministic shuffled train/holdout partition. The same seed always
/// yields the same partition for a given `n`, so the procedure can be reused
/// unmodified for every per-player fit. Holdout size is `round(n·fraction)`
/// clamped to `[1, n−1]`; callers guarantee `n >= 2`.
pub fn split_indices(n: usize, holdout_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let holdout = ((n as f64) * holdout_fraction).round() as usize;
    let holdout = holdout.clamp(1, n.saturating_sub(1).max(1));
    let split = n - holdout;
    (indices[..split].to_vec(), indices[split..].to_vec())
}

/// Ordinary least squares on the augmented normal equations. A near-zero
/// pivot (a zero-variance feature is collinear with the intercept) zeroes
/// that coefficient instead of failing.
pub fn fit_ols(samples: &[Sample]) -> LinearFit {
    const D: usize = FEATURE_COUNT + 1;

    let mut xtx = [[0.0_f64; D]; D];
    let mut xty = [0.0_f64; D];
    for sample in samples {
        let mut row = [1.0_f64; D];
        row[1..].copy_from_slice(&sample.x);
        for i in 0..D {
            for j in 0..D {
                xtx[i][j] += row[i] * row[j];
            }
            xty[i] += row[i] * sample.y;
        }
    }

    let solution = solve_symmetric(xtx, xty);
    let mut coefficients = [0.0; FEATURE_COUNT];
    coefficients.copy_from_slice(&solution[1..]);
    LinearFit {
        intercept: solution[0],
        coefficients,
    }
}

fn solve_symmetric(
    mut a: [[f64; FEATURE_COUNT + 1]; FEATURE_COUNT + 1],
    mut b: [f64; FEATURE_COUNT + 1],
) -> [f64; FEATURE_COUNT + 1] {
    const D: usize = FEATURE_COUNT + 1;
    const PIVOT_EPS: f64 = 1e-9;

    for col in 0..D {
        let mut pivot = col;
        for row in col + 1..D {
            if a[row][col].abs() > a[pivot][col].abs() {
                pivot = row;
            }
        }
        if a[pivot][col].abs() < PIVOT_EPS {
            continue;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..D {
            let factor = a[row][col] / a[col][col];
            for k in col..D {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut solution = [0.0_f64; D];
    for col in (0..D).rev() {
        if a[col][col].abs() < PIVOT_EPS {
            continue;
        }
        let mut value = b[col];
        for k in col + 1..D {
            value -= a[col][k] * solution[k];
        }
        solution[col] = value / a[col][col];
    }
    solution
}

/// Holdout figures of merit. R² is guarded against a zero-variance holdout
/// (reported as 0.0); RMSE is always √MSE.
pub fn evaluate(predictions: &[f64], actuals: &[f64]) -> EvalMetrics {
    if predictions.is_empty() || predictions.len() != actuals.len() {
        return EvalMetrics {
            r2: 0.0,
            mse: 0.0,
            rmse: 0.0,
        };
    }

    let n = actuals.len() as f64;
    let mean_actual = actuals.iter().sum::<f64>() / n;
    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (pred, actual) in predictions.iter().zip(actuals) {
        ss_res += (actual - pred) * (actual - pred);
        ss_tot += (actual - mean_actual) * (actual - mean_actual);
    }

    let mse = ss_res / n;
    let r2 = if ss_tot <= f64::EPSILON {
        0.0
    } else {
        1.0 - ss_res / ss_tot
    };
    EvalMetrics {
        r2,
        mse,
        rmse: mse.sqrt(),
    }
}
