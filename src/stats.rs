use serde::{Deserialize, Serialize};

/// Running summary of path costs (Welford's algorithm).
pub struct CostAccumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
    min: f64,
    max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostReport {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl CostAccumulator {
    pub fn new() -> Self {
        Self {
            n_vals: 0,
            mean: 0.0,
            diff_2_sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    pub fn add(&mut self, cost: f64) {
        self.n_vals += 1;

        let diff_a = cost - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = cost - self.mean;
        self.diff_2_sum += diff_a * diff_b;

        self.min = self.min.min(cost);
        self.max = self.max.max(cost);
    }

    pub fn report(&self) -> CostReport {
        if self.n_vals == 0 {
            return CostReport {
                mean: f64::NAN,
                std_dev: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
            };
        }
        CostReport {
            mean: self.mean,
            std_dev: if self.n_vals > 1 {
                (self.diff_2_sum / (self.n_vals as f64 - 1.0)).sqrt()
            } else {
                f64::NAN
            },
            min: self.min,
            max: self.max,
        }
    }
}
