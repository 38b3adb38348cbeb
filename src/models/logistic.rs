//! L2-penalised logistic regression, full-batch gradient descent

use super::{check_binary_labels, check_training_set, sigmoid};
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coefficients: Option<Array1<f64>>,
    pub intercept: Option<f64>,
    /// L2 penalty on the coefficients; the intercept is not penalised
    pub alpha: f64,
    pub max_iter: usize,
    /// Stop once the gradient norm falls below this
    pub tol: f64,
    pub learning_rate: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

/// Gradient of the penalised mean log loss at `(w, b)`
struct Gradient {
    dw: Array1<f64>,
    db: f64,
}

impl Gradient {
    fn at(x: &Array2<f64>, y: &Array1<f64>, w: &Array1<f64>, b: f64, alpha: f64) -> Self {
        let residual = (x.dot(w) + b).mapv(sigmoid) - y;
        let n = x.nrows() as f64;
        Self {
            dw: x.t().dot(&residual) / n + w * alpha,
            db: residual.sum() / n,
        }
    }

    fn norm(&self) -> f64 {
        (self.dw.dot(&self.dw) + self.db * self.db).sqrt()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            alpha: 0.01,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.1,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_training_set("logistic regression", x, y, 1)?;
        check_binary_labels("logistic regression", y)?;
        if self.alpha < 0.0 {
            return Err(PipelineError::InvalidParameter {
                name: "alpha".to_string(),
                value: self.alpha.to_string(),
                reason: "must be non-negative".to_string(),
            });
        }

        let mut w = Array1::zeros(x.ncols());
        let mut b = 0.0;
        for _ in 0..self.max_iter {
            let grad = Gradient::at(x, y, &w, b, self.alpha);
            if grad.norm() < self.tol {
                break;
            }
            w.scaled_add(-self.learning_rate, &grad.dw);
            b -= self.learning_rate * grad.db;
        }

        if !(b.is_finite() && w.iter().all(|v| v.is_finite())) {
            return Err(PipelineError::FitFailure(
                "logistic regression diverged".to_string(),
            ));
        }

        self.coefficients = Some(w);
        self.intercept = Some(b);
        Ok(self)
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let w = self.coefficients.as_ref().ok_or(PipelineError::ModelNotFitted)?;
        if x.ncols() != w.len() {
            return Err(PipelineError::Shape {
                expected: format!("{} features", w.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        let b = self.intercept.unwrap_or(0.0);
        Ok((x.dot(w) + b).mapv(sigmoid))
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.predict_proba(x)?.mapv(|p| if p > 0.5 { 1.0 } else { 0.0 }))
    }
}
