//! Decision tree implementation

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Decision tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf {
        value: f64,
        n_samples: usize,
    },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// Gini impurity (classification)
    Gini,
    /// Shannon entropy (classification)
    Entropy,
    /// Log loss; same split quality as entropy (classification)
    LogLoss,
    /// Mean squared error (regression)
    MSE,
}

impl Criterion {
    pub(crate) fn is_classification(self) -> bool {
        !matches!(self, Criterion::MSE)
    }
}

/// Target prepared for split search
enum Target<'a> {
    /// Class index per sample and the number of classes
    Classes(&'a [usize], usize),
    Values(&'a Array1<f64>),
}

/// Decision tree model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features drawn per split (all when None)
    pub max_features: Option<usize>,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Seed for feature sampling
    pub random_state: Option<u64>,
    /// Number of features
    n_features: usize,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
    /// Classes (for classification)
    classes: Vec<f64>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_classifier()
    }
}

impl DecisionTree {
    /// Create a new classifier tree
    pub fn new_classifier() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
            random_state: None,
            n_features: 0,
            feature_importances: None,
            classes: Vec::new(),
        }
    }

    /// Create a new regressor tree
    pub fn new_regressor() -> Self {
        Self {
            criterion: Criterion::MSE,
            ..Self::new_classifier()
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Set number of features drawn per split
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    /// Set criterion; a classifier keeps a classification criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn is_fitted(&self) -> bool {
        self.root.is_some()
    }

    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        super::check_training_set("decision tree", x, y, 1)?;
        if x.iter().any(|v| v.is_nan()) {
            return Err(PipelineError::FitFailure(
                "decision tree input contains NaN".to_string()
            ));
        }

        self.n_features = x.ncols();
        let mut importances = vec![0.0; x.ncols()];
        let rows: Vec<usize> = (0..x.nrows()).collect();
        let mut rng = self
            .random_state
            .map_or_else(ChaCha8Rng::from_entropy, ChaCha8Rng::seed_from_u64);

        let root = if self.criterion.is_classification() {
            let (classes, codes) = super::encode_classes(y);
            let target = Target::Classes(&codes, classes.len());
            self.classes = classes;
            self.build_tree(x, &target, &rows, 0, &mut importances, &mut rng)
        } else {
            self.classes.clear();
            self.build_tree(x, &Target::Values(y), &rows, 0, &mut importances, &mut rng)
        };
        self.root = Some(root);

        super::normalize_in_place(&mut importances);
        self.feature_importances = Some(Array1::from_vec(importances));
        Ok(self)
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        target: &Target,
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let parent_impurity = self.node_impurity(target, indices);

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || parent_impurity <= 1e-12;

        if should_stop {
            return self.leaf(target, indices);
        }

        let features = self.draw_features(x.ncols(), rng);
        let best = self.find_best_split(x, target, indices, &features, parent_impurity);

        let Some((feature_idx, threshold, gain)) = best else {
            return self.leaf(target, indices);
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, feature_idx]] <= threshold);

        importances[feature_idx] += n_samples as f64 * gain;

        let left = Box::new(self.build_tree(x, target, &left_indices, depth + 1, importances, rng));
        let right = Box::new(self.build_tree(x, target, &right_indices, depth + 1, importances, rng));

        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            n_samples,
        }
    }

    fn draw_features(&self, n_features: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
        match self.max_features {
            Some(k) if k < n_features => {
                let mut drawn = index::sample(rng, n_features, k).into_vec();
                drawn.sort_unstable();
                drawn
            }
            _ => (0..n_features).collect(),
        }
    }

    /// Best (feature, threshold, gain) over the given features, scanning each
    /// feature once in sorted order.
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        target: &Target,
        indices: &[usize],
        features: &[usize],
        parent_impurity: f64,
    ) -> Option<(usize, f64, f64)> {
        let n = indices.len() as f64;
        let min_leaf = self.min_samples_leaf;

        let feature_results: Vec<Option<(usize, f64, f64)>> = features
            .par_iter()
            .map(|&feature_idx| {
                let mut order: Vec<(f64, usize)> = indices.iter().map(|&i| (x[[i, feature_idx]], i)).collect();
                order.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

                let mut best: Option<(f64, f64)> = None;
                let mut stats = SplitStats::new(target, &order);

                for pos in 0..order.len() - 1 {
                    stats.move_left(target, order[pos].1);
                    let left_count = pos + 1;
                    let right_count = order.len() - left_count;

                    if order[pos].0 >= order[pos + 1].0 {
                        continue;
                    }
                    if left_count < min_leaf || right_count < min_leaf {
                        continue;
                    }

                    let (left_impurity, right_impurity) = stats.impurities(self.criterion);
                    let weighted = (left_count as f64 * left_impurity + right_count as f64 * right_impurity) / n;
                    let gain = parent_impurity - weighted;

                    if gain > 1e-12 && best.map_or(true, |(g, _)| gain > g) {
                        best = Some((gain, (order[pos].0 + order[pos + 1].0) / 2.0));
                    }
                }

                best.map(|(gain, threshold)| (feature_idx, threshold, gain))
            })
            .collect();

        // First feature wins among equal gains
        feature_results
            .into_iter()
            .flatten()
            .fold(None, |acc: Option<(usize, f64, f64)>, cand| match acc {
                Some(a) if a.2 >= cand.2 => Some(a),
                _ => Some(cand),
            })
    }

    fn node_impurity(&self, target: &Target, indices: &[usize]) -> f64 {
        match target {
            Target::Classes(class_idx, n_classes) => {
                let mut counts = vec![0usize; *n_classes];
                for &i in indices {
                    counts[class_idx[i]] += 1;
                }
                class_impurity(&counts, indices.len(), self.criterion)
            }
            Target::Values(y) => {
                let (sum, sq) = indices.iter().fold((0.0, 0.0), |(s, q), &i| (s + y[i], q + y[i] * y[i]));
                variance(sum, sq, indices.len())
            }
        }
    }

    fn leaf(&self, target: &Target, indices: &[usize]) -> TreeNode {
        let value = match target {
            Target::Classes(class_idx, n_classes) => {
                let mut counts = vec![0usize; *n_classes];
                for &i in indices {
                    counts[class_idx[i]] += 1;
                }
                // Lowest class wins ties
                let mut best = 0;
                for (c, &count) in counts.iter().enumerate() {
                    if count > counts[best] {
                        best = c;
                    }
                }
                self.classes.get(best).copied().unwrap_or(0.0)
            }
            Target::Values(y) => {
                if indices.is_empty() {
                    0.0
                } else {
                    indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64
                }
            }
        };

        TreeNode::Leaf {
            value,
            n_samples: indices.len(),
        }
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref()
            .ok_or(PipelineError::ModelNotFitted)?;

        if x.ncols() != self.n_features {
            return Err(PipelineError::Shape {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        Ok(x.rows().into_iter().map(|row| Self::predict_sample(root, row)).collect())
    }

    fn predict_sample(node: &TreeNode, sample: ArrayView1<f64>) -> f64 {
        match node {
            TreeNode::Leaf { value, .. } => *value,
            TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                if sample[*feature_idx] <= *threshold {
                    Self::predict_sample(left, sample)
                } else {
                    Self::predict_sample(right, sample)
                }
            }
        }
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Get tree depth
    #[cfg(test)]
    fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }
}

/// Running left/right statistics for one sorted sweep
struct SplitStats {
    left_counts: Vec<usize>,
    right_counts: Vec<usize>,
    left_sum: f64,
    left_sq: f64,
    right_sum: f64,
    right_sq: f64,
    left_n: usize,
    right_n: usize,
}

impl SplitStats {
    fn new(target: &Target, order: &[(f64, usize)]) -> Self {
        let mut stats = Self {
            left_counts: Vec::new(),
            right_counts: Vec::new(),
            left_sum: 0.0,
            left_sq: 0.0,
            right_sum: 0.0,
            right_sq: 0.0,
            left_n: 0,
            right_n: order.len(),
        };
        match target {
            Target::Classes(class_idx, n_classes) => {
                stats.left_counts = vec![0; *n_classes];
                stats.right_counts = vec![0; *n_classes];
                for &(_, i) in order {
                    stats.right_counts[class_idx[i]] += 1;
                }
            }
            Target::Values(y) => {
                for &(_, i) in order {
                    stats.right_sum += y[i];
                    stats.right_sq += y[i] * y[i];
                }
            }
        }
        stats
    }

    fn move_left(&mut self, target: &Target, i: usize) {
        self.left_n += 1;
        self.right_n -= 1;
        match target {
            Target::Classes(class_idx, _) => {
                self.left_counts[class_idx[i]] += 1;
                self.right_counts[class_idx[i]] -= 1;
            }
            Target::Values(y) => {
                let v = y[i];
                self.left_sum += v;
                self.left_sq += v * v;
                self.right_sum -= v;
                self.right_sq -= v * v;
            }
        }
    }

    fn impurities(&self, criterion: Criterion) -> (f64, f64) {
        if criterion.is_classification() {
            (
                class_impurity(&self.left_counts, self.left_n, criterion),
                class_impurity(&self.right_counts, self.right_n, criterion),
            )
        } else {
            (
                variance(self.left_sum, self.left_sq, self.left_n),
                variance(self.right_sum, self.right_sq, self.right_n),
            )
        }
    }
}

fn class_impurity(counts: &[usize], total: usize, criterion: Criterion) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    match criterion {
        Criterion::Gini => 1.0 - counts.iter().map(|&c| (c as f64 / n).powi(2)).sum::<f64>(),
        Criterion::Entropy | Criterion::LogLoss => -counts
            .iter()
            .filter(|&&c| c > 0)
            .map(|&c| {
                let p = c as f64 / n;
                p * p.ln()
            })
            .sum::<f64>(),
        Criterion::MSE => 0.0,
    }
}

fn variance(sum: f64, sq_sum: f64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let n = count as f64;
    (sq_sum / n - (sum / n).powi(2)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classifier_separable() {
        let x = array![
            [0.0, 0.0],
            [0.0, 1.0],
            [1.0, 0.0],
            [1.0, 1.0],
        ];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new_classifier();
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.predict(&x).unwrap(), y);
        assert_eq!(tree.get_depth(), 2);
    }

    #[test]
    fn test_entropy_and_log_loss_agree() {
        let x = array![[1.0, 5.0], [2.0, 4.0], [3.0, 3.0], [4.0, 2.0], [5.0, 1.0], [6.0, 0.0]];
        let y = array![0.0, 0.0, 1.0, 0.0, 1.0, 1.0];

        let mut entropy = DecisionTree::new_classifier().with_criterion(Criterion::Entropy);
        let mut log_loss = DecisionTree::new_classifier().with_criterion(Criterion::LogLoss);
        entropy.fit(&x, &y).unwrap();
        log_loss.fit(&x, &y).unwrap();

        assert_eq!(entropy.predict(&x).unwrap(), log_loss.predict(&x).unwrap());
    }

    #[test]
    fn test_regressor_simple() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0];

        let mut tree = DecisionTree::new_regressor();
        tree.fit(&x, &y).unwrap();

        let predictions = tree.predict(&x).unwrap();
        let mse: f64 = predictions.iter().zip(y.iter())
            .map(|(p, a)| (p - a).powi(2))
            .sum::<f64>() / y.len() as f64;

        assert!(mse < 1e-12, "MSE too high: {}", mse);
    }

    #[test]
    fn test_max_depth() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let y = array![0.0, 1.0, 0.0, 1.0];

        let mut tree = DecisionTree::new_classifier().with_max_depth(2);
        tree.fit(&x, &y).unwrap();

        assert!(tree.get_depth() <= 3);
    }

    #[test]
    fn test_feature_importances() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new_classifier();
        tree.fit(&x, &y).unwrap();

        let importances = tree.feature_importances().unwrap();
        assert_eq!(importances[0], 1.0);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_preserves_original_labels() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![-1.0, -1.0, 1.0, 1.0];

        let mut tree = DecisionTree::new_classifier();
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.predict(&x).unwrap(), y);
        assert_eq!(tree.classes(), &[-1.0, 1.0]);
    }

    #[test]
    fn test_errors() {
        let tree = DecisionTree::new_classifier();
        assert!(matches!(tree.predict(&array![[1.0]]), Err(PipelineError::ModelNotFitted)));

        let mut tree = DecisionTree::new_classifier();
        assert!(tree.fit(&array![[1.0], [2.0]], &array![1.0]).is_err());
        assert!(tree.fit(&array![[f64::NAN], [2.0]], &array![0.0, 1.0]).is_err());
    }
}
