//! Bagged forest of classification trees

use super::decision_tree::{Criterion, DecisionTree};
use super::normalize_in_place;
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How many features each split may look at
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    Sqrt,
    Log2,
    Fixed(usize),
    All,
}

impl MaxFeatures {
    /// Resolve against a feature count; never below one
    fn resolve(self, n_features: usize) -> usize {
        let n = n_features as f64;
        let k = match self {
            MaxFeatures::Sqrt => n.sqrt() as usize,
            MaxFeatures::Log2 => n.log2() as usize,
            MaxFeatures::Fixed(k) => k.min(n_features),
            MaxFeatures::All => n_features,
        };
        k.max(1)
    }
}

/// Forest classifier. Each member sees its own bootstrap draw and
/// per-split feature subset; prediction is a plurality vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub criterion: Criterion,
    pub random_state: Option<u64>,
    members: Vec<DecisionTree>,
    importances: Option<Array1<f64>>,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForest {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            criterion: Criterion::Gini,
            random_state: None,
            members: Vec::new(),
            importances: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    #[cfg(test)]
    fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Unfitted member tree carrying the forest's settings
    fn blank_member(&self, per_split: usize, seed: u64) -> DecisionTree {
        let tree = DecisionTree::new_classifier()
            .with_criterion(self.criterion)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_max_features(per_split)
            .with_random_state(seed);
        match self.max_depth {
            Some(depth) => tree.with_max_depth(depth),
            None => tree,
        }
    }

    /// Grow member `index`; its RNG stream depends only on the base seed and index
    fn grow_member(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        base_seed: u64,
        index: usize,
        per_split: usize,
    ) -> Result<DecisionTree> {
        let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(index as u64));
        let n = x.nrows();

        let mut tree = self.blank_member(per_split, rng.gen());
        if self.bootstrap {
            let rows: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let y_draw = y.select(Axis(0), &rows);
            tree.fit(&x.select(Axis(0), &rows), &y_draw)?;
        } else {
            tree.fit(x, y)?;
        }
        Ok(tree)
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        super::check_training_set("random forest", x, y, 1)?;
        if self.n_estimators == 0 {
            return Err(PipelineError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "a forest needs at least one tree".to_string(),
            });
        }

        let per_split = self.max_features.resolve(x.ncols());
        let base_seed = self.random_state.unwrap_or_else(rand::random);

        let members = (0..self.n_estimators)
            .into_par_iter()
            .map(|index| self.grow_member(x, y, base_seed, index, per_split))
            .collect::<Result<Vec<_>>>()?;

        let mut summed = vec![0.0; x.ncols()];
        for imp in members.iter().filter_map(|m| m.feature_importances()) {
            summed.iter_mut().zip(imp.iter()).for_each(|(s, v)| *s += v);
        }
        normalize_in_place(&mut summed);

        self.members = members;
        self.importances = Some(Array1::from_vec(summed));
        Ok(self)
    }

    /// Plurality vote across members; ties go to the lowest label
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.members.is_empty() {
            return Err(PipelineError::ModelNotFitted);
        }

        let ballots = self
            .members
            .par_iter()
            .map(|m| m.predict(x))
            .collect::<Result<Vec<_>>>()?;

        Ok((0..x.nrows())
            .map(|row| plurality(ballots.iter().map(|b| b[row])))
            .collect())
    }

    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.importances.as_ref()
    }

    #[cfg(test)]
    fn n_trees(&self) -> usize {
        self.members.len()
    }
}

fn plurality(votes: impl Iterator<Item = f64>) -> f64 {
    let mut tally: BTreeMap<i64, usize> = BTreeMap::new();
    for v in votes {
        *tally.entry(v.round() as i64).or_default() += 1;
    }
    // BTreeMap iterates in ascending label order, so `>` keeps the lowest on ties
    let mut best: Option<(i64, usize)> = None;
    for (label, count) in tally {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((label, count));
        }
    }
    best.map_or(0.0, |(label, _)| label as f64)
}
