//! Bagged ensemble of regression trees.
//!
//! Tree i draws its bootstrap sample and its per-node feature subsets from a
//! private RNG seeded with `SeedHierarchy::sub_seed("tree", i)`. Trees are
//! collected in index order, so the forest is the same whether they are
//! grown in parallel or sequentially, for any thread count.

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cache;
use super::features::{FeatureSet, N_FEATURES};
use super::tree::{RegressionTree, TreeParams};
use super::FitError;
use crate::config::ForestSettings;
use crate::indicators::levels::percentile;
use crate::rng::SeedHierarchy;

const TREE_STREAM: &str = "tree";

#[derive(Debug, Clone, PartialEq)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
    /// Out-of-bag mean absolute error of the predicted return.
    oob_mae: f64,
}

/// Forest output for one feature row, expressed as returns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestPrediction {
    pub mean: f64,
    /// 10th percentile of the per-tree predictions.
    pub low: f64,
    /// 90th percentile of the per-tree predictions.
    pub high: f64,
}

impl RandomForest {
    pub fn fit(
        data: &FeatureSet,
        settings: &ForestSettings,
        min_rows: usize,
    ) -> Result<Self, FitError> {
        let n = data.len();
        if n < min_rows.max(2) {
            return Err(FitError::InsufficientRows {
                rows: n,
                min: min_rows.max(2),
            });
        }

        let params = TreeParams {
            max_depth: settings.max_depth,
            min_samples_split: settings.min_samples_split,
            min_samples_leaf: settings.min_samples_leaf,
            max_features: (N_FEATURES / 3).max(1),
        };
        let seeds = SeedHierarchy::new(settings.seed);

        let grow = |i: usize| {
            let mut rng = seeds.rng_for(TREE_STREAM, i as u64);
            let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let mut in_bag = vec![false; n];
            for &s in &sample {
                in_bag[s] = true;
            }
            let tree = RegressionTree::fit(&data.rows, &data.targets, &sample, &params, &mut rng);
            (tree, in_bag)
        };
        // Sequential on a pool worker or inside a cache slot initializer:
        // pool workers may be blocked waiting on the slot being filled.
        let parallel = rayon::current_thread_index().is_none() && !cache::filling_slot();
        let fitted: Vec<(RegressionTree, Vec<bool>)> = if parallel {
            (0..settings.n_trees).into_par_iter().map(grow).collect()
        } else {
            (0..settings.n_trees).map(grow).collect()
        };

        let oob = oob_error(data, &fitted);
        let mut forest = Self {
            trees: fitted.into_iter().map(|(tree, _)| tree).collect(),
            oob_mae: oob,
        };
        if !oob.is_finite() {
            forest.oob_mae = forest.in_sample_mae(data);
        }
        debug!(
            trees = forest.trees.len(),
            rows = n,
            oob_mae = forest.oob_mae,
            "random forest trained"
        );
        Ok(forest)
    }

    pub fn predict(&self, row: &[f64; N_FEATURES]) -> ForestPrediction {
        let mut preds: Vec<f64> = self.trees.iter().map(|t| t.predict(row)).collect();
        let mean = preds.iter().sum::<f64>() / preds.len() as f64;
        preds.sort_by(f64::total_cmp);
        ForestPrediction {
            mean,
            low: percentile(&preds, 10.0),
            high: percentile(&preds, 90.0),
        }
    }

    pub fn oob_mae(&self) -> f64 {
        self.oob_mae
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn in_sample_mae(&self, data: &FeatureSet) -> f64 {
        let total: f64 = data
            .rows
            .iter()
            .zip(&data.targets)
            .map(|(row, y)| (self.predict(row).mean - y).abs())
            .sum();
        total / data.len() as f64
    }
}

/// Mean absolute error over rows that at least one tree left out of its sample.
/// `NaN` when every row was in every bag.
fn oob_error(data: &FeatureSet, fitted: &[(RegressionTree, Vec<bool>)]) -> f64 {
    let (mut total, mut count) = (0.0, 0usize);
    for (i, (row, target)) in data.rows.iter().zip(&data.targets).enumerate() {
        let preds: Vec<f64> = fitted
            .iter()
            .filter(|(_, in_bag)| !in_bag[i])
            .map(|(tree, _)| tree.predict(row))
            .collect();
        if preds.is_empty() {
            continue;
        }
        let mean = preds.iter().sum::<f64>() / preds.len() as f64;
        total += (mean - target).abs();
        count += 1;
    }
    if count == 0 {
        f64::NAN
    } else {
        total / count as f64
    }
}
