//! CART regression tree.
//!
//! Splits maximize the reduction in squared error. At every node a random
//! subset of `max_features` features is considered; candidate thresholds are
//! midpoints between consecutive distinct values. Nodes are stored in a flat
//! arena, children addressed by index.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::features::N_FEATURES;

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    /// Grow a tree on the rows selected by `sample` (indices may repeat).
    pub fn fit(
        rows: &[[f64; N_FEATURES]],
        targets: &[f64],
        sample: &[usize],
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(rows, targets, sample.to_vec(), 0, params, rng);
        tree
    }

    pub fn predict(&self, row: &[f64; N_FEATURES]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => idx = if row[*feature] <= *threshold { *left } else { *right },
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf(_) => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf(_))).count()
    }

    fn grow(
        &mut self,
        rows: &[[f64; N_FEATURES]],
        targets: &[f64],
        sample: Vec<usize>,
        depth: usize,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> usize {
        let idx = self.nodes.len();
        let mean = sample.iter().map(|&i| targets[i]).sum::<f64>() / sample.len() as f64;
        self.nodes.push(Node::Leaf(mean));

        if depth >= params.max_depth || sample.len() < params.min_samples_split {
            return idx;
        }
        let Some(split) = best_split(rows, targets, &sample, params, rng) else {
            return idx;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = sample
            .iter()
            .partition(|&&i| rows[i][split.feature] <= split.threshold);
        let left = self.grow(rows, targets, left, depth + 1, params, rng);
        let right = self.grow(rows, targets, right, depth + 1, params, rng);
        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        idx
    }
}

fn best_split(
    rows: &[[f64; N_FEATURES]],
    targets: &[f64],
    sample: &[usize],
    params: &TreeParams,
    rng: &mut StdRng,
) -> Option<Split> {
    let n = sample.len();
    let total: f64 = sample.iter().map(|&i| targets[i]).sum();
    let total_sq: f64 = sample.iter().map(|&i| targets[i] * targets[i]).sum();
    let parent_sse = total_sq - total * total / n as f64;
    if parent_sse <= f64::EPSILON * total_sq.max(1.0) {
        return None;
    }

    let mut features: Vec<usize> = (0..N_FEATURES).collect();
    features.shuffle(rng);
    features.truncate(params.max_features.clamp(1, N_FEATURES));

    let mut best: Option<Split> = None;
    let mut order = sample.to_vec();
    for &feature in &features {
        order.sort_by(|&a, &b| rows[a][feature].total_cmp(&rows[b][feature]));

        let (mut left_sum, mut left_sq) = (0.0, 0.0);
        for k in 0..n - 1 {
            let y = targets[order[k]];
            left_sum += y;
            left_sq += y * y;

            let n_left = k + 1;
            let n_right = n - n_left;
            if n_left < params.min_samples_leaf || n_right < params.min_samples_leaf {
                continue;
            }
            let (here, next) = (rows[order[k]][feature], rows[order[k + 1]][feature]);
            if here >= next {
                continue;
            }

            let right_sum = total - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / n_left as f64)
                + (right_sq - right_sum * right_sum / n_right as f64);
            let gain = parent_sse - sse;
            if gain > best.as_ref().map_or(0.0, |b| b.gain) {
                best = Some(Split {
                    feature,
                    threshold: (here + next) / 2.0,
                    gain,
                });
            }
        }
    }
    best
}
