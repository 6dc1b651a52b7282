//! Single regression tree.
//!
//! Trees are grown greedily: at each node we pick the `(feature, threshold)`
//! pair that minimizes the summed squared error of the two children, using
//! prefix sums over the per-feature sorted targets so each candidate split is
//! O(1) to evaluate. Growth stops on depth, node size, or when no split
//! improves on the parent SSE.

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Number of features considered per split; `None` considers all.
    pub max_features: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    root: Node,
}

impl RegressionTree {
    /// Grow a tree over the rows selected by `indices` (bootstrap sample;
    /// duplicates allowed).
    ///
    /// The RNG is only consumed for per-split feature subsampling, in
    /// depth-first order, so a fixed seed grows a fixed tree.
    pub fn fit(
        rows: &[Vec<f64>],
        targets: &[f64],
        indices: &[usize],
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let root = grow(rows, targets, indices, params, rng, 0);
        Self { root }
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }
}

fn grow(
    rows: &[Vec<f64>],
    targets: &[f64],
    indices: &[usize],
    params: &TreeParams,
    rng: &mut StdRng,
    depth: usize,
) -> Node {
    let node_mean = mean_of(targets, indices);

    if indices.len() < params.min_samples_split.max(2) {
        return Node::Leaf { value: node_mean };
    }
    if let Some(max_depth) = params.max_depth {
        if depth >= max_depth {
            return Node::Leaf { value: node_mean };
        }
    }

    let parent_sse = sse_of(targets, indices, node_mean);
    if parent_sse <= f64::EPSILON {
        return Node::Leaf { value: node_mean };
    }

    let n_features = rows[indices[0]].len();
    let candidates = candidate_features(n_features, params.max_features, rng);

    let Some(split) = best_split(rows, targets, indices, &candidates, params.min_samples_leaf)
    else {
        return Node::Leaf { value: node_mean };
    };

    // Reject splits that don't actually reduce the node SSE.
    if split.sse >= parent_sse - 1e-12 {
        return Node::Leaf { value: node_mean };
    }

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .copied()
        .partition(|&i| rows[i][split.feature] <= split.threshold);

    if left_idx.is_empty() || right_idx.is_empty() {
        return Node::Leaf { value: node_mean };
    }

    let left = grow(rows, targets, &left_idx, params, rng, depth + 1);
    let right = grow(rows, targets, &right_idx, params, rng, depth + 1);

    Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left: Box::new(left),
        right: Box::new(right),
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    sse: f64,
}

/// Pick the feature indices considered at one split.
fn candidate_features(n_features: usize, max_features: Option<usize>, rng: &mut StdRng) -> Vec<usize> {
    match max_features {
        Some(m) if m < n_features => {
            let mut picked: Vec<usize> = rand::seq::index::sample(rng, n_features, m.max(1)).into_vec();
            // Sorted so the winning split is independent of sample order on ties.
            picked.sort_unstable();
            picked
        }
        _ => (0..n_features).collect(),
    }
}

fn best_split(
    rows: &[Vec<f64>],
    targets: &[f64],
    indices: &[usize],
    features: &[usize],
    min_samples_leaf: usize,
) -> Option<SplitCandidate> {
    let min_leaf = min_samples_leaf.max(1);
    let n = indices.len();
    if n < 2 * min_leaf {
        return None;
    }
    let mut best: Option<SplitCandidate> = None;

    let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(n);
    for &feature in features {
        pairs.clear();
        pairs.extend(indices.iter().map(|&i| (rows[i][feature], targets[i])));
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        // Prefix sums of targets and squared targets over the sorted order.
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        let mut prefix: Vec<(f64, f64)> = Vec::with_capacity(n + 1);
        prefix.push((0.0, 0.0));
        for &(_, t) in &pairs {
            sum += t;
            sum_sq += t * t;
            prefix.push((sum, sum_sq));
        }
        let (total_sum, total_sq) = prefix[n];

        for k in min_leaf..=(n - min_leaf) {
            // No usable threshold between equal values.
            if pairs[k - 1].0 >= pairs[k].0 {
                continue;
            }
            let (left_sum, left_sq) = prefix[k];
            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;

            let left_sse = left_sq - left_sum * left_sum / k as f64;
            let right_sse = right_sq - right_sum * right_sum / (n - k) as f64;
            let sse = left_sse + right_sse;

            if !sse.is_finite() {
                continue;
            }
            let better = match &best {
                Some(b) => sse < b.sse,
                None => true,
            };
            if better {
                best = Some(SplitCandidate {
                    feature,
                    threshold: 0.5 * (pairs[k - 1].0 + pairs[k].0),
                    sse,
                });
            }
        }
    }

    best
}

fn mean_of(targets: &[f64], indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    indices.iter().map(|&i| targets[i]).sum::<f64>() / indices.len() as f64
}

fn sse_of(targets: &[f64], indices: &[usize], mean: f64) -> f64 {
    indices
        .iter()
        .map(|&i| {
            let d = targets[i] - mean;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn params() -> TreeParams {
        TreeParams {
            max_depth: Some(8),
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }

    #[test]
    fn constant_target_yields_single_leaf() {
        let rows = vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0]];
        let targets = vec![5.0; 4];
        let indices: Vec<usize> = (0..4).collect();
        let mut rng = StdRng::seed_from_u64(1);

        let tree = RegressionTree::fit(&rows, &targets, &indices, &params(), &mut rng);
        assert!(matches!(&tree.root, Node::Leaf { value } if (value - 5.0).abs() < 1e-12));
        assert!((tree.predict_row(&[9.9]) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn step_function_is_recovered_exactly() {
        // y = 1 for x < 0.5, y = 2 for x >= 0.5
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64 / 10.0]).collect();
        let targets: Vec<f64> = rows
            .iter()
            .map(|r| if r[0] < 0.5 { 1.0 } else { 2.0 })
            .collect();
        let indices: Vec<usize> = (0..rows.len()).collect();
        let mut rng = StdRng::seed_from_u64(1);

        let tree = RegressionTree::fit(&rows, &targets, &indices, &params(), &mut rng);
        assert!((tree.predict_row(&[0.0]) - 1.0).abs() < 1e-12);
        assert!((tree.predict_row(&[0.49]) - 1.0).abs() < 1e-12);
        assert!((tree.predict_row(&[0.51]) - 2.0).abs() < 1e-12);
        assert!((tree.predict_row(&[1.0]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn min_samples_leaf_is_respected() {
        let rows: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64]).collect();
        let targets = vec![0.0, 0.0, 0.0, 10.0, 10.0, 10.0];
        let indices: Vec<usize> = (0..6).collect();
        let tree_params = TreeParams {
            min_samples_leaf: 3,
            ..params()
        };
        let mut rng = StdRng::seed_from_u64(1);

        let tree = RegressionTree::fit(&rows, &targets, &indices, &tree_params, &mut rng);
        // The only admissible split is the 3/3 boundary.
        assert!((tree.predict_row(&[0.0]) - 0.0).abs() < 1e-12);
        assert!((tree.predict_row(&[5.0]) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn same_seed_grows_identical_trees() {
        let rows: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![i as f64, (i * 7 % 13) as f64])
            .collect();
        let targets: Vec<f64> = rows.iter().map(|r| r[0] * 2.0 + r[1]).collect();
        let indices: Vec<usize> = (0..rows.len()).collect();
        let tree_params = TreeParams {
            max_features: Some(1),
            ..params()
        };

        let mut rng_a = StdRng::seed_from_u64(7);
        let mut rng_b = StdRng::seed_from_u64(7);
        let a = RegressionTree::fit(&rows, &targets, &indices, &tree_params, &mut rng_a);
        let b = RegressionTree::fit(&rows, &targets, &indices, &tree_params, &mut rng_b);
        assert_eq!(a, b);
    }
}
