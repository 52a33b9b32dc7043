use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Number of trees in a fitted forest.
const TREE_COUNT: usize = 100;

/// Upper bound on the number of rows each tree is grown from.
const MAX_SUBSAMPLE: usize = 256;

/// Attempts at finding a feature that still varies inside a node before
/// the node is closed as a leaf.
const SPLIT_ATTEMPTS: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Tree {
    root: Node,
}

impl Tree {
    fn grow(data: &Array2<f64>, rows: Vec<usize>, depth_limit: usize, rng: &mut StdRng) -> Self {
        Self {
            root: grow_node(data, rows, 0, depth_limit, rng),
        }
    }

    fn path_length(&self, features: &ArrayView1<f64>) -> f64 {
        let mut node = &self.root;
        let mut depth = 0.0;
        loop {
            match node {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if features[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                    depth += 1.0;
                }
            }
        }
    }
}

fn grow_node(
    data: &Array2<f64>,
    rows: Vec<usize>,
    depth: usize,
    depth_limit: usize,
    rng: &mut StdRng,
) -> Node {
    if depth >= depth_limit || rows.len() <= 1 {
        return Node::Leaf { size: rows.len() };
    }

    let mut split = None;
    for _ in 0..SPLIT_ATTEMPTS {
        let feature = rng.gen_range(0..data.ncols());
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &row in &rows {
            let v = data[[row, feature]];
            lo = lo.min(v);
            hi = hi.max(v);
        }
        if hi > lo {
            split = Some((feature, lo, hi));
            break;
        }
    }

    // All sampled features were constant across the rows.
    let Some((feature, lo, hi)) = split else {
        return Node::Leaf { size: rows.len() };
    };

    let threshold = rng.gen_range(lo..hi);
    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
        .into_iter()
        .partition(|&row| data[[row, feature]] <= threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(grow_node(data, left_rows, depth + 1, depth_limit, rng)),
        right: Box::new(grow_node(data, right_rows, depth + 1, depth_limit, rng)),
    }
}

/// Expected path length of an unsuccessful search in a binary search tree
/// over `n` points. Small sizes use the exact harmonic values.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + statrs::consts::EULER_MASCHERONI) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Isolation forest over row-major feature matrices.
///
/// Scores follow the usual normalization: anomalies isolate in few splits,
/// so their expected path length is short and their decision value falls
/// below zero, while points inside the training mass land slightly above.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    trees: Vec<Tree>,
    subsample: usize,
    n_features: usize,
}

impl IsolationForest {
    /// Fit a forest on `data` (one row per sample). The `seed` fixes the
    /// subsampling and split choices so repeated fits are identical.
    pub fn fit(data: &Array2<f64>, seed: u64) -> Self {
        let n_samples = data.nrows();
        let subsample = n_samples.min(MAX_SUBSAMPLE);
        let depth_limit = (subsample.max(2) as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(seed);

        let trees = (0..TREE_COUNT)
            .map(|_| {
                let rows = rand::seq::index::sample(&mut rng, n_samples, subsample).into_vec();
                Tree::grow(data, rows, depth_limit, &mut rng)
            })
            .collect();

        Self {
            trees,
            subsample,
            n_features: data.ncols(),
        }
    }

    /// Signed anomaly score in `[-0.5, 0.5)`. Values below zero indicate
    /// isolation well ahead of the training mass.
    pub fn decision_function(&self, features: &ArrayView1<f64>) -> f64 {
        let total: f64 = self
            .trees
            .iter()
            .map(|tree| tree.path_length(features))
            .sum();
        let mean_path = total / self.trees.len() as f64;

        let denom = average_path_length(self.subsample);
        let exponent = if denom > 0.0 { -(mean_path / denom) } else { 0.0 };
        0.5 - exponent.exp2()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    fn cluster_with_outlier() -> (Array2<f64>, Array1<f64>, Array1<f64>) {
        let mut rng = StdRng::seed_from_u64(9);
        let n = 64;
        let d = 8;
        let mut data = Array2::zeros((n, d));
        for i in 0..n {
            for j in 0..d {
                data[[i, j]] = 10.0 * (j as f64) + rng.gen_range(-1.0..1.0);
            }
        }
        let center = Array1::from_iter((0..d).map(|j| 10.0 * j as f64));
        let outlier = Array1::from_elem(d, 500.0);
        (data, center, outlier)
    }

    #[test]
    fn outlier_scores_below_cluster_center() {
        let (data, center, outlier) = cluster_with_outlier();
        let forest = IsolationForest::fit(&data, 42);

        let inside = forest.decision_function(&center.view());
        let outside = forest.decision_function(&outlier.view());
        assert!(
            outside < inside,
            "outlier {} should score below center {}",
            outside,
            inside
        );
        assert!(outside < 0.0, "far outlier should be negative, got {}", outside);
    }

    #[test]
    fn decision_stays_in_range() {
        let (data, center, outlier) = cluster_with_outlier();
        let forest = IsolationForest::fit(&data, 42);

        for probe in [center, outlier] {
            let score = forest.decision_function(&probe.view());
            assert!(score > -0.5 && score <= 0.5, "score {} out of range", score);
        }
    }

    #[test]
    fn fit_is_deterministic_for_a_seed() {
        let (data, center, _) = cluster_with_outlier();
        let a = IsolationForest::fit(&data, 42).decision_function(&center.view());
        let b = IsolationForest::fit(&data, 42).decision_function(&center.view());
        assert_eq!(a, b);
    }

    #[test]
    fn constant_data_collapses_to_leaves() {
        let data = Array2::from_elem((16, 4), 3.0);
        let forest = IsolationForest::fit(&data, 42);
        let probe = Array1::from_elem(4, 3.0);

        // Every tree degenerates to a single leaf, so the expected path
        // length equals the normalizer and the score sits at exactly zero.
        let score = forest.decision_function(&probe.view());
        assert!(score.abs() < 1e-9, "got {}", score);
    }

    #[test]
    fn average_path_length_matches_known_values() {
        assert_eq!(average_path_length(0), 0.0);
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        // c(n) grows like 2 ln(n), so c(256) sits near 10.2.
        let c256 = average_path_length(256);
        assert!((c256 - 10.24).abs() < 0.1, "got {}", c256);
    }

    #[test]
    fn single_sample_forest_is_well_defined() {
        let data = Array2::from_elem((1, 3), 1.0);
        let forest = IsolationForest::fit(&data, 42);
        let probe = Array1::from_elem(3, 1.0);
        let score = forest.decision_function(&probe.view());
        assert!(score.is_finite());
    }
}
