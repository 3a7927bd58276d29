use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::regression::{FEATURE_COUNT, Sample};

#[derive(Debug, Clone)]
pub struct EnsembleConfig {
    pub trees: usize,
    pub max_depth: usize,
    pub min_leaf: usize,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            trees: 60,
            max_depth: 6,
            min_leaf: 3,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
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

impl Node {
    fn predict(&self, x: &[f64; FEATURE_COUNT]) -> f64 {
        match self {
            Node::Leaf { value } => *value,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if x[*feature] <= *threshold {
                    left.predict(x)
                } else {
                    right.predict(x)
                }
            }
        }
    }
}

/// Bootstrap-aggregated regression trees with SSE-reduction feature
/// importances normalized to sum 1.
#[derive(Debug, Clone)]
pub struct BaggedForest {
    trees: Vec<Node>,
    pub importances: [f64; FEATURE_COUNT],
}

impl BaggedForest {
    pub fn predict(&self, x: &[f64; FEATURE_COUNT]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict(x)).sum();
        sum / self.trees.len() as f64
    }
}

/// Fits the forest. Each tree derives its own RNG from the seed and its
/// index, so the result is bit-identical whatever order rayon runs the trees
/// in.
pub fn fit_bagged(samples: &[Sample], config: &EnsembleConfig, seed: u64) -> BaggedForest {
    if samples.is_empty() || config.trees == 0 {
        return BaggedForest {
            trees: Vec::new(),
            importances: [1.0 / FEATURE_COUNT as f64; FEATURE_COUNT],
        };
    }

    let fitted: Vec<(Node, [f64; FEATURE_COUNT])> = (0..config.trees)
        .into_par_iter()
        .map(|index| {
            let mut rng = ChaCha8Rng::seed_from_u64(mix_seed(seed, index as u64));
            let bootstrap: Vec<Sample> = (0..samples.len())
                .map(|_| samples[rng.gen_range(0..samples.len())])
                .collect();
            let indices: Vec<usize> = (0..bootstrap.len()).collect();
            let mut gains = [0.0_f64; FEATURE_COUNT];
            let tree = grow(&bootstrap, indices, 0, config, &mut gains);
            (tree, gains)
        })
        .collect();

    let mut trees = Vec::with_capacity(fitted.len());
    let mut totals = [0.0_f64; FEATURE_COUNT];
    for (tree, gains) in fitted {
        trees.push(tree);
        for (total, gain) in totals.iter_mut().zip(gains) {
            *total += gain;
        }
    }

    let sum: f64 = totals.iter().sum();
    let importances = if sum > 0.0 {
        let mut out = totals;
        for v in &mut out {
            *v /= sum;
        }
        out
    } else {
        [1.0 / FEATURE_COUNT as f64; FEATURE_COUNT]
    };

    BaggedForest { trees, importances }
}

/// splitmix64-style mixer keeping per-tree streams independent of each other
/// and of the split shuffle.
fn mix_seed(seed: u64, index: u64) -> u64 {
    let mut z = seed ^ index.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn grow(
    data: &[Sample],
    indices: Vec<usize>,
    depth: usize,
    config: &EnsembleConfig,
    gains: &mut [f64; FEATURE_COUNT],
) -> Node {
    let n = indices.len();
    let mean: f64 = indices.iter().map(|&i| data[i].y).sum::<f64>() / n as f64;
    let sse: f64 = indices
        .iter()
        .map(|&i| (data[i].y - mean) * (data[i].y - mean))
        .sum();

    if depth >= config.max_depth || n < config.min_leaf * 2 || sse <= 1e-12 {
        return Node::Leaf { value: mean };
    }

    let Some((feature, threshold, gain)) = best_split(data, &indices, config.min_leaf, sse) else {
        return Node::Leaf { value: mean };
    };
    gains[feature] += gain;

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
        .into_iter()
        .partition(|&i| data[i].x[feature] <= threshold);
    let left = grow(data, left_idx, depth + 1, config, gains);
    let right = grow(data, right_idx, depth + 1, config, gains);
    Node::Split {
        feature,
        threshold,
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// Scans every feature for the split with the largest SSE reduction, using a
/// prefix-sum sweep over the sorted node sample. Only positions between
/// distinct feature values are candidates.
fn best_split(
    data: &[Sample],
    indices: &[usize],
    min_leaf: usize,
    node_sse: f64,
) -> Option<(usize, f64, f64)> {
    let n = indices.len();
    let mut best: Option<(usize, f64, f64)> = None;

    for feature in 0..FEATURE_COUNT {
        let mut order = indices.to_vec();
        order.sort_by(|&a, &b| {
            data[a].x[feature]
                .total_cmp(&data[b].x[feature])
                .then(a.cmp(&b))
        });

        let total_sum: f64 = order.iter().map(|&i| data[i].y).sum();
        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        let total_sq: f64 = order.iter().map(|&i| data[i].y * data[i].y).sum();

        for pos in 1..n {
            let prev = order[pos - 1];
            left_sum += data[prev].y;
            left_sq += data[prev].y * data[prev].y;

            if pos < min_leaf || n - pos < min_leaf {
                continue;
            }
            let lo = data[prev].x[feature];
            let hi = data[order[pos]].x[feature];
            if lo == hi {
                continue;
            }

            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let left_sse = left_sq - left_sum * left_sum / pos as f64;
            let right_sse = right_sq - right_sum * right_sum / (n - pos) as f64;
            let gain = node_sse - left_sse - right_sse;
            if gain > best.map_or(1e-12, |(_, _, g)| g + 1e-12) {
                best = Some((feature, (lo + hi) / 2.0, gain));
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_samples() -> Vec<Sample> {
        // Target is a step in feature 1; features 0, 2, 3 are noise-free
        // constants, so all importance should land on feature 1.
        let mut samples = Vec::new();
        for i in 0..40 {
            let x1 = i as f64;
            let y = if x1 < 20.0 { 5.0 } else { 15.0 };
            samples.push(Sample {
                x: [1.0, x1, 0.0, 1.0],
                y,
            });
        }
        samples
    }

    #[test]
    fn forest_learns_a_step_function() {
        let forest = fit_bagged(&step_samples(), &EnsembleConfig::default(), 11);
        let low = forest.predict(&[1.0, 3.0, 0.0, 1.0]);
        let high = forest.predict(&[1.0, 36.0, 0.0, 1.0]);
        assert!(low < 8.0, "low side predicted {low}");
        assert!(high > 12.0, "high side predicted {high}");
    }

    #[test]
    fn importances_sum_to_one_and_follow_the_signal() {
        let forest = fit_bagged(&step_samples(), &EnsembleConfig::default(), 11);
        let sum: f64 = forest.importances.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(forest.importances[1] > 0.99);
    }

    #[test]
    fn fit_is_deterministic_for_a_seed() {
        let a = fit_bagged(&step_samples(), &EnsembleConfig::default(), 42);
        let b = fit_bagged(&step_samples(), &EnsembleConfig::default(), 42);
        let x = [1.0, 17.0, 0.0, 1.0];
        assert_eq!(a.predict(&x).to_bits(), b.predict(&x).to_bits());
        for (ia, ib) in a.importances.iter().zip(b.importances) {
            assert_eq!(ia.to_bits(), ib.to_bits());
        }
    }

    #[test]
    fn constant_target_collapses_to_a_leaf() {
        let samples: Vec<Sample> = (0..20)
            .map(|i| Sample {
                x: [i as f64, 2.0, 0.0, 1.0],
                y: 7.5,
            })
            .collect();
        let forest = fit_bagged(&samples, &EnsembleConfig::default(), 5);
        let pred = forest.predict(&[3.0, 2.0, 0.0, 1.0]);
        assert!((pred - 7.5).abs() < 1e-9);
        let sum: f64 = forest.importances.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }
}
