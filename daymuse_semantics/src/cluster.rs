// Topic clustering over a day's embedding batch.
//
// Plain Lloyd's k-means with a fixed seed and multiple restarts: the labels
// feed interpretable statistics (dominance, entropy), not a search index, so
// exact cluster quality matters less than reproducibility. The same batch
// must always produce the same labels.
//
// When the batch is smaller than the requested cluster count, k is silently
// reduced to the batch size rather than erroring.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::embedding::Embedding;

/// Fixed seed for clustering initialization. Changing this changes every
/// day's topic statistics, so it is part of the contract.
const KMEANS_SEED: u64 = 42;

/// Number of random restarts; the labeling with the lowest inertia wins.
const KMEANS_RESTARTS: usize = 10;

/// Iteration cap per restart. Lloyd's converges long before this on
/// batches of a few dozen articles.
const KMEANS_MAX_ITER: usize = 100;

/// Partition a batch into `min(k, batch len)` clusters. Returns one label
/// per input vector, in input order. Deterministic for a given batch.
pub fn cluster_topics(batch: &[Embedding], k: usize) -> Vec<usize> {
    let n = batch.len();
    let k = k.min(n).max(1);
    if n == 0 {
        return Vec::new();
    }
    if k == 1 {
        return vec![0; n];
    }

    let mut rng = StdRng::seed_from_u64(KMEANS_SEED);
    let mut best_labels = vec![0; n];
    let mut best_inertia = f64::INFINITY;

    for _ in 0..KMEANS_RESTARTS {
        let (labels, inertia) = lloyd(batch, k, &mut rng);
        if inertia < best_inertia {
            best_inertia = inertia;
            best_labels = labels;
        }
    }

    best_labels
}

/// One k-means run: random distinct starting points, then assign/update
/// until labels stabilize. Returns (labels, inertia).
fn lloyd(batch: &[Embedding], k: usize, rng: &mut impl Rng) -> (Vec<usize>, f64) {
    let n = batch.len();
    let dim = batch[0].len();

    // Partial Fisher-Yates: pick k distinct indices as initial centroids.
    let mut indices: Vec<usize> = (0..n).collect();
    for i in 0..k {
        let j = rng.random_range(i..n);
        indices.swap(i, j);
    }
    let mut centroids: Vec<Vec<f64>> = indices[..k]
        .iter()
        .map(|&i| batch[i].iter().map(|&x| x as f64).collect())
        .collect();

    let mut labels = vec![0usize; n];
    for _ in 0..KMEANS_MAX_ITER {
        // Assignment step.
        let mut changed = false;
        for (i, vector) in batch.iter().enumerate() {
            let nearest = nearest_centroid(vector, &centroids);
            if labels[i] != nearest {
                labels[i] = nearest;
                changed = true;
            }
        }

        // Update step. An emptied cluster keeps its previous centroid.
        let mut sums = vec![vec![0.0f64; dim]; k];
        let mut counts = vec![0usize; k];
        for (vector, &label) in batch.iter().zip(&labels) {
            counts[label] += 1;
            for (acc, &x) in sums[label].iter_mut().zip(vector) {
                *acc += x as f64;
            }
        }
        for (cluster, (sum, &count)) in sums.iter().zip(&counts).enumerate() {
            if count > 0 {
                for (c, s) in centroids[cluster].iter_mut().zip(sum) {
                    *c = s / count as f64;
                }
            }
        }

        if !changed {
            break;
        }
    }

    let inertia = batch
        .iter()
        .zip(&labels)
        .map(|(vector, &label)| squared_distance(vector, &centroids[label]))
        .sum();

    (labels, inertia)
}

fn nearest_centroid(vector: &[f32], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, centroid) in centroids.iter().enumerate() {
        let dist = squared_distance(vector, centroid);
        if dist < best_dist {
            best_dist = dist;
            best = i;
        }
    }
    best
}

fn squared_distance(vector: &[f32], centroid: &[f64]) -> f64 {
    vector
        .iter()
        .zip(centroid)
        .map(|(&x, &c)| {
            let d = x as f64 - c;
            d * d
        })
        .sum()
}

/// Cluster-size counts indexed by label, length `max(labels) + 1`.
pub fn cluster_counts(labels: &[usize]) -> Vec<usize> {
    let len = labels.iter().max().map_or(0, |&m| m + 1);
    let mut counts = vec![0usize; len];
    for &label in labels {
        counts[label] += 1;
    }
    counts
}

/// Shannon entropy of the cluster-size distribution, normalized by ln of the
/// count-vector length so it lies in [0, 1]. Defined as 0 when only one
/// cluster slot exists: a single topic has no spread.
pub fn normalized_entropy(counts: &[usize]) -> f64 {
    if counts.len() <= 1 {
        return 0.0;
    }
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let entropy: f64 = counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total as f64;
            -p * (p + 1e-9).ln()
        })
        .sum();
    (entropy / (counts.len() as f64).ln()).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> Vec<Embedding> {
        vec![
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![0.0, 0.1],
            vec![10.0, 10.0],
            vec![10.1, 10.0],
            vec![10.0, 10.1],
        ]
    }

    #[test]
    fn separates_well_separated_blobs() {
        let labels = cluster_topics(&two_blobs(), 2);
        assert_eq!(labels.len(), 6);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[0], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[3], labels[5]);
        assert_ne!(labels[0], labels[3]);
    }

    #[test]
    fn deterministic_across_runs() {
        let batch = two_blobs();
        assert_eq!(cluster_topics(&batch, 3), cluster_topics(&batch, 3));
    }

    #[test]
    fn k_reduced_to_batch_size() {
        let batch = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let labels = cluster_topics(&batch, 5);
        assert_eq!(labels.len(), 2);
        assert!(labels.iter().all(|&l| l < 2));
    }

    #[test]
    fn single_item_batch_is_one_cluster() {
        let labels = cluster_topics(&[vec![1.0, 2.0]], 4);
        assert_eq!(labels, vec![0]);
    }

    #[test]
    fn entropy_zero_for_single_cluster() {
        assert_eq!(normalized_entropy(&[7]), 0.0);
    }

    #[test]
    fn entropy_near_one_for_uniform_clusters() {
        let entropy = normalized_entropy(&[5, 5, 5, 5]);
        assert!(entropy > 0.99 && entropy <= 1.0, "entropy = {entropy}");
    }

    #[test]
    fn entropy_in_unit_range_for_skewed_clusters() {
        let entropy = normalized_entropy(&[97, 1, 1, 1]);
        assert!((0.0..=1.0).contains(&entropy));
        assert!(entropy < 0.3, "skewed distribution should be low: {entropy}");
    }

    #[test]
    fn counts_indexed_by_label() {
        assert_eq!(cluster_counts(&[0, 1, 1, 3]), vec![1, 2, 0, 1]);
        assert_eq!(cluster_counts(&[]), Vec::<usize>::new());
    }
}
