//! One-pass uniform sampling.

use rand::Rng;

/// Indices of a uniform sample of `k` out of `n` items (reservoir sampling).
///
/// The first `k` indices fill the reservoir; every later index `i` replaces a
/// random slot with probability `k / (i + 1)`. When `n <= k` every index is
/// returned in order.
pub fn reservoir_indices<R: Rng + ?Sized>(n: usize, k: usize, rng: &mut R) -> Vec<usize> {
    let mut reservoir: Vec<usize> = (0..n.min(k)).collect();
    for i in k..n {
        let j = rng.gen_range(0..=i);
        if j < k {
            reservoir[j] = i;
        }
    }
    reservoir
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng as _;
    use rand::rngs::StdRng;

    #[test]
    fn test_sample_size_is_exact() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(reservoir_indices(10_000, 1000, &mut rng).len(), 1000);
        assert_eq!(reservoir_indices(5, 1000, &mut rng), [0, 1, 2, 3, 4]);
        assert!(reservoir_indices(0, 10, &mut rng).is_empty());
    }

    #[test]
    fn test_indices_are_distinct() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut sample = reservoir_indices(500, 100, &mut rng);
        sample.sort_unstable();
        sample.dedup();
        assert_eq!(sample.len(), 100);
        assert!(sample.iter().all(|&i| i < 500));
    }

    #[test]
    fn test_inclusion_probability_is_uniform() {
        // each of 20 items should be picked with probability 5/20
        let (n, k, trials) = (20, 5, 20_000);
        let mut rng = StdRng::seed_from_u64(42);
        let mut hits = vec![0u32; n];
        for _ in 0..trials {
            for i in reservoir_indices(n, k, &mut rng) {
                hits[i] += 1;
            }
        }
        let expected = f64::from(trials) * k as f64 / n as f64;
        for (i, &h) in hits.iter().enumerate() {
            let dev = (f64::from(h) - expected).abs() / expected;
            assert!(dev < 0.05, "item {i} picked {h} times, expected about {expected}");
        }
    }
}
