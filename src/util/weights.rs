use rand::Rng;

/// Cumulative weights for drawing an index with probability proportional to its weight.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CumulativeWeights {
    cumulative: Vec<f64>,
    total: f64,
}

impl CumulativeWeights {
    /// Build from non-negative weights. Returns None if there is nothing to sample from:
    /// no weights, a negative or non-finite weight, or a zero total.
    pub fn new<I>(weights: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut cumulative = vec![];
        let mut total = 0.0;
        for w in weights {
            if !w.is_finite() || w < 0.0 {
                return None;
            }
            total += w;
            cumulative.push(total);
        }
        if cumulative.is_empty() || total <= 0.0 || !total.is_finite() {
            None
        } else {
            Some(Self { cumulative, total })
        }
    }

    /// Uniform weights over n entries.
    pub fn uniform(n: usize) -> Option<Self> {
        Self::new((0..n).map(|_| 1.0))
    }

    /// Draw an index.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let p = rng.gen_range(0. ..self.total);
        // Entry i covers [c_{i-1}, c_i), zero weight entries cover nothing.
        let indx = self.cumulative.partition_point(|c| *c <= p);
        indx.min(self.cumulative.len() - 1)
    }

    /// Probability of drawing index i.
    pub fn probability(&self, i: usize) -> f64 {
        let lower = if i == 0 { 0.0 } else { self.cumulative[i - 1] };
        (self.cumulative[i] - lower) / self.total
    }

    /// Sum of all weights.
    pub fn total(&self) -> f64 {
        self.total
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.cumulative.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.cumulative.is_empty()
    }
}

#[cfg(test)]
mod weight_tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn rejects_degenerate_weights() {
        assert!(CumulativeWeights::new(vec![]).is_none());
        assert!(CumulativeWeights::new(vec![0.0, 0.0]).is_none());
        assert!(CumulativeWeights::new(vec![1.0, -1.0]).is_none());
        assert!(CumulativeWeights::new(vec![1.0, f64::NAN]).is_none());
    }

    #[test]
    fn zero_weight_entries_never_drawn() {
        let w = CumulativeWeights::new(vec![0.0, 2.0, 0.0, 1.0]).unwrap();
        let mut rng = SmallRng::seed_from_u64(1234);
        let mut counts = [0usize; 4];
        for _ in 0..30000 {
            counts[w.sample(&mut rng)] += 1;
        }
        assert_eq!(counts[0], 0);
        assert_eq!(counts[2], 0);
        let frac = counts[1] as f64 / 30000.0;
        assert!((frac - 2.0 / 3.0).abs() < 0.02, "{:?}", counts);
    }

    #[test]
    fn probabilities_sum_to_one() {
        let w = CumulativeWeights::new(vec![0.5, 1.5, 2.0]).unwrap();
        let total: f64 = (0..w.len()).map(|i| w.probability(i)).sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!((w.probability(2) - 0.5).abs() < 1e-12);
    }
}
