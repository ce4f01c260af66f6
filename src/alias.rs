//! Vose's alias method: O(1) draws from an arbitrary discrete
//! distribution with one table lookup and one comparison.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AliasTableError {
    #[error("alias table built from an empty weight list")]
    Empty,
    #[error("alias table weights must be nonnegative, finite, and not all zero")]
    DegenerateWeights,
}

#[derive(Clone, Copy, Debug)]
struct Bucket {
    height: f64,
    alias: i32,
}

pub struct AliasTable {
    probs: Vec<f64>,
    buckets: Vec<Bucket>,
}

impl AliasTable {
    pub fn new(weights: &[f64]) -> Result<Self, AliasTableError> {
        if weights.is_empty() {
            return Err(AliasTableError::Empty);
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(AliasTableError::DegenerateWeights);
        }

        // compensated summation; the weight lists here are image-sized
        let mut w_sum = 0.0;
        let mut carry = 0.0;
        for w in weights {
            let y = w - carry;
            let t = w_sum + y;
            carry = (t - w_sum) - y;
            w_sum = t;
        }
        if w_sum <= 0.0 {
            return Err(AliasTableError::DegenerateWeights);
        }

        let n = weights.len();
        let mut probs = vec![0.0; n];
        let mut buckets = vec![
            Bucket {
                height: 0.0,
                alias: -1
            };
            n
        ];
        for i in 0..n {
            probs[i] = weights[i] / w_sum;
            buckets[i].height = probs[i] * n as f64;
        }

        let mut lower: Vec<usize> = Vec::new();
        let mut upper: Vec<usize> = Vec::new();
        for (i, bucket) in buckets.iter().enumerate() {
            if bucket.height < 1.0 {
                lower.push(i);
            } else {
                upper.push(i);
            }
        }

        loop {
            let (lower_index, upper_index) = match (lower.pop(), upper.pop()) {
                (Some(l), Some(u)) => (l, u),
                _ => break,
            };

            debug_assert!(1.0 <= buckets[upper_index].height);

            // the lower bucket keeps its height as the threshold and is done
            let mov = 1.0 - buckets[lower_index].height;
            buckets[upper_index].height -= mov;
            buckets[lower_index].alias = upper_index as i32;

            if buckets[upper_index].height < 1.0 {
                lower.push(upper_index);
            } else {
                upper.push(upper_index);
            }
        }

        Ok(Self { probs, buckets })
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Probability that `sample` returns `i`.
    pub fn probability(&self, i: usize) -> f64 {
        self.probs[i]
    }

    pub fn sample(&self, u0: f64, u1: f64) -> usize {
        let index = ((u0 * self.buckets.len() as f64) as usize).min(self.buckets.len() - 1);
        let bucket = self.buckets[index];
        if bucket.alias < 0 || u1 < bucket.height {
            index
        } else {
            bucket.alias as usize
        }
    }
}
