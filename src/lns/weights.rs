use crate::problem::Num;
use crate::utils::{select_weighted_index, Random};

const MIN_WEIGHT: Num = 1e-8;

/// Segment-wise adaptive weights over a fixed set of alternatives. Rewards
/// accumulate during a segment; at its end every alternative that was used
/// moves its weight towards its average reward.
pub struct AdaptiveWeights {
    weights: Vec<Num>,
    rewards: Vec<Num>,
    usages: Vec<u64>,
    reaction: Num,
}

impl AdaptiveWeights {
    pub fn new(count: usize, initial_weight: Num, reaction: Num) -> Self {
        Self {
            weights: vec![initial_weight; count],
            rewards: vec![0.0; count],
            usages: vec![0; count],
            reaction,
        }
    }

    /// Draws an index by roulette over the current weights and counts the
    /// usage.
    pub fn select(&mut self, rng: &mut Random) -> usize {
        let idx = select_weighted_index(rng, &self.weights);
        self.usages[idx] += 1;
        idx
    }

    pub fn add_reward(&mut self, idx: usize, amount: Num) {
        self.rewards[idx] += amount;
    }

    /// Applies the update `(1 - r) * w + r * reward / usage` to every used
    /// alternative, floored at a small positive weight, then starts a fresh
    /// segment. Unused alternatives keep their weight.
    pub fn end_segment(&mut self) {
        for idx in 0..self.weights.len() {
            if self.usages[idx] > 0 {
                let average = self.rewards[idx] / self.usages[idx] as Num;
                self.weights[idx] = MIN_WEIGHT
                    .max((1.0 - self.reaction) * self.weights[idx] + self.reaction * average);
            }
            self.rewards[idx] = 0.0;
            self.usages[idx] = 0;
        }
    }

    pub fn weights(&self) -> &[Num] {
        &self.weights
    }
}
