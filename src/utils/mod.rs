use std::mem::transmute;

use rand::{Rng, RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

use crate::problem::Num;

pub mod logging;
pub mod validator;

pub type Random = Pcg64Mcg;

pub fn create_seeded_rng(seed: i128) -> Random {
    let raw_bytes: [u8; 16] = unsafe { transmute(seed) };
    let mut rng = Pcg64Mcg::from_seed(raw_bytes);
    // discard the first three
    rng.next_u64();
    rng.next_u64();
    rng.next_u64();
    rng
}

/// Roulette draw over the given weights. Negative entries count as zero;
/// when nothing carries weight the draw is uniform.
pub fn select_weighted_index(rng: &mut Random, weights: &[Num]) -> usize {
    debug_assert!(!weights.is_empty());
    let total: Num = weights.iter().map(|w| w.max(0.0)).sum();
    if total <= 0.0 {
        return rng.gen_range(0..weights.len());
    }
    let mut remaining = rng.gen::<f64>() * total;
    for (idx, weight) in weights.iter().enumerate() {
        remaining -= weight.max(0.0);
        if remaining < 0.0 {
            return idx;
        }
    }
    weights.len() - 1
}

/// Rank-biased index into a list of `n` candidates: `floor(y^power * n)`
/// for a uniform `y`, clamped into range. Larger powers skew the draw
/// towards the front of the list.
pub fn biased_rank_index(rng: &mut Random, power: Num, n: usize) -> usize {
    debug_assert!(n > 0);
    let y = rng.gen::<f64>();
    ((y.powf(power) * n as f64).floor() as usize).min(n - 1)
}
