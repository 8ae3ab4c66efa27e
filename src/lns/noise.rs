use rand::Rng;

use crate::problem::Num;
use crate::utils::Random;

/// Optional perturbation of insertion costs, chosen adaptively alongside the
/// operators and passed down explicitly per call.
#[derive(Clone, Copy, Debug)]
pub enum NoiseMode {
    Disabled,
    /// Uniform offset in `[-amplitude, amplitude]`, result clamped at zero.
    Uniform { amplitude: Num },
}

impl NoiseMode {
    pub fn apply(&self, cost: Num, rng: &mut Random) -> Num {
        match self {
            Self::Disabled => cost,
            Self::Uniform { amplitude } => {
                (cost + rng.gen_range(-amplitude..=*amplitude)).max(0.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::create_seeded_rng;

    #[test]
    fn disabled_noise_is_the_identity() {
        let mut rng = create_seeded_rng(3);
        assert_eq!(NoiseMode::Disabled.apply(17.5, &mut rng), 17.5);
    }

    #[test]
    fn uniform_noise_stays_within_the_amplitude_and_above_zero() {
        let mut rng = create_seeded_rng(3);
        let noise = NoiseMode::Uniform { amplitude: 5.0 };
        for _ in 0..256 {
            let perturbed = noise.apply(2.0, &mut rng);
            assert!(perturbed >= 0.0);
            assert!(perturbed <= 7.0);
        }
    }
}
