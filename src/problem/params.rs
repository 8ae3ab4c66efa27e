use anyhow::{ensure, Context, Result};
use derive_builder::Builder;
use serde::Deserialize;

use crate::problem::Num;

/// Search options shared by every component. Built once, validated once,
/// then carried read-only by the instance.
#[derive(Debug, Clone, Builder, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// weight of the total distance in the objective
    #[builder(default = "1.0")]
    pub alpha: Num,
    /// weight of the total travel time in the objective
    #[builder(default = "1.0")]
    pub beta: Num,
    /// penalty per unassigned request
    #[builder(default = "1e9")]
    pub gamma: Num,

    #[builder(default = "9.0")]
    pub shaw_param_1: Num,
    #[builder(default = "3.0")]
    pub shaw_param_2: Num,
    #[builder(default = "3.0")]
    pub shaw_param_3: Num,
    #[builder(default = "5.0")]
    pub shaw_param_4: Num,
    /// determinism power of the relatedness roulette
    #[builder(default = "6.0")]
    pub p: Num,
    /// determinism power of the worst-removal roulette
    #[builder(default = "3.0")]
    pub p_worst: Num,

    /// start-temperature control: a solution worse by `w * z0` is accepted
    /// with probability `annealing_p` at the first iteration
    #[builder(default = "0.05")]
    pub w: Num,
    #[builder(default = "0.5")]
    pub annealing_p: Num,
    /// geometric cooling rate
    #[builder(default = "0.99975")]
    pub c: Num,
    /// reaction factor of the adaptive weight update
    #[builder(default = "0.1")]
    pub r: Num,
    /// rewards for new-best / improved-current / accepted-worse candidates
    #[builder(default = "[33.0, 9.0, 13.0]")]
    pub reward_adds: [Num; 3],
    #[builder(default = "1.0")]
    pub initial_weight: Num,

    /// insertion-noise amplitude as a fraction of the largest distance
    #[builder(default = "0.025")]
    pub eta: Num,

    #[builder(default = "25_000")]
    pub iteration_num: u64,
    #[builder(default = "100")]
    pub segment_num: u64,

    #[builder(default = "4")]
    pub remove_lower_bound: usize,
    #[builder(default = "100")]
    pub remove_upper_bound: usize,
    /// cap of the removal quantity as a fraction of the request count
    #[builder(default = "0.4")]
    pub epsilon: Num,

    /// iteration budget of the fleet-minimization stage
    #[builder(default = "25_000")]
    pub theta: u64,
    /// iteration budget of a single shrink probe
    #[builder(default = "2_000")]
    pub tau: u64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.0,
            gamma: 1e9,
            shaw_param_1: 9.0,
            shaw_param_2: 3.0,
            shaw_param_3: 3.0,
            shaw_param_4: 5.0,
            p: 6.0,
            p_worst: 3.0,
            w: 0.05,
            annealing_p: 0.5,
            c: 0.99975,
            r: 0.1,
            reward_adds: [33.0, 9.0, 13.0],
            initial_weight: 1.0,
            eta: 0.025,
            iteration_num: 25_000,
            segment_num: 100,
            remove_lower_bound: 4,
            remove_upper_bound: 100,
            epsilon: 0.4,
            theta: 25_000,
            tau: 2_000,
        }
    }
}

impl Parameters {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let params: Parameters =
            toml::from_str(content).context("cannot parse parameters from toml")?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.alpha >= 0.0, "alpha must be non-negative");
        ensure!(self.beta >= 0.0, "beta must be non-negative");
        ensure!(self.gamma >= 0.0, "gamma must be non-negative");
        ensure!(
            self.shaw_param_1 >= 0.0
                && self.shaw_param_2 >= 0.0
                && self.shaw_param_3 >= 0.0
                && self.shaw_param_4 >= 0.0,
            "shaw weights must be non-negative"
        );
        ensure!(self.p >= 1.0, "p must be at least 1 (got {})", self.p);
        ensure!(
            self.p_worst >= 1.0,
            "p_worst must be at least 1 (got {})",
            self.p_worst
        );
        ensure!(self.w > 0.0, "w must be positive (got {})", self.w);
        ensure!(
            self.annealing_p > 0.0 && self.annealing_p < 1.0,
            "annealing_p must lie strictly between 0 and 1 (got {})",
            self.annealing_p
        );
        ensure!(
            self.c > 0.0 && self.c < 1.0,
            "cooling rate c must lie strictly between 0 and 1 (got {})",
            self.c
        );
        ensure!(
            self.r > 0.0 && self.r <= 1.0,
            "reaction factor r must lie in (0, 1] (got {})",
            self.r
        );
        ensure!(
            self.reward_adds.iter().all(|it| *it >= 0.0),
            "rewards must be non-negative"
        );
        ensure!(
            self.initial_weight > 0.0,
            "initial_weight must be positive (got {})",
            self.initial_weight
        );
        ensure!(self.eta >= 0.0, "eta must be non-negative");
        ensure!(self.iteration_num > 0, "iteration_num must be positive");
        ensure!(self.segment_num > 0, "segment_num must be positive");
        ensure!(
            self.remove_lower_bound >= 1,
            "remove_lower_bound must be at least 1"
        );
        ensure!(
            self.remove_upper_bound >= self.remove_lower_bound,
            "remove_upper_bound ({}) must not undercut remove_lower_bound ({})",
            self.remove_upper_bound,
            self.remove_lower_bound
        );
        ensure!(
            self.epsilon > 0.0 && self.epsilon <= 1.0,
            "epsilon must lie in (0, 1] (got {})",
            self.epsilon
        );
        ensure!(self.theta > 0, "theta must be positive");
        ensure!(self.tau > 0, "tau must be positive");
        Ok(())
    }
}
