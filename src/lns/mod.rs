use std::collections::VecDeque;

use ahash::AHashSet;
use anyhow::{ensure, Result};
use log::{debug, info};
use rand::Rng;
use took::Timer;

use crate::lns::destroy::{
    handle_destroy_operator_generic, DestroyOperators, RandomRemoval, ShawRemoval, WorstRemoval,
};
use crate::lns::noise::NoiseMode;
use crate::lns::repair::{
    handle_repair_operator_generic, GreedyInsertion, RegretInsertion, RepairOperators,
};
use crate::lns::weights::AdaptiveWeights;
use crate::problem::pdptw::PDPTWInstance;
use crate::problem::Num;
use crate::solution::{Solution, SolutionDescription};
use crate::utils::logging::format_log_solution_desc;
use crate::utils::Random;

pub mod destroy;
pub mod fleet_minimization;
pub mod noise;
pub mod repair;
pub mod weights;

const ACCEPTED_MEMORY_CAPACITY: usize = 25_000;
const MIN_TEMPERATURE: Num = 1e-10;

/// Bounded set of fingerprints of accepted solutions; once full, the oldest
/// entry makes room. Candidates hashing into it are not scored again.
pub struct FingerprintMemory {
    seen: AHashSet<u64>,
    order: VecDeque<u64>,
    capacity: usize,
}

impl FingerprintMemory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            seen: AHashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn contains(&self, fingerprint: u64) -> bool {
        self.seen.contains(&fingerprint)
    }

    pub fn insert(&mut self, fingerprint: u64) {
        if self.seen.insert(fingerprint) {
            self.order.push_back(fingerprint);
            if self.order.len() > self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.seen.remove(&oldest);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

pub struct SearchSettings {
    pub max_iterations: u64,
    /// let repair drain the whole bank instead of stopping at the removal
    /// quantity
    pub insert_unlimited: bool,
    /// leave the loop as soon as the best solution serves every request
    pub stop_when_all_assigned: bool,
}

impl SearchSettings {
    pub fn with_iterations(max_iterations: u64) -> Self {
        Self {
            max_iterations,
            insert_unlimited: false,
            stop_when_all_assigned: false,
        }
    }
}

pub struct SearchOutcome {
    pub best: SolutionDescription,
    pub iterations: u64,
}

/// Adaptive large neighbourhood search: ruin part of the current solution
/// with a weight-selected removal operator, recreate it with a
/// weight-selected insertion operator, and accept by simulated annealing.
/// Operator weights adapt segment-wise to the rewards they earn.
pub fn adaptive_large_neighbourhood_search(
    instance: &PDPTWInstance,
    initial: &Solution,
    rng: &mut Random,
    settings: &SearchSettings,
) -> Result<SearchOutcome> {
    let params = instance.params();
    let timer = Timer::new();

    let z0 = initial.objective_without_bank();
    ensure!(
        z0 > 0.0,
        "initial solution has no routing cost to scale the start temperature"
    );
    let mut temperature = -(params.w * z0) / params.annealing_p.ln();

    let q_cap = params
        .remove_upper_bound
        .min((params.epsilon * instance.num_requests() as f64).floor() as usize);
    ensure!(
        q_cap >= params.remove_lower_bound,
        "removal quantity range is empty (lower bound {}, cap {})",
        params.remove_lower_bound,
        q_cap
    );

    let destroy_ops = vec![
        DestroyOperators::Shaw(ShawRemoval::with_instance(instance)),
        DestroyOperators::Random(RandomRemoval::new()),
        DestroyOperators::Worst(WorstRemoval::with_instance(instance)),
    ];
    let fleet = instance.num_vehicles();
    let mut repair_ops = vec![RepairOperators::Greedy(GreedyInsertion::new())];
    for k in [2usize, 3, 4] {
        if k <= fleet {
            repair_ops.push(RepairOperators::Regret(RegretInsertion::new(k)));
        }
    }
    if fleet > 4 {
        repair_ops.push(RepairOperators::Regret(RegretInsertion::new(fleet)));
    }
    let noise_modes = [
        NoiseMode::Disabled,
        NoiseMode::Uniform {
            amplitude: params.eta * instance.max_distance(),
        },
    ];

    let mut destroy_weights =
        AdaptiveWeights::new(destroy_ops.len(), params.initial_weight, params.r);
    let mut repair_weights =
        AdaptiveWeights::new(repair_ops.len(), params.initial_weight, params.r);
    let mut noise_weights =
        AdaptiveWeights::new(noise_modes.len(), params.initial_weight, params.r);

    let mut memory = FingerprintMemory::with_capacity(ACCEPTED_MEMORY_CAPACITY);
    let mut current = initial.clone();
    memory.insert(current.fingerprint());
    let mut current_obj = current.objective();
    let mut best = current.to_description();
    let mut best_obj = current_obj;

    let mut iterations = 0u64;
    for iteration in 0..settings.max_iterations {
        iterations = iteration + 1;
        if iteration > 0 && iteration % params.segment_num == 0 {
            destroy_weights.end_segment();
            repair_weights.end_segment();
            noise_weights.end_segment();
            debug!(
                "segment update at iteration {} - destroy {:?}, repair {:?}, noise {:?}",
                iteration,
                destroy_weights.weights(),
                repair_weights.weights(),
                noise_weights.weights(),
            );
        }

        let destroy_idx = destroy_weights.select(rng);
        let repair_idx = repair_weights.select(rng);
        let noise_idx = noise_weights.select(rng);
        let q = rng.gen_range(params.remove_lower_bound..=q_cap);

        let mut candidate = current.clone();
        let q_destroy = q.min(candidate.number_of_assigned_requests());
        if q_destroy > 0 {
            handle_destroy_operator_generic(
                &destroy_ops[destroy_idx],
                &mut candidate,
                rng,
                q_destroy,
            )?;
        }
        handle_repair_operator_generic(
            &repair_ops[repair_idx],
            &mut candidate,
            rng,
            q,
            settings.insert_unlimited,
            noise_modes[noise_idx],
        )?;

        // already-seen structures consume budget but are not scored again
        let fingerprint = candidate.fingerprint();
        if memory.contains(fingerprint) {
            continue;
        }

        let candidate_obj = candidate.objective();
        let tier = if candidate_obj <= best_obj {
            Some(0)
        } else if candidate_obj <= current_obj {
            Some(1)
        } else {
            let delta = candidate_obj - current_obj;
            if rng.gen::<f64>() < (-delta / temperature).exp() {
                Some(2)
            } else {
                None
            }
        };

        if let Some(tier) = tier {
            if candidate_obj < best_obj {
                best_obj = candidate_obj;
                best = candidate.to_description();
                debug!(
                    "new best at iteration {} - {}",
                    iteration,
                    format_log_solution_desc(&best)
                );
            }
            let reward = params.reward_adds[tier];
            destroy_weights.add_reward(destroy_idx, reward);
            repair_weights.add_reward(repair_idx, reward);
            noise_weights.add_reward(noise_idx, reward);
            memory.insert(fingerprint);
            current = candidate;
            current_obj = candidate_obj;
        }

        temperature = MIN_TEMPERATURE.max(temperature * params.c);

        if settings.stop_when_all_assigned && best.number_of_unassigned_requests() == 0 {
            break;
        }
    }

    info!(
        "alns finished after {} iterations - best {}, took: {}",
        iterations,
        format_log_solution_desc(&best),
        timer.took(),
    );
    Ok(SearchOutcome { best, iterations })
}
