//! Global search: differential evolution over the parameter box.
//!
//! The model is non-convex in `θ` and `M`, so a purely local method seeded
//! arbitrarily can settle in a poor basin. Differential evolution explores the
//! whole box and hands the refiner a good starting point.
//!
//! Strategy `best1bin`:
//! - population lives in unit-cube coordinates, Latin-hypercube initialized
//! - mutant `b' = best + F·(r0 - r1)`, with `F ~ U[mutation)` redrawn per generation
//! - binomial crossover with probability `recombination`, one forced component
//! - trial components outside `[0, 1]` are resampled uniformly
//! - stop when `std(energies) <= atol + tol·|mean(energies)|` or at `max_iter`
//!
//! Randomness comes from a seeded `StdRng` and is consumed sequentially; only
//! the objective evaluations run in parallel. Results are therefore identical
//! across runs and thread counts.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand::seq::index;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::{GlobalSettings, ParamBounds, Params};
use crate::fit::objective::finite_or_inf;

const DIM: usize = Params::DIM;

/// Smallest population the mutation scheme can work with.
const MIN_POPULATION: usize = 5;

type Member = [f64; DIM];

/// Why the search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalStatus {
    /// Population energies converged within tolerance.
    Converged,
    /// Generation budget exhausted; the best point found is still returned.
    MaxIterations,
}

/// Best point found by the global search.
#[derive(Debug, Clone)]
pub struct GlobalOutcome {
    pub best: Params,
    pub value: f64,
    pub generations: usize,
    pub evaluations: usize,
    /// Evaluations that produced a non-finite objective value.
    pub non_finite: usize,
    pub status: GlobalStatus,
}

/// Minimize `objective` over `bounds`.
pub fn differential_evolution<F>(objective: F, bounds: &ParamBounds, settings: &GlobalSettings) -> GlobalOutcome
where
    F: Fn(&Params) -> f64 + Sync,
{
    let lo = bounds.lower();
    let hi = bounds.upper();
    let to_params = |u: &Member| {
        let mut v = [0.0; DIM];
        for k in 0..DIM {
            v[k] = lo[k] + u[k] * (hi[k] - lo[k]);
        }
        Params::from_array(v)
    };

    let mut rng = StdRng::seed_from_u64(settings.seed);
    let n_pop = (settings.popsize * DIM).max(MIN_POPULATION);

    let mut population = latin_hypercube(&mut rng, n_pop);
    let mut energies = evaluate(&objective, &population, &to_params);
    let mut evaluations = n_pop;
    let mut non_finite = energies.iter().filter(|e| e.is_infinite()).count();
    promote_best(&mut population, &mut energies);

    let mut status = GlobalStatus::MaxIterations;
    let mut generations = 0;

    for generation in 1..=settings.max_iter {
        generations = generation;
        let scale = draw_mutation(&mut rng, settings.mutation);

        let trials: Vec<Member> = (0..n_pop)
            .map(|i| best1bin(&mut rng, &population, i, scale, settings.recombination))
            .collect();
        let trial_energies = evaluate(&objective, &trials, &to_params);
        evaluations += n_pop;
        non_finite += trial_energies.iter().filter(|e| e.is_infinite()).count();

        for (i, (trial, energy)) in trials.into_iter().zip(trial_energies).enumerate() {
            if energy < energies[i] {
                population[i] = trial;
                energies[i] = energy;
            }
        }
        promote_best(&mut population, &mut energies);

        if generation % 10 == 0 {
            info!(generation, best = energies[0], "global search progress");
        } else {
            debug!(generation, best = energies[0], "global search generation");
        }

        if converged(&energies, settings.tol, settings.atol) {
            status = GlobalStatus::Converged;
            break;
        }
    }

    if non_finite > 0 {
        warn!(
            non_finite,
            evaluations, "model evaluation overflowed; those candidates were treated as worst fits"
        );
    }

    GlobalOutcome {
        best: to_params(&population[0]),
        value: energies[0],
        generations,
        evaluations,
        non_finite,
        status,
    }
}

fn evaluate<F, S>(objective: &F, members: &[Member], to_params: &S) -> Vec<f64>
where
    F: Fn(&Params) -> f64 + Sync,
    S: Fn(&Member) -> Params + Sync,
{
    members
        .par_iter()
        .map(|u| finite_or_inf(objective(&to_params(u))))
        .collect()
}

/// One stratified sample per population member in every dimension.
fn latin_hypercube(rng: &mut StdRng, n_pop: usize) -> Vec<Member> {
    let segment = 1.0 / n_pop as f64;
    let mut population = vec![[0.0; DIM]; n_pop];

    for k in 0..DIM {
        let mut column: Vec<f64> = (0..n_pop)
            .map(|i| segment * rng.r#gen::<f64>() + segment * i as f64)
            .collect();
        column.shuffle(rng);
        for (member, value) in population.iter_mut().zip(column) {
            member[k] = value;
        }
    }

    population
}

fn draw_mutation(rng: &mut StdRng, (lo, hi): (f64, f64)) -> f64 {
    if hi > lo { rng.gen_range(lo..hi) } else { lo }
}

fn best1bin(rng: &mut StdRng, population: &[Member], candidate: usize, scale: f64, recombination: f64) -> Member {
    let (r0, r1) = pick_two_others(rng, population.len(), candidate);
    let best = &population[0];

    let fill_point = rng.gen_range(0..DIM);
    let mut trial = population[candidate];
    for k in 0..DIM {
        if k == fill_point || rng.r#gen::<f64>() < recombination {
            trial[k] = best[k] + scale * (population[r0][k] - population[r1][k]);
        }
    }

    for v in &mut trial {
        if !(0.0..=1.0).contains(v) {
            *v = rng.r#gen::<f64>();
        }
    }
    trial
}

/// An ordered pair of distinct indices, both different from `candidate`.
///
/// Draws from `0..n - 1` and shifts past `candidate`; `index::sample` returns
/// its picks in random order, so either index is equally likely to come first.
fn pick_two_others(rng: &mut StdRng, n: usize, candidate: usize) -> (usize, usize) {
    let picks = index::sample(rng, n - 1, 2);
    let skip = |i: usize| if i >= candidate { i + 1 } else { i };
    (skip(picks.index(0)), skip(picks.index(1)))
}

/// Move the lowest-energy member to index 0.
fn promote_best(population: &mut [Member], energies: &mut [f64]) {
    let mut best = 0;
    for i in 1..energies.len() {
        if energies[i] < energies[best] {
            best = i;
        }
    }
    population.swap(0, best);
    energies.swap(0, best);
}

fn converged(energies: &[f64], tol: f64, atol: f64) -> bool {
    let n = energies.len() as f64;
    let mean = energies.iter().sum::<f64>() / n;
    let var = energies.iter().map(|e| (e - mean) * (e - mean)).sum::<f64>() / n;
    let std = var.sqrt();
    std.is_finite() && mean.is_finite() && std <= atol + tol * mean.abs()
}
