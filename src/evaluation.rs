use crate::error::Error;
use crate::input::Config;
use crate::log;
use crate::metrics::{self, Aggregation, EfficiencyRecord};
use crate::oracle::Oracle;
use crate::scenario::{self, DemandLaw, ScenarioSet};
use crate::subproblem::{FacilityModel, Formulation, FormulationResult};
use crate::system::System;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::time::Instant;

/// Smallest decrease of the SV - EV gap that is reported for review
const MONOTONICITY_TOLERANCE: f64 = 1e-6;

/// Settings shared by every delta of a sweep
#[derive(Debug, Clone)]
pub struct SweepSettings {
    pub law: DemandLaw,
    pub max_scenarios: usize,
    pub aggregation: Aggregation,
    pub num_threads: Option<usize>,
}

impl SweepSettings {
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Ok(Self {
            law: config.demand_law()?,
            max_scenarios: config.max_scenarios,
            aggregation: config.wait_and_see_aggregation,
            num_threads: config.num_threads,
        })
    }
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            law: DemandLaw::default(),
            max_scenarios: scenario::DEFAULT_MAX_SCENARIOS,
            aggregation: Aggregation::default(),
            num_threads: None,
        }
    }
}

/// Worker pool for the wait-and-see solves. Without an explicit size
/// rayon picks one worker per core.
pub fn build_worker_pool(
    num_threads: Option<usize>,
) -> Result<ThreadPool, Error> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(num_threads) = num_threads {
        builder = builder.num_threads(num_threads);
    }
    Ok(builder.build()?)
}

fn solve_formulation(
    system: &System,
    scenarios: &ScenarioSet,
    formulation: Formulation,
    oracle: &dyn Oracle,
) -> Result<FormulationResult, Error> {
    FacilityModel::new(system, scenarios, formulation)?.solve(oracle)
}

/// Solves one independent model per scenario on the pool. The results
/// are indexed by scenario id.
pub fn solve_wait_and_see(
    system: &System,
    scenarios: &ScenarioSet,
    oracle: &dyn Oracle,
    pool: &ThreadPool,
) -> Result<Vec<FormulationResult>, Error> {
    pool.install(|| {
        (0..scenarios.len())
            .into_par_iter()
            .map(|id| {
                solve_formulation(
                    system,
                    scenarios,
                    Formulation::WaitAndSee(id),
                    oracle,
                )
            })
            .collect()
    })
}

/// Runs every formulation for a single delta and combines them.
pub fn evaluate_delta(
    system: &System,
    delta: f64,
    settings: &SweepSettings,
    oracle: &dyn Oracle,
    pool: &ThreadPool,
) -> Result<EfficiencyRecord, Error> {
    let scenarios = scenario::generate(
        &system.base_demands(),
        delta,
        &settings.law,
        settings.max_scenarios,
    )?;

    let stochastic = solve_formulation(
        system,
        &scenarios,
        Formulation::Stochastic,
        oracle,
    )?;
    let wait_and_see = solve_wait_and_see(system, &scenarios, oracle, pool)?;
    let expected_value = solve_formulation(
        system,
        &scenarios,
        Formulation::ExpectedValue,
        oracle,
    )?;
    let expected_result_of_ev = match &expected_value.siting {
        Some(siting) => solve_formulation(
            system,
            &scenarios,
            Formulation::FixedSiting(siting.clone()),
            oracle,
        )?,
        None => FormulationResult::sentinel(expected_value.status),
    };

    Ok(EfficiencyRecord::new(
        delta,
        stochastic,
        wait_and_see,
        scenarios.into_scenarios(),
        expected_value,
        expected_result_of_ev,
        settings.aggregation,
    ))
}

/// Evaluates each delta independently, in the given order. Infeasible and
/// timed-out solves are kept in the records and reported, never aborting
/// the sweep.
pub fn sweep(
    system: &System,
    deltas: &[f64],
    settings: &SweepSettings,
    oracle: &dyn Oracle,
) -> Result<Vec<EfficiencyRecord>, Error> {
    let num_scenarios = scenario::scenario_count(
        system.meta.clients_count,
        settings.max_scenarios,
    )?;
    let pool = build_worker_pool(settings.num_threads)?;

    log::sweep_greeting(
        deltas.len(),
        &system.meta,
        num_scenarios,
        pool.current_num_threads(),
    );
    log::sweep_table_header();
    log::sweep_table_divider();

    let mut records = Vec::<EfficiencyRecord>::with_capacity(deltas.len());
    for delta in deltas.iter() {
        let begin = Instant::now();
        let record = evaluate_delta(system, *delta, settings, oracle, &pool)?;
        log::sweep_table_row(&record, begin.elapsed());
        records.push(record);
    }
    log::sweep_table_divider();

    for record in records.iter() {
        for (formulation, scenario_id, status) in record.degraded_results() {
            log::degraded_result_warning(
                record.delta,
                formulation,
                scenario_id,
                status,
            );
        }
        if record.efficiency().is_err() {
            log::undefined_efficiency_warning(record.delta);
        }
    }
    for violation in
        metrics::monotonicity_violations(&records, MONOTONICITY_TOLERANCE)
    {
        log::monotonicity_warning(&violation);
    }

    Ok(records)
}
