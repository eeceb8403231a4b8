use crate::error::Error;
use crate::metrics::EfficiencyRecord;
use crate::oracle::SolveStatus;

use csv::Writer;
use serde;
use std::path::Path;

#[derive(serde::Serialize)]
struct EfficiencyOutput {
    delta: f64,
    num_scenarios: usize,
    stochastic_value: f64,
    stochastic_status: SolveStatus,
    expected_perfect_information: f64,
    efficiency_percent: Option<f64>,
    value_of_perfect_information: f64,
    expected_value: f64,
    expected_value_status: SolveStatus,
    expected_result_of_ev: f64,
    expected_result_of_ev_status: SolveStatus,
    value_of_stochastic_solution: Option<f64>,
    degraded_points: usize,
}

fn write_efficiency(
    records: &[EfficiencyRecord],
    path: &Path,
) -> Result<(), Error> {
    let mut wtr = Writer::from_path(path.join("efficiency.csv"))?;
    for record in records.iter() {
        let eev = &record.expected_result_of_ev;
        wtr.serialize(EfficiencyOutput {
            delta: record.delta,
            num_scenarios: record.num_scenarios,
            stochastic_value: record.stochastic_value(),
            stochastic_status: record.stochastic.status,
            expected_perfect_information: record.expected_perfect_information,
            efficiency_percent: record.efficiency_percent,
            value_of_perfect_information: record
                .value_of_perfect_information(),
            expected_value: record.expected_value.objective,
            expected_value_status: record.expected_value.status,
            expected_result_of_ev: eev.objective,
            expected_result_of_ev_status: eev.status,
            value_of_stochastic_solution: record
                .value_of_stochastic_solution(),
            degraded_points: record.degraded_points(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(serde::Serialize)]
struct WaitAndSeeOutput {
    delta: f64,
    scenario_index: usize,
    probability: f64,
    /// Client demands joined by ';', client 0 first
    demands: String,
    value: f64,
    status: SolveStatus,
}

fn join_demands(demands: &[f64]) -> String {
    demands
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<String>>()
        .join(";")
}

fn write_wait_and_see(
    records: &[EfficiencyRecord],
    path: &Path,
) -> Result<(), Error> {
    let mut wtr = Writer::from_path(path.join("wait_and_see.csv"))?;
    for record in records.iter() {
        for (scenario, result) in
            record.scenarios.iter().zip(record.wait_and_see.iter())
        {
            wtr.serialize(WaitAndSeeOutput {
                delta: record.delta,
                scenario_index: scenario.id,
                probability: scenario.probability,
                demands: join_demands(&scenario.demands),
                value: result.objective,
                status: result.status,
            })?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Writes `efficiency.csv` and `wait_and_see.csv` into `path`
pub fn generate_outputs(
    records: &[EfficiencyRecord],
    path: &str,
) -> Result<(), Error> {
    let path = Path::new(path);
    write_efficiency(records, path)?;
    write_wait_and_see(records, path)?;
    Ok(())
}
