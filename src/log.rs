use crate::metrics::{EfficiencyRecord, MonotonicityViolation};
use crate::oracle::SolveStatus;
use crate::system::SystemMetadata;
use chrono::Local;
use std::time::Duration;

fn seconds(time: Duration) -> f64 {
    time.as_millis() as f64 / 1000.0
}

pub fn show_greeting() {
    println!("\n# facloc-rs v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "Execution started at {}",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
}

pub fn input_reading_line(path: &str) {
    println!("\nReading input files from '{path}'");
}

/// Helper function for displaying the greeting data for the sweep
pub fn sweep_greeting(
    num_deltas: usize,
    meta: &SystemMetadata,
    num_scenarios: usize,
    num_threads: usize,
) {
    println!("\n# Sweeping");
    println!("- Deltas: {num_deltas}");
    println!("- Clients: {}", meta.clients_count);
    println!("- Sites: {}", meta.sites_count);
    println!("- Scenarios per delta: {num_scenarios}");
    let pairs = meta.clients_count * meta.sites_count;
    println!(
        "- Extensive form size: {} columns, {} rows",
        meta.sites_count + 2 * num_scenarios * pairs,
        num_scenarios * (meta.sites_count + 2 * meta.clients_count + pairs)
    );
    println!("- Worker threads: {num_threads}\n");
}

/// Helper function for displaying the sweep table header
pub fn sweep_table_header() {
    println!(
        "{0: ^8} | {1: ^13} | {2: ^13} | {3: ^13} | {4: ^13} | {5: ^14} \
         | {6: ^8}",
        "delta",
        "SV ($)",
        "EPI ($)",
        "EV ($)",
        "EEV ($)",
        "efficiency (%)",
        "time (s)"
    )
}

/// Helper function for displaying a divider for the sweep table
pub fn sweep_table_divider() {
    println!("{}", "-".repeat(100))
}

fn format_sweep_table_row(record: &EfficiencyRecord, time: Duration) -> String {
    let efficiency = match record.efficiency_percent {
        Some(value) => format!("{value:.4}"),
        None => "undefined".to_string(),
    };
    format!(
        "{0: >8.2} | {1: >13.4} | {2: >13.4} | {3: >13.4} | {4: >13.4} \
         | {5: >14} | {6: >8.2}",
        record.delta,
        record.stochastic_value(),
        record.expected_perfect_information,
        record.expected_value.objective,
        record.expected_result_of_ev.objective,
        efficiency,
        seconds(time)
    )
}

/// Helper function for displaying the results of one delta
pub fn sweep_table_row(record: &EfficiencyRecord, time: Duration) {
    println!("{}", format_sweep_table_row(record, time))
}

pub fn degraded_result_warning(
    delta: f64,
    formulation: &str,
    scenario_id: Option<usize>,
    status: SolveStatus,
) {
    let subject = match scenario_id {
        Some(id) => format!("{formulation} scenario {id}"),
        None => formulation.to_string(),
    };
    println!(
        "WARNING: delta {delta}: {subject} is {status:?}, objective set to 0"
    );
}

pub fn undefined_efficiency_warning(delta: f64) {
    println!("WARNING: delta {delta}: efficiency is undefined (EPI = 0)");
}

pub fn monotonicity_warning(violation: &MonotonicityViolation) {
    println!(
        "WARNING: SV - EV decreased from {:.4} to {:.4} \
         between deltas {} and {}",
        violation.lower_gap,
        violation.upper_gap,
        violation.lower_delta,
        violation.upper_delta
    );
}

pub fn output_generation_line(path: &str) {
    println!("\nWriting outputs to '{path}'");
}

pub fn show_farewell(time: Duration) {
    println!("\nTotal running time: {:.2} s", seconds(time));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Aggregation;
    use crate::scenario::{self, DemandLaw};
    use crate::subproblem::FormulationResult;

    fn optimal(objective: f64) -> FormulationResult {
        FormulationResult {
            status: SolveStatus::Optimal,
            objective,
            siting: Some(vec![true]),
        }
    }

    #[test]
    fn test_table_row_shows_every_reported_value() {
        let scenarios =
            scenario::generate(&[10.0], 20.0, &DemandLaw::default(), 100)
                .unwrap();
        let record = EfficiencyRecord::new(
            20.0,
            optimal(118.0),
            vec![optimal(80.0), optimal(100.0), optimal(120.0)],
            scenarios.into_scenarios(),
            optimal(112.5),
            optimal(104.25),
            Aggregation::Arithmetic,
        );
        let row = format_sweep_table_row(&record, Duration::from_millis(1500));
        let cells: Vec<&str> = row.split('|').map(|c| c.trim()).collect();
        assert_eq!(
            cells,
            vec![
                "20.00", "118.0000", "100.0000", "112.5000", "104.2500",
                "18.0000", "1.50"
            ]
        );
    }

    #[test]
    fn test_table_row_with_undefined_efficiency() {
        let scenarios =
            scenario::generate(&[10.0], 5.0, &DemandLaw::default(), 100)
                .unwrap();
        let record = EfficiencyRecord::new(
            5.0,
            FormulationResult::sentinel(SolveStatus::Infeasible),
            vec![FormulationResult::sentinel(SolveStatus::Infeasible); 3],
            scenarios.into_scenarios(),
            optimal(40.0),
            FormulationResult::sentinel(SolveStatus::Infeasible),
            Aggregation::Arithmetic,
        );
        let row = format_sweep_table_row(&record, Duration::ZERO);
        assert!(row.contains("undefined"));
        assert!(row.contains("40.0000"));
    }
}
