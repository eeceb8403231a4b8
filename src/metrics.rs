use crate::error::Error;
use crate::oracle::SolveStatus;
use crate::scenario::Scenario;
use crate::subproblem::FormulationResult;
use crate::utils;
use serde::Deserialize;

/// How the wait-and-see values are aggregated into the expected value of
/// perfect information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Each scenario weighs its joint probability
    ProbabilityWeighted,
    /// Every scenario weighs the same
    #[default]
    Arithmetic,
}

/// Aggregates the wait-and-see values of every scenario. Sentinel values
/// of non-optimal scenarios are part of the aggregate.
pub fn expected_perfect_information(
    wait_and_see: &[f64],
    probabilities: &[f64],
    aggregation: Aggregation,
) -> f64 {
    match aggregation {
        Aggregation::ProbabilityWeighted => {
            utils::dot_product(probabilities, wait_and_see)
        }
        Aggregation::Arithmetic => utils::mean(wait_and_see).unwrap_or(0.0),
    }
}

/// Relative profit of the stochastic solution against perfect
/// information, in percent.
pub fn efficiency_percent(
    stochastic_value: f64,
    expected_perfect_information: f64,
) -> Result<f64, Error> {
    if expected_perfect_information == 0.0 {
        return Err(Error::DivisionUndefined);
    }
    Ok(100.0 * (stochastic_value - expected_perfect_information)
        / expected_perfect_information)
}

/// Everything computed for one delta of the sweep
#[derive(Debug, Clone, PartialEq)]
pub struct EfficiencyRecord {
    pub delta: f64,
    pub num_scenarios: usize,
    pub stochastic: FormulationResult,
    /// Indexed by scenario id
    pub wait_and_see: Vec<FormulationResult>,
    /// The scenarios the wait-and-see results refer to, by id
    pub scenarios: Vec<Scenario>,
    pub expected_value: FormulationResult,
    /// The stochastic model evaluated at the expected value siting
    pub expected_result_of_ev: FormulationResult,
    pub expected_perfect_information: f64,
    /// `None` when the efficiency is undefined
    pub efficiency_percent: Option<f64>,
}

impl EfficiencyRecord {
    pub fn new(
        delta: f64,
        stochastic: FormulationResult,
        wait_and_see: Vec<FormulationResult>,
        scenarios: Vec<Scenario>,
        expected_value: FormulationResult,
        expected_result_of_ev: FormulationResult,
        aggregation: Aggregation,
    ) -> Self {
        let values: Vec<f64> =
            wait_and_see.iter().map(|r| r.objective).collect();
        let probabilities: Vec<f64> =
            scenarios.iter().map(|s| s.probability).collect();
        let expected_perfect_information =
            expected_perfect_information(&values, &probabilities, aggregation);
        let efficiency_percent = efficiency_percent(
            stochastic.objective,
            expected_perfect_information,
        )
        .ok();
        Self {
            delta,
            num_scenarios: wait_and_see.len(),
            stochastic,
            wait_and_see,
            scenarios,
            expected_value,
            expected_result_of_ev,
            expected_perfect_information,
            efficiency_percent,
        }
    }

    pub fn stochastic_value(&self) -> f64 {
        self.stochastic.objective
    }

    pub fn efficiency(&self) -> Result<f64, Error> {
        self.efficiency_percent.ok_or(Error::DivisionUndefined)
    }

    /// EPI - SV
    pub fn value_of_perfect_information(&self) -> f64 {
        self.expected_perfect_information - self.stochastic.objective
    }

    /// SV - EEV, when both were solved to optimality
    pub fn value_of_stochastic_solution(&self) -> Option<f64> {
        match (
            self.stochastic.is_optimal(),
            self.expected_result_of_ev.is_optimal(),
        ) {
            (true, true) => Some(
                self.stochastic.objective
                    - self.expected_result_of_ev.objective,
            ),
            _ => None,
        }
    }

    /// SV - EV
    pub fn expected_value_gap(&self) -> f64 {
        self.stochastic.objective - self.expected_value.objective
    }

    /// Results that hold a sentinel instead of an optimal value
    pub fn degraded_results(
        &self,
    ) -> Vec<(&'static str, Option<usize>, SolveStatus)> {
        let mut degraded = vec![];
        if !self.stochastic.is_optimal() {
            degraded.push(("stochastic", None, self.stochastic.status));
        }
        for (id, result) in self.wait_and_see.iter().enumerate() {
            if !result.is_optimal() {
                degraded.push(("wait-and-see", Some(id), result.status));
            }
        }
        if !self.expected_value.is_optimal() {
            degraded.push(("expected value", None, self.expected_value.status));
        }
        if !self.expected_result_of_ev.is_optimal() {
            degraded.push((
                "expected result of ev",
                None,
                self.expected_result_of_ev.status,
            ));
        }
        degraded
    }

    pub fn degraded_points(&self) -> usize {
        self.degraded_results().len()
    }
}

/// A pair of consecutive deltas where the gap between the stochastic and
/// the expected value objectives shrank as the spread grew.
#[derive(Debug, Clone, PartialEq)]
pub struct MonotonicityViolation {
    pub lower_delta: f64,
    pub upper_delta: f64,
    pub lower_gap: f64,
    pub upper_gap: f64,
}

/// Flags, for manual review, every pair of consecutive deltas whose
/// SV - EV gap decreases by more than `tolerance`.
pub fn monotonicity_violations(
    records: &[EfficiencyRecord],
    tolerance: f64,
) -> Vec<MonotonicityViolation> {
    let mut sorted: Vec<&EfficiencyRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.delta.total_cmp(&b.delta));
    sorted
        .windows(2)
        .filter_map(|pair| {
            let lower_gap = pair[0].expected_value_gap();
            let upper_gap = pair[1].expected_value_gap();
            if upper_gap < lower_gap - tolerance {
                Some(MonotonicityViolation {
                    lower_delta: pair[0].delta,
                    upper_delta: pair[1].delta,
                    lower_gap,
                    upper_gap,
                })
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{self, DemandLaw};

    fn optimal(objective: f64) -> FormulationResult {
        FormulationResult {
            status: SolveStatus::Optimal,
            objective,
            siting: Some(vec![true]),
        }
    }

    fn single_client_scenarios() -> Vec<Scenario> {
        scenario::generate(&[10.0], 20.0, &DemandLaw::default(), 100)
            .unwrap()
            .into_scenarios()
    }

    fn record(
        delta: f64,
        stochastic: f64,
        expected_value: f64,
    ) -> EfficiencyRecord {
        EfficiencyRecord::new(
            delta,
            optimal(stochastic),
            vec![optimal(stochastic + 10.0); 3],
            single_client_scenarios(),
            optimal(expected_value),
            optimal(stochastic - 5.0),
            Aggregation::ProbabilityWeighted,
        )
    }

    #[test]
    fn test_efficiency_is_zero_when_values_match() {
        assert_eq!(efficiency_percent(250.0, 250.0).unwrap(), 0.0);
        assert_eq!(efficiency_percent(-40.5, -40.5).unwrap(), 0.0);
    }

    #[test]
    fn test_efficiency_percent() {
        let value = efficiency_percent(90.0, 100.0).unwrap();
        assert!((value + 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_efficiency_undefined_for_zero_information() {
        assert!(matches!(
            efficiency_percent(10.0, 0.0),
            Err(Error::DivisionUndefined)
        ));
    }

    #[test]
    fn test_expected_perfect_information_aggregations() {
        let values = [100.0, 200.0, 300.0];
        let probabilities = [0.2, 0.45, 0.35];
        let weighted = expected_perfect_information(
            &values,
            &probabilities,
            Aggregation::ProbabilityWeighted,
        );
        assert!((weighted - 215.0).abs() < 1e-9);
        let arithmetic = expected_perfect_information(
            &values,
            &probabilities,
            Aggregation::Arithmetic,
        );
        assert!((arithmetic - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_record_derived_values() {
        let r = record(20.0, 100.0, 90.0);
        assert_eq!(r.num_scenarios, 3);
        assert!((r.expected_perfect_information - 110.0).abs() < 1e-9);
        assert!((r.value_of_perfect_information() - 10.0).abs() < 1e-9);
        assert_eq!(r.value_of_stochastic_solution(), Some(5.0));
        assert_eq!(r.expected_value_gap(), 10.0);
        let efficiency = 100.0 * (-10.0 / 110.0);
        assert!((r.efficiency().unwrap() - efficiency).abs() < 1e-9);
        assert_eq!(r.degraded_points(), 0);
        let probabilities: Vec<f64> =
            r.scenarios.iter().map(|s| s.probability).collect();
        assert_eq!(probabilities, vec![0.2, 0.45, 0.35]);
    }

    #[test]
    fn test_default_aggregation_is_the_plain_mean() {
        assert_eq!(Aggregation::default(), Aggregation::Arithmetic);
        let r = EfficiencyRecord::new(
            20.0,
            optimal(100.0),
            vec![optimal(80.0), optimal(100.0), optimal(150.0)],
            single_client_scenarios(),
            optimal(90.0),
            optimal(95.0),
            Aggregation::default(),
        );
        assert!((r.expected_perfect_information - 110.0).abs() < 1e-9);
        let efficiency = 100.0 * (100.0 - 110.0) / 110.0;
        assert!((r.efficiency().unwrap() - efficiency).abs() < 1e-9);
    }

    #[test]
    fn test_record_keeps_sentinels_in_the_count() {
        let r = EfficiencyRecord::new(
            5.0,
            FormulationResult::sentinel(SolveStatus::Infeasible),
            vec![
                FormulationResult::sentinel(SolveStatus::Infeasible),
                optimal(50.0),
                FormulationResult::sentinel(SolveStatus::TimedOut),
            ],
            single_client_scenarios(),
            optimal(40.0),
            FormulationResult::sentinel(SolveStatus::Infeasible),
            Aggregation::Arithmetic,
        );
        assert_eq!(r.num_scenarios, 3);
        assert!((r.expected_perfect_information - 50.0 / 3.0).abs() < 1e-9);
        assert_eq!(r.value_of_stochastic_solution(), None);
        let degraded = r.degraded_results();
        assert_eq!(degraded.len(), 4);
        assert_eq!(
            degraded[1],
            ("wait-and-see", Some(0), SolveStatus::Infeasible)
        );
        assert_eq!(
            degraded[2],
            ("wait-and-see", Some(2), SolveStatus::TimedOut)
        );
    }

    #[test]
    fn test_record_with_undefined_efficiency() {
        let r = EfficiencyRecord::new(
            5.0,
            FormulationResult::sentinel(SolveStatus::Infeasible),
            vec![FormulationResult::sentinel(SolveStatus::Infeasible); 3],
            single_client_scenarios(),
            FormulationResult::sentinel(SolveStatus::Infeasible),
            FormulationResult::sentinel(SolveStatus::Infeasible),
            Aggregation::ProbabilityWeighted,
        );
        assert_eq!(r.efficiency_percent, None);
        assert!(matches!(r.efficiency(), Err(Error::DivisionUndefined)));
    }

    #[test]
    fn test_monotonicity_violations() {
        // gaps: 5 -> 10 -> 4 -> 4
        let records = vec![
            record(40.0, 100.0, 96.0),
            record(5.0, 100.0, 95.0),
            record(20.0, 100.0, 90.0),
            record(60.0, 100.0, 96.0),
        ];
        let violations = monotonicity_violations(&records, 1e-6);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].lower_delta, 20.0);
        assert_eq!(violations[0].upper_delta, 40.0);
        assert_eq!(violations[0].lower_gap, 10.0);
        assert_eq!(violations[0].upper_gap, 4.0);
    }
}
