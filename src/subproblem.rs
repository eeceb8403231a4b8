use crate::error::Error;
use crate::oracle::{Oracle, Outcome, SolveStatus};
use crate::scenario::ScenarioSet;
use crate::solver;
use crate::system::System;

/// Which variant of the facility location model is assembled. All of them
/// share the same constraint shapes and differ only in the demands they
/// see and in how the siting decision is treated.
#[derive(Debug, Clone, PartialEq)]
pub enum Formulation {
    /// Extensive form: the siting is shared by every scenario and the
    /// allocation is decided per scenario.
    Stochastic,
    /// A single scenario, with the siting free to adapt to it.
    WaitAndSee(usize),
    /// The probability-weighted mean demand, with the siting free.
    ExpectedValue,
    /// Extensive form with the siting fixed beforehand, for evaluating a
    /// first-stage decision taken elsewhere.
    FixedSiting(Vec<bool>),
}

/// A demand vector and the weight of its revenue in the objective
#[derive(Debug)]
struct Realization {
    demands: Vec<f64>,
    weight: f64,
}

fn build_realizations(
    formulation: &Formulation,
    scenarios: &ScenarioSet,
) -> Result<Vec<Realization>, Error> {
    match formulation {
        Formulation::Stochastic | Formulation::FixedSiting(_) => Ok(scenarios
            .scenarios()
            .iter()
            .map(|s| Realization {
                demands: s.demands.clone(),
                weight: s.probability,
            })
            .collect()),
        Formulation::WaitAndSee(id) => match scenarios.get(*id) {
            Some(s) => Ok(vec![Realization {
                demands: s.demands.clone(),
                weight: 1.0,
            }]),
            None => Err(Error::InvalidParameter(format!(
                "scenario {} not in a set of {}",
                id,
                scenarios.len()
            ))),
        },
        Formulation::ExpectedValue => Ok(vec![Realization {
            demands: scenarios.mean_demand(),
            weight: 1.0,
        }]),
    }
}

/// Helper accessor for indexing desired variables and constraints
/// in each model. Per-realization entries are flattened with the
/// realization as the outermost index, then client, then site.
#[derive(Debug)]
pub struct Accessors {
    pub open: Vec<usize>,
    pub shipped: Vec<usize>,
    pub assigned: Vec<usize>,
    pub capacity: Vec<usize>,
    pub coverage: Vec<usize>,
    pub assignment: Vec<usize>,
    pub linking: Vec<usize>,
}

/// A capacitated facility location model, ready to be handed to an
/// [`Oracle`].
#[derive(Debug)]
pub struct FacilityModel {
    pub formulation: Formulation,
    pub problem: solver::Problem,
    pub accessors: Accessors,
    pub num_realizations: usize,
    pub num_clients: usize,
    pub num_sites: usize,
}

impl FacilityModel {
    pub fn new(
        system: &System,
        scenarios: &ScenarioSet,
        formulation: Formulation,
    ) -> Result<Self, Error> {
        let num_clients = system.meta.clients_count;
        let num_sites = system.meta.sites_count;
        if scenarios.num_clients() != num_clients {
            return Err(Error::InvalidParameter(format!(
                "scenarios have {} clients but the system has {}",
                scenarios.num_clients(),
                num_clients
            )));
        }
        if let Formulation::FixedSiting(open) = &formulation {
            if open.len() != num_sites {
                return Err(Error::InvalidParameter(format!(
                    "fixed siting has {} entries for {} sites",
                    open.len(),
                    num_sites
                )));
            }
        }
        let realizations = build_realizations(&formulation, scenarios)?;
        let num_realizations = realizations.len();

        let mut pb = solver::Problem::new();

        // VARIABLES
        let open: Vec<usize> = system
            .sites
            .iter()
            .map(|site| match &formulation {
                Formulation::FixedSiting(fixed) => {
                    let value = if fixed[site.id] { 1.0 } else { 0.0 };
                    pb.add_integer_column(
                        -site.construction_cost,
                        value..=value,
                    )
                }
                _ => pb.add_integer_column(-site.construction_cost, 0.0..=1.0),
            })
            .collect();

        let block = num_clients * num_sites;
        let mut shipped = Vec::<usize>::with_capacity(num_realizations * block);
        let mut assigned =
            Vec::<usize>::with_capacity(num_realizations * block);
        for realization in realizations.iter() {
            for client in system.clients.iter() {
                for site in system.sites.iter() {
                    shipped.push(pb.add_column(
                        realization.weight * client.revenues[site.id],
                        0.0..,
                    ));
                }
            }
            for _ in 0..block {
                assigned.push(pb.add_integer_column(0.0, 0.0..=1.0));
            }
        }
        let col = |cols: &[usize], s: usize, i: usize, j: usize| {
            cols[(s * num_clients + i) * num_sites + j]
        };

        // CONSTRAINTS
        let mut capacity =
            Vec::<usize>::with_capacity(num_realizations * num_sites);
        let mut coverage =
            Vec::<usize>::with_capacity(num_realizations * num_clients);
        let mut assignment =
            Vec::<usize>::with_capacity(num_realizations * num_clients);
        let mut linking = Vec::<usize>::with_capacity(num_realizations * block);
        for (s, realization) in realizations.iter().enumerate() {
            // shipped into a site is bounded by its capacity when open
            for site in system.sites.iter() {
                let mut factors: Vec<(usize, f64)> = (0..num_clients)
                    .map(|i| (col(&shipped, s, i, site.id), 1.0))
                    .collect();
                factors.push((open[site.id], -site.capacity));
                capacity.push(pb.add_row(..=0.0, factors));
            }
            for client in system.clients.iter() {
                let demand = realization.demands[client.id];
                let factors: Vec<(usize, f64)> = (0..num_sites)
                    .map(|j| (col(&shipped, s, client.id, j), 1.0))
                    .collect();
                coverage.push(pb.add_row(demand.., factors));

                let factors: Vec<(usize, f64)> = (0..num_sites)
                    .map(|j| (col(&assigned, s, client.id, j), 1.0))
                    .collect();
                assignment.push(pb.add_row(1.0..=1.0, factors));

                for site in system.sites.iter() {
                    linking.push(pb.add_row(
                        ..=0.0,
                        [
                            (col(&shipped, s, client.id, site.id), 1.0),
                            (col(&assigned, s, client.id, site.id), -demand),
                        ],
                    ));
                }
            }
        }

        let accessors = Accessors {
            open,
            shipped,
            assigned,
            capacity,
            coverage,
            assignment,
            linking,
        };

        Ok(FacilityModel {
            formulation,
            problem: pb,
            accessors,
            num_realizations,
            num_clients,
            num_sites,
        })
    }

    pub fn get_siting_from_solution(&self, columns: &[f64]) -> Vec<bool> {
        self.accessors
            .open
            .iter()
            .map(|col| columns[*col] > 0.5)
            .collect()
    }

    /// Solves the model. Infeasible and timed-out solves are returned as a
    /// zero-valued result tagged with their status.
    pub fn solve(
        &self,
        oracle: &dyn Oracle,
    ) -> Result<FormulationResult, Error> {
        let outcome = oracle.solve(&self.problem, solver::Sense::Maximise)?;
        Ok(match outcome {
            Outcome::Optimal { objective, columns } => FormulationResult {
                status: SolveStatus::Optimal,
                objective,
                siting: Some(self.get_siting_from_solution(&columns)),
            },
            other => FormulationResult::sentinel(other.status()),
        })
    }
}

/// The objective of one formulation, or the sentinel 0 when no optimal
/// solution was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct FormulationResult {
    pub status: SolveStatus,
    pub objective: f64,
    pub siting: Option<Vec<bool>>,
}

impl FormulationResult {
    pub fn sentinel(status: SolveStatus) -> Self {
        Self {
            status,
            objective: 0.0,
            siting: None,
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::oracle::testing::{BrokenOracle, FixedOracle};
    use crate::oracle::HighsOracle;
    use crate::scenario::{self, DemandLaw};
    use crate::system::{Client, Site};

    fn scenarios_for(system: &System, delta: f64) -> ScenarioSet {
        scenario::generate(
            &system.base_demands(),
            delta,
            &DemandLaw::default(),
            scenario::DEFAULT_MAX_SCENARIOS,
        )
        .unwrap()
    }

    fn two_site_system() -> System {
        let sites = vec![Site::new(0, 60.0, 700.0), Site::new(1, 40.0, 300.0)];
        let clients = vec![
            Client::new(0, 12.0, vec![30.0, 25.0]),
            Client::new(1, 18.0, vec![22.0, 35.0]),
        ];
        System::new(sites, clients).unwrap()
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-4, "{} != {}", a, b);
    }

    /// Position of a (realization, client, site) entry in the accessors
    fn flat_index(
        model: &FacilityModel,
        s: usize,
        i: usize,
        j: usize,
    ) -> usize {
        (s * model.num_clients + i) * model.num_sites + j
    }

    fn shipped(model: &FacilityModel, s: usize, i: usize, j: usize) -> usize {
        model.accessors.shipped[flat_index(model, s, i, j)]
    }

    fn assigned(model: &FacilityModel, s: usize, i: usize, j: usize) -> usize {
        model.accessors.assigned[flat_index(model, s, i, j)]
    }

    #[test]
    fn test_stochastic_model_dimensions() {
        let system = System::default();
        let scenarios = scenarios_for(&system, 20.0);
        let model =
            FacilityModel::new(&system, &scenarios, Formulation::Stochastic)
                .unwrap();
        // N + 2 * S * M * N columns, S * (N + 2M + M * N) rows
        assert_eq!(model.num_realizations, 9);
        assert_eq!(model.problem.num_col, 1 + 2 * 9 * 2);
        assert_eq!(model.problem.num_row, 9 * (1 + 4 + 2));
        assert_eq!(model.accessors.open.len(), 1);
        assert_eq!(model.accessors.shipped.len(), 18);
        assert_eq!(model.accessors.capacity.len(), 9);
        assert_eq!(model.accessors.coverage.len(), 18);
        assert_eq!(model.accessors.assignment.len(), 18);
        assert_eq!(model.accessors.linking.len(), 18);
    }

    #[test]
    fn test_single_instance_model_dimensions() {
        let system = two_site_system();
        let scenarios = scenarios_for(&system, 20.0);
        for formulation in
            [Formulation::WaitAndSee(4), Formulation::ExpectedValue]
        {
            let model =
                FacilityModel::new(&system, &scenarios, formulation).unwrap();
            assert_eq!(model.num_realizations, 1);
            assert_eq!(model.problem.num_col, 2 + 2 * 2 * 2);
            assert_eq!(model.problem.num_row, 2 + 2 * 2 + 2 * 2);
        }
    }

    #[test]
    fn test_objective_weights_follow_probabilities() {
        let system = System::default();
        let scenarios = scenarios_for(&system, 20.0);
        let model =
            FacilityModel::new(&system, &scenarios, Formulation::Stochastic)
                .unwrap();
        let open = model.accessors.open[0];
        assert_eq!(model.problem.col_cost[open], -500.0);
        for scenario in scenarios.scenarios() {
            let col = shipped(&model, scenario.id, 1, 0);
            assert_close(
                model.problem.col_cost[col],
                20.0 * scenario.probability,
            );
            let col = assigned(&model, scenario.id, 1, 0);
            assert_eq!(model.problem.col_cost[col], 0.0);
        }

        let model =
            FacilityModel::new(&system, &scenarios, Formulation::WaitAndSee(3))
                .unwrap();
        assert_eq!(model.problem.col_cost[shipped(&model, 0, 0, 0)], 20.0);
    }

    #[test]
    fn test_coverage_rows_use_scenario_demands() {
        let system = System::default();
        let scenarios = scenarios_for(&system, 20.0);
        let model =
            FacilityModel::new(&system, &scenarios, Formulation::Stochastic)
                .unwrap();
        for scenario in scenarios.scenarios() {
            for client_id in 0..2 {
                let row = model.accessors.coverage[scenario.id * 2 + client_id];
                assert_close(
                    model.problem.row_lower[row],
                    scenario.demands[client_id],
                );
            }
        }

        let model =
            FacilityModel::new(&system, &scenarios, Formulation::ExpectedValue)
                .unwrap();
        let row = model.accessors.coverage[1];
        assert_close(model.problem.row_lower[row], 20.6);
    }

    #[test]
    fn test_fixed_siting_bounds() {
        let system = two_site_system();
        let scenarios = scenarios_for(&system, 5.0);
        let model = FacilityModel::new(
            &system,
            &scenarios,
            Formulation::FixedSiting(vec![false, true]),
        )
        .unwrap();
        assert_eq!(model.num_realizations, 9);
        let closed = model.accessors.open[0];
        let open = model.accessors.open[1];
        assert_eq!(model.problem.col_upper[closed], 0.0);
        assert_eq!(model.problem.col_lower[open], 1.0);
        assert_eq!(model.problem.col_upper[open], 1.0);
    }

    #[test]
    fn test_reject_bad_inputs() {
        let system = two_site_system();
        let scenarios = scenarios_for(&system, 5.0);
        assert!(FacilityModel::new(
            &system,
            &scenarios,
            Formulation::WaitAndSee(9)
        )
        .is_err());
        assert!(FacilityModel::new(
            &system,
            &scenarios,
            Formulation::FixedSiting(vec![true])
        )
        .is_err());
        let other = scenarios_for(&System::default(), 5.0);
        let three_clients = System::new(
            vec![Site::new(0, 60.0, 700.0)],
            vec![
                Client::new(0, 1.0, vec![1.0]),
                Client::new(1, 1.0, vec![1.0]),
                Client::new(2, 1.0, vec![1.0]),
            ],
        )
        .unwrap();
        assert!(FacilityModel::new(
            &three_clients,
            &other,
            Formulation::Stochastic
        )
        .is_err());
    }

    #[test]
    fn test_solve_single_site_formulations() {
        let system = System::default();
        let scenarios = scenarios_for(&system, 20.0);
        let oracle = HighsOracle::default();

        // 20 * (10.3 + 20.6) - 500
        let stochastic =
            FacilityModel::new(&system, &scenarios, Formulation::Stochastic)
                .unwrap()
                .solve(&oracle)
                .unwrap();
        assert!(stochastic.is_optimal());
        assert_close(stochastic.objective, 118.0);
        assert_eq!(stochastic.siting, Some(vec![true]));

        // both clients at high demand: 20 * (12 + 24) - 500
        let wait_and_see =
            FacilityModel::new(&system, &scenarios, Formulation::WaitAndSee(8))
                .unwrap()
                .solve(&oracle)
                .unwrap();
        assert_close(wait_and_see.objective, 220.0);

        let expected_value =
            FacilityModel::new(&system, &scenarios, Formulation::ExpectedValue)
                .unwrap()
                .solve(&oracle)
                .unwrap();
        assert_close(expected_value.objective, 118.0);
    }

    #[test]
    fn test_solve_two_site_model() {
        let system = two_site_system();
        let scenarios = scenarios_for(&system, 20.0);
        let oracle = HighsOracle::default();
        let stochastic =
            FacilityModel::new(&system, &scenarios, Formulation::Stochastic)
                .unwrap()
                .solve(&oracle)
                .unwrap();
        assert!(stochastic.is_optimal());
        let siting = stochastic.siting.clone().unwrap();
        assert_eq!(siting.len(), 2);

        // fixing the optimal siting cannot change the optimal value
        let fixed = FacilityModel::new(
            &system,
            &scenarios,
            Formulation::FixedSiting(siting),
        )
        .unwrap()
        .solve(&oracle)
        .unwrap();
        assert_close(fixed.objective, stochastic.objective);
    }

    #[test]
    fn test_infeasible_model_returns_sentinel() {
        let system = System::new(
            vec![Site::new(0, 10.0, 100.0)],
            vec![Client::new(0, 20.0, vec![5.0])],
        )
        .unwrap();
        let scenarios = scenarios_for(&system, 10.0);
        let result =
            FacilityModel::new(&system, &scenarios, Formulation::WaitAndSee(0))
                .unwrap()
                .solve(&HighsOracle::default())
                .unwrap();
        assert_eq!(result.status, SolveStatus::Infeasible);
        assert_eq!(result.objective, 0.0);
        assert_eq!(result.siting, None);
    }

    #[test]
    fn test_closed_fixed_siting_is_infeasible() {
        let system = System::default();
        let scenarios = scenarios_for(&system, 20.0);
        let result = FacilityModel::new(
            &system,
            &scenarios,
            Formulation::FixedSiting(vec![false]),
        )
        .unwrap()
        .solve(&HighsOracle::default())
        .unwrap();
        assert_eq!(
            result,
            FormulationResult::sentinel(SolveStatus::Infeasible)
        );
    }

    #[test]
    fn test_timed_out_is_kept_apart_from_infeasible() {
        let system = System::default();
        let scenarios = scenarios_for(&system, 20.0);
        let model =
            FacilityModel::new(&system, &scenarios, Formulation::Stochastic)
                .unwrap();
        let result = model.solve(&FixedOracle(Outcome::TimedOut)).unwrap();
        assert_eq!(result.status, SolveStatus::TimedOut);
        assert_eq!(result.objective, 0.0);
        assert!(!result.is_optimal());
    }

    #[test]
    fn test_oracle_failure_is_an_error() {
        let system = System::default();
        let scenarios = scenarios_for(&system, 20.0);
        let model =
            FacilityModel::new(&system, &scenarios, Formulation::ExpectedValue)
                .unwrap();
        assert!(matches!(model.solve(&BrokenOracle), Err(Error::Solver(_))));
    }
}
