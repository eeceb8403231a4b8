use crate::error::Error;
use crate::solver;
use serde::Serialize;

/// How a single formulation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    TimedOut,
}

/// What the oracle returns for one solve. Any other termination of the
/// backend is an [`Error::Solver`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Optimal { objective: f64, columns: Vec<f64> },
    Infeasible,
    TimedOut,
}

impl Outcome {
    pub fn status(&self) -> SolveStatus {
        match self {
            Outcome::Optimal { .. } => SolveStatus::Optimal,
            Outcome::Infeasible => SolveStatus::Infeasible,
            Outcome::TimedOut => SolveStatus::TimedOut,
        }
    }
}

/// A MILP engine. Implementations must be usable from several worker
/// threads at once, so each call owns whatever backend state it needs.
pub trait Oracle: Send + Sync {
    fn solve(
        &self,
        problem: &solver::Problem,
        sense: solver::Sense,
    ) -> Result<Outcome, Error>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SolverOptions {
    /// Per-solve budget, in seconds
    pub time_limit: Option<f64>,
    pub verbose: bool,
}

/// Helper function for setting the same default solver options on
/// every solved problem.
fn set_default_solver_options(
    model: &mut solver::Model,
    options: &SolverOptions,
) -> Result<(), solver::HighsStatus> {
    model.set_option("mip_rel_gap", 1e-6)?;
    model.set_option("primal_feasibility_tolerance", 1e-7)?;
    if let Some(time_limit) = options.time_limit {
        model.set_option("time_limit", time_limit)?;
    }
    if options.verbose {
        model.set_option("output_flag", true)?;
        model.set_option("log_to_console", true)?;
    }
    Ok(())
}

fn solver_error(context: &str, status: impl std::fmt::Debug) -> Error {
    Error::Solver(format!("{context}: {status:?}"))
}

/// Oracle backed by HiGHS. Every call loads the problem into a fresh
/// HiGHS instance that is dropped before returning.
#[derive(Debug, Clone, Default)]
pub struct HighsOracle {
    options: SolverOptions,
}

impl HighsOracle {
    pub fn new(options: SolverOptions) -> Self {
        Self { options }
    }
}

impl Oracle for HighsOracle {
    fn solve(
        &self,
        problem: &solver::Problem,
        sense: solver::Sense,
    ) -> Result<Outcome, Error> {
        let mut model = solver::Model::try_new(problem, sense)
            .map_err(|e| solver_error("could not load model", e))?;
        set_default_solver_options(&mut model, &self.options)
            .map_err(|e| solver_error("could not set options", e))?;
        model
            .try_solve()
            .map_err(|e| solver_error("error while solving model", e))?;

        match model
            .status()
            .map_err(|e| solver_error("unreadable model status", e))?
        {
            solver::HighsModelStatus::Optimal => {
                let solution = model
                    .get_solution()
                    .map_err(|e| solver_error("could not read solution", e))?;
                Ok(Outcome::Optimal {
                    objective: model.get_objective_value(),
                    columns: solution.colvalue,
                })
            }
            solver::HighsModelStatus::Infeasible
            | solver::HighsModelStatus::UnboundedOrInfeasible => {
                Ok(Outcome::Infeasible)
            }
            solver::HighsModelStatus::ReachedTimeLimit => Ok(Outcome::TimedOut),
            status => Err(solver_error("unexpected model status", status)),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn knapsack() -> solver::Problem {
        let mut pb = solver::Problem::new();
        let a = pb.add_integer_column(3.0, 0.0..=1.0);
        let b = pb.add_integer_column(2.0, 0.0..=1.0);
        let c = pb.add_integer_column(2.0, 0.0..=1.0);
        pb.add_row(..=2.0, [(a, 2.0), (b, 1.0), (c, 1.0)]);
        pb
    }

    #[test]
    fn test_highs_oracle_optimal() {
        let oracle = HighsOracle::default();
        let outcome =
            oracle.solve(&knapsack(), solver::Sense::Maximise).unwrap();
        assert_eq!(outcome.status(), SolveStatus::Optimal);
        match outcome {
            Outcome::Optimal { objective, columns } => {
                assert!((objective - 4.0).abs() < 1e-9);
                assert_eq!(columns.len(), 3);
            }
            _ => panic!("expected an optimal outcome"),
        }
    }

    #[test]
    fn test_highs_oracle_infeasible() {
        let mut pb = knapsack();
        pb.add_row(3.0.., [(0, 1.0), (1, 1.0), (2, 1.0)]);
        let oracle = HighsOracle::new(SolverOptions {
            time_limit: Some(10.0),
            verbose: false,
        });
        let outcome = oracle.solve(&pb, solver::Sense::Maximise).unwrap();
        assert_eq!(outcome, Outcome::Infeasible);
    }

    #[test]
    fn test_outcome_status() {
        assert_eq!(Outcome::TimedOut.status(), SolveStatus::TimedOut);
        assert_eq!(Outcome::Infeasible.status(), SolveStatus::Infeasible);
    }
}
