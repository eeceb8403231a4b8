use thiserror::Error;

/// Failures that stop an evaluation. Infeasible and timed-out solves are
/// not errors: they are carried as a [`crate::oracle::SolveStatus`] in the
/// result records.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error(
        "{num_clients} clients exceed the scenario limit of {limit} \
         (3^{num_clients} joint scenarios)"
    )]
    ScenarioLimit { num_clients: usize, limit: usize },

    #[error("efficiency is undefined: expected perfect information is zero")]
    DivisionUndefined,

    #[error("solver failure: {0}")]
    Solver(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
