use crate::error::Error;
use crate::utils;

/// Marginal probabilities of the low, nominal and high demand levels
pub const DEFAULT_PROBABILITIES: [f64; 3] = [0.2, 0.45, 0.35];

/// Largest joint scenario set built unless configured otherwise (3^10)
pub const DEFAULT_MAX_SCENARIOS: usize = 59049;

const PROBABILITY_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemandLevel {
    Low,
    Nominal,
    High,
}

impl DemandLevel {
    pub const ALL: [DemandLevel; 3] =
        [DemandLevel::Low, DemandLevel::Nominal, DemandLevel::High];

    pub fn index(self) -> usize {
        match self {
            DemandLevel::Low => 0,
            DemandLevel::Nominal => 1,
            DemandLevel::High => 2,
        }
    }

    /// Multiplier applied to the base demand, for `delta` in percent
    pub fn factor(self, delta: f64) -> f64 {
        match self {
            DemandLevel::Low => 1.0 - delta / 100.0,
            DemandLevel::Nominal => 1.0,
            DemandLevel::High => 1.0 + delta / 100.0,
        }
    }
}

/// The 3-point law followed independently by every client demand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemandLaw {
    probabilities: [f64; 3],
}

impl DemandLaw {
    pub fn new(probabilities: [f64; 3]) -> Result<Self, Error> {
        if probabilities.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(Error::InvalidParameter(format!(
                "demand level probabilities must be non-negative: {:?}",
                probabilities
            )));
        }
        let total: f64 = probabilities.iter().sum();
        if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(Error::InvalidParameter(format!(
                "demand level probabilities sum to {} instead of 1",
                total
            )));
        }
        Ok(Self { probabilities })
    }

    pub fn probability(&self, level: DemandLevel) -> f64 {
        self.probabilities[level.index()]
    }
}

impl Default for DemandLaw {
    fn default() -> Self {
        Self {
            probabilities: DEFAULT_PROBABILITIES,
        }
    }
}

/// One joint realization of all client demands
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub id: usize,
    pub levels: Vec<DemandLevel>,
    pub demands: Vec<f64>,
    pub probability: f64,
}

/// The full joint scenario set for one delta. The position of a scenario
/// is its id, and every formulation indexes scenarios by it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSet {
    pub delta: f64,
    scenarios: Vec<Scenario>,
}

impl ScenarioSet {
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    pub fn num_clients(&self) -> usize {
        self.scenarios.first().map_or(0, |s| s.demands.len())
    }

    pub fn get(&self, id: usize) -> Option<&Scenario> {
        self.scenarios.get(id)
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// Hands the scenarios over, dropping the set
    pub fn into_scenarios(self) -> Vec<Scenario> {
        self.scenarios
    }

    pub fn probabilities(&self) -> Vec<f64> {
        self.scenarios.iter().map(|s| s.probability).collect()
    }

    /// Probability-weighted mean demand of each client
    pub fn mean_demand(&self) -> Vec<f64> {
        let probabilities = self.probabilities();
        (0..self.num_clients())
            .map(|client_id| {
                let demands: Vec<f64> = self
                    .scenarios
                    .iter()
                    .map(|s| s.demands[client_id])
                    .collect();
                utils::dot_product(&probabilities, &demands)
            })
            .collect()
    }
}

/// Number of joint scenarios for `num_clients`, or `ScenarioLimit` when it
/// exceeds `max_scenarios` (or does not fit in a usize).
pub fn scenario_count(
    num_clients: usize,
    max_scenarios: usize,
) -> Result<usize, Error> {
    let count = u32::try_from(num_clients)
        .ok()
        .and_then(|exponent| DemandLevel::ALL.len().checked_pow(exponent));
    match count {
        Some(count) if count <= max_scenarios => Ok(count),
        _ => Err(Error::ScenarioLimit {
            num_clients,
            limit: max_scenarios,
        }),
    }
}

/// Enumerates every combination of demand levels across clients. Client 0
/// varies slowest and levels go low, nominal, high. With `delta == 0` the
/// levels coincide but all 3^M scenarios are still produced.
pub fn generate(
    base_demands: &[f64],
    delta: f64,
    law: &DemandLaw,
    max_scenarios: usize,
) -> Result<ScenarioSet, Error> {
    if base_demands.is_empty() {
        return Err(Error::InvalidParameter(
            "scenarios need at least one client".to_string(),
        ));
    }
    if !(0.0..=100.0).contains(&delta) {
        return Err(Error::InvalidParameter(format!(
            "delta must be within [0, 100], got {}",
            delta
        )));
    }

    let num_clients = base_demands.len();
    let num_scenarios = scenario_count(num_clients, max_scenarios)?;
    let num_levels = DemandLevel::ALL.len();

    let mut scenarios = Vec::<Scenario>::with_capacity(num_scenarios);
    for id in 0..num_scenarios {
        let mut levels = vec![DemandLevel::Nominal; num_clients];
        let mut remainder = id;
        for client_id in (0..num_clients).rev() {
            levels[client_id] = DemandLevel::ALL[remainder % num_levels];
            remainder /= num_levels;
        }
        let demands = levels
            .iter()
            .zip(base_demands.iter())
            .map(|(level, base)| base * level.factor(delta))
            .collect();
        let probability = levels.iter().map(|l| law.probability(*l)).product();
        scenarios.push(Scenario {
            id,
            levels,
            demands,
            probability,
        });
    }

    Ok(ScenarioSet { delta, scenarios })
}
