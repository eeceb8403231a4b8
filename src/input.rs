use crate::error::Error;
use crate::metrics::Aggregation;
use crate::oracle::SolverOptions;
use crate::scenario::{self, DemandLaw};
use crate::system::{Client, Site, System};
use rand::prelude::*;
use rand_distr::Uniform;
use rand_xoshiro::Xoshiro256Plus;
use serde::Deserialize;
use std::fs;

fn default_probabilities() -> [f64; 3] {
    scenario::DEFAULT_PROBABILITIES
}

fn default_max_scenarios() -> usize {
    scenario::DEFAULT_MAX_SCENARIOS
}

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Relative demand perturbations, in percent
    pub deltas: Vec<f64>,
    #[serde(default = "default_probabilities")]
    pub probabilities: [f64; 3],
    #[serde(default = "default_max_scenarios")]
    pub max_scenarios: usize,
    #[serde(default)]
    pub num_threads: Option<usize>,
    /// Per-solve budget, in seconds
    #[serde(default)]
    pub time_limit: Option<f64>,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub wait_and_see_aggregation: Aggregation,
}

impl Config {
    pub fn validate(&self) -> Result<(), Error> {
        if self.deltas.is_empty() {
            return Err(Error::InvalidParameter(
                "at least one delta is required".to_string(),
            ));
        }
        if let Some(delta) =
            self.deltas.iter().find(|d| !(0.0..=100.0).contains(*d))
        {
            return Err(Error::InvalidParameter(format!(
                "delta must be within [0, 100], got {}",
                delta
            )));
        }
        if let Some(time_limit) = self.time_limit {
            if !(time_limit.is_finite() && time_limit > 0.0) {
                return Err(Error::InvalidParameter(format!(
                    "time limit must be positive, got {}",
                    time_limit
                )));
            }
        }
        if self.num_threads == Some(0) {
            return Err(Error::InvalidParameter(
                "num_threads must be at least 1".to_string(),
            ));
        }
        self.demand_law()?;
        Ok(())
    }

    pub fn demand_law(&self) -> Result<DemandLaw, Error> {
        DemandLaw::new(self.probabilities)
    }

    pub fn solver_options(&self) -> SolverOptions {
        SolverOptions {
            time_limit: self.time_limit,
            verbose: self.verbose,
        }
    }
}

pub fn read_config_input(filepath: &str) -> Result<Config, Error> {
    let contents = fs::read_to_string(filepath)?;
    let parsed: Config = serde_json::from_str(&contents)?;
    parsed.validate()?;
    Ok(parsed)
}

#[derive(Debug, Deserialize)]
pub struct SiteInput {
    pub id: usize,
    pub capacity: f64,
    pub construction_cost: f64,
}

#[derive(Debug, Deserialize)]
pub struct ClientInput {
    pub id: usize,
    pub base_demand: f64,
    pub revenues: Vec<f64>,
}

fn default_capacity_range() -> [u32; 2] {
    [50, 100]
}

fn default_construction_cost_range() -> [u32; 2] {
    [500, 1000]
}

fn default_revenue_range() -> [u32; 2] {
    [10, 50]
}

fn default_base_demand_range() -> [u32; 2] {
    [10, 30]
}

/// Seeded random instance. Every range is half-open, `[low, high)`.
#[derive(Debug, Deserialize)]
pub struct GeneratorInput {
    pub seed: u64,
    pub num_clients: usize,
    pub num_sites: usize,
    #[serde(default = "default_capacity_range")]
    pub capacity: [u32; 2],
    #[serde(default = "default_construction_cost_range")]
    pub construction_cost: [u32; 2],
    #[serde(default = "default_revenue_range")]
    pub revenue: [u32; 2],
    #[serde(default = "default_base_demand_range")]
    pub base_demand: [u32; 2],
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SystemInput {
    Explicit {
        sites: Vec<SiteInput>,
        clients: Vec<ClientInput>,
    },
    Generated(GeneratorInput),
}

pub fn read_system_input(filepath: &str) -> Result<SystemInput, Error> {
    let contents = fs::read_to_string(filepath)?;
    let parsed: SystemInput = serde_json::from_str(&contents)?;
    Ok(parsed)
}

fn validate_id_range(ids: &[usize], elem_name: &str) -> Result<(), Error> {
    for elem_id in 0..ids.len() {
        if ids.iter().filter(|id| **id == elem_id).count() != 1 {
            return Err(Error::InvalidParameter(format!(
                "ID {} not found exactly once for {}",
                elem_id, elem_name
            )));
        }
    }
    Ok(())
}

fn uniform(range: [u32; 2], elem_name: &str) -> Result<Uniform<u32>, Error> {
    Uniform::new(range[0], range[1]).map_err(|_| {
        Error::InvalidParameter(format!(
            "invalid {} range [{}, {})",
            elem_name, range[0], range[1]
        ))
    })
}

impl GeneratorInput {
    pub fn build_system(&self) -> Result<System, Error> {
        let mut rng = Xoshiro256Plus::seed_from_u64(self.seed);
        let capacity = uniform(self.capacity, "capacity")?;
        let construction_cost =
            uniform(self.construction_cost, "construction cost")?;
        let revenue = uniform(self.revenue, "revenue")?;
        let base_demand = uniform(self.base_demand, "base demand")?;

        let capacities: Vec<u32> =
            (0..self.num_sites).map(|_| rng.sample(&capacity)).collect();
        let costs: Vec<u32> = (0..self.num_sites)
            .map(|_| rng.sample(&construction_cost))
            .collect();
        let sites = (0..self.num_sites)
            .map(|id| Site::new(id, capacities[id] as f64, costs[id] as f64))
            .collect();

        let revenues: Vec<Vec<f64>> = (0..self.num_clients)
            .map(|_| {
                (0..self.num_sites)
                    .map(|_| rng.sample(&revenue) as f64)
                    .collect()
            })
            .collect();
        let clients = revenues
            .into_iter()
            .enumerate()
            .map(|(id, r)| Client::new(id, rng.sample(&base_demand) as f64, r))
            .collect();

        System::new(sites, clients)
    }
}

impl SystemInput {
    pub fn build_system(&self) -> Result<System, Error> {
        match self {
            SystemInput::Explicit { sites, clients } => {
                let site_ids: Vec<usize> = sites.iter().map(|s| s.id).collect();
                let client_ids: Vec<usize> =
                    clients.iter().map(|c| c.id).collect();
                validate_id_range(&site_ids, "sites")?;
                validate_id_range(&client_ids, "clients")?;

                let mut sites: Vec<Site> = sites
                    .iter()
                    .map(|s| Site::new(s.id, s.capacity, s.construction_cost))
                    .collect();
                sites.sort_by_key(|s| s.id);
                let mut clients: Vec<Client> = clients
                    .iter()
                    .map(|c| {
                        Client::new(c.id, c.base_demand, c.revenues.clone())
                    })
                    .collect();
                clients.sort_by_key(|c| c.id);

                System::new(sites, clients)
            }
            SystemInput::Generated(generator) => generator.build_system(),
        }
    }
}

pub struct Input {
    pub config: Config,
    pub system: System,
}

impl Input {
    /// Reads `config.json` and `system.json` from `path`. Any invalid
    /// parameter fails here, before scenarios are generated.
    pub fn build(path: &str) -> Result<Self, Error> {
        let config = read_config_input(&(path.to_owned() + "/config.json"))?;
        let system = read_system_input(&(path.to_owned() + "/system.json"))?
            .build_system()?;
        Ok(Self { config, system })
    }
}
