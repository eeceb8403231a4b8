use crate::error::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub id: usize,
    pub capacity: f64,
    pub construction_cost: f64,
}

impl Site {
    pub fn new(id: usize, capacity: f64, construction_cost: f64) -> Self {
        Self {
            id,
            capacity,
            construction_cost,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Client {
    pub id: usize,
    pub base_demand: f64,
    /// Revenue per unit shipped, indexed by site id
    pub revenues: Vec<f64>,
}

impl Client {
    pub fn new(id: usize, base_demand: f64, revenues: Vec<f64>) -> Self {
        Self {
            id,
            base_demand,
            revenues,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemMetadata {
    pub clients_count: usize,
    pub sites_count: usize,
}

/// The fixed data of a facility location instance. Sites and clients are
/// stored by id, which must match their position.
#[derive(Debug, Clone, PartialEq)]
pub struct System {
    pub sites: Vec<Site>,
    pub clients: Vec<Client>,
    pub meta: SystemMetadata,
}

fn invalid(message: String) -> Error {
    Error::InvalidParameter(message)
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

impl System {
    /// Builds the system, rejecting non-positive capacities, costs and
    /// demands, negative revenues and mismatched dimensions.
    pub fn new(sites: Vec<Site>, clients: Vec<Client>) -> Result<Self, Error> {
        if sites.is_empty() {
            return Err(invalid("at least one site is required".to_string()));
        }
        if clients.is_empty() {
            return Err(invalid("at least one client is required".to_string()));
        }
        for (index, site) in sites.iter().enumerate() {
            if site.id != index {
                return Err(invalid(format!(
                    "site at position {} has id {}",
                    index, site.id
                )));
            }
            if !is_positive(site.capacity) {
                return Err(invalid(format!(
                    "site {} has non-positive capacity {}",
                    site.id, site.capacity
                )));
            }
            if !is_positive(site.construction_cost) {
                return Err(invalid(format!(
                    "site {} has non-positive construction cost {}",
                    site.id, site.construction_cost
                )));
            }
        }
        for (index, client) in clients.iter().enumerate() {
            if client.id != index {
                return Err(invalid(format!(
                    "client at position {} has id {}",
                    index, client.id
                )));
            }
            if !is_positive(client.base_demand) {
                return Err(invalid(format!(
                    "client {} has non-positive base demand {}",
                    client.id, client.base_demand
                )));
            }
            if client.revenues.len() != sites.len() {
                return Err(invalid(format!(
                    "client {} has {} revenues for {} sites",
                    client.id,
                    client.revenues.len(),
                    sites.len()
                )));
            }
            if let Some(r) = client
                .revenues
                .iter()
                .find(|r| !r.is_finite() || **r < 0.0)
            {
                return Err(invalid(format!(
                    "client {} has invalid revenue {}",
                    client.id, r
                )));
            }
        }

        Ok(Self::assemble(sites, clients))
    }

    fn assemble(sites: Vec<Site>, clients: Vec<Client>) -> Self {
        let meta = SystemMetadata {
            clients_count: clients.len(),
            sites_count: sites.len(),
        };
        Self {
            sites,
            clients,
            meta,
        }
    }

    pub fn base_demands(&self) -> Vec<f64> {
        self.clients.iter().map(|c| c.base_demand).collect()
    }

}

impl Default for System {
    /// Two clients served by a single site
    fn default() -> Self {
        let sites = vec![Site::new(0, 100.0, 500.0)];
        let clients = vec![
            Client::new(0, 10.0, vec![20.0]),
            Client::new(1, 20.0, vec![20.0]),
        ];
        Self::assemble(sites, clients)
    }
}
