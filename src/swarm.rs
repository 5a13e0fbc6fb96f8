use rand::SeedableRng;

/// Cost summary of one optimisation epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochCost {
    /// Epoch index.
    pub epoch: usize,
    /// Lowest particle cost of the epoch.
    pub min: f64,
    /// Highest particle cost of the epoch.
    pub max: f64,
    /// Mean particle cost of the epoch.
    pub mean: f64,
    /// Standard deviation of the particle costs (0 below two samples).
    pub std: f64,
}

impl EpochCost {
    pub fn from_costs(epoch: usize, costs: &[f64]) -> anyhow::Result<Self> {
        let mut stats = incr_stats::incr::Stats::new();
        for cost in costs {
            stats.update(*cost)?;
        }
        Ok(Self {
            epoch,
            min: stats.min()?,
            max: stats.max()?,
            mean: stats.mean()?,
            std: stats.sample_standard_deviation().unwrap_or(0.0),
        })
    }

    pub fn header() -> &'static str {
        "epoch,min,max,mean,std"
    }
}

impl std::fmt::Display for EpochCost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{},{},{},{},{}",
            self.epoch, self.min, self.max, self.mean, self.std
        )
    }
}

/// A population of particles searching the scheduler parameter space.
pub struct Swarm {
    seed: u64,
    population: Vec<crate::particle::Particle>,
    num_srvs: usize,
    num_expts: usize,
    experiments: crate::experiments::Experiments,
    /// Best cost ever observed, across epochs.
    best_cost: f64,
    /// Configuration at the best cost ever observed.
    best_config: crate::scheduler::SchedulerConfig,
    epochs_run: usize,
    rng: rand::rngs::StdRng,
}

impl Swarm {
    pub fn new(
        seed: u64,
        num_particles: usize,
        num_srvs: usize,
        num_expts: usize,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            num_particles > 1,
            "the population needs at least two particles"
        );
        anyhow::ensure!(num_expts > 0, "vanishing experiment count");
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let population = (0..num_particles)
            .map(|_| {
                crate::particle::Particle::new(crate::scheduler::SchedulerConfig::random(&mut rng))
            })
            .collect();
        Ok(Self {
            seed,
            population,
            num_srvs,
            num_expts,
            experiments: crate::experiments::Experiments::new(
                crate::scheduler::PolicyFlags::default(),
            ),
            best_cost: f64::INFINITY,
            best_config: crate::scheduler::SchedulerConfig::default(),
            epochs_run: 0,
            rng,
        })
    }

    /// The best configuration found so far.
    pub fn best_config(&self) -> &crate::scheduler::SchedulerConfig {
        &self.best_config
    }

    /// The cost of the best configuration found so far.
    pub fn best_cost(&self) -> f64 {
        self.best_cost
    }

    /// Run `num_epochs` further epochs. Epoch numbering continues across
    /// calls.
    pub async fn run_epochs(&mut self, num_epochs: usize) -> anyhow::Result<Vec<EpochCost>> {
        let mut epoch_costs = Vec::with_capacity(num_epochs);
        for i in 0..num_epochs {
            log::info!("running epoch {}/{}", i + 1, num_epochs);
            let epoch_cost = self.run_epoch(self.epochs_run).await?;
            epoch_costs.push(epoch_cost);
            self.epochs_run += 1;
        }
        Ok(epoch_costs)
    }

    /// Evaluate every particle in parallel, refresh the bests, then move
    /// the population towards the post-epoch group best.
    async fn run_epoch(&mut self, epoch: usize) -> anyhow::Result<EpochCost> {
        let best = std::sync::Arc::new(std::sync::Mutex::new((
            self.best_cost,
            None::<crate::scheduler::SchedulerConfig>,
        )));

        let mut handles = Vec::with_capacity(self.population.len());
        for (i, particle) in self.population.iter().enumerate() {
            let config = particle.config.clone();
            let experiments = self.experiments;
            let num_srvs = self.num_srvs;
            let num_expts = self.num_expts;
            let seed_num = self.seed + epoch as u64;
            let best = best.clone();
            handles.push(tokio::task::spawn_blocking(move || -> anyhow::Result<f64> {
                let stats = experiments.run_expts(&config, num_srvs, num_expts, seed_num)?;
                let cost = stats.iter().map(|stat| stat.cost).sum::<f64>() / stats.len() as f64;
                log::debug!("particle {} cost {} at epoch {}", i, cost, epoch);
                let mut best = best.lock().unwrap();
                if cost < best.0 {
                    *best = (cost, Some(config));
                }
                Ok(cost)
            }));
        }

        // wait-all barrier: position updates need the post-epoch group best
        let mut costs = Vec::with_capacity(self.population.len());
        for joined in futures::future::join_all(handles).await {
            costs.push(joined??);
        }
        for (particle, cost) in self.population.iter_mut().zip(&costs) {
            particle.update_cost(*cost);
        }

        let (best_cost, best_config) = std::mem::take(&mut *best.lock().unwrap());
        if let Some(config) = best_config {
            self.best_cost = best_cost;
            self.best_config = config;
            log::info!("new group best {} at epoch {}", best_cost, epoch);
        }

        let group_best = self.best_config.clone();
        for particle in &mut self.population {
            particle.update_position(&group_best, &mut self.rng);
        }

        EpochCost::from_costs(epoch, &costs)
    }
}
