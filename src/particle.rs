use rand::Rng;

/// Cognitive acceleration constant.
const C1: f64 = 2.0;
/// Social acceleration constant.
const C2: f64 = 2.0;
/// Pace of the velocity update.
const PACE: f64 = 0.1;

/// One candidate scheduler configuration in the swarm.
#[derive(Debug, Clone)]
pub struct Particle {
    /// Current position in parameter space.
    pub config: crate::scheduler::SchedulerConfig,
    /// Best position this particle ever visited.
    pub best_config: crate::scheduler::SchedulerConfig,
    /// Cost observed at the best position.
    pub best_cost: f64,
    velocity: [f64; crate::scheduler::SchedulerConfig::PARAM_COUNT],
}

impl Particle {
    pub fn new(config: crate::scheduler::SchedulerConfig) -> Self {
        Self {
            best_config: config.clone(),
            config,
            best_cost: f64::INFINITY,
            velocity: [0.0; crate::scheduler::SchedulerConfig::PARAM_COUNT],
        }
    }

    /// Refresh the personal best with the cost observed at the current
    /// position.
    pub fn update_cost(&mut self, cost: f64) {
        if cost < self.best_cost {
            self.best_cost = cost;
            self.best_config = self.config.clone();
        }
    }

    /// Move the particle, attracted by its personal best and the group
    /// best, then reflect the position back into the parameter bounds.
    pub fn update_position(
        &mut self,
        group_best_config: &crate::scheduler::SchedulerConfig,
        rng: &mut rand::rngs::StdRng,
    ) {
        let mut position = self.config.to_array();
        let best_position = self.best_config.to_array();
        let group_best_position = group_best_config.to_array();
        let r1 = rng.gen::<f64>();
        let r2 = rng.gen::<f64>();

        for i in 0..position.len() {
            self.velocity[i] = PACE
                * (self.velocity[i]
                    + C1 * r1 * (best_position[i] - position[i])
                    + C2 * r2 * (group_best_position[i] - position[i]));
            position[i] += self.velocity[i];
        }
        for (value, (lower, upper)) in position
            .iter_mut()
            .zip(crate::scheduler::SchedulerConfig::BOUNDS)
        {
            *value = reflect(*value, lower, upper);
        }
        self.config = crate::scheduler::SchedulerConfig::from_array(position);
    }
}

/// Map an out-of-bounds value back into its interval by mirroring it at
/// the crossed bound.
pub fn reflect(value: f64, lower_bound: f64, upper_bound: f64) -> f64 {
    if value > upper_bound {
        return upper_bound - (value - upper_bound);
    }
    if value < lower_bound {
        return lower_bound + (lower_bound - value);
    }
    value
}
