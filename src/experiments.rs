use rand::{distributions::Distribution, Rng, SeedableRng};

/// Number of job requests generated for each experiment.
pub const GENERATED_JOBS_COUNT: usize = 50;

/// Width of one simulation step, in s.
const TIME_STEP: u64 = 10;

/// Spread of the job inter-arrival times.
const DYNAMISM: f64 = 500.0;
/// Location of the job mass distribution.
const MASS_BASE: f64 = 1700.0;
/// Disparity of the job mass distribution.
const DISPARITY: f64 = 3.8;

/// A reproducible simulation environment: generates job traces and drives
/// schedulers over them until drain.
#[derive(Debug, Clone, Copy)]
pub struct Experiments {
    pub flags: crate::scheduler::PolicyFlags,
    /// Number of requests per generated trace.
    pub job_count: usize,
}

impl Experiments {
    pub fn new(flags: crate::scheduler::PolicyFlags) -> Self {
        Self {
            flags,
            job_count: GENERATED_JOBS_COUNT,
        }
    }

    /// Run `num_expts` experiments with the given configuration, experiment
    /// `i` using seed `seed_num + i`.
    pub fn run_expts(
        &self,
        config: &crate::scheduler::SchedulerConfig,
        num_srvs: usize,
        num_expts: usize,
        seed_num: u64,
    ) -> anyhow::Result<Vec<crate::scheduler::SchedulerStats>> {
        let mut stats = Vec::with_capacity(num_expts);
        for i in 0..num_expts {
            let scheduler = self.run_expt(config, num_srvs, seed_num + i as u64)?;
            stats.push(scheduler.stats(1.0, 1.0)?);
        }
        Ok(stats)
    }

    /// Run one experiment to drain and return the final scheduler state.
    fn run_expt(
        &self,
        config: &crate::scheduler::SchedulerConfig,
        num_srvs: usize,
        seed_num: u64,
    ) -> anyhow::Result<crate::scheduler::Scheduler> {
        anyhow::ensure!(num_srvs > 1, "at least two servers are required");
        let mut scheduler =
            crate::scheduler::Scheduler::new(num_srvs, config.clone(), self.flags, seed_num)?;
        let mut requests = Self::generate_jobs(self.job_count, num_srvs, seed_num)?;

        let mut time = 0_u64;
        while !requests.is_empty() || scheduler.is_working() {
            while requests
                .front()
                .map_or(false, |req| req.sub_time <= time as f64)
            {
                scheduler.schedule(requests.pop_front().unwrap());
            }
            scheduler.update_schedule(time as f64);
            time += TIME_STEP;
        }
        scheduler.stop(time as f64);
        Ok(scheduler)
    }

    /// Generate a trace of `job_count` requests, in submission order.
    pub fn generate_jobs(
        job_count: usize,
        server_count: usize,
        seed_num: u64,
    ) -> anyhow::Result<std::collections::VecDeque<crate::job::JobRequest>> {
        let mut requests = std::collections::VecDeque::with_capacity(job_count);
        let mut previous_sub_time = 0.0;
        for num in 0..job_count {
            let req = Self::generate_job(previous_sub_time, server_count, num, seed_num)?;
            previous_sub_time = req.sub_time;
            requests.push_back(req);
        }
        Ok(requests)
    }

    /// Generate the `num`-th request of a trace from its own PRNG.
    fn generate_job(
        previous_sub_time: f64,
        server_count: usize,
        num: usize,
        seed_num: u64,
    ) -> anyhow::Result<crate::job::JobRequest> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed_num + num as u64);

        // heavy-tailed inter-arrival, shifted to start at zero
        let arrival_rv = rand_distr::Pareto::new(1.0, 4.0).unwrap();
        let sub_time = previous_sub_time + (arrival_rv.sample(&mut rng) - 1.0) * 3.0 * DYNAMISM;

        let mu = (MASS_BASE / DISPARITY).ln();
        let sigma = (2.0 * (MASS_BASE.ln() - mu)).sqrt();
        let mass_rv = rand_distr::LogNormal::new(mu, sigma).unwrap();
        let mass = mass_rv.sample(&mut rng);

        let alpha = rng.gen_range(0.5..1.0);
        let data = rng.gen_range(10.0..500.0);
        let min_num_servers = ((alpha / 3.0) * (server_count - 1) as f64).ceil() as usize;
        let max_num_servers = rng.gen_range(min_num_servers..server_count);

        crate::job::JobRequest::new(
            format!("job{}", num),
            sub_time,
            alpha,
            data,
            mass,
            min_num_servers,
            max_num_servers,
        )
    }
}
