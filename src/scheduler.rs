use anyhow::Context;
use rand::{seq::SliceRandom, Rng, SeedableRng};

/// The eight tunable parameters of the scheduling policies.
///
/// The declaration order is load-bearing: it is the vector layout used by
/// the swarm optimiser and the column order of the CSV row.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Scale of the reconfiguration decision term, in [0, 1].
    pub reconfig_scale: f64,
    /// Exponent on the server-count ratio in the reconfiguration decision, in [0, 1].
    pub reconfig_weight: f64,
    /// Exponent on the speedup factor in the reconfiguration decision, in [0, 1].
    pub alpha_weight: f64,
    /// Scale of the shutdown decision term, in [0, 1].
    pub shutdown_scale: f64,
    /// Exponent on the idle-server ratio in the shutdown decision, in [0, 1].
    pub shutdown_weight: f64,
    /// Short shutdown duration, in s.
    pub shutdown_time_short: f64,
    /// Long shutdown duration, in s.
    pub shutdown_time_long: f64,
    /// Probability of drawing the short shutdown duration, in [0, 1].
    pub shutdown_time_prob: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            reconfig_scale: 0.331,
            reconfig_weight: 0.175,
            alpha_weight: 0.742,
            shutdown_scale: 0.760,
            shutdown_weight: 0.455,
            shutdown_time_short: 899.0,
            shutdown_time_long: 1406.0,
            shutdown_time_prob: 0.717,
        }
    }
}

impl SchedulerConfig {
    pub const PARAM_COUNT: usize = 8;

    /// Legal interval of each parameter, in declaration order.
    pub const BOUNDS: [(f64, f64); Self::PARAM_COUNT] = [
        (0.0, 1.0),
        (0.0, 1.0),
        (0.0, 1.0),
        (0.0, 1.0),
        (0.0, 1.0),
        (260.0, 100_000.0),
        (260.0, 100_000.0),
        (0.0, 1.0),
    ];

    /// Draw a configuration uniformly over the initialisation intervals.
    pub fn random(rng: &mut rand::rngs::StdRng) -> Self {
        Self {
            shutdown_scale: rng.gen_range(0.001..1.0),
            shutdown_weight: rng.gen_range(0.01..1.0),
            reconfig_scale: rng.gen_range(0.001..1.0),
            reconfig_weight: rng.gen_range(0.01..1.0),
            shutdown_time_short: rng.gen_range(370.0..1200.0),
            shutdown_time_long: rng.gen_range(370.0..4000.0),
            shutdown_time_prob: rng.gen_range(0.0001..1.0),
            alpha_weight: rng.gen_range(0.001..1.0),
        }
    }

    /// The parameters as a position vector, in declaration order.
    pub fn to_array(&self) -> [f64; Self::PARAM_COUNT] {
        [
            self.reconfig_scale,
            self.reconfig_weight,
            self.alpha_weight,
            self.shutdown_scale,
            self.shutdown_weight,
            self.shutdown_time_short,
            self.shutdown_time_long,
            self.shutdown_time_prob,
        ]
    }

    /// Rebuild a configuration from a position vector.
    pub fn from_array(values: [f64; Self::PARAM_COUNT]) -> Self {
        Self {
            reconfig_scale: values[0],
            reconfig_weight: values[1],
            alpha_weight: values[2],
            shutdown_scale: values[3],
            shutdown_weight: values[4],
            shutdown_time_short: values[5],
            shutdown_time_long: values[6],
            shutdown_time_prob: values[7],
        }
    }

    pub fn header() -> &'static str {
        "reconfig_scale,reconfig_weight,alpha_weight,shutdown_scale,shutdown_weight,shutdown_time_short,shutdown_time_long,shutdown_time_prob"
    }

    /// Parse one CSV row written through the `Display` implementation.
    pub fn from_csv_row(row: &str) -> anyhow::Result<Self> {
        let values = row
            .trim()
            .split(',')
            .map(|token| token.trim().parse::<f64>().context("invalid float field"))
            .collect::<anyhow::Result<Vec<f64>>>()?;
        anyhow::ensure!(
            values.len() == Self::PARAM_COUNT,
            "expected {} fields, found {}",
            Self::PARAM_COUNT,
            values.len()
        );
        let mut array = [0.0; Self::PARAM_COUNT];
        array.copy_from_slice(&values);
        Ok(Self::from_array(array))
    }
}

impl std::fmt::Display for SchedulerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{},{},{}",
            self.reconfig_scale,
            self.reconfig_weight,
            self.alpha_weight,
            self.shutdown_scale,
            self.shutdown_weight,
            self.shutdown_time_short,
            self.shutdown_time_long,
            self.shutdown_time_prob
        )
    }
}

/// Toggles for the scheduler's optional policies.
#[derive(Debug, Clone, Copy)]
pub struct PolicyFlags {
    /// Grant running jobs additional servers mid-execution.
    pub reconfig_enabled: bool,
    /// Power off idle servers.
    pub power_off_enabled: bool,
    /// Gate reconfigurations and shutdowns on the tunable decision terms.
    pub param_enabled: bool,
}

impl Default for PolicyFlags {
    fn default() -> Self {
        Self {
            reconfig_enabled: true,
            power_off_enabled: true,
            param_enabled: true,
        }
    }
}

/// Summary statistics of one completed simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerStats {
    /// Start of the earliest completed job, in s.
    pub start_time: f64,
    /// End of the latest completed job, in s.
    pub end_time: f64,
    /// Length of the work span, in s.
    pub work_duration: f64,
    /// Number of completed reconfiguration jobs.
    pub reconfig_count: usize,
    /// Number of completed power-off jobs.
    pub power_off_count: usize,
    pub min_stretch_time: f64,
    pub max_stretch_time: f64,
    pub mean_stretch_time: f64,
    pub stdev_stretch_time: f64,
    /// Total energy normalised by an always-idle cluster.
    pub average_power_norm: f64,
    /// Composite cost of the run.
    pub cost: f64,
}

impl SchedulerStats {
    pub fn header() -> &'static str {
        "start_time,end_time,work_duration,reconfig_count,power_off_count,min_stretch_time,max_stretch_time,mean_stretch_time,stdev_stretch_time,average_power_norm,cost"
    }
}

impl std::fmt::Display for SchedulerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{},{},{},{},{},{}",
            self.start_time,
            self.end_time,
            self.work_duration,
            self.reconfig_count,
            self.power_off_count,
            self.min_stretch_time,
            self.max_stretch_time,
            self.mean_stretch_time,
            self.stdev_stretch_time,
            self.average_power_norm,
            self.cost
        )
    }
}

/// FIFO scheduler with moldable admission, reconfiguration and power-off
/// policies, driven by a fixed-step time counter.
pub struct Scheduler {
    conf: SchedulerConfig,
    flags: PolicyFlags,
    servers: Vec<crate::server::Server>,
    /// Arena of every job ever started; servers and job sets refer to it by index.
    jobs: Vec<crate::job::Job>,
    /// Pending requests, descending by submission time (next to serve is last).
    req_queue: Vec<crate::job::JobRequest>,
    /// The original request of each id, kept for stretch-time accounting.
    req_by_id: std::collections::BTreeMap<String, crate::job::JobRequest>,
    active_jobs: Vec<usize>,
    /// Completed job fragments per request id, chronological within each id.
    complete_jobs: std::collections::BTreeMap<String, Vec<usize>>,
    rng: rand::rngs::StdRng,
}

impl Scheduler {
    pub fn new(
        server_count: usize,
        conf: SchedulerConfig,
        flags: PolicyFlags,
        seed: u64,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(server_count > 0, "vanishing server count");
        Ok(Self {
            conf,
            flags,
            servers: (0..server_count).map(crate::server::Server::new).collect(),
            jobs: vec![],
            req_queue: vec![],
            req_by_id: std::collections::BTreeMap::new(),
            active_jobs: vec![],
            complete_jobs: std::collections::BTreeMap::new(),
            rng: rand::rngs::StdRng::seed_from_u64(seed),
        })
    }

    /// Whether the simulation still has work to do: pending requests, or
    /// active jobs other than power-offs.
    pub fn is_working(&self) -> bool {
        !self.req_queue.is_empty()
            || self
                .active_jobs
                .iter()
                .any(|id| !self.jobs[*id].is_power_off())
    }

    /// Enqueue a request, preserving the queue's descending order.
    pub fn schedule(&mut self, req: crate::job::JobRequest) {
        self.req_by_id.insert(req.id.clone(), req.clone());
        self.req_queue.push(req);
        self.req_queue
            .sort_by(|a, b| b.sub_time.total_cmp(&a.sub_time));
    }

    /// Truncate all still-active jobs at `time` and complete them.
    pub fn stop(&mut self, time: f64) {
        for id in self.active_jobs.clone() {
            self.jobs[id].interrupt(time);
            self.complete_job(id);
        }
    }

    /// Apply one tick of policy at `time`: complete finished jobs, admit
    /// queued requests, possibly reconfigure, possibly power off idle
    /// servers.
    pub fn update_schedule(&mut self, time: f64) {
        let finished: Vec<usize> = self
            .active_jobs
            .iter()
            .copied()
            .filter(|id| self.jobs[*id].is_complete(time))
            .collect();
        for id in finished {
            self.complete_job(id);
        }

        let mut av_servers: Vec<usize> = self
            .servers
            .iter()
            .filter(|server| !server.is_busy(&self.jobs, time))
            .map(|server| server.index)
            .collect();
        log::debug!(
            "update t={} available={} queued={} active={}",
            time,
            av_servers.len(),
            self.req_queue.len(),
            self.active_jobs.len()
        );

        while !self.req_queue.is_empty() && !av_servers.is_empty() {
            let req = self.req_queue.last().unwrap();
            let count = req.max_num_servers.min(av_servers.len());
            if count < req.min_num_servers {
                break;
            }
            let job_servers: Vec<usize> = av_servers
                .choose_multiple(&mut self.rng, count)
                .copied()
                .collect();
            av_servers.retain(|server| !job_servers.contains(server));
            let req = self.req_queue.pop().unwrap();
            log::debug!("admit {} on {} servers at {}", req.id, count, time);
            self.start_job(crate::job::Job::from_request(&req, job_servers, time));
        }

        if self.flags.reconfig_enabled {
            let mut by_mass = self.active_jobs.clone();
            by_mass.sort_by(|a, b| {
                self.jobs[*a]
                    .remaining_mass(time)
                    .total_cmp(&self.jobs[*b].remaining_mass(time))
            });
            let mut next = 0;
            while next < by_mass.len() && !av_servers.is_empty() {
                let id = by_mass[next];
                if self.reconfiguration_permitted(id, av_servers.len(), time) {
                    self.reconfigure_job(id, &mut av_servers, time);
                }
                next += 1;
            }
        }

        if self.flags.power_off_enabled {
            for server in av_servers.clone() {
                if !self.shutdown_allowed_by_queue(av_servers.len()) {
                    break;
                }
                let Some(duration) = self.shutdown_duration(av_servers.len()) else {
                    continue;
                };
                log::debug!("power off server {} for {} s at {}", server, duration, time);
                self.start_job(crate::job::Job::make_power_off(
                    vec![server],
                    time,
                    duration,
                ));
                av_servers.retain(|s| *s != server);
            }
        }
    }

    /// Extract the run's statistics. Pure over the current state.
    pub fn stats(
        &self,
        stretch_time_weight: f64,
        energy_weight: f64,
    ) -> anyhow::Result<SchedulerStats> {
        anyhow::ensure!(
            !self.complete_jobs.is_empty(),
            "no completed job to report on"
        );
        let (start_time, end_time) = self.work_span();
        let work_duration = end_time - start_time;

        let mut stretch = incr_stats::incr::Stats::new();
        for (id, req) in &self.req_by_id {
            let fragments = self
                .complete_jobs
                .get(id)
                .with_context(|| format!("request {} never completed", id))?;
            let last = &self.jobs[*fragments.last().unwrap()];
            stretch.update((last.end_time - req.sub_time) / req.mass)?;
        }

        let average_power_norm = self.normalized_average_power(work_duration);
        let mean_stretch_time = stretch.mean()?;
        Ok(SchedulerStats {
            start_time,
            end_time,
            work_duration,
            reconfig_count: self
                .completed()
                .filter(|job| job.is_reconfiguration())
                .count(),
            power_off_count: self
                .complete_jobs
                .get(crate::job::POWER_OFF_ID)
                .map_or(0, Vec::len),
            min_stretch_time: stretch.min()?,
            max_stretch_time: stretch.max()?,
            mean_stretch_time,
            stdev_stretch_time: stretch.sample_standard_deviation().unwrap_or(0.0),
            average_power_norm,
            cost: mean_stretch_time.powf(stretch_time_weight)
                * average_power_norm.powf(energy_weight),
        })
    }

    /// The job arena. Entries referenced by [`Scheduler::complete_jobs`]
    /// and the servers' histories.
    pub fn jobs(&self) -> &[crate::job::Job] {
        &self.jobs
    }

    /// Completed job fragments per request id, chronological within each id.
    pub fn complete_jobs(&self) -> &std::collections::BTreeMap<String, Vec<usize>> {
        &self.complete_jobs
    }

    pub fn request(&self, id: &str) -> Option<&crate::job::JobRequest> {
        self.req_by_id.get(id)
    }

    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    fn completed(&self) -> impl Iterator<Item = &crate::job::Job> {
        self.complete_jobs
            .values()
            .flatten()
            .map(|id| &self.jobs[*id])
    }

    fn start_job(&mut self, job: crate::job::Job) {
        for other in &self.active_jobs {
            let other = &self.jobs[*other];
            if other.is_running(job.start_time) {
                assert!(
                    !job.servers.iter().any(|s| other.servers.contains(s)),
                    "server held by two jobs at {}: {} and {}",
                    job.start_time,
                    job,
                    other
                );
            }
        }
        let id = self.jobs.len();
        for server in &job.servers {
            self.servers[*server].assign(id);
        }
        log::debug!("start {}", job);
        self.jobs.push(job);
        self.active_jobs.push(id);
    }

    fn complete_job(&mut self, id: usize) {
        self.active_jobs.retain(|job| *job != id);
        log::debug!("complete {}", self.jobs[id]);
        let key = self.jobs[id].id.clone();
        self.complete_jobs.entry(key).or_default().push(id);
    }

    fn reconfiguration_permitted(&self, id: usize, av_count: usize, time: f64) -> bool {
        let job = &self.jobs[id];
        // a follow-on job still waiting behind its reconfiguration must not
        // be split again before it starts
        if !job.is_reconfigurable() || !job.is_running(time) {
            return false;
        }
        let extra = (job.max_server_count - job.servers.len()).min(av_count);
        if self.flags.param_enabled {
            let ratio = (job.servers.len() + extra) as f64 / job.max_server_count as f64;
            0.5 < self.conf.reconfig_scale
                * ratio.powf(self.conf.reconfig_weight)
                * job.alpha.powf(self.conf.alpha_weight)
        } else {
            extra > 0
        }
    }

    fn reconfigure_job(&mut self, id: usize, av_servers: &mut Vec<usize>, time: f64) {
        let (extra, remaining_mass) = {
            let job = &self.jobs[id];
            (
                (job.max_server_count - job.servers.len()).min(av_servers.len()),
                job.remaining_mass(time),
            )
        };
        assert!(
            remaining_mass > 0.0,
            "non-positive remaining mass on reconfiguration of {}",
            self.jobs[id]
        );
        let extra_srvs: Vec<usize> = av_servers
            .choose_multiple(&mut self.rng, extra)
            .copied()
            .collect();
        assert!(
            !extra_srvs.is_empty(),
            "reconfiguration of {} leaves the server set unchanged",
            self.jobs[id]
        );
        av_servers.retain(|server| !extra_srvs.contains(server));
        let mut job_servers = self.jobs[id].servers.clone();
        job_servers.extend(extra_srvs);

        log::debug!(
            "reconfigure {} to {} servers at {}",
            self.jobs[id],
            job_servers.len(),
            time
        );
        self.jobs[id].interrupt(time);
        let (reconfiguration, rest) = self.jobs[id].reconfigure(job_servers, time);
        self.complete_job(id);
        self.start_job(reconfiguration);
        self.start_job(rest);
    }

    fn shutdown_allowed_by_queue(&self, av_count: usize) -> bool {
        if self.req_queue.is_empty() {
            return true;
        }
        let required: usize = self
            .req_queue
            .iter()
            .map(|req| req.min_num_servers)
            .sum();
        av_count > required
    }

    /// Decide whether an idle server may shut down, and for how long.
    fn shutdown_duration(&mut self, av_count: usize) -> Option<f64> {
        if !self.flags.param_enabled {
            return Some(self.conf.shutdown_time_short);
        }
        let ratio = av_count as f64 / self.servers.len() as f64;
        if self.conf.shutdown_scale * ratio.powf(self.conf.shutdown_weight) <= 0.5 {
            return None;
        }
        if self.rng.gen::<f64>() < self.conf.shutdown_time_prob {
            Some(self.conf.shutdown_time_short)
        } else {
            Some(self.conf.shutdown_time_long)
        }
    }

    fn work_span(&self) -> (f64, f64) {
        let start = self
            .completed()
            .map(|job| job.start_time)
            .fold(f64::INFINITY, f64::min);
        let end = self
            .completed()
            .map(|job| job.end_time)
            .fold(f64::NEG_INFINITY, f64::max);
        (start, end)
    }

    fn normalized_average_power(&self, work_duration: f64) -> f64 {
        let mut total_energy = 0.0;
        let mut area = 0.0;
        for job in self.completed() {
            let srv_count = job.servers.len() as f64;
            if job.is_power_off() {
                total_energy += crate::server::Server::reboot_energy(job.duration()) * srv_count;
            } else {
                total_energy += crate::server::Server::active_energy(job.duration()) * srv_count;
            }
            area += job.duration() * srv_count;
        }
        let cluster = self.servers.len() as f64;
        total_energy += crate::server::Server::idle_energy(work_duration * cluster - area);
        total_energy / (crate::server::Server::idle_energy(work_duration) * cluster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobRequest;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    fn fifo_flags() -> PolicyFlags {
        PolicyFlags {
            reconfig_enabled: false,
            power_off_enabled: false,
            param_enabled: false,
        }
    }

    #[test]
    fn test_single_job_no_contention() -> anyhow::Result<()> {
        let _ = env_logger::try_init();
        let mut scheduler = Scheduler::new(4, SchedulerConfig::default(), fifo_flags(), 42)?;
        scheduler.schedule(JobRequest::new(
            "A".to_string(),
            0.0,
            1.0,
            10.0,
            100.0,
            2,
            4,
        )?);

        for t in 0..=3 {
            scheduler.update_schedule(t as f64 * 10.0);
        }
        assert!(!scheduler.is_working());

        let fragments = &scheduler.complete_jobs()["A"];
        assert_eq!(fragments.len(), 1);
        let job = &scheduler.jobs()[fragments[0]];
        assert_eq!(job.servers.len(), 4);
        assert_eq!(job.start_time, 0.0);
        assert_eq!(job.end_time, 25.0);

        let stats = scheduler.stats(1.0, 1.0)?;
        assert_close(stats.mean_stretch_time, 0.25);
        assert_close(stats.min_stretch_time, 0.25);
        assert_close(stats.max_stretch_time, 0.25);
        assert_eq!(stats.stdev_stretch_time, 0.0);
        assert_eq!(stats.reconfig_count, 0);
        assert_eq!(stats.power_off_count, 0);
        assert_eq!(stats.work_duration, 25.0);
        // 4 servers active for 25 s, no idle slack
        assert_close(stats.average_power_norm, 191.0 / 95.0);
        assert_close(stats.cost, 0.25 * 191.0 / 95.0);
        Ok(())
    }

    #[test]
    fn test_queue_formation() -> anyhow::Result<()> {
        let mut scheduler = Scheduler::new(2, SchedulerConfig::default(), fifo_flags(), 42)?;
        scheduler.schedule(JobRequest::new(
            "A".to_string(),
            0.0,
            1.0,
            10.0,
            100.0,
            2,
            2,
        )?);
        scheduler.update_schedule(0.0);
        scheduler.schedule(JobRequest::new("B".to_string(), 1.0, 1.0, 10.0, 50.0, 2, 2)?);

        for t in 1..=8 {
            scheduler.update_schedule(t as f64 * 10.0);
        }
        assert!(!scheduler.is_working());

        let a = &scheduler.jobs()[scheduler.complete_jobs()["A"][0]];
        let b = &scheduler.jobs()[scheduler.complete_jobs()["B"][0]];
        assert_eq!((a.start_time, a.end_time), (0.0, 50.0));
        assert_eq!((b.start_time, b.end_time), (50.0, 75.0));

        let stats = scheduler.stats(1.0, 1.0)?;
        assert_close(stats.min_stretch_time, 50.0 / 100.0);
        assert_close(stats.max_stretch_time, 74.0 / 50.0);
        Ok(())
    }

    #[test]
    fn test_reconfiguration_path() -> anyhow::Result<()> {
        let flags = PolicyFlags {
            reconfig_enabled: true,
            power_off_enabled: false,
            param_enabled: false,
        };
        let mut scheduler = Scheduler::new(4, SchedulerConfig::default(), flags, 42)?;
        // three single-server blockers leave exactly one server for A
        for i in 0..3 {
            scheduler.schedule(JobRequest::new(
                format!("blocker{}", i),
                0.0,
                1.0,
                10.0,
                15.0,
                1,
                1,
            )?);
        }
        scheduler.update_schedule(0.0);
        scheduler.schedule(JobRequest::new(
            "A".to_string(),
            1.0,
            1.0,
            20.0,
            1000.0,
            1,
            4,
        )?);

        let mut time = 10.0;
        while scheduler.is_working() {
            scheduler.update_schedule(time);
            time += 10.0;
        }

        let fragments = &scheduler.complete_jobs()["A"];
        assert_eq!(fragments.len(), 3);
        let original = &scheduler.jobs()[fragments[0]];
        let reconfiguration = &scheduler.jobs()[fragments[1]];
        let rest = &scheduler.jobs()[fragments[2]];

        assert_eq!((original.start_time, original.end_time), (10.0, 20.0));
        assert_eq!(original.servers.len(), 1);
        assert!(reconfiguration.is_reconfiguration());
        // 20 / 4 * floor(4 / 1)
        assert_eq!(
            (reconfiguration.start_time, reconfiguration.end_time),
            (20.0, 40.0)
        );
        assert_eq!(rest.servers.len(), 4);
        assert_eq!(rest.start_time, reconfiguration.end_time);
        assert_close(rest.mass, 990.0);
        assert_close(rest.end_time, 40.0 + 990.0 / 4.0);

        assert_eq!(scheduler.stats(1.0, 1.0)?.reconfig_count, 1);
        Ok(())
    }

    #[test]
    fn test_pending_follow_on_is_not_split_again() -> anyhow::Result<()> {
        let flags = PolicyFlags {
            reconfig_enabled: true,
            power_off_enabled: false,
            param_enabled: false,
        };
        let mut scheduler = Scheduler::new(4, SchedulerConfig::default(), flags, 42)?;
        scheduler.schedule(JobRequest::new(
            "b0".to_string(),
            0.0,
            1.0,
            10.0,
            15.0,
            1,
            1,
        )?);
        for i in 1..3 {
            scheduler.schedule(JobRequest::new(
                format!("b{}", i),
                0.0,
                1.0,
                10.0,
                25.0,
                1,
                1,
            )?);
        }
        scheduler.update_schedule(0.0);
        scheduler.schedule(JobRequest::new(
            "A".to_string(),
            1.0,
            1.0,
            100.0,
            1000.0,
            1,
            4,
        )?);
        scheduler.update_schedule(10.0);

        // b0 frees one server at t = 20: A grows from 1 to 2 servers behind
        // a 100 / 2 * floor(2 / 1) = 100 s reconfiguration
        scheduler.update_schedule(20.0);
        assert_eq!(scheduler.complete_jobs()["A"].len(), 1);

        // b1 and b2 free two more servers at t = 30, but the follow-on is
        // still waiting for its reconfiguration and must be left alone
        let mut time = 30.0;
        while time < 120.0 {
            scheduler.update_schedule(time);
            time += 10.0;
        }
        assert_eq!(scheduler.complete_jobs()["A"].len(), 1);

        // once the follow-on runs it is granted the two idle servers
        while scheduler.is_working() {
            scheduler.update_schedule(time);
            time += 10.0;
        }
        let fragments = &scheduler.complete_jobs()["A"];
        assert_eq!(fragments.len(), 5);
        let last = &scheduler.jobs()[fragments[4]];
        assert_eq!(last.servers.len(), 4);
        assert_eq!(scheduler.stats(1.0, 1.0)?.reconfig_count, 2);
        Ok(())
    }

    #[test]
    fn test_power_off_gated_by_queued_demand() -> anyhow::Result<()> {
        let flags = PolicyFlags {
            reconfig_enabled: false,
            power_off_enabled: true,
            param_enabled: false,
        };
        let mut scheduler = Scheduler::new(4, SchedulerConfig::default(), flags, 42)?;
        scheduler.schedule(JobRequest::new(
            "A".to_string(),
            0.0,
            1.0,
            10.0,
            1000.0,
            2,
            2,
        )?);
        scheduler.schedule(JobRequest::new("C".to_string(), 0.0, 1.0, 10.0, 20.0, 2, 2)?);
        scheduler.update_schedule(0.0);
        scheduler.schedule(JobRequest::new(
            "B".to_string(),
            1.0,
            1.0,
            10.0,
            100.0,
            3,
            3,
        )?);
        // C ends at t = 10, freeing two servers
        scheduler.update_schedule(10.0);

        // B cannot be admitted on 2 idle servers, and its queued demand of 3
        // blocks the shutdown even though the policy would always permit it.
        assert_eq!(scheduler.active_jobs.len(), 1);
        assert!(scheduler
            .active_jobs
            .iter()
            .all(|id| !scheduler.jobs[*id].is_power_off()));
        assert_eq!(scheduler.req_queue.len(), 1);
        Ok(())
    }

    #[test]
    fn test_power_off_when_queue_empty() -> anyhow::Result<()> {
        let flags = PolicyFlags {
            reconfig_enabled: false,
            power_off_enabled: true,
            param_enabled: false,
        };
        let mut scheduler = Scheduler::new(4, SchedulerConfig::default(), flags, 42)?;
        scheduler.update_schedule(0.0);

        // all four idle servers power off for the short duration
        assert_eq!(scheduler.active_jobs.len(), 4);
        assert!(scheduler
            .active_jobs
            .iter()
            .all(|id| scheduler.jobs[*id].is_power_off()));
        assert!(!scheduler.is_working());
        let duration = scheduler.conf.shutdown_time_short;
        assert!(scheduler
            .active_jobs
            .iter()
            .all(|id| scheduler.jobs[*id].duration() == duration));
        Ok(())
    }

    #[test]
    fn test_queue_pops_oldest_submission() -> anyhow::Result<()> {
        let mut scheduler = Scheduler::new(2, SchedulerConfig::default(), fifo_flags(), 42)?;
        for (i, sub_time) in [40.0, 10.0, 30.0, 20.0].iter().enumerate() {
            scheduler.schedule(JobRequest::new(
                format!("job{}", i),
                *sub_time,
                1.0,
                10.0,
                100.0,
                1,
                1,
            )?);
        }
        let mut popped = vec![];
        while let Some(req) = scheduler.req_queue.pop() {
            popped.push(req.sub_time);
        }
        assert_eq!(popped, vec![10.0, 20.0, 30.0, 40.0]);
        Ok(())
    }

    #[test]
    fn test_stats_on_empty_run_fails() -> anyhow::Result<()> {
        let scheduler = Scheduler::new(2, SchedulerConfig::default(), fifo_flags(), 42)?;
        assert!(scheduler.stats(1.0, 1.0).is_err());
        Ok(())
    }

    #[test]
    fn test_config_array_round_trip() {
        let config = SchedulerConfig::default();
        assert_eq!(SchedulerConfig::from_array(config.to_array()), config);

        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let config = SchedulerConfig::random(&mut rng);
            assert_eq!(SchedulerConfig::from_array(config.to_array()), config);
        }
    }

    #[test]
    fn test_config_csv_round_trip() -> anyhow::Result<()> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let config = SchedulerConfig::random(&mut rng);
            assert_eq!(SchedulerConfig::from_csv_row(&config.to_string())?, config);
        }
        assert!(SchedulerConfig::from_csv_row("1,2,3").is_err());
        assert!(SchedulerConfig::from_csv_row("a,b,c,d,e,f,g,h").is_err());
        Ok(())
    }
}
