/// Identifier shared by all power-off jobs.
pub const POWER_OFF_ID: &str = "POWER_OFF";

/// The user-supplied specification of a pending job. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    /// Unique request identifier.
    pub id: String,
    /// Submission time, in s.
    pub sub_time: f64,
    /// Parallel speedup exponent, in [0.5, 1].
    pub alpha: f64,
    /// Payload moved when the job is reconfigured, in MB.
    pub data: f64,
    /// Amount of computation requested.
    pub mass: f64,
    /// Minimum acceptable server count.
    pub min_num_servers: usize,
    /// Maximum exploitable server count.
    pub max_num_servers: usize,
}

impl JobRequest {
    pub fn new(
        id: String,
        sub_time: f64,
        alpha: f64,
        data: f64,
        mass: f64,
        min_num_servers: usize,
        max_num_servers: usize,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(sub_time >= 0.0, "negative submission time");
        anyhow::ensure!(mass > 0.0, "vanishing mass");
        anyhow::ensure!(min_num_servers >= 1, "vanishing minimum server count");
        anyhow::ensure!(
            min_num_servers <= max_num_servers,
            "inverted server count interval"
        );
        Ok(Self {
            id,
            sub_time,
            alpha,
            data,
            mass,
            min_num_servers,
            max_num_servers,
        })
    }
}

/// Discriminant of the three job shapes the scheduler manipulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Executes computational mass on its server set.
    Normal,
    /// Zero-mass data movement preparing a job for a larger server set.
    Reconfiguration,
    /// Zero-mass shutdown-then-reboot cycle on one idle server.
    PowerOff,
}

/// A scheduled unit of work over a fixed server set.
///
/// Once created, a job's identity (kind, servers, start time) never
/// changes; only `end_time` may be lowered, by [`Job::interrupt`].
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub kind: JobKind,
    /// Identifier of the request this job belongs to ([`POWER_OFF_ID`] for power-offs).
    pub id: String,
    /// Speedup exponent inherited from the request (0 for zero-mass jobs).
    pub alpha: f64,
    /// Reconfiguration payload inherited from the request, in MB.
    pub data: f64,
    /// Computational mass executed by this fragment.
    pub mass: f64,
    /// Upper bound on the server count inherited from the request.
    pub max_server_count: usize,
    /// Indices of the servers this job runs on.
    pub servers: Vec<usize>,
    /// Start of execution, in s.
    pub start_time: f64,
    /// End of execution, in s.
    pub end_time: f64,
}

impl Job {
    /// Build the normal job serving `req` on the given servers.
    pub fn from_request(req: &JobRequest, servers: Vec<usize>, start_time: f64) -> Self {
        let end_time = start_time + Self::exec_time(req.mass, servers.len(), req.alpha);
        Self {
            kind: JobKind::Normal,
            id: req.id.clone(),
            alpha: req.alpha,
            data: req.data,
            mass: req.mass,
            max_server_count: req.max_num_servers,
            servers,
            start_time,
            end_time,
        }
    }

    /// Build a power-off job holding the given servers down for `duration` seconds.
    pub fn make_power_off(servers: Vec<usize>, start_time: f64, duration: f64) -> Self {
        Self {
            kind: JobKind::PowerOff,
            id: POWER_OFF_ID.to_string(),
            alpha: 0.0,
            data: 0.0,
            mass: 0.0,
            max_server_count: 0,
            servers,
            start_time,
            end_time: start_time + duration,
        }
    }

    /// Makespan of `mass` units of computation over `server_count` servers.
    pub fn exec_time(mass: f64, server_count: usize, alpha: f64) -> f64 {
        mass / (server_count as f64).powf(alpha)
    }

    /// Actual execution time of the job, in s.
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Truncate the job at `time`.
    pub fn interrupt(&mut self, time: f64) {
        self.end_time = time;
    }

    /// Split the job for execution on the larger server set `servers`.
    ///
    /// Returns the interstitial reconfiguration job and the follow-on
    /// normal job carrying the remaining mass. The follow-on starts when
    /// the reconfiguration ends.
    pub fn reconfigure(&self, servers: Vec<usize>, time: f64) -> (Job, Job) {
        let reconfig_time = self.reconfiguration_time(servers.len());
        let remaining_mass = self.remaining_mass(time);
        let reconfiguration = Job {
            kind: JobKind::Reconfiguration,
            id: self.id.clone(),
            alpha: 0.0,
            data: 0.0,
            mass: 0.0,
            max_server_count: 0,
            servers: servers.clone(),
            start_time: time,
            end_time: time + reconfig_time,
        };
        let rest = Job {
            kind: JobKind::Normal,
            id: self.id.clone(),
            alpha: self.alpha,
            data: self.data,
            mass: remaining_mass,
            max_server_count: self.max_server_count,
            end_time: time
                + reconfig_time
                + Self::exec_time(remaining_mass, servers.len(), self.alpha),
            servers,
            start_time: time + reconfig_time,
        };
        (reconfiguration, rest)
    }

    /// Mass executed up to `time`, clamped to the job's lifetime.
    pub fn executed_mass(&self, time: f64) -> f64 {
        let time = time.clamp(self.start_time, self.end_time);
        (time - self.start_time) * (self.servers.len() as f64).powf(self.alpha)
    }

    /// Mass still to execute at `time`.
    pub fn remaining_mass(&self, time: f64) -> f64 {
        self.mass - self.executed_mass(time)
    }

    /// Time left before the job ends, as seen at `time`.
    pub fn remaining_time(&self, time: f64) -> f64 {
        self.end_time - time
    }

    /// Data-movement time for switching to `new_server_count` servers.
    pub fn reconfiguration_time(&self, new_server_count: usize) -> f64 {
        let maxi = self.servers.len().max(new_server_count);
        let mini = self.servers.len().min(new_server_count);
        self.data / maxi as f64 * (maxi / mini) as f64
    }

    pub fn is_running(&self, time: f64) -> bool {
        self.start_time <= time && time < self.end_time
    }

    pub fn is_complete(&self, time: f64) -> bool {
        time >= self.end_time
    }

    /// A job can be reconfigured while it carries mass and has room to grow.
    pub fn is_reconfigurable(&self) -> bool {
        self.mass > 0.0 && self.servers.len() < self.max_server_count
    }

    pub fn is_reconfiguration(&self) -> bool {
        self.kind == JobKind::Reconfiguration
    }

    pub fn is_power_off(&self) -> bool {
        self.kind == JobKind::PowerOff
    }
}

impl std::fmt::Display for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?} {} (mass {:.1}, {} servers, {:.1} -> {:.1})",
            self.kind,
            self.id,
            self.mass,
            self.servers.len(),
            self.start_time,
            self.end_time
        )
    }
}
