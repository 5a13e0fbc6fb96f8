/// A member of the homogeneous cluster.
///
/// Servers do not own their jobs: they record the arena ids of every job
/// ever assigned to them, and their busy state is rebuilt from that
/// history.
#[derive(Debug)]
pub struct Server {
    /// Index of the server, unique within the cluster.
    pub index: usize,
    /// Arena ids of the jobs ever assigned to this server, in assignment order.
    pub jobs: Vec<usize>,
}

impl Server {
    /// Power draw of a powered-off server, in W.
    pub const P_OFF: f64 = 10.0;
    /// Power draw of an idle server, in W.
    pub const P_IDLE: f64 = 95.0;
    /// Power draw of a booting server, in W.
    pub const P_BOOT: f64 = 101.0;
    /// Power draw of a computing server, in W.
    pub const P_ACTIVE: f64 = 191.0;
    /// Power draw of a server shutting down, in W.
    pub const P_SHUTDOWN: f64 = 125.0;
    /// Time needed to boot a server, in s.
    pub const BOOT_DURATION: f64 = 151.0;
    /// Time needed to shut a server down, in s.
    pub const SHUTDOWN_DURATION: f64 = 6.0;

    pub fn new(index: usize) -> Self {
        Self {
            index,
            jobs: vec![],
        }
    }

    /// Record a job assignment. The record is never pruned.
    pub fn assign(&mut self, job_id: usize) {
        self.jobs.push(job_id);
    }

    /// Return whether any job assigned to this server is running at `time`.
    pub fn is_busy(&self, jobs: &[crate::job::Job], time: f64) -> bool {
        self.jobs.iter().any(|id| jobs[*id].is_running(time))
    }

    /// Energy drawn by an idle server over `time` seconds, in Ws.
    pub fn idle_energy(time: f64) -> f64 {
        Self::P_IDLE * time
    }

    /// Energy drawn by a computing server over `time` seconds, in Ws.
    pub fn active_energy(time: f64) -> f64 {
        Self::P_ACTIVE * time
    }

    /// Energy drawn over a shutdown-then-reboot cycle of `time` seconds, in Ws.
    ///
    /// The cycle is a shutdown phase, an off period covering the rest of
    /// `time`, and a boot phase.
    pub fn reboot_energy(time: f64) -> f64 {
        let off_duration = time - (Self::SHUTDOWN_DURATION + Self::BOOT_DURATION);
        Self::SHUTDOWN_DURATION * Self::P_SHUTDOWN
            + off_duration * Self::P_OFF
            + Self::BOOT_DURATION * Self::P_BOOT
    }
}

impl std::fmt::Display for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "server-{} ({} jobs)", self.index, self.jobs.len())
    }
}
