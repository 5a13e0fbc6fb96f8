use anyhow::Context;

/// Root of the `config.yml` file.
#[derive(Debug, serde::Deserialize)]
pub struct AppConfig {
    pub swarm: SwarmSection,
    pub benchmarks: BenchmarksSection,
}

/// Parameters of the `--train-swarm` mode.
#[derive(Debug, serde::Deserialize)]
pub struct SwarmSection {
    #[serde(rename = "SEED")]
    pub seed: u64,
    #[serde(rename = "SERVER_COUNT")]
    pub server_count: usize,
    #[serde(rename = "EXPTS_COUNT")]
    pub expts_count: usize,
    #[serde(rename = "PARTICULE_COUNT")]
    pub particle_count: usize,
    #[serde(rename = "EPOCH_COUNT")]
    pub epoch_count: usize,
    /// Rendering flag, accepted for compatibility; drawing is delegated
    /// to external tooling.
    #[serde(default)]
    pub draw_particle_gantt: bool,
    #[serde(default)]
    pub draw_cost_graph: bool,
}

/// Parameters of the `--run-benchmarks` mode.
#[derive(Debug, serde::Deserialize)]
pub struct BenchmarksSection {
    #[serde(rename = "SEED")]
    pub seed: u64,
    #[serde(rename = "SERVER_COUNT")]
    pub server_count: usize,
    #[serde(rename = "EXPTS_COUNT")]
    pub expts_count: usize,
    #[serde(default)]
    pub draw_experiment_gantt: bool,
    #[serde(default)]
    pub draw_experiment_cost: bool,
}

impl AppConfig {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read configuration file {}", path.display()))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("malformed configuration file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() -> anyhow::Result<()> {
        let config: AppConfig = serde_yaml::from_str(
            r"
swarm:
  SEED: 2
  SERVER_COUNT: 10
  EXPTS_COUNT: 10
  PARTICULE_COUNT: 20
  EPOCH_COUNT: 30
  draw_particle_gantt: false
  draw_cost_graph: true
benchmarks:
  SEED: 7
  SERVER_COUNT: 8
  EXPTS_COUNT: 5
  draw_experiment_gantt: true
  draw_experiment_cost: false
",
        )?;
        assert_eq!(config.swarm.seed, 2);
        assert_eq!(config.swarm.server_count, 10);
        assert_eq!(config.swarm.particle_count, 20);
        assert_eq!(config.swarm.epoch_count, 30);
        assert!(config.swarm.draw_cost_graph);
        assert_eq!(config.benchmarks.seed, 7);
        assert_eq!(config.benchmarks.expts_count, 5);
        assert!(config.benchmarks.draw_experiment_gantt);
        Ok(())
    }

    #[test]
    fn test_draw_flags_default_to_false() -> anyhow::Result<()> {
        let config: AppConfig = serde_yaml::from_str(
            r"
swarm:
  SEED: 2
  SERVER_COUNT: 10
  EXPTS_COUNT: 10
  PARTICULE_COUNT: 20
  EPOCH_COUNT: 30
benchmarks:
  SEED: 7
  SERVER_COUNT: 8
  EXPTS_COUNT: 5
",
        )?;
        assert!(!config.swarm.draw_particle_gantt);
        assert!(!config.benchmarks.draw_experiment_cost);
        Ok(())
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(AppConfig::load(std::path::Path::new("/does/not/exist.yml")).is_err());
    }
}
