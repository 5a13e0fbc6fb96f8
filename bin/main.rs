use clap::Parser;
use rand::SeedableRng;

use moldable_sched_sim::experiments::Experiments;
use moldable_sched_sim::scheduler::{PolicyFlags, SchedulerConfig, SchedulerStats};
use moldable_sched_sim::swarm::{EpochCost, Swarm};

#[derive(Debug, clap::Parser)]
#[command(long_about = None)]
#[command(group(clap::ArgGroup::new("mode").required(true).args(["train_swarm", "run_benchmarks"])))]
struct Args {
    /// Train the particle swarm over the scheduler parameters
    #[arg(long)]
    train_swarm: bool,
    /// Run the six benchmark scheduler setups
    #[arg(long)]
    run_benchmarks: bool,
    /// Path of the YAML configuration file
    #[arg(long, default_value = "config.yml")]
    config: std::path::PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = moldable_sched_sim::config::AppConfig::load(&args.config)?;

    if args.train_swarm {
        train_swarm(&config.swarm).await?;
    }
    if args.run_benchmarks {
        run_benchmarks(&config.benchmarks)?;
    }

    Ok(())
}

fn swarm_training_dir(seed: u64) -> std::path::PathBuf {
    std::path::PathBuf::from(format!("./results/swarm_training/seed_{}", seed))
}

async fn train_swarm(config: &moldable_sched_sim::config::SwarmSection) -> anyhow::Result<()> {
    if config.draw_particle_gantt || config.draw_cost_graph {
        log::debug!("rendering is delegated to external tooling, draw flags are ignored");
    }

    let mut swarm = Swarm::new(
        config.seed,
        config.particle_count,
        config.server_count,
        config.expts_count,
    )?;
    let epoch_costs = swarm.run_epochs(config.epoch_count).await?;

    let result_dir = swarm_training_dir(config.seed);
    moldable_sched_sim::output::write_csv(
        &result_dir.join("swarm_best_config.csv"),
        SchedulerConfig::header(),
        std::slice::from_ref(swarm.best_config()),
    )?;
    moldable_sched_sim::output::write_csv(
        &result_dir.join("swarm_costs.csv"),
        EpochCost::header(),
        &epoch_costs,
    )?;
    log::info!(
        "best cost {} with configuration {}",
        swarm.best_cost(),
        swarm.best_config()
    );
    Ok(())
}

fn run_benchmarks(config: &moldable_sched_sim::config::BenchmarksSection) -> anyhow::Result<()> {
    if config.draw_experiment_gantt || config.draw_experiment_cost {
        log::debug!("rendering is delegated to external tooling, draw flags are ignored");
    }

    let output_dir = std::path::PathBuf::from(format!(
        "./results/benchmarking_experiments/seed_{}",
        config.seed
    ));
    let best_config_path = swarm_training_dir(config.seed).join("swarm_best_config.csv");
    let mut rng = rand::rngs::StdRng::seed_from_u64(config.seed);

    let setups = [
        (
            "fifo",
            SchedulerConfig::default(),
            PolicyFlags {
                reconfig_enabled: false,
                power_off_enabled: false,
                param_enabled: false,
            },
        ),
        (
            "fifo_reconfig",
            SchedulerConfig::default(),
            PolicyFlags {
                reconfig_enabled: true,
                power_off_enabled: false,
                param_enabled: false,
            },
        ),
        (
            "fifo_poweroff",
            SchedulerConfig::default(),
            PolicyFlags {
                reconfig_enabled: false,
                power_off_enabled: true,
                param_enabled: false,
            },
        ),
        (
            "fifo_reconfig_poweroff",
            SchedulerConfig::random(&mut rng),
            PolicyFlags {
                reconfig_enabled: true,
                power_off_enabled: true,
                param_enabled: false,
            },
        ),
        (
            "random_params",
            SchedulerConfig::random(&mut rng),
            PolicyFlags::default(),
        ),
        (
            "swarm_param",
            moldable_sched_sim::output::load_best_config(&best_config_path)?,
            PolicyFlags::default(),
        ),
    ];

    for (name, scheduler_config, flags) in setups {
        log::info!("running benchmark {}", name);
        let stats = Experiments::new(flags).run_expts(
            &scheduler_config,
            config.server_count,
            config.expts_count,
            config.seed,
        )?;
        moldable_sched_sim::output::write_csv(
            &output_dir.join(name).join(format!("{}.csv", name)),
            SchedulerStats::header(),
            &stats,
        )?;
    }
    Ok(())
}
