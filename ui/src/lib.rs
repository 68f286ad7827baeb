//! This crate collects elements that are shared between the CLI programs

#[cfg(feature = "simulation")]
use clap::Args;
#[cfg(feature = "simulation")]
use compute::SimulateBase;
#[cfg(feature = "simulation")]
use data::{
    parameters::{Config, Parameters, Seed},
    Precision,
};
#[cfg(feature = "tui")]
use indicatif::{ProgressBar, ProgressFinish, ProgressStyle};
#[cfg(feature = "tui")]
use log::LevelFilter;
#[cfg(feature = "simulation")]
use std::num::NonZeroUsize;
#[cfg(feature = "tui")]
use std::time::Duration;

/// CLI arguments shared by all simulation executables
#[cfg(feature = "simulation")]
#[derive(Args)]
pub struct SharedArgs<Simulation: SimulateBase> {
    /// Number of columns of the simulation grid
    #[arg(long, default_value_t = 1920)]
    pub width: usize,

    /// Number of rows of the simulation grid
    #[arg(long, default_value_t = 1080)]
    pub height: usize,

    /// Horizontal position of the initial perturbation [default: grid center]
    #[arg(long)]
    pub pop_x: Option<usize>,

    /// Vertical position of the initial perturbation [default: grid center]
    #[arg(long)]
    pub pop_y: Option<usize>,

    /// Half-width of the initial perturbation square
    #[arg(long, default_value_t = 25)]
    pub pop_length: usize,

    /// Diffusion rate of species A
    #[arg(long)]
    pub diffusion_a: Option<Precision>,

    /// Diffusion rate of species B
    #[arg(long)]
    pub diffusion_b: Option<Precision>,

    /// Rate at which A is replenished
    #[arg(short, long)]
    pub feedrate: Option<Precision>,

    /// Rate at which B is removed
    #[arg(short, long)]
    pub killrate: Option<Precision>,

    /// Number of generations between two output frames
    #[arg(short = 'e', long, default_value_t = NonZeroUsize::MIN.saturating_add(1))]
    pub commit_every: NonZeroUsize,

    /// Log detailed diagnostics
    #[arg(short, long)]
    pub verbose: bool,

    /// Backend-specific CLI arguments
    #[command(flatten)]
    pub backend: Simulation::CliArgs,
}
//
#[cfg(feature = "simulation")]
impl<Simulation: SimulateBase> SharedArgs<Simulation> {
    /// Simulation configuration, with the defaults that clap can't handle
    ///
    /// The configuration is not validated yet, backends take care of that.
    pub fn to_config(&self) -> Config {
        let default_params = Parameters::default();
        Config {
            width: self.width,
            height: self.height,
            seed: Seed {
                x: self.pop_x.unwrap_or(self.width / 2),
                y: self.pop_y.unwrap_or(self.height / 2),
                half_width: self.pop_length,
            },
            params: Parameters {
                diffusion_rate_a: self
                    .diffusion_a
                    .unwrap_or(default_params.diffusion_rate_a),
                diffusion_rate_b: self
                    .diffusion_b
                    .unwrap_or(default_params.diffusion_rate_b),
                feed_rate: self.feedrate.unwrap_or(default_params.feed_rate),
                kill_rate: self.killrate.unwrap_or(default_params.kill_rate),
            },
            commit_every: self.commit_every,
            verbose: self.verbose,
        }
    }
}

/// Set up logging to stderr
///
/// Logs at `info` level by default, or `debug` in verbose mode. The `RUST_LOG`
/// environment variable takes precedence.
#[cfg(feature = "tui")]
pub fn init_logger(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(level.as_str()),
    )
    .init();
}

/// Progress bar for a CLI simulation run
#[cfg(feature = "tui")]
pub fn init_progress_reporting(message: &'static str, num_steps: usize) -> ProgressBar {
    let progress = ProgressBar::new(num_steps as u64)
        .with_message(message)
        .with_style(
            ProgressStyle::with_template("{msg} {pos}/{len} {wide_bar} {elapsed}/~{duration}")
                .expect("progress bar template is valid"),
        )
        .with_finish(ProgressFinish::AndClear);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

#[cfg(all(test, feature = "simulation"))]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        shared: SharedArgs<compute_naive::Simulation>,
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["test"]).unwrap();
        assert_eq!(cli.shared.to_config(), Config::default());
    }

    #[test]
    fn overrides() {
        let cli = Cli::try_parse_from([
            "test", "--width", "64", "--height", "48", "--pop-x", "10", "--pop-length", "3",
            "-f", "0.04", "--diffusion-b", "0.25", "-e", "5", "-v",
        ])
        .unwrap();
        let config = cli.shared.to_config();
        assert_eq!((config.width, config.height), (64, 48));
        assert_eq!(
            config.seed,
            Seed {
                x: 10,
                y: 24,
                half_width: 3
            }
        );
        assert_eq!(config.params.feed_rate, 0.04);
        assert_eq!(config.params.diffusion_rate_b, 0.25);
        assert_eq!(config.params.kill_rate, Parameters::default().kill_rate);
        assert_eq!(config.commit_every.get(), 5);
        assert!(config.verbose);
    }
}
