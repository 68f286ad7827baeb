//! Benchmarking utilities
//!
//! Please consider using the macros provided by this crate instead of calling
//! these implementation details directly.

use crate::{Simulate, SimulateCreate};
use clap::{Args, Command, FromArgMatches};
use criterion::{BenchmarkId, Criterion, Throughput};
use data::parameters::{Config, Seed};
use std::{hint::black_box, sync::Once};

/// Re-export criterion for the criterion_benchmark macro
pub use criterion;

// Make sure env_logger is only initialized once
fn init_logger() {
    static INIT_LOGGER: Once = Once::new();
    INIT_LOGGER.call_once(env_logger::init);
}

/// Common criterion benchmark for all Gray-Scott reaction computations
/// Use via the criterion_benchmark macro
pub fn criterion_benchmark<Simulation: SimulateCreate + Simulate>(
    c: &mut Criterion,
    backend_name: &str,
) where
    Simulation::CliArgs: Clone,
{
    init_logger();

    let args = Simulation::CliArgs::from_arg_matches(
        &Simulation::CliArgs::augment_args(Command::default().no_binary_name(true))
            .get_matches_from(None::<&str>),
    )
    .expect("Failed to parse arguments from defaults & environment");

    let mut group = c.benchmark_group(format!("{backend_name}::step"));
    for size_pow2 in 3..=10 {
        let size = 2usize.pow(size_pow2);
        let (width, height) = (2 * size, size);
        let num_elems = (width * height) as u64;
        let config = Config {
            width,
            height,
            seed: Seed {
                x: width / 2,
                y: height / 2,
                half_width: size / 8,
            },
            ..Config::default()
        };

        let mut sim = Simulation::new(black_box(config), black_box(args.clone()))
            .expect("Failed to set up simulation");

        group.throughput(Throughput::Elements(num_elems));
        group.bench_function(BenchmarkId::from_parameter(num_elems), |b| {
            b.iter(|| sim.perform_steps(1).expect("Failed to run simulation step"));
        });
        black_box(sim.frame());
    }
    group.finish();
}
