//! Naive implementation of Gray-Scott simulation
//!
//! Runs the whole grid interior on the calling thread, one generation after
//! another. Slow, but simple enough to serve as a reference for the other
//! compute backends.

use compute::{
    reaction::step_region, NoArgs, Publisher, Region, SimulateBase, SimulateCreate, SimulateStep,
};
use data::{
    concentration::Species,
    frame::{Frame, Sample},
    parameters::{Config, ConfigError, Parameters},
};
use ndarray::{s, Array2};

/// Gray-Scott reaction simulation
#[derive(Debug)]
pub struct Simulation {
    /// Simulation parameters
    params: Parameters,

    /// Chemical species concentrations
    species: Species,

    /// Samples of the generation being computed
    samples: Array2<Sample>,

    /// Generation counter and committed frame
    publisher: Publisher,
}
//
impl SimulateBase for Simulation {
    type CliArgs = NoArgs;

    type Error = ConfigError;

    fn species(&mut self) -> &Species {
        &self.species
    }

    fn frame(&self) -> &Frame {
        self.publisher.frame()
    }

    fn generation(&self) -> u64 {
        self.publisher.generation()
    }
}
//
impl SimulateCreate for Simulation {
    fn new(config: Config, _args: NoArgs) -> Result<Self, ConfigError> {
        config.validate()?;
        let species = Species::new(&config);
        let publisher = Publisher::new(&config, &species);
        Ok(Self {
            params: config.params,
            samples: publisher.frame().samples().to_owned(),
            species,
            publisher,
        })
    }
}
//
impl SimulateStep for Simulation {
    fn perform_step(&mut self) -> Result<(), ConfigError> {
        // Border cells are never recomputed
        let interior = Region::interior(self.species.shape());
        let interior_slice = s![interior.y.clone(), interior.x.clone()];

        let (in_a, out_a) = self.species.a.in_out();
        let (in_b, out_b) = self.species.b.in_out();
        step_region(
            &self.params,
            [in_a.view(), in_b.view()],
            &interior,
            [
                out_a.slice_mut(interior_slice),
                out_b.slice_mut(interior_slice),
            ],
            self.samples.slice_mut(interior_slice),
        );

        self.species.flip();
        self.publisher.generation_done(self.samples.view());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compute::Simulate;
    use data::{concentration::Cell, parameters::Seed};
    use std::num::NonZeroUsize;

    fn small_config() -> Config {
        Config {
            width: 24,
            height: 16,
            seed: Seed {
                x: 12,
                y: 8,
                half_width: 4,
            },
            commit_every: NonZeroUsize::MIN,
            ..Config::default()
        }
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let config = Config {
            width: 2,
            ..small_config()
        };
        assert!(matches!(
            Simulation::new(config, NoArgs {}),
            Err(ConfigError::GridTooSmall { .. })
        ));
    }

    #[test]
    fn border_is_never_modified() {
        let config = small_config();
        let mut sim = Simulation::new(config, NoArgs {}).unwrap();
        let seed = sim.species().clone();
        let [rows, cols] = seed.shape();
        let on_border = |x: usize, y: usize| x == 0 || y == 0 || x == cols - 1 || y == rows - 1;

        for _ in 0..25 {
            sim.perform_steps(1).unwrap();
            for y in 0..rows {
                for x in 0..cols {
                    if on_border(x, y) {
                        assert_eq!(sim.species().cell(x, y), seed.cell(x, y));
                    }
                }
            }
        }
        assert_ne!(sim.species(), &seed);
    }

    #[test]
    fn concentrations_stay_in_range() {
        let mut config = small_config();
        config.params.diffusion_rate_a = 4.0;
        config.params.feed_rate = 2.0;
        let mut sim = Simulation::new(config, NoArgs {}).unwrap();
        for _ in 0..20 {
            sim.perform_steps(1).unwrap();
            let species = sim.species();
            for (&a, &b) in species.a.input().iter().zip(species.b.input()) {
                assert!((0.0..=1.0).contains(&a) && (0.0..=1.0).contains(&b));
            }
        }
    }

    #[test]
    fn frames_follow_commit_cadence() {
        let config = Config {
            commit_every: NonZeroUsize::new(3).unwrap(),
            ..small_config()
        };
        let mut sim = Simulation::new(config, NoArgs {}).unwrap();
        let seed_frame = sim.frame().clone();
        assert_eq!(seed_frame, Frame::new(sim.species()));

        sim.perform_steps(2).unwrap();
        assert_eq!(sim.generation(), 2);
        assert_eq!(sim.frame(), &seed_frame);

        sim.perform_steps(1).unwrap();
        assert_eq!(sim.generation(), 3);
        assert_eq!(sim.frame().generation(), 3);
        let expected = Frame::new(sim.species());
        assert_eq!(sim.frame().samples(), expected.samples());
    }

    #[test]
    fn first_generation_matches_update_rule() {
        let config = small_config();
        let mut sim = Simulation::new(config, NoArgs {}).unwrap();
        let seed = sim.species().clone();
        sim.perform_steps(1).unwrap();

        // Corner of the seed square, where both species meet
        let (x, y) = (8, 4);
        let Cell { a, b } = seed.cell(x, y);
        assert_eq!((a, b), (0.0, 1.0));
        let expected = compute::reaction::react(
            &config.params,
            [seed.a.input(), seed.b.input()],
            x,
            y,
        );
        assert_eq!(sim.species().cell(x, y), expected);
    }
}
