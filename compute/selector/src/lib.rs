//! Pick the best compute backend allowed by enabled crate features, expose it
//! as a Simulation typedef.

cfg_if::cfg_if! {
    if #[cfg(feature = "compute_parallel")] {
        pub type Simulation = compute_parallel::Simulation;
    } else if #[cfg(any(feature = "compute_naive", test))] {
        pub type Simulation = compute_naive::Simulation;
    } else {
        // If no backend was specified, use a backend skeleton that throws a
        // minimal number of compiler errors.
        use compute::{NoArgs, SimulateBase, SimulateCreate, SimulateStep};
        use data::{concentration::Species, frame::Frame, parameters::{Config, ConfigError}};
        //
        pub struct Simulation;
        //
        impl SimulateBase for Simulation {
            type CliArgs = NoArgs;

            type Error = ConfigError;

            fn species(&mut self) -> &Species {
                unreachable!()
            }

            fn frame(&self) -> &Frame {
                unreachable!()
            }

            fn generation(&self) -> u64 {
                0
            }
        }
        //
        impl SimulateCreate for Simulation {
            fn new(_config: Config, _args: NoArgs) -> Result<Self, ConfigError> {
                std::compile_error!("Please enable at least one compute backend via crate features")
            }
        }
        //
        impl SimulateStep for Simulation {
            fn perform_step(&mut self) -> Result<(), ConfigError> {
                Ok(())
            }
        }
    }
}
