use clap::Parser;
use compute::{Simulate, SimulateBase, SimulateCreate};
use compute_selector::Simulation;
use data::frame::Frame;
use eyre::{eyre, Result, WrapErr};
use image::RgbaImage;
use log::info;
use std::{
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    thread,
};
use ui::SharedArgs;

/// Perform Gray-Scott simulation, saving frames as PNG images
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// CLI arguments shared with other simulation executables
    #[command(flatten)]
    shared: SharedArgs<Simulation>,

    /// Number of images to be created
    #[arg(short, long, default_value_t = 100)]
    nbimage: usize,

    /// Directory where output images will be saved
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Size of the image buffer between the compute and I/O thread
    ///
    /// A larger buffer enables better performance, at the cost of higher RAM
    /// utilization. 2 is the minimum to fully decouple compute and I/O.
    #[arg(long, default_value_t = NonZeroUsize::MIN.saturating_add(1))]
    output_buffer: NonZeroUsize,
}

fn main() -> Result<()> {
    // Parse CLI arguments and handle clap-incompatible defaults
    let args = Args::parse();
    ui::init_logger(args.shared.verbose);
    let config = args.shared.to_config();
    let steps_per_image = config.commit_every.get();
    let output_dir = args.output_dir.unwrap_or_else(|| "./".into());
    fs::create_dir_all(&output_dir)
        .wrap_err_with(|| format!("Failed to create output directory {}", output_dir.display()))?;

    // Set up the simulation
    let mut simulation = Simulation::new(config, args.shared.backend)?;
    info!(
        "Simulating {} images of a {}x{} grid, {steps_per_image} generations apart",
        args.nbimage, config.width, config.height
    );

    // Set up progress reporting
    let progress = ui::init_progress_reporting("Running simulation step", args.nbimage);

    thread::scope(|s| -> Result<()> {
        // Start the image writer thread
        let (sender, receiver) = crossbeam_channel::bounded::<Frame>(args.output_buffer.get());
        let output_dir = &output_dir;
        let writer = s.spawn(move || {
            for frame in receiver {
                save_frame(output_dir, &frame)?;
                progress.inc(1);
            }
            progress.finish();
            Ok::<_, eyre::Report>(())
        });

        // Run the simulation on the main thread
        for _ in 0..args.nbimage {
            simulation.perform_steps(steps_per_image)?;
            if sender.send(simulation.frame().clone()).is_err() {
                // The writer hung up, its error is reported below
                break;
            }
        }
        drop(sender);
        writer
            .join()
            .map_err(|_| eyre!("Image writer thread panicked"))?
    })?;

    info!("Done after {} generations", simulation.generation());
    Ok(())
}

/// Save a frame as `<generation>.png` in `output_dir`
fn save_frame(output_dir: &Path, frame: &Frame) -> Result<()> {
    let path = output_dir.join(format!("{}.png", frame.generation()));
    let image = RgbaImage::from_raw(frame.width() as u32, frame.height() as u32, frame.to_rgba())
        .ok_or_else(|| eyre!("Frame samples don't match the frame dimensions"))?;
    image
        .save(&path)
        .wrap_err_with(|| format!("Failed to save image {}", path.display()))
}
