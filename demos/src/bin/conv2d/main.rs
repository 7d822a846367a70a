//! Runs one strided 2-D correlation and reports how long it took.
//!
//! Workers are threads in this process, each with its own backend; rank 0 loads or generates
//! the data and replicates it to the others, the way a root process would in a cluster.

mod args;

use args::{Args, Mode};
use clap::Parser;
use haloconv::distributed::spawn_group;
use haloconv::io::{read_array, write_array};
use haloconv::verify::{compare, DEFAULT_TOLERANCE};
use haloconv::{
    convolve_with_stats, random, reference, replicate, CollectiveBackend, ConvConfig, Grid,
    PerfStats, Schedule, Stride,
};
use std::error::Error;
use std::num::NonZeroUsize;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::{info, warn};

type BoxResult<T> = Result<T, Box<dyn Error>>;

fn main() -> ExitCode {
    haloconv_demos::init_tracing();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> BoxResult<()> {
    let (input, kernel) = load(args)?;
    let stride = Stride::new(args.stride_rows, args.stride_cols);

    let [k_h, k_w] = kernel.shape();
    if k_h % 2 == 0 || k_w % 2 == 0 {
        warn!(k_h, k_w, "even kernel dimension, padding is asymmetric");
    }

    let workers = match args.mode {
        Mode::Serial | Mode::Threads => 1,
        Mode::Workers | Mode::Hybrid => args.workers.max(1),
    };
    let threads = match args.mode {
        Mode::Serial | Mode::Workers => NonZeroUsize::new(1),
        Mode::Threads | Mode::Hybrid => NonZeroUsize::new(args.threads),
    };
    info!(
        mode = ?args.mode,
        workers,
        threads = threads.map_or(0, NonZeroUsize::get),
        "running"
    );

    let (output, elapsed, stats) = match args.mode {
        Mode::Serial => {
            let t0 = Instant::now();
            let output = reference::serial(&input, &kernel, stride)?;
            (output, t0.elapsed(), Vec::new())
        }
        Mode::Threads => {
            let t0 = Instant::now();
            let output =
                reference::threaded(&input, &kernel, stride, threads, Schedule::Auto)?;
            (output, t0.elapsed(), Vec::new())
        }
        Mode::Workers | Mode::Hybrid => {
            let mut config = ConvConfig::default().with_reassembly(args.reassembly.into());
            if let Some(n) = threads {
                config = config.with_threads(n.get());
            }
            run_group(workers, &input, &kernel, stride, &config)?
        }
    };

    println!("Output size: {}x{}", output.rows(), output.cols());
    println!("Computation time: {:.6} seconds", elapsed.as_secs_f64());
    for (rank, s) in stats.iter().enumerate() {
        println!("--- worker {} ---\n{}", rank, s);
    }

    if args.verify {
        let t0 = Instant::now();
        let expected = reference::serial(&input, &kernel, stride)?;
        let serial_time = t0.elapsed();

        let comparison = compare(&expected, &output, DEFAULT_TOLERANCE)?;
        comparison.report("serial reference");
        println!(
            "Verification: {} (max diff {:.3e})",
            if comparison.matches() { "PASS" } else { "FAIL" },
            comparison.max_diff
        );

        let units = workers * threads.map_or_else(default_threads, NonZeroUsize::get);
        let speedup = serial_time.as_secs_f64() / elapsed.as_secs_f64().max(f64::EPSILON);
        println!("Serial time: {:.6} seconds", serial_time.as_secs_f64());
        println!("Speedup: {:.2}x", speedup);
        println!(
            "Efficiency: {:.1}% over {} thread(s)",
            100.0 * speedup / units as f64,
            units
        );
    }

    if let Some(path) = &args.output {
        info!(path = %path.display(), "writing output");
        write_array(path, &output)?;
    }
    Ok(())
}

/// Returns the input and kernel, generated or read as the arguments ask.
fn load(args: &Args) -> BoxResult<(Grid<f32>, Grid<f32>)> {
    if let Some((input_shape, kernel_shape)) = args.generate_shapes() {
        info!(?input_shape, ?kernel_shape, seed = ?args.seed, "generating random input");
        let input = random::generate(input_shape, args.seed);
        let kernel = random::generate(kernel_shape, args.seed.map(|s| s.wrapping_add(1)));
        if let Some(path) = &args.input {
            write_array(path, &input)?;
        }
        if let Some(path) = &args.kernel {
            write_array(path, &kernel)?;
        }
        return Ok((input, kernel));
    }

    match (&args.input, &args.kernel) {
        (Some(input_path), Some(kernel_path)) => {
            info!(
                input = %input_path.display(),
                kernel = %kernel_path.display(),
                "reading arrays"
            );
            Ok((read_array(input_path)?, read_array(kernel_path)?))
        }
        _ => Err("provide -f/-g files or all of -H, -W, --kh, --kw (see --help)".into()),
    }
}

/// Runs the distributed correlation on `workers` thread workers. Rank 0 owns the data and
/// replicates it before the call.
fn run_group(
    workers: usize,
    input: &Grid<f32>,
    kernel: &Grid<f32>,
    stride: Stride,
    config: &ConvConfig,
) -> BoxResult<(Grid<f32>, Duration, Vec<PerfStats>)> {
    let results = spawn_group(workers, |backend| {
        let root = backend.rank() == 0;
        let input = replicate(&backend, 0, root.then(|| input.clone()))?;
        let kernel = replicate(&backend, 0, root.then(|| kernel.clone()))?;
        convolve_with_stats(&backend, &input, &kernel, stride, config)
    })?;

    let mut output = None;
    let mut stats = Vec::with_capacity(workers);
    for result in results {
        let (grid, s) = result?;
        output.get_or_insert(grid);
        stats.push(s);
    }
    let output = output.ok_or("no workers ran")?;
    // Every worker leaves through the same barrier, so the slowest total is the wall time.
    let elapsed = stats.iter().map(|s| s.total).max().unwrap_or_default();
    Ok((output, elapsed, stats))
}

/// Threads rayon uses when no count is given.
fn default_threads() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}
