//! Measures how a single worker scales with its thread count.

use clap::Parser;
use haloconv::analysis::thread_sweep;
use haloconv::{random, Schedule, Stride};
use std::num::NonZeroUsize;
use std::process::ExitCode;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sweep")]
#[command(version, about = "Thread-count scaling of the local correlation kernel")]
struct Args {
    /// Input rows
    #[arg(short = 'H', long, default_value_t = 1024)]
    height: usize,

    /// Input columns
    #[arg(short = 'W', long, default_value_t = 1024)]
    width: usize,

    /// Kernel rows
    #[arg(long = "kh", default_value_t = 3)]
    kernel_height: usize,

    /// Kernel columns
    #[arg(long = "kw", default_value_t = 3)]
    kernel_width: usize,

    /// Vertical stride
    #[arg(long = "sh", default_value_t = 1)]
    stride_rows: usize,

    /// Horizontal stride
    #[arg(long = "sw", default_value_t = 1)]
    stride_cols: usize,

    /// Largest thread count to try (default: available parallelism)
    #[arg(short = 't', long, env = "HALOCONV_THREADS")]
    max_threads: Option<NonZeroUsize>,

    /// Seed for the random input
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> ExitCode {
    haloconv_demos::init_tracing();
    let args = Args::parse();

    let input = random::generate([args.height, args.width], Some(args.seed));
    let kernel = random::generate(
        [args.kernel_height, args.kernel_width],
        Some(args.seed.wrapping_add(1)),
    );
    let stride = Stride::new(args.stride_rows, args.stride_cols);
    let max_threads = args
        .max_threads
        .or_else(|| std::thread::available_parallelism().ok())
        .unwrap_or(NonZeroUsize::MIN);

    info!(
        input = ?input.shape(),
        kernel = ?kernel.shape(),
        max_threads = max_threads.get(),
        "starting sweep"
    );
    let report = match thread_sweep(&input, &kernel, stride, max_threads, Schedule::Auto) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "{:>8} {:>12} {:>9} {:>11}",
        "threads", "time (s)", "speedup", "efficiency"
    );
    for p in &report.points {
        println!(
            "{:>8} {:>12.6} {:>8.2}x {:>10.1}%",
            p.threads,
            p.elapsed.as_secs_f64(),
            p.speedup,
            p.efficiency
        );
    }
    for t in &report.skipped {
        println!("{:>8} {:>12}", t, "skipped");
    }
    if let Some(best) = report.best() {
        println!(
            "Best: {} thread(s), {:.2}x speedup",
            best.threads, best.speedup
        );
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["sweep", "-t", "4"]).unwrap();
        assert_eq!(args.height, 1024);
        assert_eq!(args.kernel_width, 3);
        assert_eq!(args.max_threads, NonZeroUsize::new(4));
    }
}
