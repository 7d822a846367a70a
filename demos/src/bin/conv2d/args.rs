use clap::{Parser, ValueEnum};
use haloconv::Reassembly;
use std::path::PathBuf;

/// How the correlation is executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// One thread, the plain reference loop.
    Serial,
    /// One worker, `--threads` compute threads.
    Threads,
    /// `--workers` workers, one compute thread each.
    Workers,
    /// `--workers` workers, `--threads` compute threads each.
    Hybrid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReassemblyArg {
    AllGather,
    BroadcastRows,
}

impl From<ReassemblyArg> for Reassembly {
    fn from(arg: ReassemblyArg) -> Self {
        match arg {
            ReassemblyArg::AllGather => Reassembly::AllGather,
            ReassemblyArg::BroadcastRows => Reassembly::BroadcastRows,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "conv2d")]
#[command(version, about = "Strided 2-D correlation over a group of workers")]
#[command(after_help = "Examples:
  conv2d -H 1000 -W 1000 --kh 3 --kw 3 --sh 3 --sw 2 -n 4
  conv2d -f f.txt -g g.txt -o output.txt -n 2 --verify")]
pub struct Args {
    /// Input feature map file. Written instead of read when generating.
    #[arg(short = 'f', long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Kernel file. Written instead of read when generating.
    #[arg(short = 'g', long, value_name = "FILE")]
    pub kernel: Option<PathBuf>,

    /// Output file
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Generate a random input with this many rows
    #[arg(short = 'H', long)]
    pub height: Option<usize>,

    /// Generate a random input with this many columns
    #[arg(short = 'W', long)]
    pub width: Option<usize>,

    /// Kernel rows when generating
    #[arg(long = "kh")]
    pub kernel_height: Option<usize>,

    /// Kernel columns when generating
    #[arg(long = "kw")]
    pub kernel_width: Option<usize>,

    /// Vertical stride
    #[arg(long = "sh", default_value_t = 1)]
    pub stride_rows: usize,

    /// Horizontal stride
    #[arg(long = "sw", default_value_t = 1)]
    pub stride_cols: usize,

    /// Compute threads per worker (0: rayon default)
    #[arg(short, long, env = "HALOCONV_THREADS", default_value_t = 0)]
    pub threads: usize,

    /// Number of workers
    #[arg(short = 'n', long, env = "HALOCONV_WORKERS", default_value_t = 1)]
    pub workers: usize,

    #[arg(short, long, value_enum, default_value_t = Mode::Hybrid)]
    pub mode: Mode,

    /// How workers reassemble the output
    #[arg(long, value_enum, default_value_t = ReassemblyArg::AllGather)]
    pub reassembly: ReassemblyArg,

    /// Seed for generated inputs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Compare the result against the serial reference
    #[arg(long)]
    pub verify: bool,
}

impl Args {
    /// `[rows, cols]` of the input and kernel to generate, if all four dimensions were given.
    pub fn generate_shapes(&self) -> Option<([usize; 2], [usize; 2])> {
        Some((
            [self.height?, self.width?],
            [self.kernel_height?, self.kernel_width?],
        ))
    }
}
