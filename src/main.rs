use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use smallfor::{
    demo::{self, thread_label, Executor},
    serial, BlockedRange, Partitioner, TaskPool,
};

#[derive(Parser, Debug)]
#[command(name = "smallfor", about = "Run a batch of print-loop tasks with parallel_for")]
struct Cli {
    /// Number of tasks; task `i` prints `0..i`
    #[arg(long, default_value_t = 10)]
    tasks: u32,

    /// Worker threads (defaults to the number of logical CPUs)
    #[arg(long)]
    threads: Option<usize>,

    /// Smallest piece of the task range handed to one worker
    #[arg(long, default_value_t = 1)]
    grainsize: usize,

    #[arg(long, value_enum, default_value_t = PartitionerArg::Auto)]
    partitioner: PartitionerArg,

    /// Run every piece on the main thread
    #[arg(long)]
    serial: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PartitionerArg {
    Auto,
    Simple,
    Static,
}

impl From<PartitionerArg> for Partitioner {
    fn from(arg: PartitionerArg) -> Self {
        match arg {
            PartitionerArg::Auto => Partitioner::Auto,
            PartitionerArg::Simple => Partitioner::Simple,
            PartitionerArg::Static => Partitioner::Static,
        }
    }
}

fn init_logging(debug: bool) {
    let default = if debug { "smallfor=debug" } else { "smallfor=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let mut builder = TaskPool::builder();
    if let Some(threads) = cli.threads {
        builder = builder.num_threads(threads);
    }
    let pool = builder.build()?;
    tracing::debug!(?cli, threads = pool.thread_num(), "starting");

    let tasks = demo::tasks(cli.tasks);
    let exec = Executor::new(&tasks);
    let range = BlockedRange::with_grainsize(0, tasks.len(), cli.grainsize);
    let partitioner = Partitioner::from(cli.partitioner);

    println!("{}## Starting parallel_for...", thread_label());
    if cli.serial {
        serial::parallel_for_with(range, partitioner, &exec);
    } else {
        pool.parallel_for_with(range, partitioner, &exec);
    }
    println!("{}## Finished parallel_for", thread_label());

    // The run has already finished; a failed join only gets logged.
    if let Err(err) = pool.shutdown() {
        tracing::warn!(error = %err, "task pool shutdown failed");
    }
    Ok(())
}
