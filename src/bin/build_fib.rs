use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::{error, info};
use memmap2::Mmap;

use routeinfo::export;
use routeinfo::ingest::{IngestConfig, IngestReport, InputFormat, Pipeline};
use routeinfo::{Fib, FibError};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Output {
    /// Number of networks and hosts per near address
    Summary,
    /// One line per (near address, network, next hop)
    Csv,
    /// Human readable forwarding tables
    Dump,
}

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// CSV file with link observations. Reads stdin if absent.
    input: Option<PathBuf>,

    /// JSON file with ingestion settings. Flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Layout of the input rows: nfp or links
    #[arg(short, long)]
    format: Option<InputFormat>,

    /// The input has no header row
    #[arg(long, default_value_t = false)]
    no_headers: bool,

    /// Prefix length of the destination networks
    #[arg(short, long)]
    prefix_len: Option<u8>,

    /// Host bits per network for the summary [default: 32 - PREFIX_LEN]
    #[arg(long)]
    postfix_len: Option<u8>,

    /// Expected number of rows, for the time estimate
    #[arg(short, long)]
    total: Option<u64>,

    /// Stop after this many rows
    #[arg(short, long)]
    limit: Option<u64>,

    /// Capacity of the queue between reader and inserter, in batches
    #[arg(long)]
    queue: Option<usize>,

    /// Rows per batch
    #[arg(long)]
    batch: Option<usize>,

    /// Number of FIB shards to insert into in parallel
    #[arg(long)]
    shards: Option<usize>,

    /// What to write to stdout
    #[arg(short, long, value_enum, default_value_t = Output::Summary)]
    output: Output,
}

impl Cli {
    fn ingest_config(&self) -> Result<IngestConfig, FibError> {
        let mut config = match &self.config {
            Some(path) => IngestConfig::from_json_file(path)?,
            None => IngestConfig::default(),
        };
        if let Some(format) = self.format {
            config.format = format;
        }
        if self.no_headers {
            config.has_headers = false;
        }
        if let Some(len) = self.prefix_len {
            config.prefix_len = len;
        }
        if self.total.is_some() {
            config.expected_total = self.total;
        }
        if self.limit.is_some() {
            config.limit = self.limit;
        }
        if let Some(queue) = self.queue {
            config.queue_capacity = queue;
        }
        if let Some(batch) = self.batch {
            config.batch_size = batch;
        }
        if let Some(shards) = self.shards {
            config.shards = shards;
        }
        Ok(config)
    }
}

fn ingest(
    input: Option<&PathBuf>,
    pipeline: &Pipeline,
) -> Result<(Fib, IngestReport), FibError> {
    match input {
        Some(path) => {
            let file = File::open(path).map_err(|err| {
                FibError::InputUnavailable(format!(
                    "{}: {}",
                    path.display(),
                    err
                ))
            })?;
            // The file is only read, and is expected to stay unchanged
            // while the FIB is built.
            let mmap = unsafe { Mmap::map(&file) }.map_err(|err| {
                FibError::InputUnavailable(format!(
                    "{}: {}",
                    path.display(),
                    err
                ))
            })?;
            info!("{} ({}MiB)", path.display(), mmap.len() >> 20);
            pipeline.run(&mmap[..])
        }
        None => {
            info!("reading from stdin");
            pipeline.run(io::stdin())
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .init();

    let args = Cli::parse();
    let config = args.ingest_config()?;
    let postfix_len = args
        .postfix_len
        .unwrap_or_else(|| 32_u8.saturating_sub(config.prefix_len));

    let pipeline = Pipeline::new(config);
    let (fib, report) = match ingest(args.input.as_ref(), &pipeline) {
        Ok(res) => res,
        Err(err) => {
            error!("{}", err);
            return Err(err.into());
        }
    };
    info!("ingestion finished\n{}", report);
    info!("{}", fib.stats());

    let mut out = BufWriter::new(io::stdout().lock());
    match args.output {
        Output::Summary => export::write_summary(&fib, postfix_len, &mut out)?,
        Output::Csv => export::write_csv(&fib, &mut out)?,
        Output::Dump => export::write_dump(&fib, &mut out)?,
    }
    out.flush()?;
    Ok(())
}
