//! Build a [Fib] from a stream of CSV link observations.
//!
//! The calling thread decodes rows into [Observation]s and hands them over
//! in batches through a bounded queue to an inserter thread, so that slow
//! inserts throttle the reading. The inserter puts every observation into
//! the FIB. Rows that can't be decoded, or that carry an invalid prefix
//! length for their destination, are logged and skipped. Only failing to
//! read the input ends the run.
//!
//! With more than one shard, every batch is split by near address, and
//! the parts are inserted into private per-shard FIBs in parallel. A near
//! address always lands in the same shard, so the shards can be merged
//! without conflicts at the end.

mod progress;
mod record;

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::Path;
use std::str::FromStr;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::thread;
use std::time::Duration;

use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde_derive::Deserialize;

use crate::fib::{Fib, FibConfig};
use crate::types::af::CanonicalAddress;
use crate::types::errors::FibError;

pub use progress::{Estimate, Progress};
pub use record::{LinkRecord, NfpRecord, Observation};

//------------ InputFormat ---------------------------------------------------

/// The layout of the input rows.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// `near_addr,far_addr,probe_dst_addr`
    #[default]
    Nfp,
    /// The twelve columns of a full links table, see [LinkRecord].
    Links,
}

impl InputFormat {
    pub fn columns(&self) -> usize {
        match self {
            InputFormat::Nfp => 3,
            InputFormat::Links => 12,
        }
    }
}

impl FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nfp" => Ok(InputFormat::Nfp),
            "links" => Ok(InputFormat::Links),
            _ => Err(format!("unknown input format '{}'", s)),
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputFormat::Nfp => write!(f, "nfp"),
            InputFormat::Links => write!(f, "links"),
        }
    }
}

//------------ IngestConfig --------------------------------------------------

/// Settings for one ingestion run. Every field has a default, so a JSON
/// configuration file only needs to name the fields it changes.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub format: InputFormat,
    /// Whether the first row is a header that is to be skipped.
    pub has_headers: bool,
    /// The prefix length destination networks are truncated to.
    pub prefix_len: u8,
    /// The number of batches the queue holds before the reader blocks.
    pub queue_capacity: usize,
    /// The number of rows per batch.
    pub batch_size: usize,
    /// Log the progress every this many rows.
    pub progress_interval: u64,
    /// The number of rows expected, used to estimate the remaining time.
    pub expected_total: Option<u64>,
    /// Stop after this many rows.
    pub limit: Option<u64>,
    /// The number of FIB shards to insert into in parallel.
    pub shards: usize,
    /// The number of near addresses to reserve room for.
    pub capacity: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        let fib = FibConfig::default();
        Self {
            format: InputFormat::Nfp,
            has_headers: true,
            prefix_len: fib.default_prefix_len,
            queue_capacity: 100,
            batch_size: 1024,
            progress_interval: 10_000,
            expected_total: None,
            limit: None,
            shards: 1,
            capacity: fib.capacity,
        }
    }
}

impl IngestConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, FibError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| {
            FibError::InputUnavailable(format!("{}: {}", path.display(), err))
        })?;
        serde_json::from_reader(io::BufReader::new(file)).map_err(|err| {
            FibError::MalformedRecord(format!("{}: {}", path.display(), err))
        })
    }

    fn fib_config(&self) -> FibConfig {
        FibConfig {
            capacity: self.capacity / self.shards.max(1),
            default_prefix_len: self.prefix_len,
        }
    }
}

//------------ IngestReport --------------------------------------------------

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Data rows read, headers not included.
    pub rows: u64,
    /// Observations inserted into the FIB.
    pub inserted: u64,
    /// Rows that were logged and dropped.
    pub skipped: u64,
    pub elapsed: Duration,
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "rows read:\t{}", self.rows)?;
        writeln!(f, "inserted:\t{}", self.inserted)?;
        writeln!(f, "skipped:\t{}", self.skipped)?;
        write!(f, "time:\t\t{:.3}s", self.elapsed.as_secs_f64())
    }
}

//------------ Counters ------------------------------------------------------

#[derive(Copy, Clone, Debug, Default)]
struct InsertCounters {
    inserted: u64,
    skipped: u64,
}

impl std::ops::Add for InsertCounters {
    type Output = InsertCounters;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            inserted: self.inserted + rhs.inserted,
            skipped: self.skipped + rhs.skipped,
        }
    }
}

impl std::ops::AddAssign for InsertCounters {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

#[derive(Copy, Clone, Debug, Default)]
struct ReadCounters {
    rows: u64,
    skipped: u64,
}

struct Batch {
    // rows read for this batch, including the ones that were skipped
    rows: u64,
    observations: Vec<Observation>,
}

//------------ Pipeline ------------------------------------------------------

/// The ingestion pipeline. See the module documentation.
#[derive(Clone, Debug, Default)]
pub struct Pipeline {
    config: IngestConfig,
}

impl Pipeline {
    pub fn new(config: IngestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Read all rows from `reader` and build a FIB from them.
    ///
    /// Fails with [FibError::InputUnavailable] if `reader` fails; every
    /// other problem only drops the row it occurs in.
    pub fn run<R: io::Read>(
        &self,
        reader: R,
    ) -> Result<(Fib, IngestReport), FibError> {
        let config = &self.config;
        let shards = config.shards.max(1);
        info!(
            "ingesting {} rows, prefix length {}, {} shard(s)",
            config.format, config.prefix_len, shards
        );

        let (tx, rx) = sync_channel::<Batch>(config.queue_capacity.max(1));
        let mut progress =
            Progress::new(config.progress_interval, config.expected_total);

        let (read, (fib, inserted)) = thread::scope(|s| {
            let progress = &mut progress;
            let inserter = s.spawn(move || {
                if shards == 1 {
                    consume(rx, config, progress)
                } else {
                    consume_sharded(rx, config, shards, progress)
                }
            });
            // Returning drops `tx`, which ends the inserter's loop.
            let read = read_batches(reader, config, tx);
            let consumed = inserter.join().map_err(|_| {
                FibError::InternalInconsistency("inserter thread panicked")
            })?;
            Ok::<_, FibError>((read?, consumed?))
        })?;

        let report = IngestReport {
            rows: read.rows,
            inserted: inserted.inserted,
            skipped: read.skipped + inserted.skipped,
            elapsed: progress.elapsed(),
        };
        info!(
            "done: {} rows, {} inserted, {} skipped, {} near addresses",
            report.rows,
            report.inserted,
            report.skipped,
            fib.len()
        );
        Ok((fib, report))
    }

    /// Read and ingest the file at `path`.
    pub fn run_file(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<(Fib, IngestReport), FibError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| {
            FibError::InputUnavailable(format!("{}: {}", path.display(), err))
        })?;
        self.run(io::BufReader::new(file))
    }
}

/// The shard that owns `near` when inserting into `shards` shards.
pub fn shard_of(near: CanonicalAddress, shards: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    near.hash(&mut hasher);
    (hasher.finish() % shards.max(1) as u64) as usize
}

//------------ Reader side ---------------------------------------------------

fn read_batches<R: io::Read>(
    reader: R,
    config: &IngestConfig,
    tx: SyncSender<Batch>,
) -> Result<ReadCounters, FibError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(config.has_headers)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);
    let batch_size = config.batch_size.max(1);
    let mut counters = ReadCounters::default();
    let mut record = StringRecord::new();
    let mut batch = Batch {
        rows: 0,
        observations: Vec::with_capacity(batch_size),
    };

    loop {
        if config.limit.is_some_and(|limit| counters.rows >= limit) {
            debug!("row limit of {} reached", counters.rows);
            break;
        }
        match rdr.read_record(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => {
                counters.rows += 1;
                counters.skipped += 1;
                batch.rows += 1;
                warn!("skipping row {}: {}", counters.rows, err);
                continue;
            }
        }
        counters.rows += 1;
        batch.rows += 1;

        match Observation::from_record(&record, config.format) {
            Ok(obs) => batch.observations.push(obs),
            Err(err) => {
                counters.skipped += 1;
                warn!("skipping row {}: {}", counters.rows, err);
            }
        }

        if batch.rows as usize >= batch_size {
            let full = std::mem::replace(
                &mut batch,
                Batch {
                    rows: 0,
                    observations: Vec::with_capacity(batch_size),
                },
            );
            if tx.send(full).is_err() {
                // the consumer is gone, nothing left to do
                return Ok(counters);
            }
        }
    }

    if batch.rows > 0 {
        let _ = tx.send(batch);
    }
    Ok(counters)
}

//------------ Consumer side -------------------------------------------------

fn insert_all(
    fib: &mut Fib,
    observations: &[Observation],
    prefix_len: u8,
) -> InsertCounters {
    let mut counters = InsertCounters::default();
    for obs in observations {
        let res =
            fib.insert(obs.near, obs.destination, prefix_len, obs.next_hop);
        match res {
            Ok(()) => counters.inserted += 1,
            Err(err) => {
                counters.skipped += 1;
                warn!("skipping probe to {}: {}", obs.destination, err);
            }
        }
    }
    counters
}

fn consume(
    rx: Receiver<Batch>,
    config: &IngestConfig,
    progress: &mut Progress,
) -> Result<(Fib, InsertCounters), FibError> {
    let mut fib = Fib::with_config(config.fib_config());
    let mut counters = InsertCounters::default();
    let mut rows = 0;

    for batch in rx {
        counters +=
            insert_all(&mut fib, &batch.observations, config.prefix_len);
        rows += batch.rows;
        progress.update(rows);
    }
    Ok((fib, counters))
}

fn consume_sharded(
    rx: Receiver<Batch>,
    config: &IngestConfig,
    shards: usize,
    progress: &mut Progress,
) -> Result<(Fib, InsertCounters), FibError> {
    let mut fibs = (0..shards)
        .map(|_| Fib::with_config(config.fib_config()))
        .collect::<Vec<_>>();
    let mut counters = InsertCounters::default();
    let mut rows = 0;

    for batch in rx {
        let mut parts = vec![Vec::new(); shards];
        for obs in batch.observations {
            if let Some(part) = parts.get_mut(shard_of(obs.near, shards)) {
                part.push(obs);
            }
        }
        counters += fibs
            .par_iter_mut()
            .zip(parts.par_iter())
            .map(|(fib, part)| insert_all(fib, part, config.prefix_len))
            .reduce(InsertCounters::default, |a, b| a + b);
        rows += batch.rows;
        progress.update(rows);
    }

    let mut fibs = fibs.into_iter();
    let mut fib = fibs
        .next()
        .unwrap_or_else(|| Fib::with_config(config.fib_config()));
    for shard in fibs {
        fib.merge_disjoint(shard)?;
    }
    Ok((fib, counters))
}
