//! Execution strategies for per-file blame jobs.
//!
//! Within one frontier expansion, every modified file becomes an
//! independent job: load two blobs, diff them, split the region list. Jobs
//! never touch the frontier; each returns at most one parent-side
//! candidate plus the child's residual regions, which the scheduler thread
//! applies.
//!
//! Two strategies, both required: a same-thread executor for deterministic
//! debugging and small inputs, and a bounded pool sized to the machine.
//! Pool workers pull jobs from a shared channel and each holds its own
//! cloned store reader, since readers are not thread-safe.

use std::num::NonZeroUsize;

use ahash::AHashMap;

use crate::blob_reader::BlobReader;
use crate::errors::BlameError;
use crate::file_blamer::{execute_job, BlameJob, JobOutcome};
use crate::object_store::{ObjectStore, WorkTree};
use crate::options::BlameOptions;

/// How per-file jobs of one expansion run.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Executor {
    /// Run jobs inline on the scheduler thread.
    SameThread,
    /// Fan out over a bounded worker pool.
    Pool { workers: usize },
}

impl Executor {
    /// Pool sized to available parallelism when multithreading is on.
    pub(crate) fn from_options(opts: &BlameOptions) -> Self {
        if opts.multithreading {
            let workers = std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1);
            Executor::Pool { workers }
        } else {
            Executor::SameThread
        }
    }

    /// Runs all jobs, returning their outcomes in unspecified order.
    ///
    /// All blame assignments are commutative (each result line is written
    /// once), so outcome order does not matter. The first job error fails
    /// the batch after every worker has drained.
    pub(crate) fn run_jobs<S: ObjectStore>(
        self,
        store: &S,
        overrides: &AHashMap<String, Vec<u8>>,
        work_tree: Option<&dyn WorkTree>,
        opts: &BlameOptions,
        jobs: Vec<BlameJob>,
    ) -> Result<Vec<JobOutcome>, BlameError> {
        if jobs.is_empty() {
            return Ok(Vec::new());
        }
        match self {
            Executor::SameThread => {
                let mut reader = BlobReader::new(store.new_reader(), overrides, work_tree);
                jobs.into_iter()
                    .map(|job| execute_job(job, &mut reader, opts))
                    .collect()
            }
            Executor::Pool { workers } => {
                let workers = workers.max(1).min(jobs.len());
                let job_count = jobs.len();
                let (job_tx, job_rx) = crossbeam_channel::bounded::<BlameJob>(job_count);
                let (out_tx, out_rx) =
                    crossbeam_channel::bounded::<Result<JobOutcome, BlameError>>(job_count);
                for job in jobs {
                    job_tx.send(job).expect("bounded to job count");
                }
                drop(job_tx);

                std::thread::scope(|scope| {
                    for _ in 0..workers {
                        let job_rx = job_rx.clone();
                        let out_tx = out_tx.clone();
                        scope.spawn(move || {
                            let mut reader =
                                BlobReader::new(store.new_reader(), overrides, work_tree);
                            while let Ok(job) = job_rx.recv() {
                                if out_tx.send(execute_job(job, &mut reader, opts)).is_err() {
                                    break;
                                }
                            }
                        });
                    }
                    drop(out_tx);

                    let mut outcomes = Vec::with_capacity(job_count);
                    let mut first_error = None;
                    while let Ok(outcome) = out_rx.recv() {
                        match outcome {
                            Ok(outcome) => outcomes.push(outcome),
                            Err(err) if first_error.is_none() => first_error = Some(err),
                            Err(_) => {}
                        }
                    }
                    match first_error {
                        Some(err) => Err(err),
                        None => Ok(outcomes),
                    }
                })
            }
        }
    }
}
