//! Scan job and driver (§4.7): the padding -> extension -> signature
//! cascade for a single input, plus the worker pool that drains the queue.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use shardscan_core::{Error, Result};

use crate::config::ScanConfig;
use crate::mapped_file::MappedFile;
use crate::parser::{Parser, PaddingParser};
use crate::queue::{RecvOutcome, ScanQueue};
use crate::registry::ParserRegistry;
use crate::scan_unit::ScanUnit;
use crate::signature::scan_signature;
use crate::unpack_dir::UnpackDirectory;
use crate::extension::scan_extension;

/// One pending unit of work: an input file, named by its path relative to
/// `unpack_root`, waiting to be classified.
#[derive(Debug, Clone)]
pub struct ScanJob {
    pub unpack_root: PathBuf,
    pub rel_path: PathBuf,
}

impl ScanJob {
    pub fn new(unpack_root: PathBuf, rel_path: PathBuf) -> Self {
        Self {
            unpack_root,
            rel_path,
        }
    }
}

/// Run the full classification cascade (§2) for one job and persist its
/// info record. Returns the materialized [`UnpackDirectory`], already
/// carrying any children the extension/signature scanners carved.
///
/// Only the children a claiming parser's own [`Parser::unpack`] produces are
/// returned for the caller to enqueue as fresh jobs; the children carved
/// directly by the extension/signature scanners are already classified and
/// are not re-scanned.
#[tracing::instrument(level = "debug", skip(registry, job), fields(file = %job.rel_path.display()))]
pub fn process_job(
    registry: &ParserRegistry,
    job: &ScanJob,
) -> Result<(UnpackDirectory, Vec<UnpackDirectory>)> {
    let mut ud = UnpackDirectory::from_ud_path(job.unpack_root.clone(), job.rel_path.clone())?;
    let abs_path = ud.abs_file_path();

    let metadata = std::fs::metadata(&abs_path)?;
    if !metadata.is_file() || metadata.len() == 0 {
        tracing::debug!("input is not a scannable regular file");
        return Err(Error::Unscannable { path: abs_path });
    }

    if crate::padding::is_padding_file(&abs_path)? {
        tracing::debug!("classified as padding");
        let mut padding = PaddingParser::claim(metadata.len());
        padding.write_info(&mut ud);
        ud.unpack_parser = Some(Box::new(padding));
        ud.persist_info()?;
        return Ok((ud, Vec::new()));
    }

    let mapped = MappedFile::open(&abs_path)?;

    let mut units = scan_extension(registry, &mut ud, &mapped)?;
    if units.is_empty() {
        tracing::debug!("no extension candidate matched, falling back to signature scan");
        units = scan_signature(registry, &mut ud, &mapped)?;
    }

    let grandchildren = dispatch_units(&units, &mut ud)?;

    if let Some(parser) = ud.unpack_parser.take() {
        parser.write_info(&mut ud);
        ud.unpack_parser = Some(parser);
    }
    for child in ud.extracted_files.iter_mut() {
        if let Some(parser) = child.unpack_parser.take() {
            parser.write_info(child);
            child.unpack_parser = Some(parser);
        }
    }

    ud.persist_info()?;
    for child in &ud.extracted_files {
        child.persist_info()?;
    }

    Ok((ud, grandchildren))
}

/// Invoke `unpack()` on every unit the cascade assigned a parser to,
/// collecting the children it produces (§4.7 step 3/5).
fn dispatch_units(units: &[ScanUnit], ud: &mut UnpackDirectory) -> Result<Vec<UnpackDirectory>> {
    let mut grandchildren = Vec::new();
    for unit in units {
        match *unit {
            ScanUnit::Root => {
                if let Some(parser) = ud.unpack_parser.as_ref() {
                    grandchildren.extend(parser.unpack(ud)?);
                }
            }
            ScanUnit::Child(idx) => {
                if let Some(child) = ud.extracted_files.get(idx) {
                    if let Some(parser) = child.unpack_parser.as_ref() {
                        grandchildren.extend(parser.unpack(child)?);
                    }
                }
            }
        }
    }
    Ok(grandchildren)
}

/// Seed the queue with `roots` and drain it with `config.worker_count`
/// threads, each running [`process_job`] and enqueueing the grandchildren it
/// returns. Returns every materialized [`UnpackDirectory`], in no
/// particular order.
pub fn process_jobs(
    registry: Arc<ParserRegistry>,
    config: &ScanConfig,
    roots: Vec<PathBuf>,
) -> Result<Vec<UnpackDirectory>> {
    let queue = ScanQueue::new();
    for root in roots {
        queue.push(ScanJob::new(config.unpack_root.clone(), root));
    }

    let results = std::sync::Mutex::new(Vec::new());
    let first_error: std::sync::Mutex<Option<Error>> = std::sync::Mutex::new(None);
    let timeout = config.queue_timeout;

    std::thread::scope(|scope| {
        for _ in 0..config.worker_count.max(1) {
            let queue = queue.clone();
            let registry = registry.clone();
            let results = &results;
            let first_error = &first_error;
            scope.spawn(move || loop {
                match queue.get(worker_poll_timeout(timeout)) {
                    RecvOutcome::Job(job) => {
                        match process_job(&registry, &job) {
                            Ok((ud, grandchildren)) => {
                                for grandchild in grandchildren {
                                    queue.push(ScanJob::new(
                                        job.unpack_root.clone(),
                                        grandchild.file_path.clone(),
                                    ));
                                }
                                results.lock().expect("results mutex poisoned").push(ud);
                            }
                            Err(err) => {
                                let mut slot =
                                    first_error.lock().expect("error mutex poisoned");
                                if slot.is_none() {
                                    *slot = Some(err);
                                }
                            }
                        }
                        queue.task_done();
                    }
                    RecvOutcome::Empty => {
                        if queue.is_idle() {
                            break;
                        }
                    }
                }
            });
        }
    });

    if let Some(err) = first_error.into_inner().expect("error mutex poisoned") {
        return Err(err);
    }
    Ok(results.into_inner().expect("results mutex poisoned"))
}

/// Workers poll in short slices rather than blocking for the whole
/// configured timeout, so `is_idle` gets re-checked promptly once other
/// workers finish pushing more work.
fn worker_poll_timeout(configured: Duration) -> Duration {
    configured.min(Duration::from_millis(50))
}
