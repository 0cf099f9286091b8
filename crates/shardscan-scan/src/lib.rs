//! The recursive binary-analysis scan engine: classification cascade,
//! signature cover construction, unpack-directory bookkeeping, and the
//! parser contract.

pub mod config;
pub mod extension;
pub mod job;
pub mod logging;
pub mod mapped_file;
pub mod padding;
pub mod parser;
pub mod queue;
pub mod registry;
pub mod scan_unit;
pub mod signature;
pub mod unpack_dir;

pub use config::ScanConfig;
pub use job::{process_job, process_jobs, ScanJob};
pub use mapped_file::MappedFile;
pub use parser::{ExtractingParser, PaddingParser, Parser, SynthesizingParser};
pub use queue::{RecvOutcome, ScanQueue};
pub use registry::{ParserFactory, ParserRegistration, ParserRegistry, Signature};
pub use scan_unit::ScanUnit;
pub use unpack_dir::UnpackDirectory;
