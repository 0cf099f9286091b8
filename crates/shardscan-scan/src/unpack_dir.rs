//! Unpack directory (§4.6, §3 "Unpack directory"): per-input bookkeeping for
//! an input file's workspace.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use shardscan_core::{ByteRange, InfoRecord, Result};

use crate::mapped_file::MappedFile;
use crate::parser::Parser;

/// Per-input workspace holding extracted children and metadata (§3).
pub struct UnpackDirectory {
    /// Root all paths in this tree are relative to. Shared by every UD
    /// derived from the same top-level scan.
    pub unpack_root: PathBuf,
    /// Path of the input relative to `unpack_root`.
    pub file_path: PathBuf,
    /// Directory used to store extracted children and the info record for
    /// this input, relative to `unpack_root`.
    pub ud_path: PathBuf,
    /// Byte size of the input.
    pub size: u64,
    /// The parser that ultimately claimed this file. At most one is ever
    /// set, and only once scanning is complete.
    pub unpack_parser: Option<Box<dyn Parser>>,
    /// Children produced from this input. Append-only during this UD's
    /// lifetime.
    pub extracted_files: Vec<UnpackDirectory>,
    /// Structured metadata populated by the claiming parser.
    pub info: InfoRecord,
}

impl UnpackDirectory {
    /// `from_ud_path(root, relative_path)` (§4.6): open or create the
    /// workspace for an input. Creates `ud_path` eagerly so concurrent
    /// carving of children never races on missing ancestor directories
    /// (§5 "Shared resources").
    pub fn from_ud_path(unpack_root: PathBuf, file_path: PathBuf) -> Result<Self> {
        let abs_file_path = unpack_root.join(&file_path);
        let size = std::fs::metadata(&abs_file_path)?.len();
        let ud_path = workspace_dir_for(&file_path);
        std::fs::create_dir_all(unpack_root.join(&ud_path))?;

        Ok(Self {
            unpack_root,
            file_path,
            ud_path,
            size,
            unpack_parser: None,
            extracted_files: Vec::new(),
            info: InfoRecord::empty(),
        })
    }

    /// Absolute path of the input file.
    pub fn abs_file_path(&self) -> PathBuf {
        self.unpack_root.join(&self.file_path)
    }

    /// Absolute path of this input's workspace directory.
    pub fn abs_ud_path(&self) -> PathBuf {
        self.unpack_root.join(&self.ud_path)
    }

    /// Deterministic name for a carved child covering `[offset, offset +
    /// length)`, unique within the parent (§4.6). Both `offset` and `length`
    /// are encoded so the same pair always resolves to the same path, giving
    /// idempotent carving (§8).
    pub fn extracted_filename(&self, offset: u64, length: u64) -> PathBuf {
        self.ud_path.join(format!("{offset:016x}-{length:016x}.bin"))
    }

    /// Append a child to `extracted_files`.
    pub fn add_extracted_file(&mut self, child: UnpackDirectory) {
        self.extracted_files.push(child);
    }

    /// `is_scanned()` (§3): true iff `info` is non-empty.
    pub fn is_scanned(&self) -> bool {
        self.info.is_scanned()
    }

    /// Write the info record to disk alongside the workspace directory (§6
    /// "On-disk layout").
    pub fn persist_info(&self) -> Result<()> {
        let abs_ud_path = self.abs_ud_path();
        std::fs::create_dir_all(&abs_ud_path)?;
        let bytes = serde_json::to_vec_pretty(&self.info)
            .map_err(|e| shardscan_core::Error::Registry(e.to_string()))?;
        std::fs::write(abs_ud_path.join("info.json"), bytes)?;
        Ok(())
    }
}

/// Workspace directory for an input at `file_path`: the same path with a
/// `.extracted` suffix appended to the file name (§6 "implementation
/// choice").
fn workspace_dir_for(file_path: &Path) -> PathBuf {
    let mut name = file_path.as_os_str().to_os_string();
    name.push(".extracted");
    PathBuf::from(name)
}

/// Carve `range` out of `mapped` into a new child workspace under `parent`,
/// via a direct write of the mapped slice (§5 "zero-copy file-to-file range
/// transfer where the host provides it" — here the mapping already holds the
/// bytes in memory, so the transfer is a single `write`).
pub fn carve(
    parent: &UnpackDirectory,
    mapped: &MappedFile,
    range: ByteRange,
) -> Result<UnpackDirectory> {
    if !range.fits_within(parent.size) {
        return Err(shardscan_core::Error::parse_fail(
            "carve",
            format!(
                "range {:?} does not fit within parent of size {}",
                range, parent.size
            ),
        ));
    }

    let rel_path = parent.extracted_filename(range.offset, range.length);
    let abs_path = parent.unpack_root.join(&rel_path);
    if let Some(dir) = abs_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let bytes = mapped.slice(range.offset, range.length)?;
    std::fs::write(&abs_path, bytes).map_err(|source| shardscan_core::Error::Carve {
        path: abs_path.clone(),
        offset: range.offset,
        offset_plus_length: range.end(),
        source,
    })?;

    UnpackDirectory::from_ud_path(parent.unpack_root.clone(), rel_path)
}

/// Duplicate-name policy for a parser's own `unpack()` (§4.6): rename
/// collisions by appending `-1`, `-2`, … to the first free suffix. Returns
/// the name actually used and whether it had to be renamed.
pub fn dedupe_child_name(seen: &mut HashSet<String>, proposed: &str) -> (String, bool) {
    if seen.insert(proposed.to_string()) {
        return (proposed.to_string(), false);
    }
    let mut counter = 1u32;
    loop {
        let candidate = format!("{proposed}-{counter}");
        if seen.insert(candidate.clone()) {
            return (candidate, true);
        }
        counter += 1;
    }
}
