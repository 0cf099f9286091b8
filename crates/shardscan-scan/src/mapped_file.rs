//! Memory-mapped view over an input file.
//!
//! Per §3 of the data model, the input file is an immutable byte-addressable
//! region mapped into memory for the duration of a scan, so parsers and the
//! signature scanner can take zero-copy slices of it.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use shardscan_core::{Error, Result};

/// A read-only memory mapping of one input file, plus its size.
pub struct MappedFile {
    mmap: Mmap,
}

impl MappedFile {
    /// Memory-map `path` for reading. The caller is responsible for having
    /// already established that the file is scannable (regular, non-empty).
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        // Safety: the mapping is only ever read; nothing else in this process
        // truncates or writes to input files while a scan holds them mapped.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|source| Error::Mmap {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { mmap })
    }

    /// The whole mapped region.
    pub fn bytes(&self) -> &[u8] {
        &self.mmap[..]
    }

    /// Total size of the mapped file.
    pub fn size(&self) -> u64 {
        self.mmap.len() as u64
    }

    /// Slice `[offset, offset + length)`, or a parse failure if it runs past
    /// the end of the mapping.
    pub fn slice(&self, offset: u64, length: u64) -> Result<&[u8]> {
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        let end = start.saturating_add(usize::try_from(length).unwrap_or(usize::MAX));
        self.mmap
            .get(start..end)
            .ok_or_else(|| Error::parse_fail("mapped_file", "range out of bounds"))
    }

    /// Slice from `offset` to the end of the mapping.
    pub fn bytes_from(&self, offset: u64) -> Result<&[u8]> {
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        self.mmap
            .get(start..)
            .ok_or_else(|| Error::parse_fail("mapped_file", "offset past end of file"))
    }
}
