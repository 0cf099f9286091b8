//! The parser contract (§4.4) and the three built-in synthetic parsers.
//!
//! Unlike the source this engine is descended from, parsers here are not
//! constructed bound to a byte range up front. A factory in the
//! [`crate::registry::ParserRegistry`] produces a fresh, empty parser
//! instance; [`Parser::parse_from_offset`] both binds it to a
//! [`MappedFile`]/offset and attempts the parse in one call. This keeps the
//! trait object-safe without parsers having to carry a lifetime.

use shardscan_core::{ByteRange, InfoRecord, Result};

use crate::mapped_file::MappedFile;
use crate::unpack_dir::UnpackDirectory;

/// Capability set every format handler, real or synthetic, satisfies.
///
/// A parser instance is single-use: exactly one [`Parser::parse_from_offset`]
/// call is ever made on it before it is either discarded (on failure) or
/// handed to the owning [`UnpackDirectory`] as its terminal parser.
pub trait Parser: Send + Sync {
    /// Stable identifier string, used as the `parser` field of the info
    /// record and for diagnostics.
    fn name(&self) -> &str;

    /// Attempt to validate structure starting at `start_offset` within
    /// `mapped`. On structural mismatch, magic mismatch, truncation, or
    /// constraint violation this fails with a recoverable error; on success
    /// [`Parser::parsed_size`] becomes available and is greater than zero.
    fn parse_from_offset(&mut self, mapped: &MappedFile, start_offset: u64) -> Result<()>;

    /// Number of bytes consumed by the successful parse. Only meaningful
    /// after `parse_from_offset` has returned `Ok(())`.
    fn parsed_size(&self) -> u64;

    /// Produce the child unpack directories that result from decoding this
    /// format's contents. Called once, after the parser has been assigned to
    /// `ud` and `ud` has been scanned. Synthetic parsers return an empty
    /// list.
    fn unpack(&self, ud: &UnpackDirectory) -> Result<Vec<UnpackDirectory>> {
        let _ = ud;
        Ok(Vec::new())
    }

    /// Record labels and format-specific metadata into `ud.info`.
    fn write_info(&self, ud: &mut UnpackDirectory);
}

/// Claims a whole file already established to be padding (§4.1). Reports
/// `parsed_size = file_size` on success so padding behaves uniformly with
/// real parsers for claim bookkeeping.
#[derive(Debug, Default)]
pub struct PaddingParser {
    parsed_size: u64,
}

impl PaddingParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a padding claim directly from a size already confirmed by
    /// [`crate::padding::is_padding_file`], skipping the mapped-byte
    /// re-verification `parse_from_offset` would otherwise do.
    pub fn claim(size: u64) -> Self {
        Self { parsed_size: size }
    }
}

impl Parser for PaddingParser {
    fn name(&self) -> &str {
        "padding"
    }

    fn parse_from_offset(&mut self, mapped: &MappedFile, start_offset: u64) -> Result<()> {
        let data = mapped.bytes_from(start_offset)?;
        if crate::padding::is_padding_bytes(data) {
            self.parsed_size = data.len() as u64;
            Ok(())
        } else {
            Err(shardscan_core::Error::parse_fail(
                self.name(),
                "file is not entirely 0x00 or entirely 0xFF",
            ))
        }
    }

    fn parsed_size(&self) -> u64 {
        self.parsed_size
    }

    fn write_info(&self, ud: &mut UnpackDirectory) {
        ud.info = InfoRecord::empty().with_label("padding");
        ud.info.size = self.parsed_size;
        ud.info.parser = self.name().to_string();
    }
}

/// Claims a gap between recognised regions: "unclassified bytes between
/// recognised regions" (§4.4).
#[derive(Debug)]
pub struct SynthesizingParser {
    length: u64,
    parsed_size: u64,
}

impl SynthesizingParser {
    pub fn new(length: u64) -> Self {
        Self {
            length,
            parsed_size: 0,
        }
    }
}

impl Parser for SynthesizingParser {
    fn name(&self) -> &str {
        "synthesized"
    }

    fn parse_from_offset(&mut self, _mapped: &MappedFile, _start_offset: u64) -> Result<()> {
        self.parsed_size = self.length;
        Ok(())
    }

    fn parsed_size(&self) -> u64 {
        self.parsed_size
    }

    fn write_info(&self, ud: &mut UnpackDirectory) {
        ud.info = InfoRecord::empty().with_label("synthesized");
        ud.info.size = self.parsed_size;
        ud.info.parser = self.name().to_string();
    }
}

/// Attached to a parent whose body has been decomposed into the given region
/// list; enumerates the decomposition (§4.4).
#[derive(Debug)]
pub struct ExtractingParser {
    parts: Vec<ByteRange>,
    parsed_size: u64,
}

impl ExtractingParser {
    pub fn with_parts(parts: Vec<ByteRange>) -> Self {
        let parsed_size = parts.iter().map(|r| r.length).sum();
        Self { parts, parsed_size }
    }

    pub fn parts(&self) -> &[ByteRange] {
        &self.parts
    }
}

impl Parser for ExtractingParser {
    fn name(&self) -> &str {
        "extracting"
    }

    fn parse_from_offset(&mut self, _mapped: &MappedFile, _start_offset: u64) -> Result<()> {
        // Already constructed with its parts; nothing left to validate.
        Ok(())
    }

    fn parsed_size(&self) -> u64 {
        self.parsed_size
    }

    fn write_info(&self, ud: &mut UnpackDirectory) {
        let parts = self
            .parts
            .iter()
            .map(|r| {
                serde_json::json!({ "offset": r.offset, "length": r.length })
            })
            .collect();
        let mut metadata = serde_json::Map::new();
        metadata.insert("parts".to_string(), serde_json::Value::Array(parts));

        ud.info = InfoRecord::empty().with_label("extracted");
        ud.info.metadata = metadata;
        ud.info.size = ud.size;
        ud.info.parser = self.name().to_string();
    }
}
