//! Stand-in format parsers shared across the integration scenarios.
//!
//! `GifLikeParser` mirrors the shape of a header-plus-body image format: a
//! fixed magic, a declared body length, and a body of exactly that many
//! bytes. `FbpkLikeParser` mirrors a firmware partition table: a magic, a
//! partition count, and that many `(name, data)` records, with the same
//! duplicate-name renaming an Android firmware-table unpacker has to do.

use shardscan_core::{Error, Result};
use shardscan_scan::unpack_dir::dedupe_child_name;
use shardscan_scan::{
    MappedFile, Parser, ParserRegistration, ParserRegistry, Signature, UnpackDirectory,
};
use std::collections::HashSet;

pub const GIF_MAGIC: &[u8] = b"GIF8";
pub const FBPK_MAGIC: &[u8] = b"FBPK";

/// Build `GIF_MAGIC || body.len() as u32 LE || body`.
pub fn encode_gif(body: &[u8]) -> Vec<u8> {
    let mut out = GIF_MAGIC.to_vec();
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    out
}

#[derive(Default)]
pub struct GifLikeParser {
    parsed_size: u64,
}

impl Parser for GifLikeParser {
    fn name(&self) -> &str {
        "gif"
    }

    fn parse_from_offset(&mut self, mapped: &MappedFile, start_offset: u64) -> Result<()> {
        let header = mapped.slice(start_offset, 8)?;
        if &header[0..4] != GIF_MAGIC {
            return Err(Error::parse_fail(self.name(), "bad magic"));
        }
        let body_len = u32::from_le_bytes(header[4..8].try_into().unwrap()) as u64;
        // Bounds-checked: a declared length running past the mapping fails
        // the candidate rather than panicking (exercises the "bogus match"
        // scenario).
        mapped.slice(start_offset + 8, body_len)?;
        self.parsed_size = 8 + body_len;
        Ok(())
    }

    fn parsed_size(&self) -> u64 {
        self.parsed_size
    }

    fn write_info(&self, ud: &mut UnpackDirectory) {
        ud.info.parser = self.name().to_string();
        ud.info.labels = vec!["gif".to_string(), "graphics".to_string()];
        ud.info.size = self.parsed_size;
    }
}

/// A single partition record: `name_len: u8, name, size: u32 LE, data`.
pub fn encode_fbpk(partitions: &[(&str, &[u8])]) -> Vec<u8> {
    let mut out = FBPK_MAGIC.to_vec();
    out.push(partitions.len() as u8);
    for (name, data) in partitions {
        out.push(name.len() as u8);
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
    }
    out
}

struct FbpkEntry {
    name: String,
    data: Vec<u8>,
}

#[derive(Default)]
pub struct FbpkLikeParser {
    parsed_size: u64,
    entries: Vec<FbpkEntry>,
}

impl Parser for FbpkLikeParser {
    fn name(&self) -> &str {
        "fbpk"
    }

    fn parse_from_offset(&mut self, mapped: &MappedFile, start_offset: u64) -> Result<()> {
        let mut cursor = start_offset;
        let header = mapped.slice(cursor, 5)?;
        if &header[0..4] != FBPK_MAGIC {
            return Err(Error::parse_fail(self.name(), "bad magic"));
        }
        let count = header[4] as usize;
        cursor += 5;

        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let name_len = mapped.slice(cursor, 1)?[0] as u64;
            cursor += 1;
            let name_bytes = mapped.slice(cursor, name_len)?;
            let name = String::from_utf8(name_bytes.to_vec())
                .map_err(|_| Error::parse_fail(self.name(), "non-utf8 partition name"))?;
            cursor += name_len;
            let size_bytes = mapped.slice(cursor, 4)?;
            let size = u32::from_le_bytes(size_bytes.try_into().unwrap()) as u64;
            cursor += 4;
            let data = mapped.slice(cursor, size)?.to_vec();
            cursor += size;
            entries.push(FbpkEntry { name, data });
        }

        self.parsed_size = cursor - start_offset;
        self.entries = entries;
        Ok(())
    }

    fn parsed_size(&self) -> u64 {
        self.parsed_size
    }

    fn unpack(&self, ud: &UnpackDirectory) -> Result<Vec<UnpackDirectory>> {
        let mut seen = HashSet::new();
        let mut produced = Vec::new();
        for entry in &self.entries {
            let (name, renamed) = dedupe_child_name(&mut seen, &entry.name);
            let rel_path = ud.ud_path.join(&name);
            let abs_path = ud.unpack_root.join(&rel_path);
            std::fs::write(&abs_path, &entry.data)?;
            let mut child =
                UnpackDirectory::from_ud_path(ud.unpack_root.clone(), rel_path)?;
            if renamed {
                child.info.labels.push("renamed".to_string());
            }
            produced.push(child);
        }
        Ok(produced)
    }

    fn write_info(&self, ud: &mut UnpackDirectory) {
        ud.info.parser = self.name().to_string();
        ud.info.labels = vec!["android".to_string(), "fbpk".to_string()];
        ud.info.size = self.parsed_size;
    }
}

pub fn registry_with_gif_and_fbpk() -> ParserRegistry {
    let mut registry = ParserRegistry::new();
    registry
        .register(ParserRegistration {
            id: "gif".to_string(),
            extensions: vec!["*.gif".to_string()],
            signatures: vec![Signature::new(0, GIF_MAGIC.to_vec())],
            make: Box::new(|| Box::<GifLikeParser>::default()),
        })
        .unwrap();
    registry
        .register(ParserRegistration {
            id: "fbpk".to_string(),
            extensions: vec![],
            signatures: vec![Signature::new(0, FBPK_MAGIC.to_vec())],
            make: Box::new(|| Box::<FbpkLikeParser>::default()),
        })
        .unwrap();
    registry
}
