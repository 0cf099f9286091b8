//! Extension scanner (§4.2): runs parsers whose extension pattern matches
//! the file name, against offset 0.

use shardscan_core::{ByteRange, Result};

use crate::mapped_file::MappedFile;
use crate::parser::{ExtractingParser, SynthesizingParser};
use crate::registry::{matches_file_pattern, ParserRegistry};
use crate::scan_unit::ScanUnit;
use crate::unpack_dir::{carve, UnpackDirectory};

/// Run the extension cascade over `ud`, mutating it and its
/// `extracted_files` in place, and return which of them were "yielded" for
/// the driver to invoke `unpack`/`write_info` on.
///
/// Stops after the first candidate that parses successfully (§4.2
/// rationale: the extension cascade is an optimistic fast path; ambiguity
/// resolution is the signature scanner's job). An empty return means no
/// extension candidate matched.
#[tracing::instrument(level = "debug", skip(registry, ud, mapped), fields(file = %ud.file_path.display()))]
pub fn scan_extension(
    registry: &ParserRegistry,
    ud: &mut UnpackDirectory,
    mapped: &MappedFile,
) -> Result<Vec<ScanUnit>> {
    for (pattern, factories) in registry.by_extension() {
        if !matches_file_pattern(&ud.file_path, pattern) {
            continue;
        }
        for factory in factories {
            let mut parser = factory.construct();
            let name = parser.name().to_string();
            let parsed = match parser.parse_from_offset(mapped, 0) {
                Ok(()) => parser.parsed_size(),
                Err(err) if err.is_recoverable() => {
                    tracing::debug!(parser = %name, pattern, %err, "extension candidate rejected");
                    continue;
                }
                Err(err) => return Err(err),
            };
            if parsed == 0 {
                // Treated as ParseFail per the resolved open question (§9).
                tracing::debug!(parser = %name, pattern, "extension candidate claimed zero bytes, discarding");
                continue;
            }
            tracing::debug!(parser = %name, pattern, parsed, "extension candidate claimed region");

            if parsed == mapped.size() {
                ud.unpack_parser = Some(parser);
                return Ok(vec![ScanUnit::Root]);
            }

            // Prefix consumed, suffix left over: split into a matched child
            // and a synthesized trailing child, recording the split on the
            // parent via an ExtractingParser.
            let remaining = mapped.size() - parsed;
            ud.unpack_parser = Some(Box::new(ExtractingParser::with_parts(vec![
                ByteRange::new(0, parsed),
                ByteRange::new(parsed, remaining),
            ])));

            let mut prefix_child = carve(ud, mapped, ByteRange::new(0, parsed))?;
            prefix_child.unpack_parser = Some(parser);
            ud.add_extracted_file(prefix_child);
            let prefix_idx = ud.extracted_files.len() - 1;

            let mut suffix_child = carve(ud, mapped, ByteRange::new(parsed, remaining))?;
            let mut synth = SynthesizingParser::new(remaining);
            synth.parse_from_offset(mapped, parsed)?;
            suffix_child.unpack_parser = Some(Box::new(synth));
            ud.add_extracted_file(suffix_child);
            let suffix_idx = ud.extracted_files.len() - 1;

            return Ok(vec![
                ScanUnit::Root,
                ScanUnit::Child(prefix_idx),
                ScanUnit::Child(suffix_idx),
            ]);
        }
    }
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ParserRegistration, Signature};
    use crate::parser::Parser;
    use std::path::PathBuf;

    struct FixedSizeParser {
        claim: u64,
        parsed_size: u64,
    }

    impl Parser for FixedSizeParser {
        fn name(&self) -> &str {
            "fixed"
        }
        fn parse_from_offset(&mut self, mapped: &MappedFile, start_offset: u64) -> Result<()> {
            if start_offset + self.claim > mapped.size() {
                return Err(shardscan_core::Error::parse_fail(self.name(), "too short"));
            }
            self.parsed_size = self.claim;
            Ok(())
        }
        fn parsed_size(&self) -> u64 {
            self.parsed_size
        }
        fn write_info(&self, ud: &mut crate::unpack_dir::UnpackDirectory) {
            ud.info.parser = self.name().to_string();
            ud.info.labels.push("fixed".to_string());
        }
    }

    fn registry_with_fixed_claim(claim: u64) -> ParserRegistry {
        let mut registry = ParserRegistry::new();
        registry
            .register(ParserRegistration {
                id: "fixed".to_string(),
                extensions: vec!["*.bin".to_string()],
                signatures: vec![Signature::new(0, b"FX".to_vec())],
                make: Box::new(move || {
                    Box::new(FixedSizeParser {
                        claim,
                        parsed_size: 0,
                    })
                }),
            })
            .unwrap();
        registry
    }

    #[test]
    fn whole_file_match_assigns_root_only() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("x.bin"), vec![1u8; 10]).unwrap();
        let mut ud =
            UnpackDirectory::from_ud_path(root.path().to_path_buf(), PathBuf::from("x.bin"))
                .unwrap();
        let mapped = MappedFile::open(&ud.abs_file_path()).unwrap();

        let registry = registry_with_fixed_claim(10);
        let units = scan_extension(&registry, &mut ud, &mapped).unwrap();

        assert_eq!(units, vec![ScanUnit::Root]);
        assert!(ud.unpack_parser.is_some());
        assert!(ud.extracted_files.is_empty());
    }

    #[test]
    fn prefix_match_splits_into_two_children() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("x.bin"), vec![1u8; 10]).unwrap();
        let mut ud =
            UnpackDirectory::from_ud_path(root.path().to_path_buf(), PathBuf::from("x.bin"))
                .unwrap();
        let mapped = MappedFile::open(&ud.abs_file_path()).unwrap();

        let registry = registry_with_fixed_claim(6);
        let units = scan_extension(&registry, &mut ud, &mapped).unwrap();

        assert_eq!(
            units,
            vec![ScanUnit::Root, ScanUnit::Child(0), ScanUnit::Child(1)]
        );
        assert_eq!(ud.extracted_files.len(), 2);
        assert_eq!(ud.extracted_files[0].size, 6);
        assert_eq!(ud.extracted_files[1].size, 4);
    }

    #[test]
    fn no_matching_extension_yields_nothing() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("x.dat"), vec![1u8; 10]).unwrap();
        let mut ud =
            UnpackDirectory::from_ud_path(root.path().to_path_buf(), PathBuf::from("x.dat"))
                .unwrap();
        let mapped = MappedFile::open(&ud.abs_file_path()).unwrap();

        let registry = registry_with_fixed_claim(6);
        let units = scan_extension(&registry, &mut ud, &mapped).unwrap();
        assert!(units.is_empty());
    }
}
