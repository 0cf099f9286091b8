//! Signature scanner (§4.3): finds all signature occurrences across the
//! whole file, validates candidates, and produces a non-overlapping cover.

use shardscan_core::{ByteRange, Result};

use crate::mapped_file::MappedFile;
use crate::parser::{ExtractingParser, SynthesizingParser};
use crate::registry::ParserRegistry;
use crate::scan_unit::ScanUnit;
use crate::unpack_dir::{carve, UnpackDirectory};

/// Candidate discovery: every `(start, factory)` pair implied by the
/// registered signatures, sorted stably by ascending `start` so that
/// equal-start candidates keep registry-iteration order (§4.3 "Tie-breaks").
fn discover_candidates<'r>(
    registry: &'r ParserRegistry,
    mapped: &MappedFile,
) -> Vec<(u64, &'r std::sync::Arc<crate::registry::ParserFactory>)> {
    let mut candidates = Vec::new();
    for (signature, factories) in registry.by_signature() {
        for occurrence in memchr::memmem::find_iter(mapped.bytes(), &signature.pattern) {
            let absolute = occurrence as u64;
            if absolute < signature.s_offset {
                continue;
            }
            let start = absolute - signature.s_offset;
            for factory in factories {
                candidates.push((start, factory));
            }
        }
    }
    candidates.sort_by_key(|(start, _)| *start);
    candidates
}

/// Run the signature cascade over `ud`, carving each claimed region (and
/// each gap) into a child workspace, and return which children (plus,
/// finally, the root itself if any claim was made) were yielded.
#[tracing::instrument(level = "debug", skip(registry, ud, mapped), fields(file = %ud.file_path.display()))]
pub fn scan_signature(
    registry: &ParserRegistry,
    ud: &mut UnpackDirectory,
    mapped: &MappedFile,
) -> Result<Vec<ScanUnit>> {
    let candidates = discover_candidates(registry, mapped);
    tracing::debug!(count = candidates.len(), "discovered signature candidates");

    let mut scan_offset: u64 = 0;
    let mut units = Vec::new();
    let mut parts: Vec<ByteRange> = Vec::new();

    for (start, factory) in candidates {
        if start < scan_offset {
            // Already covered, either by an earlier claim or because this
            // signature occurred inside an already-claimed region.
            tracing::debug!(start, scan_offset, "candidate offset already covered, skipping");
            continue;
        }

        let mut parser = factory.construct();
        let name = parser.name().to_string();
        let parsed_size = match parser.parse_from_offset(mapped, start) {
            Ok(()) => parser.parsed_size(),
            Err(err) if err.is_recoverable() => {
                tracing::debug!(parser = %name, start, %err, "signature candidate rejected");
                continue;
            }
            Err(err) => return Err(err),
        };
        if parsed_size == 0 {
            // Treated as ParseFail per the resolved open question (§9).
            tracing::debug!(parser = %name, start, "signature candidate claimed zero bytes, discarding");
            continue;
        }
        tracing::debug!(parser = %name, start, parsed_size, "signature candidate claimed region");

        if start == 0 && parsed_size == mapped.size() {
            ud.unpack_parser = Some(parser);
            return Ok(vec![ScanUnit::Root]);
        }

        if start > scan_offset {
            let gap = ByteRange::new(scan_offset, start - scan_offset);
            let mut gap_child = carve(ud, mapped, gap)?;
            let mut synth = SynthesizingParser::new(gap.length);
            synth.parse_from_offset(mapped, gap.offset)?;
            gap_child.unpack_parser = Some(Box::new(synth));
            ud.add_extracted_file(gap_child);
            units.push(ScanUnit::Child(ud.extracted_files.len() - 1));
            parts.push(gap);
        }

        let claimed = ByteRange::new(start, parsed_size);
        let mut child = carve(ud, mapped, claimed)?;
        child.unpack_parser = Some(parser);
        ud.add_extracted_file(child);
        units.push(ScanUnit::Child(ud.extracted_files.len() - 1));
        parts.push(claimed);

        scan_offset = start + parsed_size;
    }

    if scan_offset > 0 && scan_offset < mapped.size() {
        let gap = ByteRange::new(scan_offset, mapped.size() - scan_offset);
        let mut gap_child = carve(ud, mapped, gap)?;
        let mut synth = SynthesizingParser::new(gap.length);
        synth.parse_from_offset(mapped, gap.offset)?;
        gap_child.unpack_parser = Some(Box::new(synth));
        ud.add_extracted_file(gap_child);
        units.push(ScanUnit::Child(ud.extracted_files.len() - 1));
        parts.push(gap);
    }

    if !parts.is_empty() {
        // Attached exactly once, after the scan completes, per the resolved
        // open question (§9) rather than re-attached on every iteration.
        ud.unpack_parser = Some(Box::new(ExtractingParser::with_parts(parts)));
        units.push(ScanUnit::Root);
    }

    Ok(units)
}
