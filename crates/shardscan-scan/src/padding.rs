//! Padding detector (§4.1): a fast check that a file is entirely `0x00` or
//! entirely `0xFF`.

use std::io::Read;
use std::path::Path;

/// `is_padding(path)` per §4.1: reads the first byte; if it is not `0x00` or
/// `0xFF`, returns `false`. Otherwise reads bytes until the first differing
/// byte or end-of-file; returns `true` iff end-of-file was reached.
///
/// Reads the file sequentially rather than through the memory mapping so a
/// non-padding file is rejected after at most a handful of bytes without
/// mapping it.
pub fn is_padding_file(path: &Path) -> std::io::Result<bool> {
    let mut file = std::fs::File::open(path)?;
    let mut byte = [0u8; 1];
    if file.read(&mut byte)? == 0 {
        return Ok(false);
    }
    is_padding_stream(byte[0], &mut file)
}

fn is_padding_stream(first_byte: u8, reader: &mut impl Read) -> std::io::Result<bool> {
    if first_byte != 0x00 && first_byte != 0xFF {
        return Ok(false);
    }
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte)? {
            0 => return Ok(true),
            _ if byte[0] != first_byte => return Ok(false),
            _ => continue,
        }
    }
}

/// Same check operating on an already-loaded byte slice (used by
/// [`crate::parser::PaddingParser`], which runs over the memory-mapped
/// input rather than re-opening the file).
pub fn is_padding_bytes(data: &[u8]) -> bool {
    match data.first() {
        None => false,
        Some(&first) if first != 0x00 && first != 0xFF => false,
        Some(&first) => data.iter().all(|&b| b == first),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn pure_zero_bytes_are_padding() {
        assert!(is_padding_bytes(&[0u8; 4096]));
    }

    #[test]
    fn pure_ff_bytes_are_padding() {
        assert!(is_padding_bytes(&[0xFFu8; 128]));
    }

    #[test]
    fn mixed_bytes_are_not_padding() {
        assert!(!is_padding_bytes(b"\x00\x00\x01\x00"));
    }

    #[test]
    fn empty_slice_is_not_padding() {
        assert!(!is_padding_bytes(&[]));
    }

    #[test]
    fn file_variant_matches_byte_variant() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(&[0u8; 64]).unwrap();
        assert!(is_padding_file(f.path()).unwrap());

        let mut f2 = tempfile::NamedTempFile::new().unwrap();
        f2.write_all(b"\x00\x01").unwrap();
        assert!(!is_padding_file(f2.path()).unwrap());
    }
}
