//! Marker for which [`crate::unpack_dir::UnpackDirectory`] a scanner just
//! finished assigning a parser to, so the driver can look the target back up
//! without the scanner having to hand out borrowed references.

/// A scanner yields these in the order §4.2/§4.3 describe; the driver
/// resolves each one against the input UD it was scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanUnit {
    /// The input UD itself.
    Root,
    /// The child at this index in the input UD's `extracted_files`.
    Child(usize),
}
