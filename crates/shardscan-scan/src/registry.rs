//! Parser registry (§4.5): maps file-extension patterns and byte signatures
//! to candidate parser constructors.

use std::path::Path;
use std::sync::Arc;

use shardscan_core::Error;

use crate::parser::Parser;

/// A `(s_offset, pattern)` pair (§3 "Signature"): `pattern` found at absolute
/// position `p >= s_offset` indicates a candidate format start at `p -
/// s_offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub s_offset: u64,
    pub pattern: Vec<u8>,
}

impl Signature {
    pub fn new(s_offset: u64, pattern: impl Into<Vec<u8>>) -> Self {
        Self {
            s_offset,
            pattern: pattern.into(),
        }
    }
}

/// Factory for producing fresh parser instances, tagged with the id it was
/// registered under (for diagnostics).
pub struct ParserFactory {
    pub id: String,
    make: Box<dyn Fn() -> Box<dyn Parser> + Send + Sync>,
}

impl ParserFactory {
    pub fn construct(&self) -> Box<dyn Parser> {
        (self.make)()
    }
}

/// One parser's registration: which extensions and/or signatures it claims,
/// and how to construct it.
pub struct ParserRegistration {
    pub id: String,
    pub extensions: Vec<String>,
    pub signatures: Vec<Signature>,
    pub make: Box<dyn Fn() -> Box<dyn Parser> + Send + Sync>,
}

/// Registry errors. A failure here is treated as `ParseFail` for the
/// affected candidate (§7 "RegistryError").
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid extension glob {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        source: glob::PatternError,
    },
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Error::Registry(e.to_string())
    }
}

/// Two indexes exposed to the scanners, built once at startup and read-only
/// thereafter (§4.5, §5 "Shared resources").
#[derive(Default)]
pub struct ParserRegistry {
    by_signature: Vec<(Signature, Vec<Arc<ParserFactory>>)>,
    by_extension: Vec<(glob::Pattern, Vec<Arc<ParserFactory>>)>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parser's extension patterns and signatures. Within a
    /// pattern or signature already present, the new factory is appended
    /// after whatever is already registered there, so registry-iteration
    /// order (used for candidate tie-breaks, §4.3) reflects registration
    /// order.
    pub fn register(&mut self, registration: ParserRegistration) -> Result<(), RegistryError> {
        let factory = Arc::new(ParserFactory {
            id: registration.id,
            make: registration.make,
        });

        for ext in &registration.extensions {
            let pattern = glob::Pattern::new(ext).map_err(|source| RegistryError::InvalidPattern {
                pattern: ext.clone(),
                source,
            })?;
            match self
                .by_extension
                .iter_mut()
                .find(|(p, _)| p.as_str() == pattern.as_str())
            {
                Some((_, factories)) => factories.push(factory.clone()),
                None => self.by_extension.push((pattern, vec![factory.clone()])),
            }
        }

        for sig in &registration.signatures {
            match self.by_signature.iter_mut().find(|(s, _)| s == sig) {
                Some((_, factories)) => factories.push(factory.clone()),
                None => self.by_signature.push((sig.clone(), vec![factory.clone()])),
            }
        }

        Ok(())
    }

    /// `(extension pattern, ordered factories)` pairs, in registration order.
    pub fn by_extension(&self) -> &[(glob::Pattern, Vec<Arc<ParserFactory>>)] {
        &self.by_extension
    }

    /// `(signature, ordered factories)` pairs, in registration order.
    pub fn by_signature(&self) -> &[(Signature, Vec<Arc<ParserFactory>>)] {
        &self.by_signature
    }
}

/// `matches_file_pattern(path, pattern)` (§4.5): a pure predicate over the
/// file name, not the full path.
pub fn matches_file_pattern(path: &Path, pattern: &glob::Pattern) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|name| pattern.matches(name))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::PaddingParser;
    use std::path::PathBuf;

    fn dummy_registration(id: &str, extensions: &[&str]) -> ParserRegistration {
        ParserRegistration {
            id: id.to_string(),
            extensions: extensions.iter().map(|s| s.to_string()).collect(),
            signatures: vec![Signature::new(0, b"DUMY".to_vec())],
            make: Box::new(|| Box::new(PaddingParser::new())),
        }
    }

    #[test]
    fn register_groups_by_extension() {
        let mut registry = ParserRegistry::new();
        registry.register(dummy_registration("a", &["*.gif"])).unwrap();
        registry.register(dummy_registration("b", &["*.gif"])).unwrap();

        assert_eq!(registry.by_extension().len(), 1);
        assert_eq!(registry.by_extension()[0].1.len(), 2);
    }

    #[test]
    fn register_groups_by_signature() {
        let mut registry = ParserRegistry::new();
        registry.register(dummy_registration("a", &["*.gif"])).unwrap();
        registry.register(dummy_registration("b", &["*.bin"])).unwrap();

        assert_eq!(registry.by_signature().len(), 1);
        assert_eq!(registry.by_signature()[0].1.len(), 2);
    }

    #[test]
    fn matches_file_pattern_is_name_only() {
        let pattern = glob::Pattern::new("*.gif").unwrap();
        assert!(matches_file_pattern(&PathBuf::from("/a/b/x.gif"), &pattern));
        assert!(!matches_file_pattern(&PathBuf::from("/a/b/x.png"), &pattern));
    }
}
