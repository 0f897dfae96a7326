//! Error types for the refdoc-extract crate.

use std::backtrace::Backtrace;
use std::fmt;

use refdoc_schemas::TypeIdentity;

/// Boxed error reported by a source provider.
pub type ProviderError = Box<dyn std::error::Error + Send + Sync>;

/// Error type for type graph extraction.
///
/// This error captures the failures that abort a run: the provider cannot
/// enumerate packages, the configuration is invalid, the graph is internally
/// inconsistent, or output cannot be written. Recoverable conditions
/// (unresolvable field types, missing imports, depth cutoffs) are logged and
/// never surface here.
#[derive(Debug)]
pub struct ExtractError {
    kind: ExtractErrorKind,
    backtrace: Backtrace,
}

/// Internal error variants. Not exposed publicly; use `is_xxx()` methods
/// instead.
#[derive(Debug)]
pub(crate) enum ExtractErrorKind {
    /// The source provider failed to enumerate a package.
    Provider {
        package: Option<String>,
        source: ProviderError,
    },
    /// A registered type has no node in the type graph.
    TypeNotLoaded(TypeIdentity),
    /// An exclusion pattern is not a valid regular expression.
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
    /// The configuration file could not be parsed.
    Config(toml::de::Error),
    /// Failed to serialize output to JSON.
    Serialization(serde_json::Error),
    /// I/O error when writing output.
    Io(std::io::Error),
}

impl ExtractError {
    /// Creates an error from an error kind, capturing a backtrace.
    pub(crate) fn new(kind: ExtractErrorKind) -> Self {
        Self {
            kind,
            backtrace: Backtrace::capture(),
        }
    }

    pub(crate) fn provider(
        package: Option<&str>,
        source: ProviderError,
    ) -> Self {
        Self::new(ExtractErrorKind::Provider {
            package: package.map(str::to_owned),
            source,
        })
    }

    pub(crate) fn type_not_loaded(identity: &TypeIdentity) -> Self {
        Self::new(ExtractErrorKind::TypeNotLoaded(identity.clone()))
    }

    pub(crate) fn invalid_pattern(pattern: &str, source: regex::Error) -> Self {
        Self::new(ExtractErrorKind::InvalidPattern {
            pattern: pattern.to_owned(),
            source,
        })
    }

    /// Returns true if the source provider failed.
    pub fn is_provider(&self) -> bool {
        matches!(self.kind, ExtractErrorKind::Provider { .. })
    }

    /// Returns true if a registered type was missing from the type graph.
    pub fn is_type_not_loaded(&self) -> bool {
        matches!(self.kind, ExtractErrorKind::TypeNotLoaded(_))
    }

    /// Returns true if an exclusion pattern failed to compile.
    pub fn is_invalid_pattern(&self) -> bool {
        matches!(self.kind, ExtractErrorKind::InvalidPattern { .. })
    }

    /// Returns true if the configuration could not be parsed.
    pub fn is_config(&self) -> bool {
        matches!(self.kind, ExtractErrorKind::Config(_))
    }

    /// Returns true if this error is due to serialization failure.
    pub fn is_serialization(&self) -> bool {
        matches!(self.kind, ExtractErrorKind::Serialization(_))
    }

    /// Returns true if this error is due to I/O failure.
    pub fn is_io(&self) -> bool {
        matches!(self.kind, ExtractErrorKind::Io(_))
    }

    /// Returns the backtrace captured when this error was created.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl fmt::Display for ExtractErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractErrorKind::Provider {
                package: Some(package),
                source,
            } => {
                write!(f, "failed to load package {package}: {source}")
            }
            ExtractErrorKind::Provider {
                package: None,
                source,
            } => {
                write!(f, "failed to enumerate packages: {source}")
            }
            ExtractErrorKind::TypeNotLoaded(identity) => {
                write!(f, "type not loaded: {identity}")
            }
            ExtractErrorKind::InvalidPattern { pattern, source } => {
                write!(f, "invalid exclusion pattern {pattern:?}: {source}")
            }
            ExtractErrorKind::Config(err) => {
                write!(f, "failed to parse configuration: {err}")
            }
            ExtractErrorKind::Serialization(err) => {
                write!(f, "failed to serialize output: {err}")
            }
            ExtractErrorKind::Io(err) => {
                write!(f, "I/O error: {err}")
            }
        }
    }
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Summary of what happened.
        writeln!(f, "{}", self.kind)?;

        // Backtrace (will be empty unless RUST_BACKTRACE is set).
        write!(f, "{}", self.backtrace)
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ExtractErrorKind::Provider { source, .. } => Some(source.as_ref()),
            ExtractErrorKind::TypeNotLoaded(_) => None,
            ExtractErrorKind::InvalidPattern { source, .. } => Some(source),
            ExtractErrorKind::Config(err) => Some(err),
            ExtractErrorKind::Serialization(err) => Some(err),
            ExtractErrorKind::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ExtractError {
    fn from(err: std::io::Error) -> Self {
        Self::new(ExtractErrorKind::Io(err))
    }
}

impl From<serde_json::Error> for ExtractError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(ExtractErrorKind::Serialization(err))
    }
}

impl From<toml::de::Error> for ExtractError {
    fn from(err: toml::de::Error) -> Self {
        Self::new(ExtractErrorKind::Config(err))
    }
}
