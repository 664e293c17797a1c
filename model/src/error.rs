//! Error taxonomy for the release and role model (spec.md section 7).
//!
//! Every subsystem gets its own `Fail`-derived kind enum, wrapped in the
//! same `Context<K>` boilerplate the teacher uses throughout
//! `shipcat_definitions`/`shipcat_cli`. `ValidationError` is the one
//! exception: the validator accumulates many of these and surfaces them
//! together rather than returning the first one.

use std::fmt::{self, Display};

use failure::{Backtrace, Context, Fail};

pub type Result<T> = std::result::Result<T, failure::Error>;

/// Errors from the archive loader (spec.md section 4.1) and release
/// registry (section 4.2).
#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum ArchiveErrorKind {
    #[fail(display = "archive for '{}' not found at {}", _0, _1)]
    ArchiveMissing(String, String),

    #[fail(display = "archive for '{}' has hash {} but manifest declares {}", _0, _1, _2)]
    HashMismatch(String, String, String),

    #[fail(display = "release '{}' declares dependency on unknown package '{}'", _0, _1)]
    UnresolvedDependency(String, String),

    #[fail(display = "release name '{}' is already registered", _0)]
    DuplicateRelease(String),

    #[fail(display = "could not decode document at {}: {}", _0, _1)]
    MalformedDocument(String, String),

    #[fail(display = "I/O error reading {}", _0)]
    Io(String),
}

#[derive(Debug)]
pub struct ArchiveError {
    inner: Context<ArchiveErrorKind>,
}

impl Fail for ArchiveError {
    fn cause(&self) -> Option<&dyn Fail> {
        self.inner.cause()
    }
    fn backtrace(&self) -> Option<&Backtrace> {
        self.inner.backtrace()
    }
}
impl Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(&self.inner, f)
    }
}
impl From<ArchiveErrorKind> for ArchiveError {
    fn from(kind: ArchiveErrorKind) -> ArchiveError {
        ArchiveError { inner: Context::new(kind) }
    }
}
impl From<Context<ArchiveErrorKind>> for ArchiveError {
    fn from(inner: Context<ArchiveErrorKind>) -> ArchiveError {
        ArchiveError { inner }
    }
}

/// Errors from the release registry (spec.md section 4.2) and role
/// manifest parser (section 4.4).
#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum ManifestErrorKind {
    #[fail(display = "release '{}' is already registered", _0)]
    DuplicateRelease(String),

    #[fail(display = "no release named '{}' is registered", _0)]
    UnknownRelease(String),

    #[fail(display = "instance group '{}' has unknown type '{}'", _0, _1)]
    UnknownInstanceGroupType(String, String),

    #[fail(display = "instance group '{}' carries unknown tag '{}'", _0, _1)]
    UnknownTag(String, String),

    #[fail(display = "could not decode document at {}: {}", _0, _1)]
    MalformedDocument(String, String),

    #[fail(display = "duplicate variable name '{}'", _0)]
    DuplicateVariable(String),
}

#[derive(Debug)]
pub struct ManifestError {
    inner: Context<ManifestErrorKind>,
}

impl Fail for ManifestError {
    fn cause(&self) -> Option<&dyn Fail> {
        self.inner.cause()
    }
    fn backtrace(&self) -> Option<&Backtrace> {
        self.inner.backtrace()
    }
}
impl Display for ManifestError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(&self.inner, f)
    }
}
impl From<ManifestErrorKind> for ManifestError {
    fn from(kind: ManifestErrorKind) -> ManifestError {
        ManifestError { inner: Context::new(kind) }
    }
}
impl From<Context<ManifestErrorKind>> for ManifestError {
    fn from(inner: Context<ManifestErrorKind>) -> ManifestError {
        ManifestError { inner }
    }
}

/// Errors from link resolution (spec.md section 4.5).
#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum LinkErrorKind {
    #[fail(display = "consumer '{}' in job '{}' of group '{}' did not resolve to any provider", _0, _1, _2)]
    UnresolvedConsumer(String, String, String),

    #[fail(display = "consumer '{}' in job '{}' of group '{}' matched more than one provider of type '{}'", _0, _1, _2, _3)]
    AmbiguousProvider(String, String, String, String),
}

/// One failed check from the validator (spec.md section 4.6).
///
/// The validator never stops at the first one of these: it accumulates a
/// `Vec<ValidationError>` and surfaces the whole batch as a single
/// `failure::Error` (see [`ValidationErrors`]).
#[derive(Clone, Eq, PartialEq, Debug, Fail)]
#[fail(display = "{}: {}: {}", field_path, kind, detail)]
pub struct ValidationError {
    pub field_path: String,
    pub kind: ValidationErrorKind,
    pub detail: String,
}

impl ValidationError {
    pub fn new(field_path: impl Into<String>, kind: ValidationErrorKind, detail: impl Into<String>) -> Self {
        ValidationError { field_path: field_path.into(), kind, detail: detail.into() }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum ValidationErrorKind {
    #[fail(display = "ConfigError")]
    Config,
    #[fail(display = "ValidationError")]
    Generic,
    #[fail(display = "UnresolvedConsumer")]
    UnresolvedConsumer,
    #[fail(display = "AmbiguousProvider")]
    AmbiguousProvider,
    #[fail(display = "DuplicateVariable")]
    DuplicateVariable,
}

/// The accumulated batch of checks a single [`crate::validate::validate`]
/// call produced. `Display` renders one `<field-path>: <kind>: <detail>`
/// line per entry, matching spec.md section 7's user-visible format.
#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", e)?;
        }
        Ok(())
    }
}
