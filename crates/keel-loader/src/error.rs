//! Loader-specific error types.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// Errors that can occur while resolving libraries or binding tables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadError {
    /// No candidate name produced a loadable file.
    LibraryNotFound {
        /// Generic name of the library.
        name: String,
        /// Every path tried, in order.
        candidates: Vec<PathBuf>,
        /// The last error the module loader reported, if any candidate
        /// existed but failed to open.
        last_error: Option<String>,
    },
    /// A required export was absent under its name and every alternate.
    MissingFunction {
        /// The function table being bound.
        table: &'static str,
        /// The field that could not be bound.
        function: &'static str,
    },
    /// A declaration names a field the table has no slot for.
    UnknownSlot {
        /// The function table being bound.
        table: &'static str,
        /// The declared field.
        function: &'static str,
    },
    /// A declared dependency could not be loaded.
    DependencyFailed {
        /// The library whose dependency failed.
        name: String,
        /// Why the dependency failed.
        source: Box<LoadError>,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LibraryNotFound {
                name,
                candidates,
                last_error,
            } => {
                write!(f, "library {name} not found")?;
                if !candidates.is_empty() {
                    let tried: Vec<_> =
                        candidates.iter().map(|p| p.display().to_string()).collect();
                    write!(f, " (tried {})", tried.join(", "))?;
                }
                if let Some(e) = last_error {
                    write!(f, ": {e}")?;
                }
                Ok(())
            }
            Self::MissingFunction { table, function } => {
                write!(f, "missing function {function} in {table}")
            }
            Self::UnknownSlot { table, function } => {
                write!(f, "{table} declares {function} but has no slot for it")
            }
            Self::DependencyFailed { name, source } => {
                write!(f, "dependency of {name} failed: {source}")
            }
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::DependencyFailed { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
