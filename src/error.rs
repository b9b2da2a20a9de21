//! Error type for singleton construction.

use core::fmt;

/// The error type for [`LazySingleton::try_access`](crate::LazySingleton::try_access).
#[derive(Debug)]
pub enum SingletonError {
    /// The constructor of `type_name` failed during this call.
    ///
    /// Only the caller that triggered construction sees this variant.
    Construction {
        /// Name of the singleton type.
        type_name: &'static str,
        /// The constructor's error.
        source: anyhow::Error,
    },
    /// Construction of `type_name` failed earlier; it is never retried.
    Poisoned {
        /// Name of the singleton type.
        type_name: &'static str,
    },
}

impl SingletonError {
    pub(crate) fn construction<T>(source: anyhow::Error) -> Self {
        Self::Construction {
            type_name: core::any::type_name::<T>(),
            source,
        }
    }

    pub(crate) fn poisoned<T>() -> Self {
        Self::Poisoned {
            type_name: core::any::type_name::<T>(),
        }
    }

    /// Name of the singleton type the error is about.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Construction { type_name, .. } | Self::Poisoned { type_name } => type_name,
        }
    }

    /// Returns `true` for [`SingletonError::Poisoned`].
    pub fn is_poisoned(&self) -> bool {
        matches!(self, Self::Poisoned { .. })
    }
}

impl fmt::Display for SingletonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Construction { type_name, source } => {
                write!(f, "failed to construct singleton `{type_name}`: {source}")
            }
            Self::Poisoned { type_name } => {
                write!(f, "singleton `{type_name}` is poisoned by an earlier failed construction")
            }
        }
    }
}

impl std::error::Error for SingletonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Construction { source, .. } => Some(&**source),
            Self::Poisoned { .. } => None,
        }
    }
}
