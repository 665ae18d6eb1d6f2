use super::types::VishnoraError;

/// The smallest unit of work an error is allowed to abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    /// One probe target is skipped; the loop continues.
    Target,
    /// One spec source is skipped; the other sources still run.
    Source,
    /// The whole job fails and the campaign ends up `failed`.
    Job,
}

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub scope: ErrorScope,
}

impl VishnoraError {
    /// Classify this error to determine its type and how far it is allowed to propagate.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            VishnoraError::ProbeNetwork(_) => ErrorClassification {
                error_type: "ProbeNetworkError",
                scope: ErrorScope::Target,
            },

            VishnoraError::Fetch(_) => ErrorClassification {
                error_type: "FetchError",
                scope: ErrorScope::Source,
            },
            VishnoraError::Parse(_) => ErrorClassification {
                error_type: "ParseError",
                scope: ErrorScope::Source,
            },
            VishnoraError::Json(_) => ErrorClassification {
                error_type: "JsonError",
                scope: ErrorScope::Source,
            },
            VishnoraError::Yaml(_) => ErrorClassification {
                error_type: "YamlError",
                scope: ErrorScope::Source,
            },

            VishnoraError::NotFound(_) => ErrorClassification {
                error_type: "NotFoundError",
                scope: ErrorScope::Job,
            },
            VishnoraError::IllegalTransition { .. } => ErrorClassification {
                error_type: "IllegalTransitionError",
                scope: ErrorScope::Job,
            },
            VishnoraError::Persistence(_) => ErrorClassification {
                error_type: "PersistenceError",
                scope: ErrorScope::Job,
            },
            VishnoraError::Config(_) => ErrorClassification {
                error_type: "ConfigError",
                scope: ErrorScope::Job,
            },
            VishnoraError::Network(_) => ErrorClassification {
                error_type: "NetworkError",
                scope: ErrorScope::Job,
            },
            VishnoraError::Io(_) => ErrorClassification {
                error_type: "IoError",
                scope: ErrorScope::Job,
            },
            VishnoraError::Internal(_) => ErrorClassification {
                error_type: "InternalError",
                scope: ErrorScope::Job,
            },
        }
    }

    /// True when the error may be absorbed by per-source isolation.
    pub fn is_source_isolated(&self) -> bool {
        matches!(self.classify().scope, ErrorScope::Target | ErrorScope::Source)
    }
}
