//! Run-level error types for the zone pipeline.
//!
//! Per-zone fetch failures never reach this module: they are absorbed by
//! [`crate::services::fetcher::score_zone`]. Everything here terminates a run.

use std::fmt;

use crate::geometry::topology::TopologyError;
use crate::geometry::GeometryError;

/// Result type for pipeline operations
pub type ZoneResult<T> = Result<T, ZoneError>;

/// Structured context for run-level errors.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation being performed (e.g., "tessellate", "load_dataset")
    pub operation: Option<String>,
    /// The entity type involved (e.g., "area", "dataset")
    pub entity: Option<String>,
    /// The entity ID if applicable
    pub entity_id: Option<String>,
    /// Additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with an operation name.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    /// Set the entity type.
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Set the entity ID.
    pub fn with_entity_id(mut self, id: impl ToString) -> Self {
        self.entity_id = Some(id.to_string());
        self
    }

    /// Set additional details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref op) = self.operation {
            parts.push(format!("operation={}", op));
        }
        if let Some(ref entity) = self.entity {
            parts.push(format!("entity={}", entity));
        }
        if let Some(ref id) = self.entity_id {
            parts.push(format!("id={}", id));
        }
        if let Some(ref details) = self.details {
            parts.push(format!("details={}", details));
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Error type for a whole aggregation run.
#[derive(Debug, thiserror::Error)]
pub enum ZoneError {
    /// The area could not be partitioned into zones.
    #[error("Tessellation error: {message} {context}")]
    Tessellation {
        message: String,
        context: ErrorContext,
    },

    /// A boundary or catalog dataset is missing or unreadable.
    #[error("Dataset error: {message} {context}")]
    Dataset {
        message: String,
        context: ErrorContext,
    },

    /// Configuration or initialization error.
    #[error("Configuration error: {message} {context}")]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    /// The run request itself is malformed (unknown area, bad parameters).
    #[error("Invalid request: {message} {context}")]
    InvalidRequest {
        message: String,
        context: ErrorContext,
    },
}

impl ZoneError {
    /// Create a tessellation error with context.
    pub fn tessellation(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Tessellation {
            message: message.into(),
            context,
        }
    }

    /// Create a dataset error with context.
    pub fn dataset(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::Dataset {
            message: message.into(),
            context,
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create an invalid-request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Get the error context.
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Tessellation { context, .. }
            | Self::Dataset { context, .. }
            | Self::Configuration { context, .. }
            | Self::InvalidRequest { context, .. } => context,
        }
    }

    /// True for errors raised while building the zone set, dataset loading included.
    pub fn is_tessellation_failure(&self) -> bool {
        matches!(self, Self::Tessellation { .. } | Self::Dataset { .. })
    }
}

impl From<GeometryError> for ZoneError {
    fn from(err: GeometryError) -> Self {
        ZoneError::tessellation(err.to_string(), ErrorContext::new("build_grid"))
    }
}

impl From<TopologyError> for ZoneError {
    fn from(err: TopologyError) -> Self {
        ZoneError::dataset(err.to_string(), ErrorContext::new("decode_topology"))
    }
}
