//! Connection descriptor construction for the Snowflake data source.
//!
//! Everything in this crate is a pure function of its inputs: the host
//! supplies decoded request context and decrypted secrets, and gets back a
//! connection string for the SQL driver or a structured health result.

mod config;
mod context;
mod dsn;
mod health;
mod instance;
mod query_tag;

pub use config::DatasourceConfig;
pub use context::{InstanceSettings, PluginContext, User};
pub use dsn::{Credential, connection_string};
pub use health::{
    CheckHealthResult, ConnectionProbe, HealthStatus, Validated, check_health,
    create_and_validate_connection_string,
};
pub use instance::{DatasourceInstance, query_connection_string};
pub use query_tag::{Identity, JOB_LABEL, QueryTag};

/// Error type for [snowflake_datasource](crate).
///
/// Validation failures are not represented here: the health check turns them
/// into a [CheckHealthResult]. What remains is either a decode failure on the
/// query path or an internal defect.
#[derive(Debug, thiserror::Error)]
pub enum DatasourceError {
    /// The configuration document could not be decoded.
    ///
    /// Displays the parser message unchanged.
    #[error("{0}")]
    Decode(serde_json::Error),
    /// The query tag could not be serialized. Always a bug.
    #[error("failed to encode query tag: {0}")]
    QueryTag(serde_json::Error),
    /// A generic configuration error
    #[error("{0}")]
    Config(String),
}

impl DatasourceError {
    /// Creates a new [DatasourceError] from a custom message describing a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        DatasourceError::Config(message.into())
    }

    /// Returns a non-owned string with an error message.
    ///
    /// Used for test assertions and log fields.
    pub fn msg(&self) -> &str {
        match self {
            DatasourceError::Decode(_) => "Decode Error",
            DatasourceError::QueryTag(_) => "Query Tag Error",
            DatasourceError::Config(msg) => msg,
        }
    }

    /// Whether this error points at a defect in this crate rather than at
    /// user-supplied input.
    pub fn is_internal(&self) -> bool {
        matches!(self, DatasourceError::QueryTag(_))
    }
}
