use std::error::Error;

use strum_macros::{Display, EnumString};

use crate::dsn::{self, Credential};
use crate::{DatasourceConfig, DatasourceError, InstanceSettings, PluginContext, QueryTag};

const MISSING_CREDENTIAL: &str = "Password or private key are required.";
const MISSING_ACCOUNT: &str = "Account not provided";
const MISSING_USERNAME: &str = "Username not provided";
const HEALTHY: &str = "Data source is working";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum HealthStatus {
    #[default]
    Unknown,
    Ok,
    Error,
}

/// Outcome of a health check, shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckHealthResult {
    pub status: HealthStatus,
    pub message: String,
}

impl CheckHealthResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Ok,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Error,
            message: message.into(),
        }
    }
}

/// Opens a connection with a descriptor and reports whether it works.
///
/// Implemented by the host on top of the SQL driver.
pub trait ConnectionProbe {
    fn ping(&self, connection_string: &str) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// A descriptor, or the reason the settings cannot produce one.
pub type Validated = Result<String, CheckHealthResult>;

fn invalid(message: impl Into<String>) -> Validated {
    let result = CheckHealthResult::error(message);
    tracing::debug!(reason = %result.message, "data source settings rejected");
    Err(result)
}

/// Validate the instance settings of `ctx` and build the descriptor used to
/// check the connection.
///
/// Stops at the first problem found and reports it as a [CheckHealthResult].
/// The outer error is reserved for internal defects.
///
/// Unlike [query_connection_string](crate::query_connection_string), the
/// descriptor asks the driver to reject role, warehouse, database and schema
/// values that do not exist.
pub fn create_and_validate_connection_string(
    ctx: &PluginContext,
) -> Result<Validated, DatasourceError> {
    let no_settings = InstanceSettings::default();
    let settings = ctx.settings().unwrap_or(&no_settings);

    let credential = Credential::resolve(settings.password(), settings.private_key());
    if credential.is_empty() {
        return Ok(invalid(MISSING_CREDENTIAL));
    }

    let mut config = match DatasourceConfig::from_json(&settings.json_data) {
        Ok(config) => config,
        Err(err) => return Ok(invalid(format!("Error getting config: {err}"))),
    };
    if config.account.is_empty() {
        return Ok(invalid(MISSING_ACCOUNT));
    }
    if config.username.is_empty() {
        return Ok(invalid(MISSING_USERNAME));
    }

    let query_tag = QueryTag::from_context(ctx)
        .encode()
        .inspect_err(|err| tracing::error!(error = %err, "could not encode query tag"))?;

    if !config.extra_config.is_empty() {
        config.extra_config.push('&');
    }
    config.extra_config.push_str(dsn::VALIDATE_DEFAULT_PARAMETERS);
    config.extra_config.push_str("=true");

    Ok(Ok(dsn::connection_string(&config, &credential, &query_tag)))
}

/// Run the health check for a data source instance.
pub fn check_health(
    ctx: &PluginContext,
    probe: &dyn ConnectionProbe,
) -> Result<CheckHealthResult, DatasourceError> {
    let connection_string = match create_and_validate_connection_string(ctx)? {
        Ok(connection_string) => connection_string,
        Err(result) => return Ok(result),
    };
    match probe.ping(&connection_string) {
        Ok(()) => Ok(CheckHealthResult::ok(HEALTHY)),
        Err(err) => {
            tracing::info!(error = %err, "health check connection failed");
            Ok(CheckHealthResult::error(err.to_string()))
        }
    }
}
