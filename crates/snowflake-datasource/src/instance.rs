use crate::dsn::{Credential, connection_string};
use crate::{DatasourceConfig, DatasourceError, InstanceSettings, PluginContext, QueryTag};

/// Per-instance state owned by the host's instance manager.
///
/// The host creates one when a data source is first used or its settings
/// change, and drops it when the settings are replaced. Nothing is cached
/// here: descriptors embed per-request audit data and are built fresh.
#[derive(Debug)]
pub struct DatasourceInstance {
    _private: (),
}

impl DatasourceInstance {
    pub fn new(_settings: &InstanceSettings) -> Self {
        tracing::info!("Creating instance");
        DatasourceInstance { _private: () }
    }
}

impl Drop for DatasourceInstance {
    fn drop(&mut self) {
        tracing::info!("Disposing of instance");
    }
}

/// Build the descriptor used to run queries for `ctx`.
///
/// Performs no presence checks: that is the health check's job. A settings
/// document that cannot be decoded is an error here.
pub fn query_connection_string(ctx: &PluginContext) -> Result<String, DatasourceError> {
    let settings = ctx
        .settings()
        .ok_or_else(|| DatasourceError::config("data source instance settings are missing"))?;

    let config = DatasourceConfig::from_json(&settings.json_data)
        .inspect_err(|err| tracing::error!(error = %err, "Could not get config for plugin"))?;
    let query_tag = QueryTag::from_context(ctx).encode()?;
    let credential = Credential::resolve(settings.password(), settings.private_key());

    Ok(connection_string(&config, &credential, &query_tag))
}
