use std::collections::HashMap;

/// Secure settings key holding the account password.
pub(crate) const PASSWORD_KEY: &str = "password";
/// Secure settings key holding the key-pair authentication private key.
pub(crate) const PRIVATE_KEY_KEY: &str = "privateKey";

/// Settings of one data source instance, as handed over by the host.
#[derive(Debug, Default, Clone)]
pub struct InstanceSettings {
    /// Raw JSON settings document. See [DatasourceConfig](crate::DatasourceConfig).
    pub json_data: Vec<u8>,
    /// Secure settings, already decrypted by the host.
    pub decrypted_secure_json_data: HashMap<String, String>,
}

impl InstanceSettings {
    /// Look up a decrypted secret, treating an absent key as empty.
    pub fn secret(&self, key: &str) -> &str {
        self.decrypted_secure_json_data
            .get(key)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn password(&self) -> &str {
        self.secret(PASSWORD_KEY)
    }

    pub fn private_key(&self) -> &str {
        self.secret(PRIVATE_KEY_KEY)
    }
}

/// The signed-in user a request is made on behalf of.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct User {
    pub login: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

/// Per-request context supplied by the host.
#[derive(Debug, Default, Clone)]
pub struct PluginContext {
    pub org_id: i64,
    /// `None` for requests the host issues itself, e.g. alert evaluation.
    pub user: Option<User>,
    pub datasource_instance_settings: Option<InstanceSettings>,
}

impl PluginContext {
    pub(crate) fn settings(&self) -> Option<&InstanceSettings> {
        self.datasource_instance_settings.as_ref()
    }
}
