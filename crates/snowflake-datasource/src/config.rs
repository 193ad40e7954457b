use std::fmt;

use serde::de::{Deserialize, Deserializer, IgnoredAny, MapAccess, Visitor};

use crate::DatasourceError;

/// Keys of the settings document, in field order.
const FIELDS: [&str; 7] = [
    "account",
    "username",
    "role",
    "warehouse",
    "database",
    "schema",
    "extraConfig",
];

/// Non-secret settings of a Snowflake data source instance.
///
/// Every field is optional in the stored document and defaults to the empty
/// string. Presence of `account` and `username` is checked by the health
/// check, not here.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DatasourceConfig {
    pub account: String,
    pub username: String,
    pub role: String,
    pub warehouse: String,
    pub database: String,
    pub schema: String,
    /// Trailing driver parameters in `key=value&...` form, appended to the
    /// descriptor as-is.
    pub extra_config: String,
}

impl DatasourceConfig {
    /// Decode the stored JSON settings document.
    ///
    /// Documents saved by older editors are accepted as they are:
    /// - a `null` document yields the empty configuration;
    /// - keys match field names ignoring ASCII case (`Account` sets `account`);
    /// - a `null` value leaves the field as it was;
    /// - when a key repeats, the last occurrence wins;
    /// - unknown keys are ignored.
    ///
    /// On failure the parser's own message is kept unchanged in
    /// [DatasourceError::Decode].
    pub fn from_json(json_data: &[u8]) -> Result<Self, DatasourceError> {
        serde_json::from_slice::<Option<Self>>(json_data)
            .map(Option::unwrap_or_default)
            .map_err(DatasourceError::Decode)
    }

    fn field_mut(&mut self, key: &str) -> Option<&mut String> {
        let name = FIELDS.iter().find(|name| name.eq_ignore_ascii_case(key))?;
        Some(match *name {
            "account" => &mut self.account,
            "username" => &mut self.username,
            "role" => &mut self.role,
            "warehouse" => &mut self.warehouse,
            "database" => &mut self.database,
            "schema" => &mut self.schema,
            _ => &mut self.extra_config,
        })
    }
}

impl<'de> Deserialize<'de> for DatasourceConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(DatasourceConfigVisitor)
    }
}

/// Applies entries in document order, so later keys overwrite earlier ones.
struct DatasourceConfigVisitor;

impl<'de> Visitor<'de> for DatasourceConfigVisitor {
    type Value = DatasourceConfig;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a data source settings object")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut config = DatasourceConfig::default();
        while let Some(key) = map.next_key::<String>()? {
            match config.field_mut(&key) {
                Some(field) => {
                    if let Some(value) = map.next_value::<Option<String>>()? {
                        *field = value;
                    }
                }
                None => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(config)
    }
}
