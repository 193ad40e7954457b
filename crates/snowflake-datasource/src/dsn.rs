//! Connection descriptor assembly.
//!
//! The descriptor follows the Snowflake driver's DSN syntax:
//!
//! ```text
//! <userinfo>@<account>?<param>=<value>&...&<extraConfig>
//! ```
//!
//! Two escapers are involved and they are not interchangeable. Parameter
//! values are query-encoded, which escapes every reserved character. The
//! userinfo part uses the narrower userinfo rules, which leave `$&+,;=`
//! untouched; passwords containing those characters reach the driver
//! literally. Changing either side changes what the driver authenticates with.

use std::collections::BTreeMap;
use std::fmt;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::DatasourceConfig;

// Parameter names understood by the driver ---------------------------------

pub(crate) const ROLE: &str = "role";
pub(crate) const WAREHOUSE: &str = "warehouse";
pub(crate) const DATABASE: &str = "database";
pub(crate) const SCHEMA: &str = "schema";
pub(crate) const QUERY_TAG: &str = "QUERY_TAG";
pub(crate) const AUTHENTICATOR: &str = "authenticator";
pub(crate) const PRIVATE_KEY: &str = "privateKey";
pub(crate) const VALIDATE_DEFAULT_PARAMETERS: &str = "validateDefaultParameters";

pub(crate) mod authenticator {
    /// Key-pair authentication with a signed JWT
    pub(crate) const JWT: &str = "SNOWFLAKE_JWT";
}

/// Everything but ASCII alphanumerics and `-_.~`.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Like [QUERY_COMPONENT], but `$&+,;=` may appear in userinfo unescaped.
/// `@`, `/`, `?` and `:` are still escaped since they delimit the userinfo.
const USERINFO: &AsciiSet = &QUERY_COMPONENT
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=');

fn escape_userinfo(s: &str) -> String {
    utf8_percent_encode(s, USERINFO).to_string()
}

/// Query-component escaping. Spaces become `+`.
fn escape_query(s: &str) -> String {
    s.split(' ')
        .map(|part| utf8_percent_encode(part, QUERY_COMPONENT).to_string())
        .collect::<Vec<_>>()
        .join("+")
}

/// The secret a descriptor authenticates with.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Password(String),
    /// PKCS#8 private key for key-pair authentication, passed to the driver unchanged.
    PrivateKey(String),
}

impl Credential {
    /// Pick the credential to use from the decrypted secure settings.
    ///
    /// A non-empty private key always wins over the password.
    pub fn resolve(password: &str, private_key: &str) -> Self {
        if private_key.is_empty() {
            Credential::Password(password.to_string())
        } else {
            Credential::PrivateKey(private_key.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Credential::Password(secret) | Credential::PrivateKey(secret) => secret.is_empty(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Password(_) => f.write_str("Password(<redacted>)"),
            Credential::PrivateKey(_) => f.write_str("PrivateKey(<redacted>)"),
        }
    }
}

/// Assemble the connection descriptor.
///
/// No field is validated here; `account` and `extra_config` are copied
/// verbatim. An empty `query_tag` leaves the `QUERY_TAG` parameter out.
pub fn connection_string(
    config: &DatasourceConfig,
    credential: &Credential,
    query_tag: &str,
) -> String {
    let mut params = BTreeMap::from([
        (ROLE, config.role.as_str()),
        (WAREHOUSE, config.warehouse.as_str()),
        (DATABASE, config.database.as_str()),
        (SCHEMA, config.schema.as_str()),
    ]);
    if !query_tag.is_empty() {
        params.insert(QUERY_TAG, query_tag);
    }

    let username = escape_userinfo(&config.username);
    let userinfo = match credential {
        Credential::PrivateKey(key) if !key.is_empty() => {
            params.insert(AUTHENTICATOR, authenticator::JWT);
            params.insert(PRIVATE_KEY, key.as_str());
            username
        }
        Credential::PrivateKey(_) => format!("{username}:"),
        Credential::Password(password) => format!("{username}:{}", escape_userinfo(password)),
    };

    // BTreeMap iteration gives the byte-wise key order the driver expects.
    let params = params
        .into_iter()
        .map(|(key, value)| format!("{}={}", escape_query(key), escape_query(value)))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{userinfo}@{account}?{params}&{extra}",
        account = config.account,
        extra = config.extra_config,
    )
}
