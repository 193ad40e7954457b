//! The `QUERY_TAG` session parameter.
//!
//! Every session opened through a descriptor carries a small JSON document
//! naming the organization and user on whose behalf queries run, so they can
//! be audited from Snowflake's query history.
//! See <https://docs.snowflake.com/en/sql-reference/parameters#query-tag>.

use std::io;

use serde::Serialize;
use serde_json::ser::Formatter;

use crate::{DatasourceError, PluginContext, User};

/// Value of the `job` field of every tag.
pub const JOB_LABEL: &str = "Grafana";

/// Who a request is made for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Issued by the host itself, e.g. alert evaluation.
    Backend,
    /// A viewer without login, name or email. The role is still reported.
    Anonymous { role: String },
    /// A signed-in user.
    User(User),
}

impl Identity {
    /// Classify the user attached to a request.
    pub fn classify(user: Option<&User>) -> Self {
        match user {
            None => Identity::Backend,
            Some(u) if u.name.is_empty() && u.login.is_empty() && u.email.is_empty() => {
                Identity::Anonymous {
                    role: u.role.clone(),
                }
            }
            Some(u) => Identity::User(u.clone()),
        }
    }
}

/// Audit tag attached to every session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTag {
    pub org_id: i64,
    pub identity: Identity,
}

impl QueryTag {
    pub fn new(org_id: i64, identity: Identity) -> Self {
        Self { org_id, identity }
    }

    pub fn from_context(ctx: &PluginContext) -> Self {
        Self::new(ctx.org_id, Identity::classify(ctx.user.as_ref()))
    }

    /// Serialize to compact JSON.
    ///
    /// Keys come out in a fixed order and empty fields are left out, so equal
    /// tags always encode to equal strings. A failure here is a bug in this
    /// crate, never bad input; see [DatasourceError::is_internal].
    pub fn encode(&self) -> Result<String, DatasourceError> {
        use serde::ser::Error as _;

        let mut buf = Vec::with_capacity(128);
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, HtmlSafeFormatter);
        self.record()
            .serialize(&mut ser)
            .map_err(DatasourceError::QueryTag)?;
        String::from_utf8(buf)
            .map_err(|e| DatasourceError::QueryTag(serde_json::Error::custom(e)))
    }

    fn record(&self) -> QueryTagRecord<'_> {
        let mut record = QueryTagRecord {
            job: JOB_LABEL,
            org_id: self.org_id,
            user_login: "",
            user_name: "",
            user_email: "",
            user_role: "",
            is_backend: false,
            is_anonymous: false,
        };
        match &self.identity {
            Identity::Backend => record.is_backend = true,
            Identity::Anonymous { role } => {
                record.user_role = role;
                record.is_anonymous = true;
            }
            Identity::User(user) => {
                record.user_login = &user.login;
                record.user_name = &user.name;
                record.user_email = &user.email;
                record.user_role = &user.role;
            }
        }
        record
    }
}

/// Wire shape of the tag. Field order is the key order of the output.
#[derive(Serialize)]
struct QueryTagRecord<'a> {
    job: &'a str,
    org_id: i64,
    #[serde(skip_serializing_if = "is_empty")]
    user_login: &'a str,
    #[serde(skip_serializing_if = "is_empty")]
    user_name: &'a str,
    #[serde(skip_serializing_if = "is_empty")]
    user_email: &'a str,
    #[serde(skip_serializing_if = "is_empty")]
    user_role: &'a str,
    #[serde(skip_serializing_if = "is_false")]
    is_backend: bool,
    #[serde(skip_serializing_if = "is_false")]
    is_anonymous: bool,
}

fn is_empty(s: &&str) -> bool {
    s.is_empty()
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Compact JSON that additionally escapes `<`, `>`, `&`, U+2028 and U+2029,
/// keeping tags byte-identical to the ones already recorded server-side.
struct HtmlSafeFormatter;

impl Formatter for HtmlSafeFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            let escaped = match c {
                '<' => "\\u003c",
                '>' => "\\u003e",
                '&' => "\\u0026",
                '\u{2028}' => "\\u2028",
                '\u{2029}' => "\\u2029",
                _ => continue,
            };
            writer.write_all(fragment[start..i].as_bytes())?;
            writer.write_all(escaped.as_bytes())?;
            start = i + c.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}
