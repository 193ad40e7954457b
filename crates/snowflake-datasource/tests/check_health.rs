//! Health check tests through the public API.

mod tests {
    use std::collections::HashMap;
    use std::io;
    use std::sync::{Arc, Mutex};
    use std::thread;

    use pretty_assertions::assert_eq;
    use snowflake_datasource::{
        CheckHealthResult, ConnectionProbe, DatasourceInstance, HealthStatus, InstanceSettings,
        PluginContext, User, check_health, create_and_validate_connection_string,
    };

    const BACKEND_TAG: &str =
        "QUERY_TAG=%7B%22job%22%3A%22Grafana%22%2C%22org_id%22%3A0%2C%22is_backend%22%3Atrue%7D";

    fn request(json: Option<&str>, secrets: &[(&str, &str)]) -> PluginContext {
        PluginContext {
            org_id: 0,
            user: None,
            datasource_instance_settings: Some(InstanceSettings {
                json_data: json.map(|j| j.as_bytes().to_vec()).unwrap_or_default(),
                decrypted_secure_json_data: secrets
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect::<HashMap<_, _>>(),
            }),
        }
    }

    enum Expected {
        Rejected(&'static str),
        Accepted(String),
    }

    #[test]
    fn test_create_and_validate_connection_string() {
        let cases = [
            (
                request(None, &[("password", "")]),
                Expected::Rejected("Password or private key are required."),
            ),
            (
                request(Some("{"), &[("password", "pass")]),
                Expected::Rejected(
                    "Error getting config: EOF while parsing an object at line 1 column 1",
                ),
            ),
            (
                request(Some("{}"), &[("password", "pass")]),
                Expected::Rejected("Account not provided"),
            ),
            (
                request(Some(r#"{"account":"test"}"#), &[("password", "pass")]),
                Expected::Rejected("Username not provided"),
            ),
            (
                request(
                    Some(r#"{"account":"test","username":"user"}"#),
                    &[("password", "pass")],
                ),
                Expected::Accepted(format!(
                    "user:pass@test?{BACKEND_TAG}&database=&role=&schema=&warehouse=&validateDefaultParameters=true"
                )),
            ),
            (
                request(
                    Some(r#"{"account":"test","username":"user","extraConfig":"config=conf"}"#),
                    &[("password", "pass")],
                ),
                Expected::Accepted(format!(
                    "user:pass@test?{BACKEND_TAG}&database=&role=&schema=&warehouse=&config=conf&validateDefaultParameters=true"
                )),
            ),
        ];

        for (i, (ctx, expected)) in cases.iter().enumerate() {
            let got = create_and_validate_connection_string(ctx).expect("no internal error");
            match expected {
                Expected::Rejected(message) => assert_eq!(
                    got,
                    Err(CheckHealthResult {
                        status: HealthStatus::Error,
                        message: message.to_string(),
                    }),
                    "testcase {i}"
                ),
                Expected::Accepted(dsn) => assert_eq!(got, Ok(dsn.clone()), "testcase {i}"),
            }
        }
    }

    #[test]
    fn test_named_user_tag() {
        let mut ctx = request(
            Some(r#"{"account":"test","username":"user"}"#),
            &[("password", "pass")],
        );
        ctx.org_id = 123;
        ctx.user = Some(User {
            name: "Firstname Lastname".to_string(),
            login: "auserlogin".to_string(),
            email: "someone@example.com".to_string(),
            role: "Admin".to_string(),
        });
        let dsn = create_and_validate_connection_string(&ctx)
            .unwrap()
            .unwrap();
        assert_eq!(
            dsn,
            "user:pass@test?QUERY_TAG=%7B%22job%22%3A%22Grafana%22%2C%22org_id%22%3A123%2C%22user_login%22%3A%22auserlogin%22%2C%22user_name%22%3A%22Firstname+Lastname%22%2C%22user_email%22%3A%22someone%40example.com%22%2C%22user_role%22%3A%22Admin%22%7D&database=&role=&schema=&warehouse=&validateDefaultParameters=true"
        );
    }

    #[test]
    fn test_account_is_not_escaped() {
        let ctx = request(
            Some(r#"{"account":"acc@ount","username":"user@name"}"#),
            &[("password", "pa$$s&")],
        );
        let dsn = create_and_validate_connection_string(&ctx)
            .unwrap()
            .unwrap();
        assert!(dsn.starts_with("user%40name:pa$$s&@acc@ount?QUERY_TAG="));
    }

    #[test]
    fn test_concurrent_requests_do_not_interfere() {
        let handles = (0..8)
            .map(|org_id| {
                thread::spawn(move || {
                    let mut ctx = request(
                        Some(r#"{"account":"test","username":"user"}"#),
                        &[("password", "pass")],
                    );
                    ctx.org_id = org_id;
                    let dsn = create_and_validate_connection_string(&ctx)
                        .unwrap()
                        .unwrap();
                    (org_id, dsn)
                })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            let (org_id, dsn) = handle.join().unwrap();
            assert!(dsn.contains(&format!("%22org_id%22%3A{org_id}%2C")), "{dsn}");
        }
    }

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Capture {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    struct FailingProbe;

    impl ConnectionProbe for FailingProbe {
        fn ping(&self, _: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Err("260008: failed to connect to DB".into())
        }
    }

    fn with_captured_logs(f: impl FnOnce()) -> String {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        capture.contents()
    }

    #[test]
    fn test_secrets_are_never_logged() {
        let logs = with_captured_logs(|| {
            let ok = request(
                Some(r#"{"account":"test","username":"user"}"#),
                &[("password", "hunter2"), ("privateKey", "MIIEvQIBADAN")],
            );
            let result = check_health(&ok, &FailingProbe).unwrap();
            assert_eq!(result.status, HealthStatus::Error);

            let rejected = request(Some("{}"), &[("password", "hunter2")]);
            let result = check_health(&rejected, &FailingProbe).unwrap();
            assert_eq!(result.message, "Account not provided");
        });
        assert!(logs.contains("Account not provided"), "{logs}");
        assert!(logs.contains("260008: failed to connect to DB"), "{logs}");
        assert!(!logs.contains("hunter2"), "{logs}");
        assert!(!logs.contains("MIIEvQIBADAN"), "{logs}");
    }

    #[test]
    fn test_instance_lifecycle_is_logged() {
        let logs = with_captured_logs(|| {
            let instance = DatasourceInstance::new(&InstanceSettings::default());
            drop(instance);
        });
        let created = logs.find("Creating instance").expect("creation logged");
        let disposed = logs.find("Disposing of instance").expect("disposal logged");
        assert!(created < disposed);
    }
}
