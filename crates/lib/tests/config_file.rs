//! Integration test: load a config file from a temp directory.

use lib::config::{self, Config};
use std::io::Write;
use std::path::PathBuf;

fn temp_config(contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("wabot-config-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join("config.json");
    std::fs::File::create(&path)
        .and_then(|mut f| f.write_all(contents.as_bytes()))
        .expect("write config.json");
    path
}

#[test]
fn load_config_reads_whatsapp_section() {
    let path = temp_config(
        r#"{
            "gateway": { "bind": "127.0.0.1", "healthMessage": "hola" },
            "whatsapp": {
                "verifyToken": "verify",
                "authToken": "auth",
                "phoneId": "111",
                "appSecret": "secret",
                "appId": "app"
            }
        }"#,
    );
    let (config, used) = config::load_config(Some(path.clone())).expect("load config");
    assert_eq!(used, path);
    assert_eq!(config.gateway.health_message, "hola");
    assert_eq!(config.whatsapp.app_id.as_deref(), Some("app"));

    if std::env::var(config::ENV_PHONE_ID).is_err() {
        let settings = config::resolve_whatsapp(&config);
        let creds = settings.credentials().expect("complete credentials");
        assert_eq!(creds.phone_id, "111");
        assert_eq!(settings.app_secret.as_deref(), Some("secret"));
    }
}

#[test]
fn missing_file_yields_defaults() {
    let path = std::env::temp_dir()
        .join(format!("wabot-missing-{}", uuid::Uuid::new_v4()))
        .join("config.json");
    let (config, _) = config::load_config(Some(path)).expect("defaults");
    assert_eq!(config.gateway.bind, Config::default().gateway.bind);
    assert!(config.whatsapp.verify_token.is_none());
}

#[test]
fn invalid_file_is_an_error() {
    let path = temp_config("{ not json");
    let err = config::load_config(Some(path)).unwrap_err();
    assert!(format!("{:#}", err).contains("parsing config"));
}
