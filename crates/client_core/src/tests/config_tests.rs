use super::*;

use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn temp_root(label: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    env::temp_dir().join(format!("skillmatrix_config_{label}_{suffix}"))
}

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name: &str| vars.get(name).cloned()
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db", Path::new("/unused")),
        "sqlite://./data/test.db"
    );
}

#[test]
fn keeps_memory_and_full_urls_untouched() {
    assert_eq!(
        normalize_database_url("sqlite::memory:", Path::new("/unused")),
        "sqlite::memory:"
    );
    assert_eq!(
        normalize_database_url("sqlite:///var/lib/skm.db", Path::new("/unused")),
        "sqlite:///var/lib/skm.db"
    );
}

#[test]
fn blank_database_url_falls_back_to_data_dir() {
    assert_eq!(
        normalize_database_url("  ", Path::new("/srv/skm")),
        "sqlite:///srv/skm/client.sqlite3"
    );
}

#[test]
fn converts_single_colon_windows_path() {
    assert_eq!(
        normalize_database_url("sqlite:C:\\Users\\alice\\skm.db", Path::new("/unused")),
        "sqlite://C:/Users/alice/skm.db"
    );
}

#[test]
fn missing_file_and_env_yield_defaults() {
    let root = temp_root("defaults");
    let settings = load_settings_from(&root.join("absent.toml"), env_from(&[])).expect("settings");
    let defaults = Settings::default();
    assert_eq!(settings.notification_dwell, DEFAULT_NOTIFICATION_DWELL);
    assert_eq!(settings.auth_server_url, None);
    assert_eq!(settings.database_url, defaults.database_url);
}

#[test]
fn file_settings_apply_then_env_overrides_win() {
    let root = temp_root("layered");
    fs::create_dir_all(&root).expect("temp root");
    let path = root.join(SETTINGS_FILE_NAME);
    fs::write(
        &path,
        r#"
data_dir = "/srv/skillmatrix"
notification_dwell_ms = 2500
auth_server_url = "https://auth.ktf.example/api"
"#,
    )
    .expect("write config");

    let from_file = load_settings_from(&path, env_from(&[])).expect("settings");
    assert_eq!(from_file.data_dir, PathBuf::from("/srv/skillmatrix"));
    assert_eq!(
        from_file.database_url,
        "sqlite:///srv/skillmatrix/client.sqlite3"
    );
    assert_eq!(from_file.notification_dwell, Duration::from_millis(2500));
    assert_eq!(
        from_file.auth_server_url.as_ref().map(Url::as_str),
        Some("https://auth.ktf.example/api/")
    );

    let overridden = load_settings_from(
        &path,
        env_from(&[
            ("SKILLMATRIX_NOTIFICATION_DWELL_MS", "750"),
            ("APP__DATABASE_URL", "sqlite::memory:"),
            ("SKILLMATRIX_DATABASE_URL", "ignored.db"),
        ]),
    )
    .expect("settings");
    assert_eq!(overridden.notification_dwell, Duration::from_millis(750));
    assert_eq!(overridden.database_url, "sqlite::memory:");

    fs::remove_dir_all(root).expect("cleanup");
}

#[test]
fn invalid_dwell_override_is_an_error() {
    let root = temp_root("bad_dwell");
    let err = load_settings_from(
        &root.join("absent.toml"),
        env_from(&[("SKILLMATRIX_NOTIFICATION_DWELL_MS", "five")]),
    )
    .expect_err("invalid dwell");
    assert!(err.to_string().contains("NOTIFICATION_DWELL_MS"));
}

#[test]
fn malformed_file_is_an_error() {
    let root = temp_root("malformed");
    fs::create_dir_all(&root).expect("temp root");
    let path = root.join(SETTINGS_FILE_NAME);
    fs::write(&path, "notification_dwell_ms = \"soon\"").expect("write config");

    assert!(load_settings_from(&path, env_from(&[])).is_err());
    fs::remove_dir_all(root).expect("cleanup");
}
