//! Configuration file loading tests

use sensorlink::config::{Config, ConfigManager};
use std::io::Write;
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_full_config_file() {
    let file = write_config(
        r#"
[server]
bind_addr = "0.0.0.0:8080"
shutdown_timeout = "5s"

[serial]
port = "/dev/ttyUSB0"
baud_rate = 115200
read_timeout = "500ms"
stop_timeout = "1s"
connect_grace = "200ms"

[model]
path = "/etc/sensorlink/model.json"

[monitoring]
log_level = "debug"
prometheus_enabled = false
"#,
    );

    let config = ConfigManager::load_from_file(file.path()).unwrap();

    assert_eq!(config.server.bind_addr.port(), 8080);
    assert_eq!(config.server.shutdown_timeout, Duration::from_secs(5));
    assert_eq!(config.serial.port.as_deref(), Some("/dev/ttyUSB0"));
    assert_eq!(config.serial.baud_rate, 115200);
    assert_eq!(config.serial.read_timeout, Duration::from_millis(500));
    assert_eq!(config.serial.stop_timeout, Duration::from_secs(1));
    assert_eq!(config.serial.connect_grace, Duration::from_millis(200));
    assert!(config.model.path.is_some());
    assert_eq!(config.monitoring.log_level, "debug");
    assert!(!config.monitoring.prometheus_enabled);
}

#[test]
fn test_partial_config_uses_defaults() {
    let file = write_config(
        r#"
[serial]
port = "COM3"
"#,
    );

    let config = ConfigManager::load_from_file(file.path()).unwrap();
    let defaults = Config::default();

    assert_eq!(config.serial.port.as_deref(), Some("COM3"));
    assert_eq!(config.serial.baud_rate, defaults.serial.baud_rate);
    assert_eq!(config.serial.read_timeout, defaults.serial.read_timeout);
    assert_eq!(config.server.bind_addr, defaults.server.bind_addr);
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let config = ConfigManager::load_from_file(&dir.path().join("absent.toml")).unwrap();

    assert!(config.serial.port.is_none());
    assert_eq!(config.server.bind_addr.port(), 5005);
}

#[test]
fn test_invalid_config_file_is_rejected() {
    let file = write_config(
        r#"
[serial]
baud_rate = 0
"#,
    );
    assert!(ConfigManager::load_from_file(file.path()).is_err());

    let file = write_config("[serial\nport = ");
    assert!(ConfigManager::load_from_file(file.path()).is_err());

    let file = write_config(
        r#"
[serial]
read_timeout = "whenever"
"#,
    );
    assert!(ConfigManager::load_from_file(file.path()).is_err());
}
