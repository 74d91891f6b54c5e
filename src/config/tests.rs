use super::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.server.name, "enterprise-crm-server");
    assert_eq!(config.server.version, "1.0.0");
    assert!(config.server.instructions.is_some());
    assert_eq!(config.crm.base_uri, "crm://");
    assert!(config.validate().is_ok());
}

#[test]
fn config_validation() {
    let config = Config::default();

    let mut invalid_config = config.clone();
    invalid_config.server.name = "  ".to_string();
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidName(_))
    ));

    let mut invalid_config = config.clone();
    invalid_config.server.version = String::new();
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidVersion(_))
    ));

    let mut invalid_config = config;
    invalid_config.crm.base_uri = "not a uri".to_string();
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidBaseUri(_))
    ));
}

#[test]
fn base_url_parsing() {
    let config = Config::default();
    let url = config
        .crm
        .base_url()
        .expect("default base uri should parse");
    assert_eq!(url.scheme(), "crm");
}

#[test]
fn base_url_normalizes_host_only_uri() {
    let mut config = Config::default();
    config.crm.base_uri = "https://crm.example.com".to_string();
    let url = config.crm.base_url().expect("host-only base uri should parse");
    assert_eq!(url.as_str(), "https://crm.example.com/");

    config.crm.base_uri = "https://crm.example.com/api/".to_string();
    assert!(config.validate().is_ok());

    config.crm.base_uri = "https://crm.example.com/api".to_string();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidBaseUri(_))
    ));
}

#[test]
fn toml_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
}

#[test]
fn load_from_file() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config_path = temp_dir.path().join("config.toml");

    fs::write(
        &config_path,
        r#"
            [server]
            name = "acme-crm"
            version = "2.3.1"

            [crm]
            base_uri = "acme-crm://"
        "#,
    )
    .expect("should write to config_path successfully");

    let config = Config::load_from(&config_path).expect("should load config");
    assert_eq!(config.server.name, "acme-crm");
    assert_eq!(config.server.version, "2.3.1");
    assert_eq!(config.server.instructions, None);
    assert_eq!(config.crm.base_uri, "acme-crm://");
}

#[test]
fn load_from_rejects_invalid_values() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config_path = temp_dir.path().join("config.toml");

    fs::write(
        &config_path,
        r#"
            [server]
            name = ""
            version = "1.0.0"

            [crm]
            base_uri = "crm://"
        "#,
    )
    .expect("should write to config_path successfully");

    let err = Config::load_from(&config_path).expect_err("empty name is invalid");
    assert!(err.to_string().contains("validation failed"));
}

#[test]
fn partial_config_is_rejected() {
    let partial_toml = r#"
        [server]
        name = "custom"
    "#;

    let result: Result<Config, toml::de::Error> = toml::from_str(partial_toml);
    assert!(result.is_err());
}

#[test]
fn missing_file_is_an_error_for_explicit_paths() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let result = Config::load_from(&temp_dir.path().join("absent.toml"));
    assert!(result.is_err());
}

#[test]
fn config_file_lives_in_config_dir() {
    if let (Ok(dir), Ok(file)) = (Config::config_dir(), Config::config_file_path()) {
        assert_eq!(file, dir.join("config.toml"));
    }
}
