use super::load_existing_config as load_existing_config_impl;
use super::*;
use tempfile::TempDir;

#[test]
fn load_existing_config_without_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let config = load_existing_config_impl(temp_dir.path());

    assert_eq!(config.base_dir, temp_dir.path());
    assert_eq!(config.cohere, CohereConfig::default());
}

#[test]
fn load_existing_config_falls_back_on_invalid_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    std::fs::write(temp_dir.path().join("config.toml"), "[retrieval]\ntop_k = 0\n")
        .expect("should write config");

    let config = load_existing_config_impl(temp_dir.path());

    assert_eq!(config.retrieval.top_k, 3);
}

#[test]
fn load_existing_config_reads_saved_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut saved = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    saved.retrieval.top_k = 7;
    saved.save().expect("config should save");

    let config = load_existing_config_impl(temp_dir.path());

    assert_eq!(config.retrieval.top_k, 7);
}
