use super::*;
use std::fs;
use tempfile::TempDir;

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn partial_config_with_defaults() {
        let partial_toml = r#"
            [cohere]
            chat_model = "command-r"

            [retrieval]
            top_k = 4
        "#;

        let config: Config = toml::from_str(partial_toml).expect("partial config should parse");
        assert_eq!(config.cohere.chat_model, "command-r");
        assert_eq!(config.cohere.embed_model, "embed-english-v3.0");
        assert_eq!(config.retrieval.top_k, 4);
        assert_eq!(config.chunking.chunk_size, 500);
    }

    #[test]
    fn complete_valid_config() {
        let valid_toml = r#"
            [cohere]
            base_url = "https://api.cohere.com/"
            embed_model = "embed-english-v3.0"
            chat_model = "command"
            batch_size = 48
            embedding_dimension = 1024
            timeout_secs = 45
            temperature = 0.0

            [chunking]
            chunk_size = 400
            chunk_overlap = 40
            separators = ["\n\n", "\n", " "]

            [retrieval]
            top_k = 3
        "#;

        let config: Config = toml::from_str(valid_toml).expect("should parse toml successfully");
        assert_eq!(config.cohere.batch_size, 48);
        assert_eq!(config.cohere.timeout_secs, 45);
        assert_eq!(config.chunking.chunk_size, 400);
        assert_eq!(config.chunking.separators, vec!["\n\n", "\n", " "]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_toml_handling() {
        let invalid_toml = r#"
            [cohere
            timeout_secs = "soon"
        "#;

        let result: Result<Config, toml::de::Error> = toml::from_str(invalid_toml);
        assert!(result.is_err());
    }

    #[test]
    fn config_file_persistence() {
        let temp_dir = TempDir::new().expect("should create TempDir successfully");
        let config_path = temp_dir.path().join("config.toml");

        let mut original_config = Config {
            base_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        };
        original_config.cohere.chat_model = "command-r-plus".to_string();

        let toml_content = toml::to_string_pretty(&original_config)
            .expect("config should convert to toml string successfully");
        fs::write(&config_path, toml_content).expect("should write to config_path successfully");

        let loaded_config = Config::load(temp_dir.path()).expect("should load config");

        assert_eq!(original_config, loaded_config);
    }

    #[test]
    fn error_display_messages() {
        let errors = vec![
            ConfigError::InvalidUrl("ftp://x".to_string()),
            ConfigError::InvalidBatchSize(0),
            ConfigError::InvalidModel(String::new()),
            ConfigError::InvalidChunkSize(10),
            ConfigError::OverlapTooLarge(60, 50),
            ConfigError::InvalidTopK(0),
        ];

        for error in errors {
            let message = format!("{error}");
            assert!(message.len() > 10);
        }
    }

    #[test]
    fn default_dir_ends_with_app_name() {
        let dir = Config::default_base_dir().expect("home or data dir should exist");
        let name = dir
            .file_name()
            .and_then(|name| name.to_str())
            .expect("dir has a name");
        assert!(name == ".docqa" || name == "docqa");
    }
}
