// Configuration management module
// TOML settings plus the API credential read from the environment

pub mod interactive;
pub mod settings;

#[cfg(test)]
mod tests;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    API_KEY_VAR, CohereConfig, Config, ConfigError, RetrievalConfig, load_api_key,
};
