mod settings;

use config::{Config, ConfigError, Environment, File};

pub use settings::{BrokerSettings, LogSettings, PartialSettings, ServerSettings, Settings};

/// Prefix for environment overrides, e.g. `POPMQ_SERVER__PORT=1884`.
pub const ENV_PREFIX: &str = "POPMQ";

/// Loads the configuration from the default file and environment variables
/// Merges the configuration with default values
/// Returns a `Settings` struct containing the server, broker and log configurations
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(partial.merge(Settings::default()))
}

#[cfg(test)]
mod tests;
