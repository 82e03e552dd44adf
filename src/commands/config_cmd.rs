use clap::{Args, Subcommand};
use std::fs;
use std::io::Write;

use recipe_sync::config::Config;

use super::OutputFormat;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Initialize configuration file
    Init,
}

const DEFAULT_CONFIG: &str = r#"# recipes configuration

# Path to SQLite database (default: ~/.local/share/recipes/recipes.db)
# database_path: ~/.local/share/recipes/recipes.db

sync:
  # Recipe server, e.g. http://localhost:8080
  # server_url: http://localhost:8080
  # Run a full sync right after 'recipes login'
  sync_on_login: true
  # Request timeout in seconds
  timeout_secs: 30
"#;

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!("Config file: {} (not found)", config.config_path.display());
                        }
                        println!();

                        println!("database_path: {}", config.database_path.value.display());
                        println!("  source: {}", config.database_path.source);
                        println!();

                        let sync = &config.sync;
                        println!(
                            "sync.server_url: {}",
                            sync.server_url.as_deref().unwrap_or("(not set)")
                        );
                        println!("sync.email: {}", sync.email.as_deref().unwrap_or("(not set)"));
                        println!(
                            "sync.token: {}",
                            if sync.token.is_some() { "(set)" } else { "(not set)" }
                        );
                        println!("sync.sync_on_login: {}", sync.sync_on_login);
                        println!("sync.timeout_secs: {}", sync.timeout_secs);
                    }
                }
                Ok(())
            }

            ConfigSubcommand::Init => {
                let config_path = &config.config_path;

                if config_path.exists() {
                    println!("Config file already exists: {}", config_path.display());
                    println!("Use 'recipes config show' to view current configuration.");
                    return Ok(());
                }

                if let Some(parent) = config_path.parent() {
                    fs::create_dir_all(parent)?;
                }

                let mut file = fs::File::create(config_path)?;
                file.write_all(DEFAULT_CONFIG.as_bytes())?;

                println!("Created config file: {}", config_path.display());
                println!("\nEdit this file to customize your settings.");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_parses() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, DEFAULT_CONFIG).unwrap();

        let config = Config::load(Some(path)).unwrap();
        assert!(config.sync.sync_on_login);
        assert_eq!(config.sync.timeout_secs, 30);
        assert_eq!(config.sync.server_url, None);
    }
}
