use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "intent-arbiter")]
#[command(about = "Intent conflict arbiter", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override data directory
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Config profile to apply, e.g. `lab` for `[profiles.lab]`
    #[arg(short, long)]
    pub profile: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn apply_to_env(&self) {
        if let Some(config_path) = &self.config {
            std::env::set_var(arbiter_core::infrastructure::config::CONFIG_PATH_ENV, config_path);
        }

        if let Some(data_dir) = &self.data_dir {
            std::env::set_var(arbiter_core::infrastructure::config::DATA_DIR_ENV, data_dir);
        }
    }
}
