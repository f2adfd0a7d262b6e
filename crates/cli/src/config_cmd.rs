//! `gadai config`: validate or print the effective pipeline configuration.

use std::path::PathBuf;

use clap::Subcommand;
use serde::Serialize;

use crate::{load_config, print_json, CliError};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Parse and validate a config file without running
    #[command(after_help = "\
Examples:
  gadai config check cabang.toml")]
    Check {
        /// Path to the TOML config
        file: PathBuf,
    },

    /// Print the effective configuration (defaults filled in) as TOML
    #[command(after_help = "\
Examples:
  gadai config show > gadai.toml
  gadai config show -c cabang.toml --json")]
    Show {
        #[arg(long, short = 'c', env = "GADAI_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct CheckOutput<'a> {
    ok: bool,
    name: &'a str,
    sheets: usize,
    fields: usize,
}

pub fn cmd_config(cmd: ConfigCommands, json: bool) -> Result<(), CliError> {
    match cmd {
        ConfigCommands::Check { file } => {
            let config = load_config(Some(&file))?;
            if json {
                return print_json(&CheckOutput {
                    ok: true,
                    name: &config.name,
                    sheets: config.sheets.len(),
                    fields: config.fields.len(),
                });
            }
            eprintln!(
                "ok: {} ({} sheet(s), {} field(s))",
                config.name,
                config.sheets.len(),
                config.fields.len()
            );
            Ok(())
        }
        ConfigCommands::Show { config } => {
            let config = load_config(config.as_deref())?;
            if json {
                return print_json(&config);
            }
            let text = config.to_toml().map_err(CliError::pipeline)?;
            print!("{}", text);
            Ok(())
        }
    }
}
