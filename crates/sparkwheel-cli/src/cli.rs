//! sparkwheel CLI - resolve and inspect layered configuration
//!
//! Usage:
//!   sparkwheel get config.yaml model::lr --set model::lr=0.5
//!   sparkwheel dump base.yaml site.yaml --format json
//!   sparkwheel check config.yaml
//!
//! Exit codes: 0 success, 1 merge/validation error, 2 resolution error,
//! 3 instantiation error.

use clap::{Parser, Subcommand};
use colored::Colorize;
use sparkwheel_core::{Config, Error, Options, Resolved};
use std::path::PathBuf;
use std::process::ExitCode;

/// sparkwheel - declarative configuration engine
#[derive(Parser)]
#[command(name = "sparkwheel")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a value from the merged configuration
    Get {
        /// Configuration file(s), merged in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Identifier to resolve (e.g. model::lr)
        id: String,

        /// Override strings applied after merging ([~|=]id=literal)
        #[arg(short, long = "set")]
        set: Vec<String>,

        /// Print the raw (unresolved) node instead
        #[arg(short, long)]
        raw: bool,

        /// Output format: text, yaml, json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the merged raw tree
    Dump {
        /// Configuration file(s), merged in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Override strings applied after merging ([~|=]id=literal)
        #[arg(short, long = "set")]
        set: Vec<String>,

        /// Output format: yaml, json
        #[arg(short, long, default_value = "yaml")]
        format: String,

        /// Write to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Quick syntax check of configuration files
    Check {
        /// Configuration file(s) to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Run the CLI with the given arguments
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Get {
            files,
            id,
            set,
            raw,
            format,
        } => cmd_get(files, &id, &set, raw, &format),

        Commands::Dump {
            files,
            set,
            format,
            output,
        } => cmd_dump(files, &set, &format, output),

        Commands::Check { files } => cmd_check(files),
    }
}

fn load_config(files: &[PathBuf], set: &[String]) -> Result<Config, Error> {
    let mut config = Config::from_yaml_files_with_options(files, Options::from_env())?;
    if !set.is_empty() {
        config.update(set)?;
    }
    Ok(config)
}

fn fail(err: Error) -> ExitCode {
    eprintln!("{}", err.to_string().red());
    ExitCode::from(err.exit_code())
}

fn cmd_get(files: Vec<PathBuf>, id: &str, set: &[String], raw: bool, format: &str) -> ExitCode {
    let config = match load_config(&files, set) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };

    if raw {
        let node = match config.get(id) {
            Ok(n) => n.clone(),
            Err(e) => return fail(e),
        };
        return print_value(&node, format);
    }

    let resolved = match config.resolve(id) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    match resolved {
        Resolved::Value(value) => print_value(&value, format),
        other => {
            // Constructed components have no data form; describe them
            println!("{}", other);
            ExitCode::SUCCESS
        }
    }
}

fn print_value(value: &sparkwheel_core::Value, format: &str) -> ExitCode {
    match format {
        "json" => match serde_json::to_string_pretty(value) {
            Ok(text) => {
                println!("{}", text);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                ExitCode::from(1)
            }
        },
        "yaml" => match serde_yaml::to_string(value) {
            Ok(text) => {
                print!("{}", text);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                ExitCode::from(1)
            }
        },
        _ => {
            println!("{}", value);
            ExitCode::SUCCESS
        }
    }
}

fn cmd_dump(
    files: Vec<PathBuf>,
    set: &[String],
    format: &str,
    output: Option<PathBuf>,
) -> ExitCode {
    let config = match load_config(&files, set) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };

    let content = if format == "json" {
        serde_json::to_string_pretty(config.raw()).map_err(|e| Error::parse(e.to_string()))
    } else {
        config.to_yaml()
    };

    match content {
        Ok(content) => {
            if let Some(output_path) = output {
                if let Err(e) = std::fs::write(&output_path, &content) {
                    eprintln!("{}: {}", "Error writing file".red(), e);
                    return ExitCode::from(1);
                }
                eprintln!("{} Wrote to {}", "✓".green(), output_path.display());
            } else {
                print!("{}", content);
                if format == "json" {
                    println!();
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn cmd_check(files: Vec<PathBuf>) -> ExitCode {
    let mut all_valid = true;

    for file in files {
        let content = match std::fs::read_to_string(&file) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), file.display(), e);
                all_valid = false;
                continue;
            }
        };

        match sparkwheel_core::value::from_yaml_str(&content, false) {
            Ok(_) => {
                println!("{} {}: valid YAML", "✓".green(), file.display());
            }
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), file.display(), e);
                all_valid = false;
            }
        }
    }

    if all_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
