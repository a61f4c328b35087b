//! Command-line driver for vu-formatter.
//!
//! Usage:
//!   vu-formatter preprocess `<input>` [-o `<output>`]   - Insert the WORKAROUND sentinel
//!   vu-formatter strip `<input>` [-o `<output>`]        - Remove the WORKAROUND sentinel
//!   vu-formatter format `<tree.json>` [-o `<output>`]   - Validate and rewrite codified VUs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use vu_formatter_config::Config;
use vu_formatter_engine::{
    AttributeClassifier, ProcessValidator, ValidatorCommand, VuError, io, preprocess,
    process_document,
};

#[derive(Debug, Parser)]
#[command(name = "vu-formatter", version, about = "Formats codified Valid Usage statements")]
struct Cli {
    /// Configuration file (defaults to ~/.config/vu-formatter/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Mark list items inside Valid Usage sections so the list parser leaves them intact
    Preprocess {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Remove the WORKAROUND sentinels the preprocessor inserted
    Strip {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate codified VUs in a document tree and write the rewritten tree
    Format {
        tree: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Validator program, replacing the configured command and arguments
        #[arg(long)]
        validator: Option<String>,
        /// Argument passed to the validator program (repeatable)
        #[arg(long = "validator-arg", requires = "validator", allow_hyphen_values = true)]
        validator_args: Vec<String>,
        /// Seconds to wait for each validator response; 0 waits forever
        #[arg(long)]
        timeout: Option<u64>,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            log::error!("{e:#}");
            process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when the run completed but must report failure.
fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Commands::Preprocess { input, output } => {
            let source = io::read_source(&input)?;
            emit(output.as_deref(), &preprocess::preprocess_text(&source))?;
            Ok(true)
        }
        Commands::Strip { input, output } => {
            let source = io::read_source(&input)?;
            emit(output.as_deref(), &preprocess::strip_workaround(&source))?;
            Ok(true)
        }
        Commands::Format {
            tree,
            output,
            validator,
            validator_args,
            timeout,
        } => {
            let config = Config::load_or_default(cli.config.as_deref())?;
            log::debug!("Using configuration: {config:?}");

            let command = validator_command(&config, validator, validator_args, timeout);
            let classifier = AttributeClassifier {
                version_prefix: config.attributes.version_prefix.clone(),
                extension_prefix: config.attributes.extension_prefix.clone(),
            };
            format_tree(&tree, output.as_deref(), &command, &classifier)
        }
    }
}

fn validator_command(
    config: &Config,
    validator: Option<String>,
    validator_args: Vec<String>,
    timeout: Option<u64>,
) -> ValidatorCommand {
    let (program, args) = match validator {
        Some(program) => (program, validator_args),
        None => (
            config.validator.command.clone(),
            config.validator.args.clone(),
        ),
    };
    let timeout = match timeout {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => config.validator.timeout(),
    };
    ValidatorCommand::new(program).args(args).timeout(timeout)
}

fn format_tree(
    tree: &Path,
    output: Option<&Path>,
    command: &ValidatorCommand,
    classifier: &AttributeClassifier,
) -> Result<bool> {
    let mut document = io::read_document(tree)?;
    let mut validator = ProcessValidator::spawn(command)
        .with_context(|| format!("Failed to start validator for {}", tree.display()))?;

    let succeeded = match process_document(&mut document, &mut validator, classifier) {
        Ok(report) => report.succeeded(),
        Err(VuError::ConfigurationRejected { .. }) => false,
        Err(e) => return Err(e.into()),
    };

    emit(output, &io::document_to_json(&document)?)?;
    Ok(succeeded)
}

fn emit(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => io::write_output(path, content)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vu_formatter_config::ValidatorConfig;

    fn config() -> Config {
        Config {
            validator: ValidatorConfig {
                command: "python3".to_string(),
                args: vec!["scripts/vupreprocessor.py".to_string()],
                timeout_secs: 60,
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_validator_command_from_config() {
        let command = validator_command(&config(), None, Vec::new(), None);
        assert_eq!(command.program, "python3");
        assert_eq!(command.args, vec!["scripts/vupreprocessor.py"]);
        assert_eq!(command.timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_validator_flag_replaces_command_and_args() {
        let command = validator_command(
            &config(),
            Some("sh".to_string()),
            vec!["validator.sh".to_string()],
            Some(5),
        );
        assert_eq!(command.program, "sh");
        assert_eq!(command.args, vec!["validator.sh"]);
        assert_eq!(command.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_zero_timeout_flag_disables_timeout() {
        let command = validator_command(&config(), None, Vec::new(), Some(0));
        assert_eq!(command.timeout, None);
    }

    #[test]
    fn test_cli_parses_format_flags() {
        let cli = Cli::try_parse_from([
            "vu-formatter",
            "--verbose",
            "format",
            "tree.json",
            "-o",
            "out.json",
            "--validator",
            "sh",
            "--validator-arg",
            "-c",
            "--timeout",
            "3",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Format {
                tree,
                output,
                validator,
                validator_args,
                timeout,
            } => {
                assert_eq!(tree, PathBuf::from("tree.json"));
                assert_eq!(output, Some(PathBuf::from("out.json")));
                assert_eq!(validator.as_deref(), Some("sh"));
                assert_eq!(validator_args, vec!["-c"]);
                assert_eq!(timeout, Some(3));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
