//! opgen CLI
//!
//! Command-line interface for regenerating Openplanet symbol patterns

mod commands;
mod output;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use colored::Colorize;
use opgen_core::{GeneratorOptions, OpgenError, Result, init_tracing_with};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "opgen")]
#[command(about = "Regenerate Openplanet symbol patterns in an AngelScript TextMate grammar")]
#[command(version = opgen_core::VERSION)]
#[command(args_conflicts_with_subcommands = true)]
#[command(
    long_about = "opgen reads the metadata files of an Openplanet install and rewrites the\n\
namespace, type and function patterns of an AngelScript TextMate grammar.\n\
\n\
Examples:\n  \
opgen                                   # Scan default install dirs, patch the default grammar\n  \
opgen --openplanet-dir ~/OpenplanetNext # Scan one install dir\n  \
opgen --core OpenplanetCore.json        # Read only the given files\n  \
opgen watch                             # Regenerate whenever metadata changes\n  \
opgen config init                       # Create a configuration file"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    generate: GenerateArgs,

    /// Output format of the run summary
    #[arg(short, long, default_value = "human")]
    format: OutputFormat,

    /// Configuration file path
    #[arg(
        short,
        long,
        global = true,
        help = "Path to configuration file (.opgenrc.json/.opgenrc.toml)"
    )]
    config: Option<PathBuf>,

    /// Verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Generate shell completion script
    #[arg(
        long,
        value_enum,
        help = "Generate completion script for specified shell"
    )]
    generate_completion: Option<Shell>,
}

/// Source and output selection shared by `generate` and `watch`
#[derive(Args, Debug, Clone, Default)]
pub struct GenerateArgs {
    /// Core metadata file
    #[arg(long, value_name = "PATH", help = "Read this OpenplanetCore.json")]
    pub core: Option<PathBuf>,

    /// Per-application metadata files
    #[arg(
        long,
        visible_alias = "next",
        value_name = "PATH",
        help = "Read this Openplanet*.json (repeatable)"
    )]
    pub game: Vec<PathBuf>,

    /// Header file
    #[arg(long, value_name = "PATH", help = "Read this Openplanet.h")]
    pub header: Option<PathBuf>,

    /// One install directory to scan
    #[arg(long, value_name = "DIR", help = "Scan this Openplanet install directory")]
    pub openplanet_dir: Option<PathBuf>,

    /// Semicolon-separated install directories to scan
    #[arg(
        long,
        value_name = "DIRS",
        help = "Scan these install directories (separated by ';')"
    )]
    pub openplanet_dirs: Option<String>,

    /// Read Openplanet.h from scanned directories too
    #[arg(long, help = "Also read Openplanet.h from install directories")]
    pub include_headers: bool,

    /// Grammar document to patch
    #[arg(
        long,
        value_name = "PATH",
        help = "Grammar to patch (default: syntaxes/angelscript.tmLanguage.json)"
    )]
    pub grammar: Option<PathBuf>,

    /// Maximum length of one generated alternation
    #[arg(long, value_name = "BYTES", help = "Maximum bytes per generated alternation")]
    pub max_chunk_length: Option<usize>,
}

impl GenerateArgs {
    /// Layer the flags that were given over `options`
    pub fn apply(self, options: &mut GeneratorOptions) {
        if self.core.is_some() {
            options.core = self.core;
        }
        if !self.game.is_empty() {
            options.game = self.game;
        }
        if self.header.is_some() {
            options.header = self.header;
        }

        let mut dirs: Vec<PathBuf> = self.openplanet_dir.into_iter().collect();
        if let Some(list) = self.openplanet_dirs.as_deref() {
            dirs.extend(GeneratorOptions::split_dir_list(list));
        }
        if !dirs.is_empty() {
            options.openplanet_dirs = dirs;
        }

        if self.include_headers {
            options.include_headers = true;
        }
        if self.grammar.is_some() {
            options.grammar = self.grammar;
        }
        if self.max_chunk_length.is_some() {
            options.max_chunk_length = self.max_chunk_length;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Regenerate the grammar once (the default)
    Generate {
        #[command(flatten)]
        args: GenerateArgs,

        /// Output format
        #[arg(short, long, default_value = "human", help = "Output format of the run summary")]
        format: OutputFormat,
    },

    /// Regenerate, then keep regenerating whenever metadata changes
    Watch {
        #[command(flatten)]
        args: GenerateArgs,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show version information
    Version {
        /// Show detailed version information
        #[arg(long, help = "Show detailed build and version information")]
        detailed: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Initialize a new configuration file
    Init {
        /// Configuration format
        #[arg(
            short,
            long,
            default_value = "json",
            help = "Configuration file format"
        )]
        format: ConfigFormat,

        /// Overwrite existing configuration
        #[arg(long, help = "Overwrite existing configuration file")]
        force: bool,

        /// Include the grammar layout section
        #[arg(long, help = "Write the default grammar layout too")]
        with_layout: bool,
    },

    /// Show the effective options
    Show {
        /// Output format
        #[arg(short, long, default_value = "json", help = "Output format")]
        format: ConfigFormat,
    },

    /// Print the JSON Schema of the configuration file
    Schema,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    Human,
    /// JSON summary
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    /// JSON format
    Json,
    /// TOML format
    Toml,
}

fn main() {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => exit_with(&OpgenError::from(e)),
    };

    if let Err(e) = runtime.block_on(async_main()) {
        exit_with(&e);
    }
}

fn exit_with(error: &OpgenError) -> ! {
    eprintln!("{} {}", "error:".red().bold(), error);
    std::process::exit(1);
}

async fn async_main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(shell) = cli.generate_completion {
        generate_completion_script(shell);
        return Ok(());
    }

    if !cli.no_color && std::env::var("NO_COLOR").is_err() {
        colored::control::unset_override();
    } else {
        colored::control::set_override(false);
    }

    let log_level = match cli.verbose {
        0 => "opgen=error",
        1 => "opgen=warn",
        2 => "opgen=info",
        3 => "opgen=debug",
        _ => "opgen=trace",
    };
    init_tracing_with(log_level);

    run_command(cli).await
}

fn generate_completion_script(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

async fn run_command(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Generate { args, format }) => {
            commands::generate_command(args, format, cli.config).await
        }

        Some(Commands::Watch { args }) => commands::watch_command(args, cli.config).await,

        Some(Commands::Config { action }) => match action {
            ConfigAction::Init {
                format,
                force,
                with_layout,
            } => commands::config_init_command(format, force, with_layout).await,
            ConfigAction::Show { format } => {
                commands::config_show_command(format, cli.config).await
            }
            ConfigAction::Schema => commands::config_schema_command().await,
        },

        Some(Commands::Version { detailed }) => {
            if detailed {
                println!("opgen {}", opgen_core::VERSION);
                println!("Build information:");
                println!("  Target: {}", std::env::consts::ARCH);
                println!("  OS: {}", std::env::consts::OS);
            } else {
                println!("{}", opgen_core::VERSION);
            }
            Ok(())
        }

        None => commands::generate_command(cli.generate, cli.format, cli.config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_config() {
        let mut options = GeneratorOptions {
            openplanet_dirs: vec![PathBuf::from("from-config")],
            max_chunk_length: Some(100),
            ..Default::default()
        };
        let args = GenerateArgs {
            openplanet_dir: Some(PathBuf::from("a")),
            openplanet_dirs: Some("b;c".to_string()),
            include_headers: true,
            ..Default::default()
        };
        args.apply(&mut options);

        assert_eq!(
            options.openplanet_dirs,
            vec![PathBuf::from("a"), PathBuf::from("b"), PathBuf::from("c")]
        );
        assert!(options.include_headers);
        assert_eq!(options.max_chunk_length, Some(100));
    }

    #[test]
    fn test_next_alias() {
        let cli = Cli::try_parse_from(["opgen", "--next", "OpenplanetNext.json"]).unwrap();
        assert_eq!(cli.generate.game, vec![PathBuf::from("OpenplanetNext.json")]);
    }

    #[test]
    fn test_generate_subcommand_flags() {
        let cli = Cli::try_parse_from([
            "opgen",
            "generate",
            "--core",
            "OpenplanetCore.json",
            "--format",
            "json",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Generate { args, format }) => {
                assert_eq!(args.core, Some(PathBuf::from("OpenplanetCore.json")));
                assert_eq!(format, OutputFormat::Json);
            }
            _ => panic!("expected generate"),
        }
    }
}
