//! CLI argument definitions using clap derive

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Plugup - editor plugin set updater
///
/// Resolves every declared plugin to its newest upstream commit, hashes
/// it and regenerates the nix expression packaging the set.
#[derive(Parser, Debug)]
#[command(name = "plugup")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute (defaults to `update`)
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Flags shared by every command
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Nixpkgs checkout used for evaluation and commits
    #[arg(long, global = true, default_value = ".")]
    pub nixpkgs: PathBuf,

    /// Declared plugin list (overrides the editor default)
    #[arg(short = 'i', long = "input-names", global = true)]
    pub input_names: Option<PathBuf>,

    /// Generated nix file (overrides the editor default)
    #[arg(short = 'o', long = "out", global = true)]
    pub out: Option<PathBuf>,

    /// Number of concurrent fetches (overrides the config file)
    #[arg(short, long, global = true)]
    pub proc: Option<usize>,

    /// GitHub token used to avoid rate limiting
    #[arg(short = 't', long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Don't commit the updated files
    #[arg(short = 'n', long, global = true)]
    pub no_commit: bool,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Explicit log level, overriding -v
    #[arg(long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Log output format (overrides the config file)
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Configuration file path
    #[arg(short, long, global = true, env = "PLUGUP_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add new plugins to the declared list
    Add(AddArgs),

    /// Update all or a subset of the plugins
    Update(UpdateArgs),
}

/// Arguments for the add command
#[derive(Parser, Debug)]
pub struct AddArgs {
    /// Plugins as `owner/repo[@branch][ as alias]` or a git URI
    #[arg(required = true, value_name = "PLUGIN")]
    pub plugins: Vec<String>,
}

/// Arguments for the update command
#[derive(Parser, Debug, Default)]
pub struct UpdateArgs {
    /// Normalized names of the plugins to update (all when empty)
    #[arg(value_name = "NAME")]
    pub names: Vec<String>,
}

/// Log verbosity
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Level selected by `-v` repetitions: 0 = warn, 1 = info, 2+ = debug
    pub fn from_verbosity(verbose: u8) -> Self {
        match verbose {
            0 => Self::Warn,
            1 => Self::Info,
            _ => Self::Debug,
        }
    }

    /// Directive understood by `EnvFilter`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output format
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl CommonArgs {
    /// Effective log level from `--log-level` or `-v`
    pub fn log_level(&self) -> LogLevel {
        self.log_level
            .unwrap_or_else(|| LogLevel::from_verbosity(self.verbose))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_update() {
        let cli = Cli::parse_from(["plugup"]);
        assert!(cli.command.is_none());
        assert!(!cli.common.no_commit);
    }

    #[test]
    fn cli_parses_add() {
        let cli = Cli::parse_from(["plugup", "add", "foo/bar@dev as baz", "x/y"]);
        match cli.command {
            Some(Commands::Add(args)) => {
                assert_eq!(args.plugins, vec!["foo/bar@dev as baz", "x/y"]);
            }
            _ => panic!("expected Add command"),
        }
    }

    #[test]
    fn add_requires_a_plugin() {
        assert!(Cli::try_parse_from(["plugup", "add"]).is_err());
    }

    #[test]
    fn cli_parses_update_with_global_flags() {
        let cli = Cli::parse_from([
            "plugup", "update", "vim-foo", "nvim-lua", "-p", "4", "--no-commit", "-i", "names",
        ]);
        match cli.command {
            Some(Commands::Update(args)) => assert_eq!(args.names, vec!["vim-foo", "nvim-lua"]),
            _ => panic!("expected Update command"),
        }
        assert_eq!(cli.common.proc, Some(4));
        assert!(cli.common.no_commit);
        assert_eq!(cli.common.input_names, Some(PathBuf::from("names")));
    }

    #[test]
    fn log_level_from_flags() {
        let cli = Cli::parse_from(["plugup", "-vv"]);
        assert_eq!(cli.common.log_level(), LogLevel::Debug);

        let cli = Cli::parse_from(["plugup", "-v", "--log-level", "error"]);
        assert_eq!(cli.common.log_level(), LogLevel::Error);

        let cli = Cli::parse_from(["plugup", "--log-format", "json"]);
        assert_eq!(cli.common.log_format, Some(LogFormat::Json));
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
