//! CLI argument definitions

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// texbuddy - one report for all your LaTeX checkers
#[derive(Parser)]
#[command(name = "texbuddy")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Whitelist file (overrides the configuration)
    #[arg(short, long, global = true)]
    pub whitelist: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check LaTeX documents
    Check(CheckArgs),

    /// Manage the whitelist
    Whitelist {
        #[command(subcommand)]
        command: WhitelistCommands,
    },
}

#[derive(Args)]
pub struct CheckArgs {
    /// Documents to check. Included files are checked as well.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Directory that receives a `<name>.result.json` per document
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Document language
    #[arg(short, long)]
    pub language: Option<String>,

    /// Run only these modules (comma separated)
    #[arg(long, value_delimiter = ',', conflicts_with = "disable_modules")]
    pub enable_modules: Vec<String>,

    /// Run every module except these (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub disable_modules: Vec<String>,
}

#[derive(Subcommand)]
pub enum WhitelistCommands {
    /// Add keys to the whitelist
    Add {
        /// Keys as printed in JSON output
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Whitelist every word of a word list as correctly spelled
    FromWordlist {
        /// File with one word per line
        wordlist: PathBuf,

        /// Language the words belong to, e.g. "en"
        language: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
