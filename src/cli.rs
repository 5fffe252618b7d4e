use clap::{Args, Parser, Subcommand};
use relay_billing::pricing::RawUsage;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "billing", version, about = "Usage billing and pricing catalog tool")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Multiply every catalog price by a factor (a backup is taken first)
    Adjust {
        /// Positive factor, e.g. 1.5 (+50%) or 0.8 (-20%)
        #[arg(allow_hyphen_values = true)]
        multiplier: String,
    },

    /// Reinstall a previously taken backup as the live catalog
    Restore {
        /// Backup file name (or path) as printed by `adjust` or `backups`
        backup: String,
    },

    /// List available catalog backups
    Backups,

    /// Show what one event would cost at several multipliers
    Simulate {
        /// Model name as listed in the catalog
        #[arg(short, long)]
        model: String,

        #[command(flatten)]
        usage: UsageArgs,

        /// Multipliers to compare (default: 1.0 1.5 0.8 2.0 0.5)
        #[arg(short = 'x', long = "multiplier", num_args = 1..)]
        multipliers: Vec<f64>,
    },

    /// Meter one event end to end and print the usage record as JSON
    Record {
        /// Account / API key identifier
        #[arg(short, long)]
        account: String,

        /// Model name as listed in the catalog
        #[arg(short, long)]
        model: String,

        #[command(flatten)]
        usage: UsageArgs,
    },

    /// Validate configuration and catalog
    Test,
}

/// Token counts for one event
#[derive(Args, Debug, Clone, Default)]
pub struct UsageArgs {
    /// Input tokens
    #[arg(long)]
    pub input: Option<u64>,

    /// Output tokens
    #[arg(long)]
    pub output: Option<u64>,

    /// Cache creation tokens
    #[arg(long)]
    pub cache_create: Option<u64>,

    /// Cache read tokens
    #[arg(long)]
    pub cache_read: Option<u64>,
}

impl From<&UsageArgs> for RawUsage {
    fn from(args: &UsageArgs) -> Self {
        RawUsage {
            input_tokens: args.input,
            output_tokens: args.output,
            cache_create_tokens: args.cache_create,
            cache_read_tokens: args.cache_read,
        }
    }
}
