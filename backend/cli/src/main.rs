mod accounting_cmd;
mod config;
mod free_usage_cmd;
mod instances_cmd;
mod mail;
mod quotas_cmd;
mod render;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use stackreport_core::Flavor;
use stackreport_inventory::SortKey;
use stackreport_logging::init_logger;
use stackreport_store::SqliteStore;

use config::{Config, DatabaseOverrides};
use free_usage_cmd::FreeUsageOptions;

#[derive(Parser)]
#[command(name = "stackreport")]
#[command(about = "Usage, capacity and quota reports for OpenStack compute clouds")]
#[command(version)]
struct Cli {
    /// Config file [default: ~/.stackreport/config.yaml]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Compute (nova) SQLite database
    #[arg(long, global = true)]
    nova: Option<PathBuf>,

    /// Block storage (cinder) SQLite database
    #[arg(long, global = true)]
    cinder: Option<PathBuf>,

    /// Identity (keystone) SQLite database
    #[arg(long, global = true)]
    keystone: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walltime and volume usage per user
    Accounting {
        /// Also write the rows as CSV; without a path the configured file is used
        #[arg(short, long, num_args = 0..=1, value_name = "PATH")]
        file: Option<Option<PathBuf>>,
    },
    /// Free instance slots per flavor
    FreeUsage(FreeUsageArgs),
    /// Live instances grouped by user
    InstancesByUser {
        /// Sort users by name, vms or cpus
        #[arg(short, long, default_value_t = SortKey::Name)]
        sort: SortKey,

        /// Reverse the sort order
        #[arg(short, long)]
        reverse: bool,
    },
    /// Compare stored quota usage with live instances
    TestQuotas {
        /// Overwrite mismatching counters with the live values
        #[arg(long)]
        update_usages: bool,

        /// Mail the findings instead of printing them
        #[arg(long)]
        send_mail: bool,
    },
}

#[derive(Args)]
struct FreeUsageArgs {
    /// Increase verbosity (up to -vvvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only report these flavors
    #[arg(short = 'f', long = "flavor", num_args = 0..)]
    flavors: Vec<String>,

    /// Add a simulated flavor built from the options below
    #[arg(long)]
    simulate: bool,

    /// Name of the simulated flavor
    #[arg(short = 'n', long, default_value = "simulated-flavor")]
    flavor_name: String,

    /// vCPUs of the simulated flavor
    #[arg(short = 'c', long, default_value_t = 1)]
    vcpus: i64,

    /// RAM in MB of the simulated flavor
    #[arg(short = 'm', long, default_value_t = 1000)]
    ram: i64,

    /// Root disk in GB of the simulated flavor
    #[arg(short = 'r', long, default_value_t = 10)]
    root_disk: i64,

    /// Ephemeral disk in GB of the simulated flavor
    #[arg(short = 'e', long, default_value_t = 0)]
    ephemeral_disk: i64,
}

impl FreeUsageArgs {
    fn into_options(self) -> FreeUsageOptions {
        let simulated = self.simulate.then(|| Flavor {
            name: self.flavor_name,
            vcpus: self.vcpus,
            memory_mb: self.ram,
            root_gb: self.root_disk,
            ephemeral_gb: self.ephemeral_disk,
        });
        FreeUsageOptions { verbose: self.verbose, flavors: self.flavors, simulated }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let overrides = DatabaseOverrides { nova: cli.nova, cinder: cli.cinder, keystone: cli.keystone };
    let config = Config::load(cli.config.as_deref(), overrides).await?;

    init_logger(config.log_dir().as_deref(), config.log_level())?;
    config.log_warnings();

    let store = SqliteStore::open(&config.databases)?;

    match cli.command {
        Commands::Accounting { file } => {
            let file = file.map(|path| path.unwrap_or_else(|| config.accounting_output_file()));
            accounting_cmd::run(&store, &store, file).await?;
        }
        Commands::FreeUsage(args) => {
            free_usage_cmd::run(&store, &args.into_options()).await?;
        }
        Commands::InstancesByUser { sort, reverse } => {
            instances_cmd::run(&store, &store, sort, reverse).await?;
        }
        Commands::TestQuotas { update_usages, send_mail } => {
            let mail = send_mail.then(|| config.mail());
            quotas_cmd::run(&store, update_usages, mail.as_ref()).await?;
        }
    }

    info!("Report finished");
    Ok(())
}
