use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use findaccount::{
    csv_header, render_table, to_csv, AccountFinder, ChainRegistry, ChainResult, CustomNetwork,
    EndpointOrder, LookupConfig,
};

#[derive(Parser, Debug)]
#[command(name = "findaccount")]
#[command(about = "Find an account on every network sharing its key derivation", long_about = None)]
struct Args {
    /// A bech32-encoded address
    #[arg(short, long)]
    address: String,

    /// Name of a custom network (requires --rpc and --prefix)
    #[arg(long, requires_all = ["rpc", "prefix"])]
    name: Option<String>,

    /// RPC endpoint of the custom network
    #[arg(long, requires_all = ["name", "prefix"])]
    rpc: Option<String>,

    /// Bech32 prefix of the custom network
    #[arg(long, requires_all = ["name", "rpc"])]
    prefix: Option<String>,

    /// Directory in chain-registry layout to use instead of the embedded registry
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Per-endpoint probe timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Overall deadline in seconds for querying all networks
    #[arg(long)]
    deadline: Option<u64>,

    /// Order in which endpoint candidates are tried
    #[arg(long, value_enum, default_value_t = Order::LastFirst)]
    order: Order,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Csv)]
    format: Format,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Order {
    LastFirst,
    Registered,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Csv,
    Table,
}

fn load_registry(dir: Option<&PathBuf>) -> Result<ChainRegistry> {
    match dir {
        Some(dir) => Ok(ChainRegistry::load_dir(dir)?
            .with_additional_endpoints(&ChainRegistry::embedded_additional_endpoints()?)),
        None => ChainRegistry::load(),
    }
}

fn print_results(results: &[ChainResult], format: Format) {
    match format {
        Format::Csv => {
            println!("{}", csv_header());
            for result in results {
                println!("{}", to_csv(result));
            }
        }
        Format::Table => print!("{}", render_table(results)),
    }
}

async fn lookup(args: Args) -> Result<Vec<ChainResult>> {
    if args.timeout == 0 {
        bail!("--timeout must be at least one second");
    }

    let mut config = LookupConfig::default()
        .with_probe_timeout(Duration::from_secs(args.timeout))
        .with_endpoint_order(match args.order {
            Order::LastFirst => EndpointOrder::LastRegisteredFirst,
            Order::Registered => EndpointOrder::Registered,
        });
    if let Some(deadline) = args.deadline {
        config = config.with_deadline(Duration::from_secs(deadline));
    }
    let finder = AccountFinder::new(&config);

    match (args.name, args.rpc, args.prefix) {
        (Some(name), Some(rpc), Some(prefix)) => {
            let network = CustomNetwork { name, rpc, prefix };
            Ok(vec![finder.run_custom(&args.address, &network).await?])
        }
        _ => {
            let registry = load_registry(args.registry.as_ref())?;
            Ok(finder.run(&args.address, &registry).await?)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("findaccount=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let format = args.format;

    match lookup(args).await {
        Ok(results) => print_results(&results, format),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
