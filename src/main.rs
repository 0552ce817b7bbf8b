use std::path::PathBuf;

use clap::Parser;
use octopus_agile::{report, OctopusClient};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "octopus-agile")]
#[command(author, version, about = "Fetch Octopus Energy Agile pricing data")]
#[command(after_help = "Examples:\n  \
    octopus-agile                            # London prices for the last 7 days\n  \
    octopus-agile --region Yorkshire         # Yorkshire prices for the last 7 days\n  \
    octopus-agile --region London --days 14  # London prices for the last 14 days\n  \
    octopus-agile --list-regions             # Show all regions\n\
    \nThe API base URL can also be set with OCTOPUS_API_URL.")]
struct Cli {
    /// Region name
    #[arg(short, long, default_value = "London")]
    region: String,

    /// Number of days of historical data
    #[arg(short, long, default_value_t = 7)]
    days: u32,

    /// List all regions and exit
    #[arg(long)]
    list_regions: bool,

    /// Output directory for CSV files
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Base URL of the Octopus API, overriding OCTOPUS_API_URL
    #[arg(long)]
    api_url: Option<String>,

    /// Maximum number of product detail requests in flight
    #[arg(long, default_value_t = 4)]
    concurrency: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("octopus_agile=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut out = std::io::stdout();

    if cli.list_regions {
        report::write_region_list(&mut out)?;
        return Ok(());
    }

    let client = OctopusClient::from_env()?
        .with_base_url_override(cli.api_url)
        .with_concurrency(cli.concurrency);

    println!("Fetching available products and tariffs...");
    let catalog = client.fetch_catalog().await?;
    report::write_catalog_summary(&mut out, &catalog)?;

    report::write_region_report(
        &mut out,
        &client,
        &catalog,
        &cli.region,
        cli.days,
        &cli.output_dir,
    )
    .await?;

    Ok(())
}
