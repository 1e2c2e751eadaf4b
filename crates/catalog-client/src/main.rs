//! catalog-cli: command-line client for the catalog API.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use catalog_client::{
    CatalogClient, ClientError, FetchOutcome, ItemsFeed, ItemsPager,
    client::DEFAULT_PAGE_SIZE,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "catalog-cli", version, about = "Query a running catalog service")]
struct Cli {
    /// Base URL of the catalog service.
    #[arg(
        long = "base-url",
        env = "CATALOG_URL",
        default_value = "http://localhost:3001",
        value_name = "URL"
    )]
    base_url: String,

    /// Request timeout in seconds.
    #[arg(long = "timeout-seconds", default_value_t = 10, value_name = "SECONDS")]
    timeout_seconds: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List one page of items.
    Items(ItemsArgs),
    /// Print the aggregate stats snapshot.
    Stats,
}

#[derive(Debug, Args)]
struct ItemsArgs {
    /// Case-insensitive name filter.
    #[arg(long, default_value = "")]
    q: String,

    /// 1-based page number.
    #[arg(long, default_value_t = 1)]
    page: u32,

    /// Items per page.
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    limit: u32,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), ClientError> {
    let client = CatalogClient::new(&cli.base_url, Duration::from_secs(cli.timeout_seconds))?;

    match cli.command {
        Commands::Items(args) => list_items(client, args).await,
        Commands::Stats => {
            let stats = client.get_stats().await?;
            let rendered = serde_json::to_string_pretty(&stats)
                .map_err(|err| ClientError::Decode(err.to_string()))?;
            println!("{rendered}");
            Ok(())
        }
    }
}

async fn list_items(client: CatalogClient, args: ItemsArgs) -> Result<(), ClientError> {
    let feed = ItemsFeed::new(Arc::new(client));
    let mut pager = ItemsPager::new(args.limit);
    pager.set_query(args.q);

    let mut request = pager.request();
    request.page = args.page.max(1);

    if feed.fetch_items(request.clone()).await? == FetchOutcome::Cancelled {
        return Ok(());
    }
    pager.set_total(feed.total());

    for item in feed.items() {
        println!(
            "{:>15}  {:<30}  {:<15}  {:>10.2}",
            item.id, item.name, item.category, item.price
        );
    }
    println!(
        "Page {} / {} ({} matching)",
        request.page,
        pager.total_pages(),
        pager.total()
    );
    Ok(())
}
