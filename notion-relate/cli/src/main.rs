//! notion-relate - link records in Notion databases based on a common property

mod progress;

use std::io;
use std::time::{Duration, Instant};

use clap::Parser;
use notion_relate_lib::{LinkOptions, MAX_PAGE_SIZE, NotionClient, NotionConfig, link_databases};
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::progress::ProgressPrinter;

/// Link records in Notion databases based on a common property.
///
/// Every record of the auxiliary database is indexed by its --match
/// property. Each base record whose --field value appears in that index gets
/// its --link relation replaced with the matching auxiliary records.
#[derive(Debug, Parser)]
#[command(name = "notion-relate")]
#[command(version)]
#[command(about = "Link records in Notion databases based on a common property")]
struct Cli {
    /// Notion integration token
    #[arg(long, env = "NOTION_TOKEN", hide_env_values = true)]
    token: String,

    /// Base database ID
    #[arg(long, value_name = "ID")]
    base: String,

    /// Auxiliary database ID to pull relations from
    #[arg(long, value_name = "ID")]
    aux: String,

    /// Property name used for matching records in the base database
    #[arg(long, value_name = "PROPERTY")]
    field: String,

    /// Property name used for finding matches in the auxiliary database
    #[arg(long = "match", value_name = "PROPERTY")]
    match_field: String,

    /// Property name in the base database where the relation will be created
    #[arg(long, value_name = "PROPERTY")]
    link: String,

    /// Show what would change without making any updates
    #[arg(long)]
    dryrun: bool,

    /// Skip updating records that already have a related entry
    #[arg(long)]
    skip: bool,

    /// Print a line per record instead of progress markers
    #[arg(long)]
    verbose: bool,

    /// Maximum number of base records to process
    #[arg(long, value_name = "N")]
    max: Option<usize>,

    /// Enable debug logging on stderr
    #[arg(long)]
    debug: bool,

    /// Output logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Alternate Notion API base URL.
    #[arg(long, env = "NOTION_API_URL", hide = true)]
    api_url: Option<String>,

    /// Records requested per query page (1-100).
    #[arg(long, value_name = "N", default_value_t = MAX_PAGE_SIZE, hide = true)]
    page_size: u32,

    /// Per-request timeout in seconds.
    #[arg(long, value_name = "SECS", default_value_t = 30, hide = true)]
    timeout: u64,
}

impl Cli {
    fn link_options(&self) -> LinkOptions {
        LinkOptions {
            base_database: self.base.clone(),
            aux_database: self.aux.clone(),
            match_property: self.field.clone(),
            aux_match_property: self.match_field.clone(),
            link_property: self.link.clone(),
            dry_run: self.dryrun,
            skip_existing: self.skip,
            max_records: self.max,
        }
    }

    fn notion_config(&self) -> NotionConfig {
        let config = NotionConfig::new(self.token.clone())
            .with_page_size(self.page_size)
            .with_timeout(Duration::from_secs(self.timeout));
        match &self.api_url {
            Some(url) => config.with_base_url(url.clone()),
            None => config,
        }
    }
}

fn print_parameters(cli: &Cli) {
    println!("Running with parameters:");
    println!("Base ID: {}", cli.base);
    println!("Aux ID: {}", cli.aux);
    println!("Match Field: {}", cli.field);
    println!("Aux Match Field: {}", cli.match_field);
    println!("Link Field: {}", cli.link);
    println!("Dry Run: {}", cli.dryrun);
    println!("Skip Existing: {}", cli.skip);
    match cli.max {
        Some(max) => println!("Max Records: {max}"),
        None => println!("Max Records: unlimited"),
    }
}

/// Initialize tracing on stderr so stdout carries only the report.
fn init_tracing(debug: bool, json: bool) {
    let base_filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) if debug => "warn,notion_relate_lib=debug,notion_relate=debug".to_string(),
        Err(_) => "warn".to_string(),
    };

    let filter = EnvFilter::try_new(&base_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(debug)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.debug, cli.log_json);

    let start = Instant::now();
    print_parameters(&cli);

    let client = match NotionClient::new(cli.notion_config()) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let options = cli.link_options();
    let mut printer = ProgressPrinter::new(io::stdout(), cli.verbose, &cli.link);

    match link_databases(&client, &options, &mut printer).await {
        Ok(report) => {
            tracing::debug!(?report, "Run complete");
            println!(
                "Total changes made or would have been made: {}",
                report.change_count
            );
            println!(
                "Total processing time: {:.2} seconds",
                start.elapsed().as_secs_f64()
            );
        }
        Err(e) => {
            eprintln!("Linking failed: {e}");
            std::process::exit(1);
        }
    }
}
