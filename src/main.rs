use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use memevote_client::chain::{AccountAddress, SubstrateConnector};
use memevote_client::config::load_config;
use memevote_client::feed::FeedMode;
use memevote_client::observability::{logging, metrics};
use memevote_client::{AppContext, ClientResult};

#[derive(Parser)]
#[command(name = "memevote")]
#[command(about = "Browse, create and vote on memes stored by a meme-vote contract", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Account to act as (defaults to the provider's first account)
    #[arg(short, long)]
    account: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show connection and signer status
    Status,
    /// List accounts authorized by the signer provider
    Accounts,
    /// List entries in insertion order
    List {
        #[arg(long, default_value_t = 0)]
        offset: u32,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// List entries with the most likes
    Top {
        #[arg(long)]
        count: Option<u32>,
    },
    /// Show a single entry
    Show { id: u32 },
    /// Create an entry and wait for inclusion
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        url: String,
    },
    /// Vote for an entry and wait for inclusion
    Vote { id: u32 },
    /// Check whether the selected account voted for an entry
    HasVoted { id: u32 },
    /// Print the feed whenever it changes, until Ctrl-C
    Watch {
        #[arg(long, default_value = "all")]
        mode: FeedMode,
        #[arg(long, default_value_t = 5)]
        interval_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    logging::init_logging(&config.observability)?;

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let ctx = Arc::new(AppContext::from_config(config, &SubstrateConnector).await?);

    if let Some(account) = &cli.account {
        if let Err(e) = ctx.select_account(&AccountAddress::from(account.as_str())).await {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    if let Err(e) = run(cli.command, Arc::clone(&ctx)).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(command: Commands, ctx: Arc<AppContext>) -> ClientResult<()> {
    match command {
        Commands::Status => {
            let selected = ctx.selected_account();
            print_json(&json!({
                "endpoint": ctx.connection().endpoint(),
                "connection": ctx.connection_state(),
                "contract": ctx.binding().address(),
                "signer": {
                    "available": ctx.discovery_error().is_none(),
                    "error": ctx.discovery_error().map(|e| e.to_string()),
                    "selected": selected,
                },
            }));
        }
        Commands::Accounts => {
            let accounts = ctx.accounts().await?;
            print_json(&accounts);
        }
        Commands::List { offset, limit } => {
            let limit = limit.unwrap_or(ctx.config().feed.page_limit);
            print_json(&ctx.list_all(offset, limit).await?);
        }
        Commands::Top { count } => {
            let count = count.unwrap_or(ctx.config().feed.top_count);
            print_json(&ctx.list_top(count).await?);
        }
        Commands::Show { id } => match ctx.get_entry(id).await? {
            Some(entry) => print_json(&entry),
            None => print_json(&json!({ "id": id, "found": false })),
        },
        Commands::Create { title, url } => {
            let receipt = ctx.create_entry_and_wait(&title, &url).await?;
            print_json(&receipt);
        }
        Commands::Vote { id } => {
            let receipt = ctx.cast_vote_and_wait(id).await?;
            print_json(&receipt);
        }
        Commands::HasVoted { id } => {
            let voted = ctx.has_voted(id).await?;
            print_json(&json!({
                "entry_id": id,
                "account": ctx.selected_account().map(|a| a.address),
                "has_voted": voted,
                "vote": ctx.vote_availability(id).await,
            }));
        }
        Commands::Watch {
            mode,
            interval_secs,
        } => watch(ctx, mode, Duration::from_secs(interval_secs.max(1))).await?,
    }
    Ok(())
}

async fn watch(ctx: Arc<AppContext>, mode: FeedMode, interval: Duration) -> ClientResult<()> {
    ctx.set_feed_mode(mode);

    let mut stop = ctx.shutdown().subscribe();
    let mut refresh = ctx.feed().subscribe_refresh();
    let signal_ctx = Arc::clone(&ctx);
    tokio::spawn(async move { signal_ctx.shutdown().trigger_on_ctrl_c().await });

    let mut ticker = tokio::time::interval(interval);
    let mut last = None;

    loop {
        tokio::select! {
            _ = stop.recv() => break,
            _ = ticker.tick() => {}
            Ok(()) = refresh.changed() => {}
        }

        match ctx.load_feed().await {
            Ok(entries) if last.as_ref() != Some(&entries) => {
                print_json(&json!({ "mode": mode, "entries": entries }));
                last = Some(entries);
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Feed refresh failed"),
        }
    }

    tracing::info!("Watch stopped");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Error: could not render output: {}", e),
    }
}
