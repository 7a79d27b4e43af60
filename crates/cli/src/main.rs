use anyhow::Context;
use clap::{Parser, Subcommand};
use setlens_core::gateway::AnalysisGateway;
use setlens_core::market::mock::MockStockDataSource;
use setlens_core::market::StockDataSource;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "setlens", about = "SET stock dashboard tools")]
struct Args {
    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the available stocks.
    List {
        /// Only stocks whose symbol or name contains this text, ignoring case.
        #[arg(long, short)]
        query: Option<String>,
    },

    /// Print the simulated price history of a stock.
    History {
        symbol: String,

        /// Seed the random walk for a reproducible series.
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Ask the AI analyst for a BUY/SELL/HOLD opinion on a stock.
    Analyze { symbol: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = setlens_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    if let Err(err) = run(&args, &settings).await {
        sentry_anyhow::capture_anyhow(&err);
        return Err(err);
    }
    Ok(())
}

async fn run(args: &Args, settings: &setlens_core::config::Settings) -> anyhow::Result<()> {
    let source = MockStockDataSource::from_settings(settings);

    let output = match &args.command {
        Command::List { query } => {
            let stocks = source
                .search_stocks(query.as_deref().unwrap_or_default())
                .await?;
            serde_json::to_value(stocks)?
        }
        Command::History { symbol, seed } => {
            let stock = source
                .find_stock(symbol)
                .await?
                .with_context(|| format!("unknown symbol: {symbol}"))?;
            let source = match seed {
                Some(seed) => source.with_seed(*seed),
                None => source,
            };
            serde_json::to_value(source.get_history(&stock.symbol).await?)?
        }
        Command::Analyze { symbol } => {
            let stock = source
                .find_stock(symbol)
                .await?
                .with_context(|| format!("unknown symbol: {symbol}"))?;
            let gateway = AnalysisGateway::from_settings(settings)?;
            let analysis = gateway.analyze(&stock).await;
            if let Some(reason) = analysis.failure_reason() {
                tracing::warn!(symbol = %stock.symbol, %reason, "showing fallback analysis");
            }
            serde_json::to_value(analysis)?
        }
    };

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{rendered}");
    Ok(())
}

fn init_sentry(settings: &setlens_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
