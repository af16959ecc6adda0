mod embed;
mod server;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use recall_core::{Rating, ScoringWeights};
use recall_store::{
    Config, DB_FILE, NewCard, SessionOptions, Store, default_data_dir, format_timestamp,
    now_millis,
};
use rmcp::{ServiceExt, transport::stdio};

use crate::embed::{EmbeddingProvider, HttpEmbedder, card_text, embed_cards, provider_from_config};

#[derive(Parser)]
#[command(name = "recall", about = "Spaced-repetition scheduler CLI and MCP server")]
struct Cli {
    /// Data directory (defaults to $RECALL_DATA_DIR, then ~/.recall)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a card
    Add {
        question: String,
        answer: String,
        #[arg(long)]
        category: Option<String>,
        /// 1 (easy) to 5 (hard)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        difficulty: Option<u8>,
    },

    /// List all cards with stage and due time
    List,

    /// Show the next session in presentation order
    Next {
        #[arg(long)]
        limit: Option<usize>,
        /// Id of the card just answered
        #[arg(long)]
        after: Option<String>,
        /// Card ids to leave out
        #[arg(long)]
        exclude: Vec<String>,
        /// Steer the session toward this text (needs an embedding provider)
        #[arg(long)]
        keyword: Option<String>,
        /// Weight preset: review or keyword
        #[arg(long)]
        weights: Option<String>,
    },

    /// Record a rating for a card
    Review {
        id: String,
        /// again, hard or good
        rating: Rating,
    },

    /// Show deck statistics
    Stats,

    /// Delete a card and its history
    Delete { id: String },

    /// Compute embeddings for cards that lack them
    Embed {
        /// Recompute every card, not just missing ones
        #[arg(long)]
        all: bool,
    },

    /// Start MCP server on stdio transport
    Serve,
}

fn data_dir(cli: &Cli) -> PathBuf {
    cli.data_dir
        .clone()
        .or_else(|| std::env::var("RECALL_DATA_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(default_data_dir)
}

fn open(cli: &Cli) -> Result<(Store, Config)> {
    let dir = data_dir(cli);
    let config = Config::load_from_dir(&dir).context("failed to load config")?;
    let store = Store::open(&dir.join(DB_FILE))
        .with_context(|| format!("failed to open store in {}", dir.display()))?;
    Ok((store, config))
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Add {
            question,
            answer,
            category,
            difficulty,
        } => cmd_add(&cli, question, answer, category.clone(), *difficulty).await,
        Commands::List => cmd_list(&cli),
        Commands::Next {
            limit,
            after,
            exclude,
            keyword,
            weights,
        } => {
            let opts = NextArgs {
                limit: *limit,
                after: after.clone(),
                exclude: exclude.clone(),
                keyword: keyword.as_deref(),
                weights: weights.as_deref(),
            };
            cmd_next(&cli, opts).await
        }
        Commands::Review { id, rating } => cmd_review(&cli, id, *rating),
        Commands::Stats => cmd_stats(&cli),
        Commands::Delete { id } => cmd_delete(&cli, id),
        Commands::Embed { all } => cmd_embed(&cli, *all).await,
        Commands::Serve => cmd_serve(&cli).await,
    }
}

async fn cmd_add(
    cli: &Cli,
    question: &str,
    answer: &str,
    category: Option<String>,
    difficulty: Option<u8>,
) -> Result<()> {
    let (store, config) = open(cli)?;

    let embedding = match provider_from_config(config.embedding.as_ref())? {
        Some(provider) => provider.embed(&card_text(question, answer)).await,
        None => None,
    };

    let card = store
        .add_card(
            &NewCard {
                question: question.to_string(),
                answer: answer.to_string(),
                category,
                difficulty,
                embedding,
            },
            now_millis(),
        )
        .context("failed to add card")?;

    println!("added {}", card.id);
    Ok(())
}

fn cmd_list(cli: &Cli) -> Result<()> {
    let (store, config) = open(cli)?;
    let rows = store.list_rows().context("failed to list cards")?;
    if rows.is_empty() {
        println!("(no cards)");
        return Ok(());
    }

    let now = now_millis();
    for row in &rows {
        let state = row.effective_state(now);
        println!(
            "{}  stage {}  due {}  {}",
            row.card.id,
            state.stage,
            format_timestamp(state.next_review_at, config.utc_offset_hours),
            row.card.question
        );
    }
    Ok(())
}

struct NextArgs<'a> {
    limit: Option<usize>,
    after: Option<String>,
    exclude: Vec<String>,
    keyword: Option<&'a str>,
    weights: Option<&'a str>,
}

fn preset_weights(name: &str) -> Result<ScoringWeights> {
    match ScoringWeights::preset(name) {
        Some(w) => Ok(w),
        None => bail!("unknown weights preset '{name}' (expected 'review' or 'keyword')"),
    }
}

async fn keyword_embedding(
    provider: Option<&HttpEmbedder>,
    keyword: Option<&str>,
) -> Option<Vec<f64>> {
    let keyword = keyword?;
    match provider {
        Some(p) => p.embed(keyword).await,
        None => {
            tracing::warn!("keyword ignored: no embedding provider configured");
            None
        }
    }
}

async fn cmd_next(cli: &Cli, args: NextArgs<'_>) -> Result<()> {
    let (store, config) = open(cli)?;
    let provider = provider_from_config(config.embedding.as_ref())?;

    let opts = SessionOptions {
        limit: args.limit,
        after: args.after,
        exclude: args.exclude,
        weights: args.weights.map(preset_weights).transpose()?,
        keyword_embedding: keyword_embedding(provider.as_ref(), args.keyword).await,
    };

    let session = store
        .next_session(&config, &opts, now_millis())
        .context("failed to assemble session")?;

    if session.is_empty() {
        println!("(nothing due)");
        return Ok(());
    }
    for (i, sc) in session.iter().enumerate() {
        println!(
            "{:>3}. {}  [stage {}, score {:.3}]  {}",
            i + 1,
            sc.card.id,
            sc.state.stage,
            sc.score,
            sc.card.question
        );
    }
    Ok(())
}

fn cmd_review(cli: &Cli, id: &str, rating: Rating) -> Result<()> {
    let (store, config) = open(cli)?;
    let state = store
        .record_review(id, rating, now_millis())
        .with_context(|| format!("failed to review {id}"))?;

    println!(
        "{id}: {rating} -> stage {}, ease {:.2}, next review {}",
        state.stage,
        state.ease,
        format_timestamp(state.next_review_at, config.utc_offset_hours)
    );
    Ok(())
}

fn cmd_stats(cli: &Cli) -> Result<()> {
    let (store, config) = open(cli)?;
    let report = store
        .stats_report(&config, now_millis())
        .context("failed to compute stats")?;
    let deck = &report.deck;

    println!("total:      {}", deck.total);
    println!("new:        {}", deck.new);
    println!("due:        {}", deck.due);
    println!("learning:   {}", deck.learning);
    println!("mastered:   {}", deck.mastered);
    println!(
        "by stage:   {}",
        deck.by_stage
            .iter()
            .map(usize::to_string)
            .collect::<Vec<_>>()
            .join(" / ")
    );
    println!("today:      {}", report.reviewed_today);
    Ok(())
}

fn cmd_delete(cli: &Cli, id: &str) -> Result<()> {
    let (store, _) = open(cli)?;
    if !store.delete_card(id).context("failed to delete card")? {
        bail!("no card with id {id}");
    }
    println!("deleted {id}");
    Ok(())
}

async fn cmd_embed(cli: &Cli, all: bool) -> Result<()> {
    let (store, config) = open(cli)?;
    let Some(provider) = provider_from_config(config.embedding.as_ref())? else {
        bail!("no [embedding] section in config.toml");
    };

    let cards = if all {
        store
            .list_rows()
            .context("failed to list cards")?
            .into_iter()
            .map(|r| r.card)
            .collect()
    } else {
        store
            .cards_missing_embedding()
            .context("failed to list cards")?
    };

    let (embedded, attempted) = embed_cards(&store, &provider, &cards).await?;
    println!("embedded {embedded}/{attempted} cards");
    Ok(())
}

async fn cmd_serve(cli: &Cli) -> Result<()> {
    let (store, config) = open(cli)?;
    tracing::info!("starting MCP server in {}", data_dir(cli).display());

    let embedder = provider_from_config(config.embedding.as_ref())?;
    let server = server::RecallServer::new(store, config, embedder);
    let service = server
        .serve(stdio())
        .await
        .context("failed to start MCP server")?;
    service.waiting().await?;
    Ok(())
}
