//! Rostrum CLI — debate judging over transcript files.
//!
//! Usage:
//!   rostrum judge <transcripts.json> --topic <motion> [--out graph.json]
//!   rostrum dedup <graph.json> [--out cleaned.json]
//!   rostrum score <graph.json>

use clap::{Parser, Subcommand};
use rostrum::{
    read_snapshot, write_snapshot, DebateJudge, Deduplicator, HttpEmbedder, HttpOracle,
    JudgeConfig, Scorecard, Scorer, Utterance,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default endpoint for the extraction oracle and embedding provider.
const DEFAULT_BASE_URL: &str = "https://open.bigmodel.cn/api/paas/v4";

#[derive(Parser)]
#[command(
    name = "rostrum",
    version,
    about = "Argument-graph construction and scoring engine for debate transcripts"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: rounds, deduplication, scoring
    Judge {
        /// Transcripts file: a JSON array of rounds, each an array of
        /// {"speaker", "text"} objects
        transcripts: PathBuf,
        /// The debate motion, included in extraction prompts
        #[arg(long)]
        topic: String,
        /// Where to write the cleaned graph snapshot
        #[arg(long, default_value = "graph.json")]
        out: PathBuf,
        /// Also write the pre-deduplication graph snapshot here
        #[arg(long)]
        construction_out: Option<PathBuf>,
        /// Opening (context-free) round numbers
        #[arg(long, value_delimiter = ',', default_values_t = [1u32, 3])]
        opening_rounds: Vec<u32>,
        /// Sliding-window size for context snapshots
        #[arg(long, default_value_t = 3)]
        window: u32,
        /// Ask the evaluation model for a judge's commentary
        #[arg(long)]
        commentary: bool,
        /// API key (falls back to ROSTRUM_API_KEY)
        #[arg(long)]
        api_key: Option<String>,
        /// Service base URL
        #[arg(long, default_value = DEFAULT_BASE_URL)]
        base_url: String,
    },
    /// Semantically deduplicate a saved graph snapshot
    Dedup {
        /// Graph snapshot to clean
        graph: PathBuf,
        /// Where to write the cleaned snapshot (default: cleaned_<input>)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Cosine-similarity threshold for duplicates
        #[arg(long, default_value_t = 0.85)]
        threshold: f32,
        /// API key (falls back to ROSTRUM_API_KEY)
        #[arg(long)]
        api_key: Option<String>,
        /// Service base URL
        #[arg(long, default_value = DEFAULT_BASE_URL)]
        base_url: String,
    },
    /// Score a saved graph snapshot
    Score {
        /// Graph snapshot to score
        graph: PathBuf,
    },
}

fn resolve_api_key(flag: Option<String>) -> Result<String, String> {
    flag.or_else(|| std::env::var("ROSTRUM_API_KEY").ok())
        .ok_or_else(|| "no API key given (use --api-key or ROSTRUM_API_KEY)".to_string())
}

fn read_transcripts(path: &Path) -> Result<Vec<Vec<Utterance>>, String> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
    serde_json::from_str(&data)
        .map_err(|e| format!("cannot parse '{}': {}", path.display(), e))
}

fn print_scorecard(scorecard: &Scorecard) {
    for (side, total) in &scorecard.totals {
        println!("{side} total: {total:.2}");
    }
    println!("Result: {}", scorecard.verdict);
    if !scorecard.unknown_speakers.is_empty() {
        for (id, speaker) in &scorecard.unknown_speakers {
            eprintln!("Warning: claim {id} by unrecognized speaker '{speaker}' excluded");
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn cmd_judge(
    transcripts: &Path,
    topic: String,
    out: &Path,
    construction_out: Option<&Path>,
    opening_rounds: Vec<u32>,
    window: u32,
    commentary: bool,
    api_key: Option<String>,
    base_url: &str,
) -> i32 {
    let rounds = match read_transcripts(transcripts) {
        Ok(rounds) => rounds,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };
    let api_key = match resolve_api_key(api_key) {
        Ok(key) => key,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    let config = JudgeConfig::for_topic(topic)
        .with_opening_rounds(opening_rounds)
        .with_window(window);
    let oracle = Arc::new(HttpOracle::new(base_url, api_key.clone(), &config));
    let embedder = Arc::new(HttpEmbedder::new(
        base_url,
        api_key,
        config.models.embedding.clone(),
        config.models.embedding_dimensions,
    ));

    let judge = DebateJudge::new(config, oracle, embedder);
    let outcome = judge.run(&rounds).await;

    if let Some(path) = construction_out {
        if let Err(e) = write_snapshot(path, &outcome.construction_graph) {
            eprintln!("Error: cannot write '{}': {}", path.display(), e);
            return 1;
        }
    }
    if let Err(e) = write_snapshot(out, &outcome.graph) {
        eprintln!("Error: cannot write '{}': {}", out.display(), e);
        return 1;
    }
    println!("Graph snapshot written to {}", out.display());

    print_scorecard(&outcome.scorecard);

    if commentary {
        println!("\n{}", judge.commentary(&outcome).await);
    }
    0
}

async fn cmd_dedup(
    graph_path: &Path,
    out: Option<PathBuf>,
    threshold: f32,
    api_key: Option<String>,
    base_url: &str,
) -> i32 {
    let mut graph = match read_snapshot(graph_path) {
        Ok(graph) => graph,
        Err(e) => {
            eprintln!("Error: cannot read '{}': {}", graph_path.display(), e);
            return 1;
        }
    };
    let api_key = match resolve_api_key(api_key) {
        Ok(key) => key,
        Err(e) => {
            eprintln!("Error: {e}");
            return 1;
        }
    };

    let config = JudgeConfig::default().with_similarity_threshold(threshold);
    let embedder = Arc::new(HttpEmbedder::new(
        base_url,
        api_key,
        config.models.embedding.clone(),
        config.models.embedding_dimensions,
    ));

    let report = match Deduplicator::new(&config, embedder).dedupe(&mut graph).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: deduplication failed: {e}");
            return 1;
        }
    };

    let out = out.unwrap_or_else(|| cleaned_path(graph_path));
    if let Err(e) = write_snapshot(&out, &graph) {
        eprintln!("Error: cannot write '{}': {}", out.display(), e);
        return 1;
    }
    println!(
        "Removed {} duplicate node(s); cleaned snapshot written to {}",
        report.removed,
        out.display()
    );
    0
}

/// `cleaned_<name>` beside the input, matching the historical convention.
fn cleaned_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "graph.json".to_string());
    input.with_file_name(format!("cleaned_{name}"))
}

fn cmd_score(graph_path: &Path) -> i32 {
    let graph = match read_snapshot(graph_path) {
        Ok(graph) => graph,
        Err(e) => {
            eprintln!("Error: cannot read '{}': {}", graph_path.display(), e);
            return 1;
        }
    };
    let scorecard = Scorer::new(&JudgeConfig::default()).score(&graph);
    print_scorecard(&scorecard);
    0
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Judge {
            transcripts,
            topic,
            out,
            construction_out,
            opening_rounds,
            window,
            commentary,
            api_key,
            base_url,
        } => {
            cmd_judge(
                &transcripts,
                topic,
                &out,
                construction_out.as_deref(),
                opening_rounds,
                window,
                commentary,
                api_key,
                &base_url,
            )
            .await
        }
        Commands::Dedup {
            graph,
            out,
            threshold,
            api_key,
            base_url,
        } => cmd_dedup(&graph, out, threshold, api_key, &base_url).await,
        Commands::Score { graph } => cmd_score(&graph),
    };
    std::process::exit(code);
}
