//! CIQ - natural-language to shell command translator
//!
//! `ciq "show disk usage"` looks the query up in the command corpus, asks the
//! generation model for its own answer, fuses the two and offers to run the
//! result.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use ciq_core::{
    CiqConfig, CiqError, ExecutionOutcome, FinalCommand, FusionPolicy, PredictionReport,
    ShellExecutor,
};
use clap::Parser;
use command_gen::{GenConfig, OllamaGenerator};
use command_index::{EmbedderKind, IndexConfig};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, Level};

const RULE: &str = "=====================================";
const MISSING_QUERY: &str = "Error: Missing query. Use --help for usage.";

#[derive(Parser)]
#[command(name = "ciq")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CIQ - Offline NL-to-Linux Command Translator", long_about = None)]
struct Cli {
    /// Natural-language description of the command you want
    #[arg(required = true, num_args = 1..)]
    query: Vec<String>,

    /// Run the suggestion without asking
    #[arg(short, long, conflicts_with = "dry_run")]
    yes: bool,

    /// Show the suggestion, never run it
    #[arg(long)]
    dry_run: bool,

    /// Print the full prediction report as JSON instead of the summary
    #[arg(long)]
    report: bool,

    /// Add a one-line explanation of the final command
    #[arg(long)]
    explain: bool,

    /// Command corpus file
    #[arg(long, env = "CIQ_CORPUS", default_value = command_index::DEFAULT_CORPUS_PATH)]
    corpus: PathBuf,

    /// Corpus embedder: "ollama" or "hash"
    #[arg(long, env = "CIQ_EMBEDDER", default_value = "ollama")]
    embedder: EmbedderKind,

    /// Ollama embedding model
    #[arg(long, env = "CIQ_EMBED_MODEL", default_value = "nomic-embed-text")]
    embed_model: String,

    /// Ollama server
    #[arg(long, env = "OLLAMA_HOST", default_value = command_gen::DEFAULT_OLLAMA_HOST)]
    ollama_host: String,

    /// Ollama generation model
    #[arg(long, env = "CIQ_GEN_MODEL", default_value = command_gen::DEFAULT_GEN_MODEL)]
    gen_model: String,

    /// Maximum generated tokens
    #[arg(long, env = "CIQ_GEN_MAX_TOKENS", default_value_t = command_gen::DEFAULT_MAX_TOKENS)]
    max_tokens: u32,

    /// Corpus matches to retrieve
    #[arg(long, env = "CIQ_TOP_K", default_value_t = ciq_core::DEFAULT_TOP_K)]
    top_k: usize,

    /// Prefix put in front of the query for the generation model
    #[arg(long, env = "CIQ_PROMPT_PREFIX", default_value = ciq_core::DEFAULT_PROMPT_PREFIX)]
    prompt_prefix: String,

    /// Word-set similarity above which the corpus command wins
    #[arg(long, env = "CIQ_SIMILARITY_THRESHOLD", default_value_t = ciq_core::DEFAULT_SIMILARITY_THRESHOLD)]
    threshold: f64,

    /// Shell used to run the command
    #[arg(long, env = "CIQ_SHELL", default_value = ciq_core::DEFAULT_SHELL)]
    shell: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn query(&self) -> String {
        self.query.join(" ")
    }

    fn ciq_config(&self) -> Result<CiqConfig> {
        Ok(CiqConfig::default()
            .with_top_k(self.top_k)?
            .with_prompt_prefix(self.prompt_prefix.clone())
            .with_shell(self.shell.clone())
            .with_fusion(FusionPolicy::new(self.threshold)?))
    }

    fn index_config(&self) -> IndexConfig {
        IndexConfig {
            corpus_path: self.corpus.clone(),
            embedder: self.embedder,
            embed_model: self.embed_model.clone(),
            ollama_host: self.ollama_host.clone(),
            ..IndexConfig::default()
        }
    }

    fn gen_config(&self) -> Result<GenConfig> {
        Ok(GenConfig::new(&self.ollama_host, &self.gen_model).with_max_tokens(self.max_tokens)?)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let query = cli.query();
    if query.trim().is_empty() {
        eprintln!("{MISSING_QUERY}");
        return Ok(ExitCode::from(2));
    }

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    ciq_core::init_tracing(cli.json, level);

    let config = cli.ciq_config().context("Invalid configuration")?;

    let index = cli
        .index_config()
        .open()
        .await
        .with_context(|| format!("Failed to load command corpus {}", cli.corpus.display()))?;
    let generator = OllamaGenerator::new(cli.gen_config()?)
        .context("Failed to create generation client")?;

    let predictor = ciq_core::CommandPredictor::new(Arc::new(index), Arc::new(generator), config);
    debug!(predictor = ?predictor, "predictor ready");

    let report = match predictor.report(&query).await {
        Ok(report) => report,
        Err(CiqError::EmptyQuery) => {
            eprintln!("{MISSING_QUERY}");
            return Ok(ExitCode::from(2));
        }
        Err(e) => return Err(e.into()),
    };

    if cli.report {
        println!("{}", report.to_json_pretty()?);
    } else {
        println!("{}", render_summary(&report, cli.explain));
    }

    let Some(final_command) = report.final_command.clone() else {
        println!("Model could not generate a command for your query.");
        return Ok(ExitCode::FAILURE);
    };

    if cli.dry_run {
        return Ok(ExitCode::SUCCESS);
    }

    if !cli.yes && !confirm().await? {
        println!("Cancelled.");
        return Ok(ExitCode::SUCCESS);
    }

    run(&predictor.config().shell, final_command).await
}

/// Ask on stdin. EOF counts as "no".
async fn confirm() -> Result<bool> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"\nRun this command? [y/n]: ").await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read answer")?;
    Ok(is_affirmative(&line))
}

async fn run(shell: &str, command: FinalCommand) -> Result<ExitCode> {
    match ShellExecutor::new(shell).execute(&command.confirm()).await {
        Ok(outcome) => {
            print!("{}", render_outcome(&outcome));
            Ok(ExitCode::from(exit_status_byte(&outcome)))
        }
        Err(CiqError::LaunchFailure { shell, reason }) => {
            eprintln!("Failed to execute command: {shell}: {reason}");
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}

/// `y` or `yes`, any case, surrounding whitespace ignored.
fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn render_summary(report: &PredictionReport, explain: bool) -> String {
    let final_text = report
        .final_command
        .as_ref()
        .map(|f| f.as_str())
        .unwrap_or("");

    let mut lines = vec![
        String::new(),
        RULE.to_string(),
        format!("Query                 : {}", report.query),
        format!(
            "Retrieval suggestion  : {}",
            report.retrieval_top().unwrap_or("")
        ),
        format!(
            "Generation suggestion : {}",
            report.generated_clean.as_deref().unwrap_or("")
        ),
        format!("Final suggestion      : {final_text}"),
    ];
    if explain && !final_text.is_empty() {
        lines.push(format!(
            "Explanation           : {}",
            ciq_core::explain(final_text)
        ));
    }
    lines.push(RULE.to_string());
    lines.join("\n")
}

fn render_outcome(outcome: &ExecutionOutcome) -> String {
    let mut out = outcome.stdout.clone();
    if let Some(stderr) = &outcome.stderr {
        end_line(&mut out);
        out.push_str("Errors:\n");
        out.push_str(stderr);
    }
    match outcome.exit_code {
        Some(0) => {}
        Some(code) => {
            end_line(&mut out);
            out.push_str(&format!("Exit status: {code}\n"));
        }
        None => {
            end_line(&mut out);
            out.push_str("Terminated by signal\n");
        }
    }
    out
}

fn end_line(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

/// The command's own exit status, clamped into a process exit byte.
fn exit_status_byte(outcome: &ExecutionOutcome) -> u8 {
    match outcome.exit_code {
        Some(code) => u8::try_from(code).unwrap_or(1),
        None => 1,
    }
}
