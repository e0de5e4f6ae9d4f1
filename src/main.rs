// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{ArgAction, Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use trovi::query::{RenderOptions, found_header, render_hit};
use trovi::sync::{ProgressReporter, RunReport};
use trovi::utils::confirm;
use trovi::utils::logging::{format_error, format_info, format_success, format_warning};
use trovi::{
    Config, DocumentStore, ElasticClient, HitHandler, QueryConsumer, QueryProgress, QueryRequest,
    ReconcileEngine, SearchHit, SyncMode, TerminalProgress,
};

const FIND_HELP: &str = "\
Searchable fields:
  filename, fullpath, path, size, extension, hash, isfolder, date, mode,
  attachment.content, attachment.title, attachment.author, attachment.content_type

Examples:
  trovi find 'filename:report*'
  trovi find 'extension:\\.pdf AND size:>100000' ~/documents
  trovi find 'attachment.content:invoice' --highlight --grep invoice
  trovi find 'isfolder:true AND filename:src'";

#[derive(Parser)]
#[command(name = "trovi")]
#[command(version)]
#[command(about = "Keep an Elasticsearch document index in sync with local folders", long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = true, action = ArgAction::Set, global = true)]
    color: bool,

    /// Repeat for more output (-v warn, -vv info, -vvv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Concurrent uploads during a sync pass
    #[arg(short, long, value_name = "N", global = true)]
    jobs: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synchronize the index with the configured folders
    Sync {
        /// forced, update or update-fast
        mode: SyncMode,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Search the index
    #[command(after_help = FIND_HELP)]
    Find {
        /// Query string syntax, `*` matches everything
        query: String,

        /// Only return documents under these folders
        paths: Vec<PathBuf>,

        #[arg(short, long)]
        score: bool,

        /// Mark this text in highlighted snippets (implies --highlight)
        #[arg(short, long, value_name = "TEXT")]
        grep: Option<String>,

        #[arg(long)]
        highlight: bool,
    },

    /// Delete the whole index
    DeleteIndex {
        #[arg(short, long)]
        yes: bool,
    },

    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    colored::control::set_override(cli.color);
    trovi::utils::logging::init_logger(cli.color, cli.verbose);

    if let Commands::Init { force } = cli.command {
        return cmd_init(force);
    }

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(jobs) = cli.jobs {
        trovi::Validator::validate_jobs(jobs)?;
        config.sync.jobs = jobs;
    }

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping after in-flight requests");
                cancel.cancel();
            }
        }
    });

    let client = ElasticClient::new(&config.backend, cancel.clone())
        .context("Failed to create backend client")?;
    client.ping().await.with_context(|| {
        format!("Cannot reach the search backend at {}", client.base_url())
    })?;

    match cli.command {
        Commands::Sync { mode, yes } => {
            cmd_sync(&config, client, mode, yes, cli.color, cancel).await?;
        }
        Commands::Find {
            query,
            paths,
            score,
            grep,
            highlight,
        } => {
            cmd_find(&config, &client, query, paths, score, grep, highlight, cancel).await?;
        }
        Commands::DeleteIndex { yes } => {
            cmd_delete_index(&client, yes).await?;
        }
        Commands::Init { .. } => {}
    }

    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let dir = Config::settings_dir();
    let path = dir.join(trovi::config::CONFIG_FILENAME);

    if path.exists() && !force {
        println!(
            "{}",
            format_warning(&format!(
                "{} already exists, use --force to overwrite",
                path.display()
            ))
        );
        return Ok(());
    }

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    std::fs::write(&path, Config::default_config().to_toml()?)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("{}", format_success(&format!("Wrote {}", path.display())));
    println!(
        "{}",
        format_info("Edit the index folders, then run `trovi sync forced`")
    );
    Ok(())
}

fn ask(question: &str) -> Result<bool> {
    let stdin = io::stdin();
    confirm(question, stdin.lock(), io::stdout()).context("Failed to read confirmation")
}

async fn cmd_sync(
    config: &Config,
    client: ElasticClient,
    mode: SyncMode,
    yes: bool,
    colored: bool,
    cancel: CancellationToken,
) -> Result<()> {
    config.require_folders()?;

    let question = match mode {
        SyncMode::Forced => format!(
            "Index {} will be deleted and rebuilt from {} folder(s). Continue?",
            client.index(),
            config.index.len()
        ),
        _ => format!(
            "Index {} will be updated from {} folder(s). Continue?",
            client.index(),
            config.index.len()
        ),
    };
    if !yes && !ask(&question)? {
        println!("{}", format_warning("Sync aborted"));
        return Ok(());
    }

    let progress = Arc::new(TerminalProgress::new(colored));
    let engine = ReconcileEngine::new(
        config,
        Arc::new(client),
        progress.clone() as Arc<dyn ProgressReporter>,
        cancel,
    );
    info!("Synchronizing with {} workers", engine.jobs());

    let result = engine.run(mode).await;
    progress.finish();
    let report = result.with_context(|| format!("{} sync failed", mode))?;

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &RunReport) {
    if let Some(update) = &report.update {
        println!(
            "{}",
            format_info(&format!(
                "Checked {} indexed documents: {} unchanged, {} re-uploaded, {} deleted",
                update.checked, update.unchanged, update.reuploaded, update.deleted
            ))
        );
        if !update.complete {
            println!(
                "{}",
                format_warning("Not every indexed document could be checked")
            );
        }
    }

    for pass in &report.passes {
        println!(
            "{}",
            format_info(&format!(
                "{}: {}/{} files, {} uploaded, {} added, {} failed ({:.1} files/sec)",
                pass.folder.display(),
                pass.processed,
                pass.total,
                pass.uploaded,
                pass.added,
                pass.failed,
                pass.files_per_second()
            ))
        );
    }

    let failed = report.failed();
    if failed > 0 {
        println!(
            "{}",
            format_error(&format!("{} files could not be synchronized, see the log", failed))
        );
    } else {
        println!("{}", format_success(&format!("{} sync complete", report.mode)));
    }
}

/// Collects rendered hits so the header can report the total first.
struct FindOutput {
    options: RenderOptions,
    buffer: String,
}

#[async_trait]
impl HitHandler for FindOutput {
    async fn handle(&mut self, hit: SearchHit, _progress: QueryProgress) {
        self.buffer.push_str(&render_hit(&hit, &self.options));
    }
}

#[allow(clippy::too_many_arguments)]
async fn cmd_find(
    config: &Config,
    client: &ElasticClient,
    query: String,
    paths: Vec<PathBuf>,
    score: bool,
    grep: Option<String>,
    highlight: bool,
    cancel: CancellationToken,
) -> Result<()> {
    let request = QueryRequest::new(query)
        .with_paths(paths)
        .with_highlight(highlight || grep.is_some());
    let mut output = FindOutput {
        options: RenderOptions {
            show_score: score,
            grep,
        },
        buffer: String::new(),
    };

    let store: &dyn DocumentStore = client;
    let report = QueryConsumer::new(store, config.backend.page_size, cancel)
        .run(&request, &mut output)
        .await
        .context("Search failed")?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", found_header(report.total))?;
    stdout.write_all(output.buffer.as_bytes())?;
    stdout.flush()?;

    if !report.complete {
        warn!(
            "Only {} of {} results could be fetched",
            report.delivered, report.total
        );
    }
    Ok(())
}

async fn cmd_delete_index(client: &ElasticClient, yes: bool) -> Result<()> {
    let question = format!("Index {} will be deleted. Continue?", client.index());
    if !yes && !ask(&question)? {
        println!("{}", format_warning("Delete aborted"));
        return Ok(());
    }

    client
        .delete_index()
        .await
        .with_context(|| format!("Failed to delete index {}", client.index()))?;
    println!(
        "{}",
        format_success(&format!("Index {} deleted", client.index()))
    );
    Ok(())
}
