use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use walkdir::WalkDir;

use docchat_chat::{ChatEngine, Mode, Session};
use docchat_core::config::{expand_path, Config, Settings, UiSettings};
use docchat_core::error::Error;
use docchat_core::data_processor::ChunkingConfig;
use docchat_llm::{build_llm_client, ContextChatService, LlmClient};
use docchat_text::TantivyStore;

mod logging;
mod repl;

pub type Engine = ChatEngine<Arc<TantivyStore>, ContextChatService<Arc<TantivyStore>, Box<dyn LlmClient>>, Arc<TantivyStore>>;

#[derive(Parser)]
#[command(name = "docchat", version, about = "Chat with your documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest files (directories are walked); same-named documents are replaced
    Ingest { paths: Vec<PathBuf> },
    /// List ingested file names
    List,
    /// Delete one ingested file (every page) or everything
    Delete {
        file: Option<String>,
        #[arg(long, conflicts_with = "file")]
        all: bool,
    },
    /// Show the passages most relevant to a query
    Search { query: String },
    /// Interactive chat
    Chat {
        /// "Query Files", "Search Files" or "LLM Chat (no context from files)"
        #[arg(long)]
        mode: Option<String>,
    },
}

fn build_engine(settings: &Settings) -> anyhow::Result<Engine> {
    let index_dir = expand_path(&settings.data.index_dir);
    let store = Arc::new(
        TantivyStore::open(&index_dir, ChunkingConfig::from(&settings.chunking))
            .with_context(|| format!("opening index at {}", index_dir.display()))?,
    );
    let llm = build_llm_client(settings)?;
    tracing::info!(index = %index_dir.display(), llm = %settings.llm_label(), "engine ready");
    let generator = ContextChatService::new(Arc::clone(&store), llm, settings.rag.clone());
    Ok(ChatEngine::new(Arc::clone(&store), generator, store).with_pacing(Duration::from_millis(settings.ui.stream_pacing_ms)))
}

/// Refuse deletions switched off in the `ui` settings.
fn ensure_delete_enabled(ui: &UiSettings, all: bool) -> anyhow::Result<()> {
    if all && !ui.delete_all_files_button_enabled {
        bail!("deleting all files is disabled (ui.delete_all_files_button_enabled)");
    }
    if !all && !ui.delete_file_button_enabled {
        bail!("deleting files is disabled (ui.delete_file_button_enabled)");
    }
    Ok(())
}

/// Delete every page ingested under `file`.
fn delete_file(engine: &Engine, session: &mut Session, ui: &UiSettings, file: &str) -> anyhow::Result<usize> {
    ensure_delete_enabled(ui, false)?;
    session.select_file(file);
    let removed = engine.delete_selected_file(session)?;
    if removed == 0 {
        return Err(Error::NotFound(format!("{} is not ingested", file)).into());
    }
    Ok(removed)
}

fn collect_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for root in paths {
        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();
    files
}

fn ingest(engine: &Engine, paths: &[PathBuf]) -> anyhow::Result<()> {
    let files = collect_files(paths);
    if files.is_empty() { bail!("no files found under the given paths"); }
    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")?);
    let mut units = 0;
    for file in &files {
        pb.set_message(file.display().to_string());
        units += engine.upload(std::slice::from_ref(file))?;
        pb.inc(1);
    }
    pb.finish_with_message(format!("✅ Ingest complete ({} files, {} pages)", files.len(), units));
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    let engine = build_engine(&settings)?;
    let mut session = Session::new(settings.ui.clone());

    match cli.command {
        Command::Ingest { paths } => ingest(&engine, &paths)?,
        Command::List => {
            for file in engine.list_ingested_files()? { println!("{}", file); }
        }
        Command::Delete { file: Some(file), .. } => {
            let removed = delete_file(&engine, &mut session, &settings.ui, &file)?;
            println!("Deleted {} ({} pages)", file, removed);
        }
        Command::Delete { file: None, all: true } => {
            ensure_delete_enabled(&settings.ui, true)?;
            let removed = engine.delete_all_files(&mut session)?;
            println!("Deleted {} documents", removed);
        }
        Command::Delete { file: None, all: false } => bail!("give a file name or --all"),
        Command::Search { query } => {
            let stream = engine.chat(&session, &query, &[], Mode::SearchFiles).await?;
            println!("{}", stream.final_text().await?);
        }
        Command::Chat { mode } => {
            if let Some(tag) = mode {
                let mode: Mode = tag.parse()?;
                session.set_mode(mode);
            }
            println!("{}", settings.llm_label());
            repl::run(&engine, session, &settings.ui).await?;
        }
    }
    Ok(())
}
