use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};

use docchat_chat::{Mode, Session};
use docchat_core::config::UiSettings;
use docchat_core::types::Turn;

use crate::{ensure_delete_enabled, Engine};

const HELP: &str = "\
/mode <tag>     switch mode (Query Files | Search Files | LLM Chat (no context from files))
/prompt <text>  set the system prompt (empty clears it)
/select <file>  restrict Query Files to one ingested file
/deselect       query all files again
/files          list ingested files
/delete         delete the selected file
/delete-all     delete every ingested file
/clear          forget the conversation
/quit           leave (Ctrl-C at the prompt also leaves; during an answer it stops the answer)";

/// Print only what `snapshot` adds to what is already on screen.
fn render(shown: &mut String, snapshot: &str) {
    let mut out = std::io::stdout().lock();
    match snapshot.strip_prefix(shown.as_str()) {
        Some(suffix) => { let _ = write!(out, "{}", suffix); }
        None => { let _ = write!(out, "\n{}", snapshot); }
    }
    let _ = out.flush();
    shown.clear();
    shown.push_str(snapshot);
}

async fn answer(engine: &Engine, session: &Session, history: &mut Vec<Turn>, message: &str) -> anyhow::Result<()> {
    let mut stream = engine.chat(session, message, history, session.mode()).await?;
    let mut shown = String::new();
    loop {
        tokio::select! {
            item = stream.next() => match item {
                Some(Ok(snapshot)) => render(&mut shown, &snapshot),
                Some(Err(e)) => { println!(); return Err(e.into()); }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                stream.close();
                println!("\n[interrupted]");
                break;
            }
        }
    }
    println!();
    history.push(Turn::new(message, shown));
    Ok(())
}

fn command(engine: &Engine, session: &mut Session, history: &mut Vec<Turn>, ui: &UiSettings, line: &str) -> anyhow::Result<bool> {
    let (cmd, arg) = line.split_once(' ').map(|(c, a)| (c, a.trim())).unwrap_or((line, ""));
    match cmd {
        "/quit" | "/exit" => return Ok(false),
        "/help" => println!("{}", HELP),
        "/mode" => {
            let mode: Mode = arg.parse()?;
            session.set_mode(mode);
            println!("Mode: {}", mode);
        }
        "/prompt" => session.set_system_prompt(arg),
        "/select" => {
            session.select_file(arg);
            println!("Selected for Query or Deletion: {}", session.selected_label());
        }
        "/deselect" => {
            session.deselect_file();
            println!("Selected for Query or Deletion: {}", session.selected_label());
        }
        "/files" => {
            for file in engine.list_ingested_files()? { println!("{}", file); }
        }
        "/delete" => {
            ensure_delete_enabled(ui, false)?;
            println!("Deleted {} documents", engine.delete_selected_file(session)?);
        }
        "/delete-all" => {
            ensure_delete_enabled(ui, true)?;
            println!("Deleted {} documents", engine.delete_all_files(session)?);
        }
        "/clear" => history.clear(),
        other => println!("unknown command {} (try /help)", other),
    }
    Ok(true)
}

pub async fn run(engine: &Engine, mut session: Session, ui: &UiSettings) -> anyhow::Result<()> {
    println!("Mode: {} | Scope: {} | /help for commands", session.mode(), session.selected_label());
    let mut history: Vec<Turn> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };
        let Some(line) = line else { break };
        let line = line.trim();
        if line.is_empty() { continue; }
        if line.starts_with('/') {
            match command(engine, &mut session, &mut history, ui, line) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => eprintln!("error: {}", e),
            }
            continue;
        }
        if let Err(e) = answer(engine, &session, &mut history, line).await {
            eprintln!("error: {}", e);
        }
    }
    Ok(())
}
