use anyhow::Result;
use async_trait::async_trait;
use log::LevelFilter;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

use tabpad::{App, CommandProcessor, ConfigStore, Dialogs, FsHost, SaveChoice};

type SharedInput = Arc<Mutex<Lines<BufReader<Stdin>>>>;

/// Dialogs answered on the terminal, sharing stdin with the command loop.
struct TerminalDialogs {
    input: SharedInput,
}

impl TerminalDialogs {
    async fn ask(&self, prompt: &str) -> Option<String> {
        print!("{}", prompt);
        let _ = std::io::stdout().flush();
        let mut input = self.input.lock().await;
        match input.next_line().await {
            Ok(Some(line)) => Some(line.trim().to_string()),
            Ok(None) => None,
            Err(e) => {
                log::error!("Failed to read dialog answer: {}", e);
                None
            }
        }
    }

    async fn ask_path(&self, prompt: &str) -> Option<PathBuf> {
        self.ask(prompt)
            .await
            .filter(|answer| !answer.is_empty())
            .map(PathBuf::from)
    }
}

#[async_trait]
impl Dialogs for TerminalDialogs {
    async fn pick_open_path(&self) -> Option<PathBuf> {
        self.ask_path("開くファイルのパス (空欄でキャンセル): ").await
    }

    async fn pick_save_path(&self) -> Option<PathBuf> {
        self.ask_path("保存先のパス (空欄でキャンセル): ").await
    }

    async fn ask_save_changes(&self, name: &str) -> SaveChoice {
        let prompt = format!(
            "{} への変更を保存しますか? [s]保存 / [d]保存しない / [c]キャンセル: ",
            name
        );
        match self.ask(&prompt).await.as_deref() {
            Some("s") | Some("S") | Some("0") => SaveChoice::Save,
            Some("d") | Some("D") | Some("1") => SaveChoice::DontSave,
            _ => SaveChoice::Cancel,
        }
    }
}

fn print_status(app: &mut App) {
    app.update_status();
    if let Some(message) = app.take_status() {
        if message.severity.is_problem() {
            eprintln!("[{}]", message.text);
        } else {
            println!("[{}]", message.text);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut logger = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        logger.filter_level(LevelFilter::Info);
        logger.filter_module("tabpad", LevelFilter::Debug);
    }
    logger.init();

    let store = match ConfigStore::resolve() {
        Ok(store) => store,
        Err(e) => {
            eprintln!("設定ファイルの場所を特定できませんでした: {}", e);
            return Err(e);
        }
    };
    log::info!("Using config file: {}", store.path().display());

    let input: SharedInput = Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines()));
    let dialogs = TerminalDialogs {
        input: input.clone(),
    };
    let host = Arc::new(FsHost::new(store, Box::new(dialogs)));
    let mut app = App::start(host.clone()).await;

    for arg in std::env::args().skip(1) {
        let path = PathBuf::from(&arg);
        if app.open_path(&path).await.is_none() {
            log::error!("Failed to load file '{}'", arg);
        }
        print_status(&mut app);
    }

    let processor = CommandProcessor::new();
    println!("tabpad: help でコマンド一覧を表示します");

    loop {
        if app.should_quit() || host.is_closed() {
            break;
        }

        print!("{}> ", tabpad::status::window_title(app.tabs()));
        let _ = std::io::stdout().flush();

        let line = {
            let mut input = input.lock().await;
            input.next_line().await
        };

        match line {
            Ok(Some(line)) => {
                match processor.execute(&line, &mut app).await {
                    Ok(output) if !output.is_empty() => println!("{}", output),
                    Ok(_) => {}
                    Err(e) => {
                        log::debug!("Command failed: {}", e);
                        eprintln!("エラー: {}", e);
                    }
                }
                print_status(&mut app);
            }
            Ok(None) => {
                log::info!("Input closed, exiting");
                if !app.exit().await {
                    // Nobody is left to answer; keep the session for next time.
                    app.persist_session().await;
                    log::warn!("Exit was not confirmed; unsaved tabs stay in the session");
                }
                break;
            }
            Err(e) => {
                log::error!("Failed to read command: {}", e);
                eprintln!("入力の読み込みに失敗しました: {}", e);
                app.persist_session().await;
                break;
            }
        }
    }

    log::info!("Application loop ended successfully");
    Ok(())
}
