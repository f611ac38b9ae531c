//! src/main.rs
//! Line-oriented driver: reads commands from stdin, prints listings and
//! notifications, and remembers the last directory between runs.

use std::panic::PanicHookInfo;

use anyhow::{Context, Result};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout},
    signal,
    sync::mpsc,
};
use tracing::{debug, error, info, warn};

use pocketfm_core::{
    Logger,
    config::Config,
    controller::{
        actions::Action,
        event_loop::{EventLoop, Reply, TaskResult},
    },
    model::{session::Session, snapshot::SessionSnapshot},
    view::listing::render_reply,
};

const PROMPT: &[u8] = b"pfm> ";

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let config = Config::load()
        .await
        .context("Failed to load configuration")?;

    let _guard = Logger::init_tracing(&config.logging).context("Failed to initialise logging")?;
    setup_panic_handler();

    info!(home = %config.home_dir().display(), "pocketfm starting");

    let snapshot_path = SessionSnapshot::default_path().context("No data directory")?;
    let snapshot = match SessionSnapshot::load_from(&snapshot_path).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("Ignoring unreadable session snapshot: {}", e);
            SessionSnapshot::default()
        }
    };

    let (task_tx, task_rx) = mpsc::unbounded_channel::<TaskResult>();
    let mut session = Session::new(config, task_tx);
    session.restore(&snapshot).await;

    let mut event_loop = EventLoop::new(session, task_rx);
    let mut stdout = tokio::io::stdout();

    let initial = event_loop.handle_action(Action::List);
    print_replies(&mut stdout, &initial).await?;

    run(&mut event_loop, &mut stdout).await?;

    let snapshot = event_loop.session().snapshot();
    snapshot
        .save_to(&snapshot_path)
        .await
        .context("Failed to save session location")?;

    info!("pocketfm exited cleanly after {} events", event_loop.event_count());
    Ok(())
}

async fn run(event_loop: &mut EventLoop, stdout: &mut Stdout) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout.write_all(PROMPT).await?;
    stdout.flush().await?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    debug!("stdin closed");
                    break;
                };

                if line.trim().is_empty() {
                    stdout.write_all(PROMPT).await?;
                    stdout.flush().await?;
                    continue;
                }

                let replies = match line.parse::<Action>() {
                    Ok(action) => event_loop.handle_action(action),
                    Err(e) => vec![Reply::Text(e.to_string())],
                };

                if print_replies(stdout, &replies).await? {
                    break;
                }
                stdout.write_all(PROMPT).await?;
                stdout.flush().await?;
            }

            Some(result) = event_loop.next_task_result() => {
                let replies = event_loop.handle_task_result(result);
                if !replies.is_empty() {
                    stdout.write_all(b"\n").await?;
                    print_replies(stdout, &replies).await?;
                    stdout.write_all(PROMPT).await?;
                    stdout.flush().await?;
                }
            }

            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C");
                break;
            }
        }
    }

    event_loop.session_mut().stop_thumbnails();
    Ok(())
}

/// Prints replies; returns `true` when one of them asks to quit.
async fn print_replies(stdout: &mut Stdout, replies: &[Reply]) -> Result<bool> {
    let mut quit = false;

    for reply in replies {
        match render_reply(reply) {
            Some(text) => {
                stdout.write_all(text.as_bytes()).await?;
                if !text.ends_with('\n') {
                    stdout.write_all(b"\n").await?;
                }
            }
            None => quit = true,
        }
    }

    stdout.flush().await?;
    Ok(quit)
}

fn setup_panic_handler() {
    let original_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info: &PanicHookInfo<'_>| {
        error!("Application panicked: {}", panic_info);
        original_hook(panic_info);
    }));
}
