//! A terminal client that streams answers from the chat service.

#[macro_use]
extern crate tracing;

mod render;

use std::env;
use std::io::Write as _;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use ragchat_core::{Role, SessionBuilder, SessionSnapshot};
use ragchat_http::{HttpConfigBuilder, HttpTransport};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::select;
use tokio::signal;
use tokio::time::sleep;

use crate::render::Printer;

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let Ok(base_url) = env::var("RAGCHAT_BASE_URL") else {
        eprintln!("RAGCHAT_BASE_URL environment variable is not set");
        return;
    };
    let mut config_builder = HttpConfigBuilder::with_base_url(base_url)
        .with_connect_timeout(Duration::from_secs(10));
    if let Ok(path) = env::var("RAGCHAT_QUERY_PATH") {
        config_builder = config_builder.with_query_path(path);
    }
    let config = config_builder.build();
    info!("using endpoint {}", config.endpoint());

    let transport = match HttpTransport::new(config) {
        Ok(transport) => transport,
        Err(err) => {
            eprintln!("failed to set up the HTTP client: {err}");
            return;
        }
    };
    let session = SessionBuilder::with_transport(transport).build();
    let mut snapshot_rx = session.subscribe();

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let mut lines = BufReader::new(io::stdin()).lines();
    let mut printer = Printer::default();

    'outer: loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let line = select! {
            line = lines.next_line() => line,
            _ = signal::ctrl_c() => break,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                error!("error reading input: {err}");
                break;
            }
        };

        match line.trim() {
            "" => continue,
            "/quit" => break,
            "/reset" => {
                session.reset();
                println!("{}", "Conversation cleared.".dimmed());
                continue;
            }
            query => session.submit(query),
        }

        // The turn has settled once it is no longer loading and its user
        // message is in place.
        let message_count = snapshot_rx.borrow_and_update().messages.len();
        let settled = |s: &SessionSnapshot| {
            !s.loading && s.messages.len() > message_count
        };

        let mut progress_bar = Some({
            let progress_bar = ProgressBar::new_spinner();
            progress_bar.set_style(progress_style.clone());
            progress_bar.set_message("🔎 Searching...");
            progress_bar
        });
        let mut started = false;

        loop {
            select! {
                changed = snapshot_rx.changed() => {
                    if changed.is_err() {
                        break 'outer;
                    }
                }
                _ = signal::ctrl_c() => {
                    session.cancel();
                    continue;
                }
                _ = sleep(Duration::from_millis(100)) => {
                    if let Some(progress_bar) = &progress_bar {
                        progress_bar.inc(1);
                    }
                    continue;
                }
            }

            let snapshot = snapshot_rx.borrow_and_update().clone();
            let text = printer.diff(&snapshot);
            if !text.is_empty() {
                // Finish the spinner before printing anything else.
                if let Some(progress_bar) = progress_bar.take() {
                    progress_bar.finish_and_clear();
                }
                if !started {
                    print!("{}🤖 ", BAR_CHAR.bright_cyan());
                    started = true;
                }
                print!("{}", text.bright_white());
                std::io::stdout().flush().ok();
            }

            if settled(&snapshot) {
                if let Some(progress_bar) = progress_bar.take() {
                    progress_bar.finish_and_clear();
                }
                if started {
                    println!();
                }
                if let Some(err) = &snapshot.error {
                    println!("{}{}", BAR_CHAR.bright_red(), err.red());
                } else if snapshot
                    .messages
                    .last()
                    .is_some_and(|m| m.role() == Role::User)
                {
                    println!("{}", "Cancelled.".dimmed());
                }
                println!();
                break;
            }
        }
    }
}
