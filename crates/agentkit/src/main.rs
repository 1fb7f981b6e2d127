//! A simple program demonstrates how to use `agentkit` as a library.

#[macro_use]
extern crate tracing;

use std::env;
use std::io::Write as _;
use std::time::Duration;

use agentkit::core::{ClientConfig, ClientConfigBuilder, ModelClient};
use agentkit::gemini::{GeminiConfigBuilder, GeminiProvider};
use agentkit::{CleanupGuard, Session, SessionBuilder};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufReadExt};
use tokio::{select, signal};

const BAR_CHAR: &str = "▎";
const EXIT_WORDS: [&str; 3] = ["sair", "exit", "quit"];
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut builder = ClientConfigBuilder::new();
    if let Ok(model) = env::var("AGENTKIT_MODEL") {
        builder = builder.with_model(model);
    }
    let config = match builder.build() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };
    debug!("using {config:?}");

    if let Err(err) = agentkit::block_on(run(config), SHUTDOWN_GRACE) {
        eprintln!("failed to start the runtime: {err}");
    }
}

async fn run(config: ClientConfig) {
    let provider = GeminiProvider::new(GeminiConfigBuilder::new().build());
    let client = ModelClient::new(provider, config);
    let mut session = SessionBuilder::with_client(client)
        .with_system_prompt(include_str!("./persona.md"))
        .build();

    let mut cleanup = CleanupGuard::new();
    cleanup.on_cleanup(|| {
        println!(
            "\n{}🎙️ {}",
            BAR_CHAR.bright_cyan(),
            "That's all for today. Back to the studio!".bright_white()
        );
    });

    println!(
        "🎙️ {}\nAsk me anything, or type {} to leave.",
        "Your virtual reporter is live!".bright_white().bold(),
        EXIT_WORDS.join("/").bright_yellow()
    );

    select! {
        _ = chat(&mut session) => {}
        _ = signal::ctrl_c() => {
            debug!("interrupted");
        }
        _ = terminated() => {
            debug!("terminated");
        }
    }
}

#[cfg(unix)]
async fn terminated() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(err) => {
            error!("cannot listen for SIGTERM: {err}");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminated() {
    std::future::pending::<()>().await;
}

async fn chat(session: &mut Session) {
    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = read_line().await else {
            break;
        };
        let line = line.trim();
        if line.is_empty()
            || EXIT_WORDS.iter().any(|word| line.eq_ignore_ascii_case(word))
        {
            break;
        }

        let progress_bar = ProgressBar::new_spinner();
        progress_bar.set_style(progress_style.clone());
        progress_bar.set_message("🤔 Thinking...");
        progress_bar.enable_steady_tick(Duration::from_millis(100));
        let mut progress_bar = Some(progress_bar);

        session
            .send_message(line, |fragment| {
                // Finish the progress bar before printing anything else.
                if let Some(progress_bar) = progress_bar.take() {
                    progress_bar.finish_and_clear();
                    print!("{}🤖 ", BAR_CHAR.bright_cyan());
                }
                if fragment.is_error() {
                    print!("{}", fragment.content.bright_red());
                } else {
                    print!("{}", fragment.content.bright_white());
                }
                std::io::stdout().flush().ok();
            })
            .await;

        if let Some(progress_bar) = progress_bar.take() {
            progress_bar.finish_and_clear();
        }
        println!();
    }
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
