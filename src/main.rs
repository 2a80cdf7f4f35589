use std::io::Write;

use color_eyre::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use navik::cli::{parse_args, CliCommand, ReplOptions};
use navik::config::ClientConfig;
use navik::session::ChatSession;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const USAGE: &str = "\
Usage: navik [OPTIONS]

Interactive client for the Navik care-resource navigator assistant.

Options:
  --base-url <url>   Backend base URL (default: NAVIK_BASE_URL or http://localhost:8000)
  --no-stream        Use the single-shot endpoint instead of streaming
  -V, --version      Print version
  -h, --help         Print this help

Commands inside the REPL:
  Ctrl+C             Cancel the answer currently streaming
  :cancel            Cancel the in-flight answer
  :clear             Cancel and empty the transcript
  :export            Print the transcript as markdown
  :quit              Exit
";

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("NAVIK_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match parse_args(std::env::args()) {
        CliCommand::Version => {
            println!("navik {}", VERSION);
            Ok(())
        }
        CliCommand::Help => {
            print!("{}", USAGE);
            Ok(())
        }
        CliCommand::Repl(options) => run_repl(options).await,
    }
}

async fn run_repl(options: ReplOptions) -> Result<()> {
    let mut config = ClientConfig::from_env();
    if let Some(base_url) = options.base_url {
        config = config.with_base_url(base_url);
    }
    if options.no_stream {
        config = config.with_streaming(false);
    }

    let mut session = ChatSession::new(config);
    let mut revisions = session.subscribe().await;

    println!(
        "navik {} - ask about providers and regional centers (:quit to exit)",
        VERSION
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "" => continue,
            ":quit" | ":q" => break,
            ":cancel" => {
                session.cancel().await;
                continue;
            }
            ":clear" => {
                session.clear().await;
                continue;
            }
            ":export" => {
                print!("{}", session.export_markdown().await);
                continue;
            }
            query => {
                let Some(message_id) = session.ask(query, None).await else {
                    continue;
                };
                print_answer(&mut session, &mut revisions, message_id).await?;
            }
        }
    }

    session.cancel().await;
    Ok(())
}

fn prompt() -> Result<()> {
    print!("> ");
    std::io::stdout().flush()?;
    Ok(())
}

/// Print the answer as it streams in by following transcript revisions.
/// Ctrl+C cancels the in-flight request without leaving the REPL.
async fn print_answer(
    session: &mut ChatSession,
    revisions: &mut tokio::sync::watch::Receiver<u64>,
    message_id: uuid::Uuid,
) -> Result<()> {
    let mut printed = 0usize;
    loop {
        tokio::select! {
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                session.cancel().await;
                println!("\n[cancelled]");
                break;
            }
        }

        let messages = session.messages().await;
        let Some(message) = messages.into_iter().find(|m| m.id == message_id) else {
            break;
        };

        if message.content.len() >= printed && message.content.is_char_boundary(printed) {
            let delta = &message.content[printed..];
            if !delta.is_empty() {
                print!("{}", delta);
                std::io::stdout().flush()?;
                printed = message.content.len();
            }
        } else {
            // content was rewritten wholesale (terminal error text)
            print!("\n{}", message.content);
            printed = message.content.len();
        }

        if !message.is_streaming && !message.is_loading {
            if !message.referenced_entities.is_empty() {
                print!("\nSources: {}", message.referenced_entities.join(", "));
            }
            if let Some(region) = &message.matched_region {
                print!("\nRegional center: {}", region);
            }
            println!();
            break;
        }
    }
    Ok(())
}
