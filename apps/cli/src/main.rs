//! `folio`: terminal chat client for the folio API.
//!
//! Streams the greeting, then reads one question per line. Ctrl-C cancels the
//! answer being streamed; `/quit` or end of input exits.

mod message;
mod session;
mod transport;

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::session::{ChatSession, ModelChoice, SendOutcome, SessionEvent};
use crate::transport::HttpTransport;

#[derive(Parser, Debug)]
#[command(name = "folio", version, about = "Chat with a folio portfolio API")]
struct Args {
    /// Base URL of the folio API
    #[arg(long, env = "FOLIO_API_URL", default_value = "http://localhost:8080")]
    url: String,

    /// Model provider: openai, anthropic or google (server default when omitted)
    #[arg(long, requires = "model")]
    provider: Option<String>,

    /// Model name for the chosen provider
    #[arg(long, requires = "provider")]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so they never interleave with the streamed answer.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}=warn", env!("CARGO_PKG_NAME").replace('-', "_")))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let transport = HttpTransport::new(&args.url)?;
    let (tx, rx) = mpsc::unbounded_channel();
    let session = ChatSession::new(
        Arc::new(transport),
        ModelChoice {
            provider: args.provider,
            model: args.model,
        },
    )
    .with_events(tx);
    tokio::spawn(render(rx));

    run_turn(&session, session.load_greeting()).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line == "/quit" {
            break;
        }
        if line.is_empty() {
            continue;
        }

        run_turn(&session, session.send(line)).await;
    }

    Ok(())
}

/// Awaits one turn, cancelling it on Ctrl-C.
async fn run_turn(session: &ChatSession, turn: impl std::future::Future<Output = SendOutcome>) {
    tokio::pin!(turn);
    let outcome = tokio::select! {
        outcome = &mut turn => outcome,
        _ = tokio::signal::ctrl_c() => {
            session.cancel();
            turn.await
        }
    };

    match outcome {
        SendOutcome::Cancelled => println!("\n[cancelled]"),
        SendOutcome::Ignored => {}
        SendOutcome::Completed | SendOutcome::Errored => println!(),
    }
}

async fn render(mut events: mpsc::UnboundedReceiver<SessionEvent>) {
    let mut stdout = std::io::stdout();
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Component(tag) => print!("[{tag}] "),
            SessionEvent::Text(text) => print!("{text}"),
            SessionEvent::Notice(text) => print!("{text}"),
        }
        let _ = stdout.flush();
    }
}
