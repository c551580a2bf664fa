//! chatwire: send one prompt to a chat-completions endpoint from the command line
//!
//! Usage:
//!   chatwire [--model <id>] [--system <text>] [--no-stream] <prompt...>
//!
//! Configuration comes from the environment (`CHATWIRE_API_KEY` or
//! `OPENAI_API_KEY`, `CHATWIRE_BASE_URL`, ...). Set `RUST_LOG=chatwire=debug`
//! to see request logs on stderr.

use anyhow::{bail, Context};
use chatwire::types::{ChatRequest, Message};
use chatwire::{CancellationToken, ChatClient};
use futures::StreamExt;
use std::io::Write;
use tracing_subscriber::EnvFilter;

const DEFAULT_MODEL: &str = "gpt-4o-mini";

struct Args {
    model: String,
    system: Option<String>,
    stream: bool,
    prompt: String,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut model = std::env::var("CHATWIRE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
    let mut system = None;
    let mut stream = true;
    let mut words = Vec::new();

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--model" | "-m" => model = it.next().context("--model needs a value")?,
            "--system" | "-s" => system = Some(it.next().context("--system needs a value")?),
            "--no-stream" => stream = false,
            "help" | "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            _ => words.push(arg),
        }
    }

    if words.is_empty() {
        print_usage();
        bail!("missing prompt");
    }

    Ok(Args {
        model,
        system,
        stream,
        prompt: words.join(" "),
    })
}

fn print_usage() {
    println!(
        r#"chatwire: chat-completions from the command line

USAGE:
    chatwire [OPTIONS] <PROMPT>...

OPTIONS:
    -m, --model <id>        Model id (default: $CHATWIRE_MODEL or {DEFAULT_MODEL})
    -s, --system <text>     System prompt
        --no-stream         Wait for the full reply instead of streaming
    -h, --help              Show this help message

ENVIRONMENT:
    CHATWIRE_API_KEY        API key (falls back to OPENAI_API_KEY)
    CHATWIRE_BASE_URL       Provider base URL
    RUST_LOG                Log filter, e.g. chatwire=debug"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;

    let cancel = CancellationToken::new();
    let client = ChatClient::from_env()
        .context("failed to configure client")?
        .with_cancellation(cancel.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let mut messages = Vec::new();
    if let Some(system) = args.system {
        messages.push(Message::system(system));
    }
    messages.push(Message::user(args.prompt));
    let request = ChatRequest::new(args.model, messages);

    if !args.stream {
        let response = client.chat_completion(&request).await?;
        println!("{}", response.content().unwrap_or_default());
        return Ok(());
    }

    let mut stream = client.chat_completion_stream(&request.stream()).await?;
    let mut stdout = std::io::stdout();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if let Some(text) = chunk.content() {
            write!(stdout, "{}", text)?;
            stdout.flush()?;
        }
    }
    writeln!(stdout)?;

    if !stream.saw_done() {
        eprintln!("warning: stream closed before [DONE]");
    }
    Ok(())
}
