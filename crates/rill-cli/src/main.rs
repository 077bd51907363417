//! rill - terminal chat front-end
//!
//! Drives the Stream Client against a running relay and prints response
//! increments as they arrive.

mod config;

use clap::Parser;
use rill_ai::{ChatModel, ChatRequest};
use rill_client::{ChatClient, ClientEvent, DEFAULT_ENDPOINT};
use std::io::{self, IsTerminal, Write};
use tokio::sync::broadcast;

/// rill - streaming chat in the terminal
#[derive(Parser, Debug)]
#[command(name = "rill")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Relay endpoint (default: config file, then http://127.0.0.1:3000)
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Model to request; the relay substitutes its default if unknown
    #[arg(short, long)]
    model: Option<String>,

    /// Developer message overriding the built-in default
    #[arg(short, long)]
    developer: Option<String>,

    /// Run in non-interactive mode with a single prompt
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    if args.init_config {
        let path = config::Config::init()?;
        println!("Config file: {}", path.display());
        return Ok(());
    }

    let cfg = config::Config::load();
    let endpoint = args
        .endpoint
        .or(cfg.endpoint)
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
    let mut model = args.model.or(cfg.model).unwrap_or_default();
    let developer = args.developer.or(cfg.developer_message).unwrap_or_default();

    let client = ChatClient::new(endpoint);

    if let Some(prompt) = args.command {
        return run_once(&client, &prompt, &model, &developer).await;
    }

    run_interactive(&client, &mut model, &developer).await
}

/// Submit a single prompt, print the streamed response, and exit.
async fn run_once(
    client: &ChatClient,
    prompt: &str,
    model: &str,
    developer: &str,
) -> anyhow::Result<()> {
    let printer = spawn_printer(client.subscribe());
    let result = client.submit(build_request(prompt, model, developer)).await;

    match result {
        Ok(()) => {
            printer.await.ok();
            Ok(())
        }
        Err(e) => {
            printer.abort();
            anyhow::bail!("{}", e)
        }
    }
}

async fn run_interactive(
    client: &ChatClient,
    model: &mut String,
    developer: &str,
) -> anyhow::Result<()> {
    // Show minimal startup info (only if TTY)
    if io::stderr().is_terminal() {
        eprintln!("rill ({})", client.endpoint());
        eprintln!("Type /help for commands.");
        eprintln!();
    }

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(command) = input.strip_prefix('/') {
            match execute_command(command, client, model) {
                CommandResult::Continue => {
                    println!();
                    continue;
                }
                CommandResult::Exit => break,
            }
        }

        println!();

        let printer = spawn_printer(client.subscribe());
        match client.submit(build_request(input, model, developer)).await {
            Ok(()) => {
                printer.await.ok();
            }
            Err(e) => {
                printer.abort();
                println!("error: {}", e);
            }
        }
        println!();
    }

    Ok(())
}

fn build_request(prompt: &str, model: &str, developer: &str) -> ChatRequest {
    ChatRequest {
        developer_message: developer.to_string(),
        user_message: prompt.to_string(),
        model: model.to_string(),
    }
}

/// Print increments as they arrive, until the submission ends.
fn spawn_printer(mut receiver: broadcast::Receiver<ClientEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Ok(event) = receiver.recv().await {
            match event {
                ClientEvent::Increment { delta } => {
                    print!("{}", delta);
                    io::stdout().flush().ok();
                }
                ClientEvent::StreamEnd { .. } => {
                    println!();
                    break;
                }
                // The REPL prints the error itself.
                ClientEvent::StreamError { .. } => break,
                _ => {}
            }
        }
    })
}

enum CommandResult {
    Continue,
    Exit,
}

fn execute_command(command: &str, client: &ChatClient, model: &mut String) -> CommandResult {
    let mut parts = command.split_whitespace();
    match parts.next().unwrap_or("") {
        "clear" => {
            client.clear();
            println!("Cleared conversation.");
        }
        "model" => match parts.next() {
            Some(id) => {
                *model = id.to_string();
                println!("Model set to: {}", id);
            }
            None => {
                println!("Available models:");
                for m in ChatModel::all() {
                    let marker = if m.id() == model { "*" } else { " " };
                    println!("  {} {}", marker, m.id());
                }
            }
        },
        "help" => {
            println!("Commands:");
            println!("  /clear        Clear the conversation");
            println!("  /model [id]   Show or set the model");
            println!("  /quit         Exit");
        }
        "quit" | "exit" => return CommandResult::Exit,
        other => {
            println!("Unknown command: /{}", other);
            println!("Type /help for available commands.");
        }
    }
    CommandResult::Continue
}
