// Copyright 2026 The Chat Relay Project
// SPDX-License-Identifier: Apache-2.0

// relay-chat: terminal front end for a chat relay.
//
// Usage:
//   relay-chat "What is an event stream?"
//   relay-chat --no-stream "Hello"
//   relay-chat                      (interactive; /stream, /clear, /quit)

use clap::Parser;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use chat_relay::client::{ChatClient, ClientError, RenderObserver};
use chat_relay::message::{Conversation, MessageKind};

#[derive(Parser)]
#[command(name = "relay-chat", about = "Chat with a relay server from the terminal.")]
struct Cli {
    /// Base URL of the relay server.
    #[arg(long, env = "RELAY_URL", default_value = "http://127.0.0.1:3000")]
    url: String,

    /// Wait for the whole reply instead of streaming it.
    #[arg(long)]
    no_stream: bool,

    /// Send a single prompt and exit.
    prompt: Option<String>,
}

/// Prints each message once, and the in-flight reply as it grows.
#[derive(Default)]
struct TerminalRenderer {
    /// Index of the first message not yet fully printed.
    next: usize,
    /// Bytes of `messages[next]` already printed.
    printed: usize,
}

impl TerminalRenderer {
    fn reset(&mut self) {
        self.next = 0;
        self.printed = 0;
    }
}

impl RenderObserver for TerminalRenderer {
    fn on_update(&mut self, conversation: &Conversation) {
        let messages = conversation.messages();
        let mut out = std::io::stdout().lock();

        while let Some(message) = messages.get(self.next) {
            match message.kind {
                // Already on screen: the user typed it.
                MessageKind::User => {}
                MessageKind::Assistant => {
                    let fresh = message.content.get(self.printed..).unwrap_or_default();
                    let _ = write!(out, "{fresh}");
                    self.printed = message.content.len();

                    let in_flight = self.next + 1 == messages.len() && conversation.is_streaming();
                    if in_flight {
                        break;
                    }
                    let _ = writeln!(out);
                }
                MessageKind::Error => {
                    let _ = writeln!(out, "! {}", message.content);
                }
            }
            self.next += 1;
            self.printed = 0;
        }
        let _ = out.flush();
    }
}

async fn send(
    client: &ChatClient,
    conversation: &mut Conversation,
    renderer: &mut TerminalRenderer,
    prompt: &str,
    stream: bool,
) -> Result<(), ClientError> {
    if stream {
        let outcome = client.stream_chat(conversation, prompt, renderer).await?;
        tracing::debug!(?outcome, "stream finished");
    } else {
        let outcome = client.chat(conversation, prompt, renderer).await?;
        tracing::debug!(?outcome, "reply received");
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let client = ChatClient::new(cli.url.clone());
    let mut conversation = Conversation::new();
    let mut renderer = TerminalRenderer::default();
    let mut stream = !cli.no_stream;

    if let Some(prompt) = cli.prompt {
        if let Err(e) = send(&client, &mut conversation, &mut renderer, &prompt, stream).await {
            tracing::error!("{e}");
            std::process::exit(1);
        }
        return;
    }

    tracing::info!(url = %cli.url, stream, "connected; type /quit to exit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("failed to read stdin: {e}");
                break;
            }
        };

        match line.trim() {
            "/quit" => break,
            "/clear" => {
                conversation.clear();
                renderer.reset();
            }
            "/stream" => {
                stream = !stream;
                println!("streaming {}", if stream { "on" } else { "off" });
            }
            prompt => match send(&client, &mut conversation, &mut renderer, prompt, stream).await {
                Ok(()) => {}
                Err(ClientError::EmptyPrompt) => {}
                Err(e) => tracing::warn!("{e}"),
            },
        }
    }
}
