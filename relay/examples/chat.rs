//! Terminal chat against an assistant service.
//!
//! Reads one message per line from stdin and prints the reply as it streams.
//! Type `/clear` to start a new conversation.
//!
//! Run with:
//!
//! ```sh
//! RELAY_BASE_URL=http://localhost:3000 RELAY_ASSISTANT_ID=asst_... \
//!     RUST_LOG=relay_session=debug cargo run --example chat -p relay
//! ```

use std::io::Write;
use std::sync::Arc;

use relay::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = SessionConfig::from_env()?;
    let client = AssistantClient::from_env()?;
    let session = ChatSession::spawn(Arc::new(client), config);

    for message in session.snapshot().messages() {
        println!("assistant> {}", message.text_value());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim() == "/clear" {
            session.clear().await?;
            println!("(new conversation)");
            continue;
        }

        match session.submit(line).await {
            Ok(()) => {}
            Err(SessionError::EmptyMessage) => continue,
            Err(e) => return Err(e.into()),
        }

        print!("assistant> ");
        std::io::stdout().flush()?;
        let shown = stream_reply(&session).await;
        let done = session.snapshot();
        match done.status {
            TurnStatus::Failed => {
                println!();
                if let Some(failure) = &done.last_error {
                    eprintln!("error: {failure}");
                }
            }
            _ if shown == 0 => {
                let reply = done
                    .messages()
                    .last()
                    .filter(|m| m.role == Role::Assistant)
                    .map(Message::text_value)
                    .unwrap_or_default();
                println!("{reply}");
            }
            _ => println!(),
        }
        session.reset().await?;
    }
    Ok(())
}

/// Print partial text as it grows; returns how many bytes were printed.
async fn stream_reply(session: &ChatSession) -> usize {
    let mut rx = session.subscribe();
    let mut shown = 0;
    loop {
        let (partial, active) = {
            let snapshot = rx.borrow_and_update();
            (snapshot.partial_text.clone(), snapshot.turn_active)
        };
        if partial.len() > shown {
            print!("{}", &partial[shown..]);
            let _ = std::io::stdout().flush();
            shown = partial.len();
        }
        if !active || rx.changed().await.is_err() {
            return shown;
        }
    }
}
