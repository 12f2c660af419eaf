//! TUI-less "say" command

use std::error::Error;
use std::io::{self, Write};

use tracing::info;

use crate::api::ChatBackend;
use crate::core::chat_stream::{StreamEvent, StreamIngestor};
use crate::core::conversation::DEFAULT_TITLE;

/// Send `prompt` and print the reply to stdout as it arrives. Without a
/// conversation id a new conversation is created first.
pub async fn run_say(
    backend: &dyn ChatBackend,
    conversation: Option<i64>,
    prompt: Vec<String>,
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: parley say [-c <conversation>] <prompt>");
        std::process::exit(1);
    }

    let conversation_id = match conversation {
        Some(id) => id,
        None => {
            let created = backend.create_conversation(DEFAULT_TITLE).await?;
            eprintln!("Started conversation {}", created.id);
            created.id
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let reply = stream_reply(backend, conversation_id, &prompt, &mut out).await?;
    info!(conversation_id, chars = reply.chars().count(), "reply printed");
    Ok(())
}

/// Write each delta to `out` as it arrives; returns the full reply.
pub async fn stream_reply<W: Write>(
    backend: &dyn ChatBackend,
    conversation_id: i64,
    prompt: &str,
    out: &mut W,
) -> Result<String, Box<dyn Error>> {
    let mut ingestor = StreamIngestor::open(backend, conversation_id, prompt).await?;
    let mut reply = String::new();
    loop {
        match ingestor.read().await {
            Ok(StreamEvent::Delta(delta)) => {
                out.write_all(delta.as_bytes())?;
                out.flush()?;
                reply.push_str(&delta);
            }
            Ok(StreamEvent::Done) => {
                writeln!(out)?;
                return Ok(reply);
            }
            Err(err) => {
                writeln!(out)?;
                return Err(Box::new(err));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::utils::test_utils::{create_test_conversation, FakeBackend, FakeOp};

    #[tokio::test]
    async fn prints_deltas_followed_by_newline() {
        let backend = FakeBackend::new();
        backend.add_conversation(create_test_conversation(42, Some("Greetings"), 0));
        backend.script_stream(42, &["data:Hi\n\n", "data: there\n\n", "data:[DONE]\n\n"]);
        let mut out = Vec::new();

        let reply = stream_reply(&backend, 42, "Hello", &mut out)
            .await
            .expect("reply");

        assert_eq!(reply, "Hi there");
        assert_eq!(String::from_utf8(out).unwrap(), "Hi there\n");
        assert_eq!(backend.sent_messages(), vec![(42, "Hello".to_string())]);
    }

    #[tokio::test]
    async fn open_failure_is_reported() {
        let backend = FakeBackend::new();
        backend.fail_next(
            FakeOp::Stream,
            ApiError::Status {
                status: 503,
                body: "busy".into(),
            },
        );
        let mut out = Vec::new();

        let err = stream_reply(&backend, 1, "Hello", &mut out)
            .await
            .expect_err("should fail");

        assert!(err.to_string().contains("503"));
        assert!(out.is_empty());
    }
}
