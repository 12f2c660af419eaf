use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use memchr::memchr;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{ApiError, ByteStream, ChatBackend};

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Splits a byte stream into complete lines, independent of chunk boundaries.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Next complete line without its terminator. Lines that are not valid
    /// UTF-8 are dropped.
    pub fn next_line(&mut self) -> Option<String> {
        while let Some(newline_pos) = memchr(b'\n', &self.buffer) {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            match decode_line(&line[..newline_pos]) {
                Some(text) => return Some(text),
                None => continue,
            }
        }
        None
    }

    /// Whatever is left once the transport has ended.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }
}

fn decode_line(bytes: &[u8]) -> Option<String> {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Some(text.to_string()),
        Err(err) => {
            warn!(error = %err, "skipping stream line with invalid UTF-8");
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Delta(String),
    Done,
}

/// Interpret one event line. Everything after `data:` is content, including
/// a leading space.
pub fn parse_frame(line: &str) -> Option<StreamEvent> {
    let payload = line.strip_prefix(DATA_PREFIX)?;
    if payload.trim() == DONE_SENTINEL {
        return Some(StreamEvent::Done);
    }
    if payload.is_empty() {
        return None;
    }
    Some(StreamEvent::Delta(payload.to_string()))
}

/// Pulls content deltas out of one reply stream.
pub struct StreamIngestor {
    source: ByteStream,
    decoder: FrameDecoder,
    transport_ended: bool,
    done: bool,
}

impl StreamIngestor {
    pub fn new(source: ByteStream) -> Self {
        Self {
            source,
            decoder: FrameDecoder::new(),
            transport_ended: false,
            done: false,
        }
    }

    pub async fn open(
        backend: &dyn ChatBackend,
        conversation_id: i64,
        text: &str,
    ) -> Result<Self, ApiError> {
        let source = backend.open_message_stream(conversation_id, text).await?;
        Ok(Self::new(source))
    }

    /// Next delta, or `Done` once the sentinel arrives or the transport ends.
    /// Keeps returning `Done` afterwards.
    pub async fn read(&mut self) -> Result<StreamEvent, ApiError> {
        loop {
            if self.done {
                return Ok(StreamEvent::Done);
            }

            while let Some(line) = self.decoder.next_line() {
                if let Some(event) = parse_frame(&line) {
                    self.done = event == StreamEvent::Done;
                    return Ok(event);
                }
            }

            if self.transport_ended {
                self.done = true;
                continue;
            }

            match self.source.next().await {
                Some(Ok(chunk)) => self.decoder.push(&chunk),
                Some(Err(err)) => {
                    self.done = true;
                    return Err(err);
                }
                None => {
                    self.transport_ended = true;
                    if let Some(event) = self.decoder.finish().as_deref().and_then(parse_frame) {
                        self.done = event == StreamEvent::Done;
                        return Ok(event);
                    }
                }
            }
        }
    }

    /// Consume the rest of the transport without interpreting it, so the
    /// backend finishes (and persists) the reply nobody is watching.
    pub async fn drain(mut self) {
        let mut discarded = 0usize;
        while let Some(chunk) = self.source.next().await {
            match chunk {
                Ok(bytes) => discarded += bytes.len(),
                Err(err) => {
                    debug!(error = %err, "detached stream ended with error");
                    break;
                }
            }
        }
        debug!(discarded, "detached stream drained");
    }
}

/// Coalesces deltas into snapshots no more often than once per interval.
#[derive(Debug)]
pub struct ThrottledText {
    content: String,
    interval: Duration,
    last_emit: Option<Instant>,
    pending: bool,
}

impl ThrottledText {
    pub fn new(interval: Duration) -> Self {
        Self {
            content: String::new(),
            interval,
            last_emit: None,
            pending: false,
        }
    }

    /// Append a delta; returns the full text when a snapshot is due. The
    /// first delta is always due.
    pub fn push(&mut self, delta: &str, now: Instant) -> Option<String> {
        self.content.push_str(delta);
        self.pending = true;

        let due = self
            .last_emit
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval);
        if !due {
            return None;
        }
        self.last_emit = Some(now);
        self.pending = false;
        Some(self.content.clone())
    }

    /// The coalesced text, if some of it was held back by the throttle.
    pub fn finish(&mut self) -> Option<String> {
        if !self.pending {
            return None;
        }
        self.pending = false;
        Some(self.content.clone())
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn into_content(self) -> String {
        self.content
    }
}

/// Identifies which send a stream message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamTag {
    pub epoch: u64,
    pub stream_id: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamMessage {
    /// Full text received so far.
    Progress(String),
    /// Final text of the reply.
    Completed(String),
    Failed(String),
}

pub struct StreamParams {
    pub backend: Arc<dyn ChatBackend>,
    pub conversation_id: i64,
    pub text: String,
    pub throttle: Duration,
    pub cancel_token: CancellationToken,
    pub tag: StreamTag,
}

#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<(StreamMessage, StreamTag)>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, StreamTag)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn_stream(&self, params: StreamParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let StreamParams {
                backend,
                conversation_id,
                text,
                throttle,
                cancel_token,
                tag,
            } = params;

            let send = |message: StreamMessage| {
                let _ = tx.send((message, tag));
            };

            let mut ingestor =
                match StreamIngestor::open(backend.as_ref(), conversation_id, &text).await {
                    Ok(ingestor) => ingestor,
                    Err(err) => {
                        warn!(conversation_id, stream_id = tag.stream_id, error = %err, "failed to open reply stream");
                        if !cancel_token.is_cancelled() {
                            send(StreamMessage::Failed(err.to_string()));
                        }
                        return;
                    }
                };
            debug!(conversation_id, stream_id = tag.stream_id, "reply stream opened");

            let mut snapshots = ThrottledText::new(throttle);
            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel_token.cancelled() => None,
                    event = ingestor.read() => Some(event),
                };
                let Some(event) = next else {
                    debug!(conversation_id, stream_id = tag.stream_id, "reply stream detached");
                    ingestor.drain().await;
                    return;
                };

                match event {
                    Ok(StreamEvent::Delta(delta)) => {
                        if let Some(snapshot) = snapshots.push(&delta, Instant::now()) {
                            send(StreamMessage::Progress(snapshot));
                        }
                    }
                    Ok(StreamEvent::Done) => {
                        if let Some(snapshot) = snapshots.finish() {
                            send(StreamMessage::Progress(snapshot));
                        }
                        debug!(
                            conversation_id,
                            stream_id = tag.stream_id,
                            chars = snapshots.content().chars().count(),
                            "reply stream completed"
                        );
                        send(StreamMessage::Completed(snapshots.into_content()));
                        return;
                    }
                    Err(err) => {
                        warn!(conversation_id, stream_id = tag.stream_id, error = %err, "reply stream failed");
                        send(StreamMessage::Failed(err.to_string()));
                        return;
                    }
                }
            }
        });
    }
}
