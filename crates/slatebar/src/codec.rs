//! i3bar wire protocol framing
//!
//! Output: one header object, `[`, then an endless JSON array of block
//! lists, each followed by `,\n`. Input: an endless JSON array of click
//! events, one per line.

use slatebar_core::{Block, ClickEvent, Header};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Protocol error
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode blocks: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("invalid click event {line:?}: {source}")]
    Decode {
        line: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ProtocolError {
    /// The host stopped reading our output
    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::BrokenPipe)
    }
}

/// Writes the outbound block stream
pub struct BarWriter<W> {
    out: W,
    frames: u64,
}

impl<W: AsyncWrite + Unpin> BarWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, frames: 0 }
    }

    /// Write the header and open the infinite array. Call once.
    pub async fn write_header(&mut self, header: &Header) -> Result<(), ProtocolError> {
        let mut buf = serde_json::to_vec(header).map_err(ProtocolError::Encode)?;
        buf.extend_from_slice(b"\n[\n");
        self.out.write_all(&buf).await?;
        self.out.flush().await?;
        Ok(())
    }

    /// Write one full status line
    pub async fn write_blocks(&mut self, blocks: &[Block]) -> Result<(), ProtocolError> {
        let mut buf = serde_json::to_vec(blocks).map_err(ProtocolError::Encode)?;
        buf.extend_from_slice(b",\n");
        self.out.write_all(&buf).await?;
        self.out.flush().await?;
        self.frames += 1;
        trace!(frame = self.frames, blocks = blocks.len(), "wrote status line");
        Ok(())
    }

    /// Number of status lines written so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Parse one line of the inbound event stream.
///
/// Array punctuation around the object is stripped; blank lines (and the
/// lone opening `[`) yield `Ok(None)`.
pub fn parse_event_line(line: &str) -> Result<Option<ClickEvent>, ProtocolError> {
    let trimmed = line
        .trim()
        .trim_start_matches([',', '['])
        .trim_end_matches([',', ']'])
        .trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|source| ProtocolError::Decode {
            line: trimmed.to_string(),
            source,
        })
}

/// Read click events until the input closes, forwarding each to `tx`.
///
/// Undecodable lines are logged and skipped. The task ends when the input
/// reaches EOF or fails, or when the receiver is dropped.
pub fn spawn_event_reader<R>(input: R, tx: mpsc::Sender<ClickEvent>) -> JoinHandle<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = input.lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match parse_event_line(&line) {
                    Ok(Some(event)) => {
                        trace!(name = %event.name, button = event.button, "click event");
                        if tx.send(event).await.is_err() {
                            debug!("event receiver closed, stopping reader");
                            return;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "skipping malformed click event"),
                },
                Ok(None) => {
                    debug!("host input closed");
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "failed to read host input");
                    return;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn test_header_then_frames() {
        let mut writer = BarWriter::new(Vec::new());
        writer.write_header(&Header::default()).await.unwrap();
        writer
            .write_blocks(&[Block::new("a & <b>").with_name("static:0:0")])
            .await
            .unwrap();
        writer.write_blocks(&[]).await.unwrap();
        assert_eq!(writer.frames(), 2);

        let out = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(
            out,
            "{\"version\":1,\"click_events\":true}\n[\n\
             [{\"full_text\":\"a & <b>\",\"name\":\"static:0:0\"}],\n\
             [],\n"
        );
    }

    #[test]
    fn test_parse_event_line_variants() {
        assert!(parse_event_line("[").unwrap().is_none());
        assert!(parse_event_line("   ").unwrap().is_none());

        let first = parse_event_line(r#"[{"name":"time:0:0","button":1}"#).unwrap().unwrap();
        assert_eq!(first.name, "time:0:0");

        let later = parse_event_line(r#",{"name":"time:0:0","button":3}"#).unwrap().unwrap();
        assert_eq!(later.button, 3);

        let trailing = parse_event_line(r#"{"name":"x:0:0"},"#).unwrap().unwrap();
        assert_eq!(trailing.name, "x:0:0");
    }

    #[test]
    fn test_parse_event_line_garbage() {
        let err = parse_event_line("{not json").unwrap_err();
        assert!(matches!(err, ProtocolError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_reader_skips_bad_lines() {
        let input = "[\n{\"name\":\"a:0:0\",\"button\":1}\n,garbage\n\
                     ,{\"name\":\"b:0:1\",\"button\":2}\n";
        let (tx, mut rx) = mpsc::channel(8);
        let reader = spawn_event_reader(BufReader::new(input.as_bytes()), tx);

        assert_eq!(rx.recv().await.unwrap().name, "a:0:0");
        assert_eq!(rx.recv().await.unwrap().name, "b:0:1");
        assert!(rx.recv().await.is_none());
        reader.await.unwrap();
    }

    #[test]
    fn test_broken_pipe_detection() {
        let err = ProtocolError::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert!(err.is_broken_pipe());
        let other = ProtocolError::from(std::io::Error::from(std::io::ErrorKind::Other));
        assert!(!other.is_broken_pipe());
    }
}
