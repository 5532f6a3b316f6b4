//! Line-delimited JSON chat loop
//!
//! Each input line is a [`ChatRequest`]; each output line is the matching
//! [`CommandOutput`]. Lines that do not parse get an error reply and the loop
//! carries on.

use crate::Assistant;
use crate::commands::{ChatRequest, CommandOutput};
use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

/// Answer requests from `reader` on `writer` until end of input.
///
/// Returns the number of lines answered.
pub async fn serve<R, W>(assistant: &Assistant, reader: R, mut writer: W) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut answered = 0;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let output = match serde_json::from_str::<ChatRequest>(line) {
            Ok(request) => {
                let message = request.message_text();
                assistant.respond(&message, request.command).await
            }
            Err(e) => {
                warn!("Rejected request line: {}", e);
                CommandOutput::text(format!("⚠️ Error processing request: invalid request: {e}"))
            }
        };

        let mut encoded = serde_json::to_string(&output)?;
        encoded.push('\n');
        writer.write_all(encoded.as_bytes()).await?;
        writer.flush().await?;
        answered += 1;
    }

    info!("Input closed after {} requests", answered);
    Ok(answered)
}
