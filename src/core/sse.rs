//! Decoding of Server-Sent Event streams returned by provider APIs.

use anyhow::Error;
use async_stream::try_stream;
use futures::Stream;
use futures_util::StreamExt;

/// Turn a raw byte stream into the `data` payloads of each event.
///
/// Bytes are buffered until a blank line ends the event. This is
/// necessary to handle SSE fragmentation over HTTP/2 frames, which can
/// split an event anywhere, including in the middle of a multi-byte
/// character.
pub fn data_events<S, B, E>(stream: S) -> impl Stream<Item = Result<String, Error>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<Error>,
{
    try_stream! {
        let mut stream = Box::pin(stream);
        let mut buffer: Vec<u8> = Vec::new();
        let mut after_cr = false;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(Into::<Error>::into)?;
            push_normalized(&mut buffer, chunk.as_ref(), &mut after_cr);

            while let Some(event_end) = find_event_end(&buffer) {
                let raw: Vec<u8> = buffer.drain(..event_end + 2).collect();
                let raw = String::from_utf8(raw)?;
                if let Some(data) = parse_event(&raw) {
                    yield data;
                }
            }
        }

        // Some servers close the connection without a trailing blank line
        if !buffer.is_empty() {
            let raw = String::from_utf8(buffer)?;
            if let Some(data) = parse_event(&raw) {
                yield data;
            }
        }
    }
}

/// Append `chunk` with every line ending (`\r\n`, `\r` or `\n`) turned
/// into `\n`. `after_cr` carries a trailing `\r` over to the next chunk
/// so a `\r\n` split between chunks stays a single line ending.
fn push_normalized(buffer: &mut Vec<u8>, chunk: &[u8], after_cr: &mut bool) {
    for &byte in chunk {
        match byte {
            b'\r' => {
                buffer.push(b'\n');
                *after_cr = true;
            }
            b'\n' if *after_cr => *after_cr = false,
            _ => {
                buffer.push(byte);
                *after_cr = false;
            }
        }
    }
}

fn find_event_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

/// Collect the `data` lines of one event. Comments and other fields
/// (`event`, `id`, `retry`) are ignored.
fn parse_event(raw: &str) -> Option<String> {
    let lines: Vec<&str> = raw
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect();
    let data = lines.join("\n");
    if data.trim().is_empty() {
        None
    } else {
        Some(data)
    }
}
