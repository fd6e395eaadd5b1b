use bytes::BytesMut;
use futures_util::{Stream, StreamExt};

use super::{EventTooLargeSnafu, FrameError, FrameStream};

/// Bytes one event may take before it is complete
pub(crate) const MAX_EVENT_SIZE: usize = 64 * 1024;

/// Incremental `text/event-stream` decoder, yield the data of each complete event.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: BytesMut,
    data: String,
    has_data: bool,
}

impl SseDecoder {
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Next complete event data, `None` if more bytes are needed
    pub fn next_data(&mut self) -> Option<String> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line = self.buffer.split_to(pos + 1);
            line.truncate(pos);
            if line.last() == Some(&b'\r') {
                line.truncate(pos - 1);
            }

            if line.is_empty() {
                if let Some(data) = self.dispatch() {
                    return Some(data);
                }
                continue;
            }

            let line = match std::str::from_utf8(&line) {
                Ok(line) => line,
                Err(_) => {
                    log::trace!("Skip non utf-8 sse line");
                    continue;
                }
            };

            self.process_line(line);
        }

        None
    }

    /// Bytes held for the event not yet complete
    pub fn pending_len(&self) -> usize {
        self.buffer.len() + self.data.len()
    }

    fn process_line(&mut self, line: &str) {
        // comment
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        if field == "data" {
            if self.has_data {
                self.data.push('\n');
            }
            self.data.push_str(value);
            self.has_data = true;
        } else {
            log::trace!("Ignore sse field {}", field);
        }
    }

    fn dispatch(&mut self) -> Option<String> {
        self.has_data = false;
        let data = std::mem::take(&mut self.data);
        if data.is_empty() {
            None
        } else {
            Some(data)
        }
    }
}

/// Turn a http body byte stream into a stream of event data.
///
/// Body read error is yielded once, then the stream ends.
pub(crate) fn frames<S, B, E>(body: S) -> FrameStream
where
    S: Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + 'static,
    E: Into<FrameError> + 'static,
{
    futures_util::stream::unfold(
        (body, SseDecoder::default(), false),
        |(mut body, mut decoder, done)| async move {
            if done {
                return None;
            }

            loop {
                if let Some(data) = decoder.next_data() {
                    return Some((Ok(data), (body, decoder, false)));
                }

                if decoder.pending_len() > MAX_EVENT_SIZE {
                    let err = EventTooLargeSnafu {
                        limit: MAX_EVENT_SIZE,
                    }
                    .build();
                    return Some((Err(err), (body, decoder, true)));
                }

                match body.next().await {
                    Some(Ok(chunk)) => decoder.feed(chunk.as_ref()),
                    Some(Err(err)) => return Some((Err(err.into()), (body, decoder, true))),
                    None => {
                        if decoder.has_data {
                            log::debug!("Event stream ended with an incomplete event, drop it");
                        }
                        return None;
                    }
                }
            }
        },
    )
    .boxed()
}
