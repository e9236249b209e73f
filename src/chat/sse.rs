//! Incremental decoder for `text/event-stream` bodies.
//!
//! Bytes may be split anywhere, including inside a UTF-8 sequence or between
//! the `\r` and `\n` of a CRLF. Like a browser `EventSource` feeding
//! `onmessage`, only events with no type or type `message` are delivered;
//! `id`, `retry` and comment lines are skipped. One leading byte-order mark
//! is dropped.

use crate::error::StreamError;

const BOM: &[u8] = "\u{feff}".as_bytes();

#[derive(Debug, Default)]
pub struct SseDecoder {
    line: Vec<u8>,
    data: Option<String>,
    event_type: String,
    skip_lf: bool,
    past_first_line: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns the data payload of every event it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<String>, StreamError> {
        let mut events = Vec::new();
        for &byte in chunk {
            if self.skip_lf {
                self.skip_lf = false;
                if byte == b'\n' {
                    continue;
                }
            }
            match byte {
                b'\r' | b'\n' => {
                    self.skip_lf = byte == b'\r';
                    let line = std::mem::take(&mut self.line);
                    if let Some(event) = self.process_line(&line)? {
                        events.push(event);
                    }
                }
                _ => self.line.push(byte),
            }
        }
        Ok(events)
    }

    /// Whether a partial event is buffered. At end of body it is dropped.
    pub fn has_partial(&self) -> bool {
        !self.line.is_empty() || self.data.is_some()
    }

    fn process_line(&mut self, raw: &[u8]) -> Result<Option<String>, StreamError> {
        let first = !std::mem::replace(&mut self.past_first_line, true);
        let raw = match raw.strip_prefix(BOM) {
            Some(rest) if first => rest,
            _ => raw,
        };
        if raw.is_empty() {
            let event_type = std::mem::take(&mut self.event_type);
            let data = self.data.take();
            if event_type.is_empty() || event_type == "message" {
                return Ok(data);
            }
            return Ok(None);
        }
        let line = std::str::from_utf8(raw)
            .map_err(|e| StreamError::Malformed(format!("invalid UTF-8 in event line: {e}")))?;
        if line.starts_with(':') {
            return Ok(None);
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => match self.data.as_mut() {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.data = Some(value.to_string()),
            },
            "event" => self.event_type = value.to_string(),
            _ => {}
        }
        Ok(None)
    }
}
