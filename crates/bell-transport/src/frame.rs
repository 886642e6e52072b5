//! STOMP 1.2 frame codec
//!
//! Just enough of the protocol for a subscribe-only client:
//! `COMMAND\nheader:value\n...\n\nbody\0`. A frame consisting only of end of
//! line characters is a heart-beat.

use crate::error::TransportError;
use std::fmt;

/// Frame command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StompCommand {
    /// Client session request
    Connect,
    /// Server session acknowledgement
    Connected,
    /// Client subscription
    Subscribe,
    /// Server-delivered message
    Message,
    /// Server receipt
    Receipt,
    /// Server error; the session is over
    Error,
    /// Client session end
    Disconnect,
    /// Anything else
    Other(String),
}

impl StompCommand {
    fn parse(s: &str) -> Self {
        match s {
            "CONNECT" => Self::Connect,
            "CONNECTED" => Self::Connected,
            "SUBSCRIBE" => Self::Subscribe,
            "MESSAGE" => Self::Message,
            "RECEIPT" => Self::Receipt,
            "ERROR" => Self::Error,
            "DISCONNECT" => Self::Disconnect,
            other => Self::Other(other.to_string()),
        }
    }

    /// CONNECT and CONNECTED headers are sent without escaping
    #[inline]
    #[must_use]
    pub fn is_handshake(&self) -> bool {
        matches!(self, Self::Connect | Self::Connected)
    }

    /// Wire form
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Connect => "CONNECT",
            Self::Connected => "CONNECTED",
            Self::Subscribe => "SUBSCRIBE",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
            Self::Disconnect => "DISCONNECT",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for StompCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One STOMP frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StompFrame {
    /// Command line
    pub command: StompCommand,
    /// Headers in wire order
    pub headers: Vec<(String, String)>,
    /// Body text
    pub body: String,
}

impl StompFrame {
    /// Frame with no headers or body
    #[must_use]
    pub fn new(command: StompCommand) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Session request for `host`, optionally carrying a bearer token
    #[must_use]
    pub fn connect(host: &str, token: Option<&str>) -> Self {
        let frame = Self::new(StompCommand::Connect)
            .header("accept-version", "1.2")
            .header("host", host)
            .header("heart-beat", "0,0");
        match token {
            Some(token) => frame.header("Authorization", format!("Bearer {token}")),
            None => frame,
        }
    }

    /// Subscription to `destination`
    #[must_use]
    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new(StompCommand::Subscribe)
            .header("id", id)
            .header("destination", destination)
            .header("ack", "auto")
    }

    /// First value of a header; repeated headers keep the first occurrence
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Encode to wire text, NUL-terminated
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        let raw = self.command.is_handshake();
        for (key, value) in &self.headers {
            if raw {
                out.push_str(key);
                out.push(':');
                out.push_str(value);
            } else {
                out.push_str(&escape(key));
                out.push(':');
                out.push_str(&escape(value));
            }
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Decode wire text; `Ok(None)` for a heart-beat
    ///
    /// # Errors
    /// `TransportError::Protocol` for a frame without a header terminator or
    /// with an invalid escape sequence
    pub fn parse(text: &str) -> Result<Option<Self>, TransportError> {
        let text = text.trim_start_matches(['\r', '\n']);
        if text.is_empty() || text == "\0" {
            return Ok(None);
        }

        let (head, rest) = split_head(text)
            .ok_or_else(|| TransportError::Protocol("missing header terminator".to_string()))?;

        let mut lines = head.lines();
        let command = lines
            .next()
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.is_empty())
            .ok_or_else(|| TransportError::Protocol("missing command".to_string()))?;

        let command = StompCommand::parse(command);
        let raw = command.is_handshake();
        let mut headers = Vec::new();
        for line in lines {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| TransportError::Protocol(format!("bad header line: {line}")))?;
            if raw {
                headers.push((key.to_string(), value.to_string()));
            } else {
                headers.push((unescape(key)?, unescape(value)?));
            }
        }

        let body = match rest.find('\0') {
            Some(end) => {
                let trailing = rest[end + 1..].trim_matches(['\r', '\n']);
                if !trailing.is_empty() {
                    tracing::debug!(
                        command = %command,
                        trailing = trailing.len(),
                        "ignoring data after frame terminator"
                    );
                }
                &rest[..end]
            }
            None => rest,
        };

        Ok(Some(Self {
            command,
            headers,
            body: body.to_string(),
        }))
    }

    /// Decode every frame in one WebSocket message, skipping heart-beats
    ///
    /// # Errors
    /// The first frame that fails [`StompFrame::parse`]
    pub fn parse_all(text: &str) -> Result<Vec<Self>, TransportError> {
        let mut frames = Vec::new();
        for chunk in text.split_inclusive('\0') {
            if let Some(frame) = Self::parse(chunk)? {
                frames.push(frame);
            }
        }
        Ok(frames)
    }
}

fn split_head(text: &str) -> Option<(&str, &str)> {
    let lf = text.find("\n\n").map(|i| (i, 2));
    let crlf = text.find("\r\n\r\n").map(|i| (i, 4));
    let (at, len) = match (lf, crlf) {
        (Some(a), Some(b)) => {
            if a.0 <= b.0 {
                a
            } else {
                b
            }
        }
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return None,
    };
    Some((&text[..at], &text[at + len..]))
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(s: &str) -> Result<String, TransportError> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            other => {
                return Err(TransportError::Protocol(format!(
                    "invalid escape sequence: \\{}",
                    other.map(String::from).unwrap_or_default()
                )))
            }
        }
    }
    Ok(out)
}
