//! Protocol v2 request parsing.
//!
//! A request body carries one or more commands. Each command is a
//! `command=<name>` data packet, optional capability packets, then --
//! after a delimiter -- argument packets, terminated by a flush. Only
//! `ls-refs` and `fetch` are recognized; anything else is a fatal parse
//! error.

use crate::errors::ProxyError;
use crate::protocol::pktline::{self, PktLine};

/// Command names this proxy understands.
const RECOGNIZED_COMMANDS: [&str; 2] = ["ls-refs", "fetch"];

// ---------------------------------------------------------------------------
// CommandRequest
// ---------------------------------------------------------------------------

/// One parsed protocol v2 command: the `command=` packet and every
/// capability and argument packet up to (excluding) the end-of-request
/// flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    command: String,
    chunks: Vec<PktLine>,
}

impl CommandRequest {
    /// The command name (`ls-refs` or `fetch`).
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Argument payloads: the data packets following the delimiter. A
    /// command without a delimiter has no arguments.
    pub fn arguments(&self) -> impl Iterator<Item = &[u8]> {
        let delim = self
            .chunks
            .iter()
            .position(|c| *c == PktLine::Delimiter)
            .map(|i| i + 1)
            .unwrap_or(self.chunks.len());
        self.chunks[delim..].iter().filter_map(|c| match c {
            PktLine::Data(d) => Some(d.as_slice()),
            _ => None,
        })
    }

    /// Re-encode the command, including the terminating flush. This is the
    /// byte stream fed to the upstream POST body and to the local
    /// `upload-pack` stdin.
    pub fn to_pkt_bytes(&self) -> Vec<u8> {
        let mut out = pktline::encode_pkts(&self.chunks);
        out.extend_from_slice(b"0000");
        out
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a full request body into its command sequence.
pub fn parse_commands(body: &[u8]) -> Result<Vec<CommandRequest>, ProxyError> {
    let packets = pktline::decode_pkt_lines(body)
        .map_err(|e| ProxyError::BadRequest(format!("cannot parse the request: {e}")))?;

    let mut commands = Vec::new();
    let mut current: Option<CommandRequest> = None;

    for packet in packets {
        match packet {
            PktLine::Data(payload) => match current.as_mut() {
                Some(command) => command.chunks.push(PktLine::Data(payload)),
                None => {
                    let line = String::from_utf8_lossy(&payload);
                    let name = line
                        .strip_prefix("command=")
                        .map(|n| n.trim_end_matches('\n').to_string())
                        .ok_or_else(|| {
                            ProxyError::BadRequest(format!(
                                "expected a command packet, got {:?}",
                                line.trim_end()
                            ))
                        })?;
                    if !RECOGNIZED_COMMANDS.contains(&name.as_str()) {
                        return Err(ProxyError::BadRequest(format!(
                            "unrecognized command: {name}"
                        )));
                    }
                    current = Some(CommandRequest {
                        command: name,
                        chunks: vec![PktLine::Data(payload)],
                    });
                }
            },
            PktLine::Delimiter => match current.as_mut() {
                Some(command) => command.chunks.push(PktLine::Delimiter),
                None => {
                    return Err(ProxyError::BadRequest(
                        "delimiter packet outside a command".to_string(),
                    ))
                }
            },
            PktLine::Flush => {
                // End-of-request marker; a flush with no open command is a
                // trailing terminator and carries nothing.
                if let Some(command) = current.take() {
                    commands.push(command);
                }
            }
            PktLine::ResponseEnd => {
                return Err(ProxyError::BadRequest(
                    "unexpected response-end packet in a request".to_string(),
                ))
            }
        }
    }

    if current.is_some() {
        return Err(ProxyError::BadRequest(
            "truncated command: missing end-of-request".to_string(),
        ));
    }

    Ok(commands)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
