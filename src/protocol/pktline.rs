//! Git packet-line framing.
//!
//! Each packet line is prefixed with a 4-character hex length that includes
//! itself:
//!
//! - `0000` -- flush packet (end of message / section)
//! - `0001` -- delimiter packet
//! - `0002` -- response-end packet
//! - `0004`+ -- data packet (length includes the 4 prefix bytes)
//!
//! Unlike a best-effort scanner, this parser rejects malformed input: a Git
//! client speaking protocol v2 never produces a frame we cannot parse, so
//! anything unparsable is a bad request.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A single Git packet line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PktLine {
    /// A data packet containing arbitrary bytes.
    Data(Vec<u8>),
    /// Flush packet (`0000`).
    Flush,
    /// Delimiter packet (`0001`).
    Delimiter,
    /// Response-end packet (`0002`).
    ResponseEnd,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PktLineError {
    #[error("invalid packet-line length prefix {prefix:?} at offset {offset}")]
    InvalidLengthPrefix { offset: usize, prefix: String },
    #[error("reserved packet-line length 0003 at offset {offset}")]
    ReservedLength { offset: usize },
    #[error("truncated packet-line at offset {offset}: declared {declared}, {available} available")]
    Truncated {
        offset: usize,
        declared: usize,
        available: usize,
    },
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode a byte slice as a data packet (4-hex-digit length prefix + data).
///
/// Callers are responsible for including any trailing newline in `data` if
/// the protocol requires it.
pub fn encode_pkt_line(data: &[u8]) -> Vec<u8> {
    let total_len = data.len() + 4;
    assert!(
        total_len <= 0xFFFF,
        "packet-line data too large ({total_len} bytes)"
    );
    let mut buf = Vec::with_capacity(total_len);
    buf.extend_from_slice(format!("{total_len:04x}").as_bytes());
    buf.extend_from_slice(data);
    buf
}

/// Encode a [`PktLine`] back into its wire representation.
pub fn encode_pkt(pkt: &PktLine) -> Vec<u8> {
    match pkt {
        PktLine::Data(data) => encode_pkt_line(data),
        PktLine::Flush => b"0000".to_vec(),
        PktLine::Delimiter => b"0001".to_vec(),
        PktLine::ResponseEnd => b"0002".to_vec(),
    }
}

/// Encode a sequence of packets into one contiguous wire buffer.
pub fn encode_pkts(pkts: &[PktLine]) -> Vec<u8> {
    let mut out = Vec::new();
    for pkt in pkts {
        out.extend_from_slice(&encode_pkt(pkt));
    }
    out
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode a complete buffer of packet lines.
///
/// Trailing garbage, truncated frames, and invalid length prefixes are
/// errors; a decoded sequence re-encodes to the exact input bytes.
pub fn decode_pkt_lines(data: &[u8]) -> Result<Vec<PktLine>, PktLineError> {
    let mut packets = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        if pos + 4 > data.len() {
            return Err(PktLineError::Truncated {
                offset: pos,
                declared: 4,
                available: data.len() - pos,
            });
        }

        let prefix = &data[pos..pos + 4];
        let pkt_len = std::str::from_utf8(prefix)
            .ok()
            .and_then(|s| u16::from_str_radix(s, 16).ok())
            .ok_or_else(|| PktLineError::InvalidLengthPrefix {
                offset: pos,
                prefix: String::from_utf8_lossy(prefix).into_owned(),
            })? as usize;

        match pkt_len {
            0 => {
                packets.push(PktLine::Flush);
                pos += 4;
            }
            1 => {
                packets.push(PktLine::Delimiter);
                pos += 4;
            }
            2 => {
                packets.push(PktLine::ResponseEnd);
                pos += 4;
            }
            3 => {
                // Length 3 would mean 3 total bytes, but the prefix itself
                // is already 4.
                return Err(PktLineError::ReservedLength { offset: pos });
            }
            n => {
                if pos + n > data.len() {
                    return Err(PktLineError::Truncated {
                        offset: pos,
                        declared: n,
                        available: data.len() - pos,
                    });
                }
                packets.push(PktLine::Data(data[pos + 4..pos + n].to_vec()));
                pos += n;
            }
        }
    }

    Ok(packets)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
