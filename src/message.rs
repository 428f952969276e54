//! Message protocol definitions
//!
//! Fixed-layout binary frame shared by server and client. There is no length
//! prefix: every read and write moves exactly [`FRAME_LEN`] bytes.
//!
//! ```text
//! offset  size  field
//!      0     4  kind      (u32, network byte order)
//!      4   100  text      (99 usable bytes, NUL padded)
//!    104    15  nickname  (14 usable bytes, NUL padded)
//!    119     1  padding   (always zero)
//! ```
//!
//! Text and nickname longer than their fields are silently truncated. This is
//! a data-loss surface: anything past [`MAX_TEXT_LEN`] / [`MAX_NICKNAME_LEN`]
//! bytes never reaches the wire.

use crate::error::AppError;

const KIND_LEN: usize = 4;
const TEXT_FIELD_LEN: usize = 100;
const NICKNAME_FIELD_LEN: usize = 15;

const TEXT_OFFSET: usize = KIND_LEN;
const NICKNAME_OFFSET: usize = TEXT_OFFSET + TEXT_FIELD_LEN;

/// Total size of one frame on the wire
pub const FRAME_LEN: usize = 120;

/// Usable bytes of the text field (one byte is reserved for the terminator)
pub const MAX_TEXT_LEN: usize = TEXT_FIELD_LEN - 1;

/// Usable bytes of the nickname field
pub const MAX_NICKNAME_LEN: usize = NICKNAME_FIELD_LEN - 1;

/// Message kind carried in the frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Client handshake announcing its nickname
    Register,
    /// Chat line sent by a client
    Chat,
    /// Server-originated fan-out message
    Broadcast,
}

impl MessageKind {
    fn to_wire(self) -> u32 {
        match self {
            MessageKind::Register => 0,
            MessageKind::Chat => 1,
            MessageKind::Broadcast => 2,
        }
    }

    fn from_wire(value: u32) -> Result<Self, AppError> {
        match value {
            0 => Ok(MessageKind::Register),
            1 => Ok(MessageKind::Chat),
            2 => Ok(MessageKind::Broadcast),
            other => Err(AppError::UnknownKind(other)),
        }
    }
}

/// One decoded wire message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub text: String,
    pub nickname: String,
}

impl Message {
    /// Build a message, truncating text and nickname to their wire bounds
    pub fn new(kind: MessageKind, text: &str, nickname: &str) -> Self {
        Self {
            kind,
            text: truncate(text, MAX_TEXT_LEN).to_string(),
            nickname: truncate(nickname, MAX_NICKNAME_LEN).to_string(),
        }
    }

    /// Registration handshake for `nickname`
    pub fn register(nickname: &str) -> Self {
        Self::new(MessageKind::Register, "", nickname)
    }

    /// Chat line from `nickname`
    pub fn chat(text: &str, nickname: &str) -> Self {
        Self::new(MessageKind::Chat, text, nickname)
    }

    /// Server broadcast (no nickname)
    pub fn broadcast(text: &str) -> Self {
        Self::new(MessageKind::Broadcast, text, "")
    }

    /// Serialize into one fixed-size frame
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        encode(self.kind, &self.text, &self.nickname)
    }

    /// Parse one frame
    ///
    /// Fails if `bytes` is not exactly [`FRAME_LEN`] long or the kind is unknown.
    /// Embedded NUL bytes terminate the text and nickname fields.
    pub fn decode(bytes: &[u8]) -> Result<Self, AppError> {
        if bytes.len() != FRAME_LEN {
            return Err(AppError::MalformedMessage {
                expected: FRAME_LEN,
                actual: bytes.len(),
            });
        }

        let mut kind = [0u8; KIND_LEN];
        kind.copy_from_slice(&bytes[..KIND_LEN]);
        let kind = MessageKind::from_wire(u32::from_be_bytes(kind))?;

        Ok(Self {
            kind,
            text: read_field(&bytes[TEXT_OFFSET..TEXT_OFFSET + MAX_TEXT_LEN]),
            nickname: read_field(&bytes[NICKNAME_OFFSET..NICKNAME_OFFSET + MAX_NICKNAME_LEN]),
        })
    }
}

/// Encode a frame directly from its parts (silent truncation, never fails)
pub fn encode(kind: MessageKind, text: &str, nickname: &str) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    frame[..KIND_LEN].copy_from_slice(&kind.to_wire().to_be_bytes());
    write_field(&mut frame[TEXT_OFFSET..], text, MAX_TEXT_LEN);
    write_field(&mut frame[NICKNAME_OFFSET..], nickname, MAX_NICKNAME_LEN);
    frame
}

fn write_field(dst: &mut [u8], value: &str, max: usize) {
    let bytes = truncate(value, max).as_bytes();
    dst[..bytes.len()].copy_from_slice(bytes);
}

fn read_field(src: &[u8]) -> String {
    let end = src.iter().position(|&b| b == 0).unwrap_or(src.len());
    String::from_utf8_lossy(&src[..end]).into_owned()
}

/// Longest prefix of `value` within `max` bytes that ends on a char boundary
fn truncate(value: &str, max: usize) -> &str {
    if value.len() <= max {
        return value;
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

/// Accumulates bytes from non-blocking reads until one full frame is present
#[derive(Debug)]
pub struct FrameBuffer {
    buf: [u8; FRAME_LEN],
    filled: usize,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            buf: [0u8; FRAME_LEN],
            filled: 0,
        }
    }

    /// The part of the frame still waiting for bytes
    pub fn unfilled_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.filled..]
    }

    /// Record `n` freshly read bytes; yields the frame once it is complete
    pub fn advance(&mut self, n: usize) -> Option<[u8; FRAME_LEN]> {
        self.filled = (self.filled + n).min(FRAME_LEN);
        if self.filled < FRAME_LEN {
            return None;
        }
        self.filled = 0;
        Some(self.buf)
    }

    /// Bytes of a partial frame currently held
    pub fn pending(&self) -> usize {
        self.filled
    }
}
