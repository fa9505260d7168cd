//! Chunked transfer encoding for binary messages.
//!
//! A message larger than one transport write is split into an ordered
//! run of chunks. Only the first chunk carries the total length:
//!
//! ```text
//! Chunk 1: [tag][len_hi][len_lo] payload part 1
//! Chunk 2: [tag]                 payload part 2
//! Chunk N: [tag]                 payload part N
//! ```
//!
//! The length is the big-endian u16 payload total across all chunks.
//! The receiver knows the message is complete once that many payload
//! bytes have arrived.

use crate::error::{Error, FrameError, Result};

/// First-chunk header size (tag + 2-byte big-endian length).
pub const FIRST_HEADER_SIZE: usize = 3;

/// Continuation-chunk header size (tag only).
pub const NEXT_HEADER_SIZE: usize = 1;

/// Largest payload whose length fits the 16-bit header field.
pub const MAX_MESSAGE_SIZE: usize = u16::MAX as usize;

/// One transport-sized unit of a binary message, header included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireChunk {
    bytes: Vec<u8>,
    first: bool,
}

impl WireChunk {
    fn first(tag: u8, total: u16, payload: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(FIRST_HEADER_SIZE + payload.len());
        bytes.push(tag);
        bytes.extend_from_slice(&total.to_be_bytes());
        bytes.extend_from_slice(payload);
        Self { bytes, first: true }
    }

    fn next(tag: u8, payload: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(NEXT_HEADER_SIZE + payload.len());
        bytes.push(tag);
        bytes.extend_from_slice(payload);
        Self {
            bytes,
            first: false,
        }
    }

    /// Full chunk as written to the transport.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_first(&self) -> bool {
        self.first
    }

    pub fn tag(&self) -> u8 {
        self.bytes[0]
    }

    pub fn header_len(&self) -> usize {
        if self.first {
            FIRST_HEADER_SIZE
        } else {
            NEXT_HEADER_SIZE
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[self.header_len()..]
    }
}

/// Split `payload` into chunks of at most `max_chunk_size` bytes each.
///
/// Always yields at least one chunk; an empty payload is a bare header.
pub fn split_message(tag: u8, payload: &[u8], max_chunk_size: usize) -> Result<Vec<WireChunk>> {
    if max_chunk_size <= FIRST_HEADER_SIZE {
        return Err(Error::Configuration(
            "chunk size must hold the 3-byte header plus one payload byte",
        ));
    }
    let total = u16::try_from(payload.len()).map_err(|_| Error::PayloadTooLarge {
        len: payload.len(),
        max: MAX_MESSAGE_SIZE,
    })?;

    let first_len = payload.len().min(max_chunk_size - FIRST_HEADER_SIZE);
    let (head, rest) = payload.split_at(first_len);

    let mut chunks = Vec::with_capacity(1 + rest.len().div_ceil(max_chunk_size - NEXT_HEADER_SIZE));
    chunks.push(WireChunk::first(tag, total, head));
    chunks.extend(
        rest.chunks(max_chunk_size - NEXT_HEADER_SIZE)
            .map(|part| WireChunk::next(tag, part)),
    );
    Ok(chunks)
}

/// A reassembled inbound binary message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub tag: u8,
    pub declared_len: u16,
    pub payload: Vec<u8>,
}

/// Reassemble one message from its complete, ordered chunk sequence.
pub fn reassemble<'a, I>(chunks: I) -> Result<InboundMessage>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut reassembler = Reassembler::new();
    let mut chunks = chunks.into_iter();

    while let Some(chunk) = chunks.next() {
        if let Some(message) = reassembler.feed(chunk)? {
            if let Some(extra) = chunks.next() {
                return Err(FrameError::Overrun {
                    declared: message.declared_len as usize,
                    received: message.payload.len() + extra.len(),
                }
                .into());
            }
            return Ok(message);
        }
    }

    Err(reassembler.incomplete().into())
}

struct Partial {
    tag: u8,
    declared: usize,
    buffer: Vec<u8>,
}

/// Reassembly buffer for an incoming chunk stream.
///
/// Fed one chunk at a time as notifications arrive. Any framing error
/// discards the partial message so the next chunk starts a fresh one.
#[derive(Default)]
pub struct Reassembler {
    partial: Option<Partial>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self { partial: None }
    }

    /// Feed one chunk.
    ///
    /// Returns `Ok(Some(message))` when the declared length is reached
    /// and `Ok(None)` when more chunks are expected.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Option<InboundMessage>> {
        let result = self.feed_inner(chunk);
        if result.is_err() {
            self.reset();
        }
        result
    }

    fn feed_inner(&mut self, chunk: &[u8]) -> Result<Option<InboundMessage>> {
        let partial = match self.partial.as_mut() {
            None => {
                if chunk.len() < FIRST_HEADER_SIZE {
                    return Err(FrameError::HeaderTooShort.into());
                }
                let declared = u16::from_be_bytes([chunk[1], chunk[2]]) as usize;
                let mut buffer = Vec::with_capacity(declared);
                buffer.extend_from_slice(&chunk[FIRST_HEADER_SIZE..]);
                self.partial.insert(Partial {
                    tag: chunk[0],
                    declared,
                    buffer,
                })
            }
            Some(partial) => {
                let (&tag, payload) = chunk.split_first().ok_or(FrameError::EmptyChunk)?;
                if tag != partial.tag {
                    return Err(FrameError::TagMismatch {
                        expected: partial.tag,
                        found: tag,
                    }
                    .into());
                }
                partial.buffer.extend_from_slice(payload);
                partial
            }
        };

        if partial.buffer.len() > partial.declared {
            return Err(FrameError::Overrun {
                declared: partial.declared,
                received: partial.buffer.len(),
            }
            .into());
        }
        if partial.buffer.len() < partial.declared {
            return Ok(None);
        }

        Ok(self.partial.take().map(|p| InboundMessage {
            tag: p.tag,
            declared_len: p.declared as u16,
            payload: p.buffer,
        }))
    }

    /// Discard any partial message.
    pub fn reset(&mut self) {
        self.partial = None;
    }

    /// Whether reassembly is in progress.
    pub fn is_active(&self) -> bool {
        self.partial.is_some()
    }

    fn incomplete(&self) -> FrameError {
        match &self.partial {
            Some(p) => FrameError::Incomplete {
                declared: p.declared,
                received: p.buffer.len(),
            },
            None => FrameError::HeaderTooShort,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────
