//! Call channel framing.
//!
//! Every message is a little-endian `u32` length followed by that many bytes
//! of MessagePack. The host sends a [`Call`]; the sandbox answers each call
//! with exactly one [`Reply`].

use std::collections::BTreeMap;
use std::io::{self, Read, Write};

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use sandbox_core::WireValue;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Size of the length prefix
pub const HEADER_SIZE: usize = 4;

/// Default upper bound on a single message body
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 64 * 1024 * 1024;

/// One inbound call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    /// Method name
    pub name: String,
    /// Positional arguments
    #[serde(default)]
    pub args: Vec<WireValue>,
    /// Keyword arguments
    #[serde(default)]
    pub kwargs: BTreeMap<String, WireValue>,
}

impl Call {
    /// A call with positional arguments only.
    pub fn new(name: impl Into<String>, args: Vec<WireValue>) -> Self {
        Call {
            name: name.into(),
            args,
            kwargs: BTreeMap::new(),
        }
    }

    /// Add a keyword argument.
    pub fn kwarg(mut self, name: impl Into<String>, value: WireValue) -> Self {
        self.kwargs.insert(name.into(), value);
        self
    }

    /// Encode as a message body, fields by name.
    pub fn to_msgpack(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Decode a message body.
    pub fn from_msgpack(bytes: &[u8]) -> Result<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

/// Failure details sent back to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    /// Failure class
    pub kind: String,
    /// Human-readable message
    pub message: String,
}

/// The single response to a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reply {
    /// Successful result
    Data(WireValue),
    /// The call failed
    Exc(Failure),
}

impl Reply {
    /// Reply describing `err`.
    pub fn failure(err: &Error) -> Self {
        Reply::Exc(Failure {
            kind: err.kind().to_string(),
            message: err.message(),
        })
    }

    /// Encode as a message body.
    pub fn to_msgpack(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Decode a message body.
    pub fn from_msgpack(bytes: &[u8]) -> Result<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

/// Length-prefixed framing over a reader and a writer.
pub struct Transport<R, W> {
    reader: R,
    writer: W,
    max_message_bytes: usize,
}

impl<R: Read, W: Write> Transport<R, W> {
    /// Frame messages over `reader`/`writer`, rejecting bodies above
    /// `max_message_bytes`.
    pub fn new(reader: R, writer: W, max_message_bytes: usize) -> Self {
        Transport {
            reader,
            writer,
            max_message_bytes,
        }
    }

    /// Read one message body.
    ///
    /// Returns `Ok(None)` when the channel closes cleanly between messages.
    pub fn read_frame(&mut self) -> Result<Option<Vec<u8>>> {
        let mut header = [0u8; HEADER_SIZE];
        let mut filled = 0;
        while filled < HEADER_SIZE {
            match self.reader.read(&mut header[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => {
                    return Err(Error::Io {
                        reason: "channel closed inside a frame header".to_string(),
                    })
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        let size = LittleEndian::read_u32(&header) as usize;
        if size > self.max_message_bytes {
            return Err(Error::FrameTooLarge {
                size,
                limit: self.max_message_bytes,
            });
        }
        let mut body = vec![0u8; size];
        self.reader.read_exact(&mut body)?;
        Ok(Some(body))
    }

    /// Write one message body and flush.
    pub fn write_frame(&mut self, body: &[u8]) -> Result<()> {
        let size = u32::try_from(body.len())
            .ok()
            .filter(|size| *size as usize <= self.max_message_bytes)
            .ok_or(Error::FrameTooLarge {
                size: body.len(),
                limit: self.max_message_bytes,
            })?;
        self.writer.write_u32::<LittleEndian>(size)?;
        self.writer.write_all(body)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Read and decode the next call.
    ///
    /// The outer `Option` is `None` at end of channel; the inner result
    /// carries a decode failure for a frame that arrived intact but is not a
    /// call, so the caller can answer it and keep going.
    pub fn read_call(&mut self) -> Result<Option<Result<Call>>> {
        Ok(self.read_frame()?.map(|body| Call::from_msgpack(&body)))
    }

    /// Encode and send a reply.
    pub fn write_reply(&mut self, reply: &Reply) -> Result<()> {
        let body = reply.to_msgpack()?;
        self.write_frame(&body)
    }

    /// Encode and send a call. Used by hosts and tests driving a sandbox.
    pub fn write_call(&mut self, call: &Call) -> Result<()> {
        let body = call.to_msgpack()?;
        self.write_frame(&body)
    }

    /// Read and decode the next reply.
    pub fn read_reply(&mut self) -> Result<Option<Reply>> {
        self.read_frame()?
            .map(|body| Reply::from_msgpack(&body))
            .transpose()
    }

    /// Give back the reader and writer.
    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

/// Frame a sequence of calls into one byte buffer, as a host would send them.
pub fn encode_calls(calls: &[Call]) -> Result<Vec<u8>> {
    let mut transport = Transport::new(io::empty(), Vec::new(), DEFAULT_MAX_MESSAGE_BYTES);
    for call in calls {
        transport.write_call(call)?;
    }
    Ok(transport.into_inner().1)
}

/// Split a byte buffer of framed replies.
pub fn decode_replies(bytes: &[u8]) -> Result<Vec<Reply>> {
    let mut transport = Transport::new(bytes, io::sink(), DEFAULT_MAX_MESSAGE_BYTES);
    let mut replies = Vec::new();
    while let Some(reply) = transport.read_reply()? {
        replies.push(reply);
    }
    Ok(replies)
}
