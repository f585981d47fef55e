//! Reading a file as a stream of concatenated messages.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use mpack_decoder::unpacker::DEFAULT_RESERVE_SIZE;
use mpack_decoder::{DecodeError, DecoderConfig, ObjectHandle, Unpacker};

/// One decoded message and where it sat in the input.
#[derive(Debug)]
pub struct Message {
    pub offset: usize,
    pub len: usize,
    pub handle: ObjectHandle,
}

pub fn open(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("cannot open {}", path.display()))
}

/// Decode every message from `reader` through the reserve / read /
/// consume / next cycle.
///
/// # Errors
///
/// I/O failures, malformed or oversized messages (the underlying
/// [`DecodeError`] stays reachable through `downcast_ref`), and input that
/// ends inside a message.
pub fn read_messages<R: Read>(mut reader: R, config: DecoderConfig) -> Result<Vec<Message>> {
    let mut unpacker = Unpacker::with_config(config);
    let mut messages = Vec::new();
    let mut received = 0usize;
    let mut end = 0usize;

    loop {
        unpacker.reserve_buffer(DEFAULT_RESERVE_SIZE);
        let n = reader.read(unpacker.buffer()).context("read failed")?;
        if n == 0 {
            break;
        }
        unpacker.buffer_consumed(n);
        received += n;

        loop {
            let next = unpacker.next().with_context(|| {
                format!("bad message at offset {}", received - unpacker.nonparsed_size())
            })?;
            let Some(handle) = next else { break };
            let start = end;
            end = received - unpacker.nonparsed_size();
            messages.push(Message {
                offset: start,
                len: end - start,
                handle,
            });
        }
    }

    if unpacker.has_partial_message() || unpacker.nonparsed_size() > 0 {
        let needed = unpacker.shortfall().max(1);
        return Err(anyhow::Error::new(DecodeError::InsufficientBytes { needed })
            .context(format!("truncated message at offset {end}")));
    }
    Ok(messages)
}
