use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

use crate::config::DecoderConfig;
use crate::error::DecodeError;
use crate::handle::ObjectHandle;
use crate::unpacker::{DEFAULT_RESERVE_SIZE, Unpacker};

/// Asynchronous streaming decoder: yields one message at a time from any
/// `AsyncRead` source.
///
/// Wraps an [`Unpacker`] and runs its reserve / read / consume / next
/// cycle, so the caller only awaits messages. Nothing is read ahead of
/// demand beyond one `read` call.
///
/// ```text
///   Some(Ok(handle))     message decoded
///   Some(Ok(handle))
///   Some(Err(e))         malformed input or premature EOF; stream ends
///   None                 clean EOF between messages
/// ```
///
/// # Example
///
/// ```rust,no_run
/// use mpack_decoder::StreamingDecoder;
/// use tokio::io::AsyncRead;
///
/// async fn print_all(reader: impl AsyncRead + Unpin) {
///     let mut stream = StreamingDecoder::new(reader);
///     while let Some(handle) = stream.next().await.transpose().unwrap() {
///         println!("{handle}");
///     }
/// }
/// ```
pub struct StreamingDecoder<R> {
    reader: R,
    unpacker: Unpacker,
    read_size: usize,
    state: StreamState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StreamState {
    Reading,
    Done,
}

impl<R: AsyncRead + Unpin> StreamingDecoder<R> {
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, DecoderConfig::default())
    }

    #[must_use]
    pub fn with_config(reader: R, config: DecoderConfig) -> Self {
        Self::from_unpacker(reader, Unpacker::with_config(config))
    }

    /// Continue from an existing unpacker, keeping any bytes it holds.
    #[must_use]
    pub fn from_unpacker(reader: R, unpacker: Unpacker) -> Self {
        Self {
            reader,
            unpacker,
            read_size: DEFAULT_RESERVE_SIZE,
            state: StreamState::Reading,
        }
    }

    /// Minimum writable space reserved before each read.
    #[must_use]
    pub fn with_read_size(mut self, read_size: usize) -> Self {
        self.read_size = read_size.max(1);
        self
    }

    pub fn unpacker(&self) -> &Unpacker {
        &self.unpacker
    }

    pub fn into_inner(self) -> (R, Unpacker) {
        (self.reader, self.unpacker)
    }

    /// Read the next message from the stream.
    ///
    /// Returns `None` once the reader is exhausted with no partial message
    /// pending. A reader that ends mid-message yields one
    /// [`DecodeError::InsufficientBytes`]; any error ends the stream.
    pub async fn next(&mut self) -> Option<Result<ObjectHandle, DecodeError>> {
        if self.state == StreamState::Done {
            return None;
        }
        match self.read_next().await {
            Ok(Some(handle)) => Some(Ok(handle)),
            Ok(None) => {
                self.state = StreamState::Done;
                None
            }
            Err(e) => {
                self.state = StreamState::Done;
                Some(Err(e))
            }
        }
    }

    async fn read_next(&mut self) -> Result<Option<ObjectHandle>, DecodeError> {
        loop {
            if let Some(handle) = self.unpacker.next()? {
                return Ok(Some(handle));
            }

            self.unpacker.reserve_buffer(self.read_size);
            let n = self.reader.read(self.unpacker.buffer()).await?;
            trace!(bytes = n, "stream read");
            if n == 0 {
                if self.unpacker.has_partial_message() || self.unpacker.nonparsed_size() > 0 {
                    return Err(DecodeError::InsufficientBytes {
                        needed: self.unpacker.shortfall().max(1),
                    });
                }
                return Ok(None);
            }
            self.unpacker.buffer_consumed(n);
        }
    }
}
