/// Implementation of `mpack validate`.
///
/// Decodes every message of a stream under the configured limits and
/// reports either success checkmarks (`✓`) or one diagnostic (`✗`) that
/// tells oversized input apart from corrupt input.
///
/// # Success output
///
/// ```text
/// ✓ Messages: 3 decoded
/// ✓ Bytes: 41 consumed, no trailing data
/// ```
///
/// # Failure output
///
/// ```text
/// ✗ Limit exceeded: array size 70000 exceeds limit 1000
/// ✗ Malformed: parse error: invalid tag byte 0xC1 at offset 12
/// ✗ Truncated: insufficient bytes: need at least 3 more
/// ```
use anyhow::{Context, Result};
use mpack_decoder::DecodeError;

use crate::ValidateArgs;
use crate::source::{open, read_messages};

/// Run the `mpack validate` command.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or any message fails to
/// decode; the `✗` line has been printed to stdout by then.
pub fn run(args: &ValidateArgs) -> Result<()> {
    let file = open(&args.file)?;

    match read_messages(file, args.limits.config()) {
        Ok(messages) => {
            let total: usize = messages.iter().map(|m| m.len).sum();
            println!("✓ Messages: {} decoded", messages.len());
            println!("✓ Bytes: {total} consumed, no trailing data");
            Ok(())
        }
        Err(e) => {
            println!("✗ {}", diagnostic(&e));
            Err(e).with_context(|| format!("{} failed validation", args.file.display()))
        }
    }
}

fn diagnostic(err: &anyhow::Error) -> String {
    match err.downcast_ref::<DecodeError>() {
        Some(e) if e.is_size_overflow() => format!("Limit exceeded: {e}"),
        Some(e) if e.is_parse_error() => format!("Malformed: {e}"),
        Some(e) if e.is_incomplete() => format!("Truncated: {e}"),
        Some(e) => format!("Error: {e}"),
        None => format!("Error: {err:#}"),
    }
}
