/// Implementation of `mpack inspect`.
///
/// Decodes a stream of concatenated messages and prints one summary line
/// per message, followed by its stringified value.
///
/// # Output format
///
/// ```text
/// Stream: 3 messages, 41 bytes
/// Message 0 @ 0x0000 (1 byte): positive integer
///          1
/// Message 1 @ 0x0001 (3 bytes): str
///          "hi"
/// Message 2 @ 0x0004 (37 bytes): map
///          {"id":7,"tags":["a","b"],…
/// ```
use std::fs;

use anyhow::{Context, Result};

use crate::InspectArgs;
use crate::source::read_messages;

/// Run the `mpack inspect` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or any message is
/// malformed, oversized, or truncated.
pub fn run(args: &InspectArgs) -> Result<()> {
    let bytes =
        fs::read(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;

    let messages = read_messages(&bytes[..], args.limits.config())
        .with_context(|| format!("failed to decode {}", args.file.display()))?;

    println!(
        "Stream: {} message{}, {} bytes",
        messages.len(),
        plural(messages.len()),
        bytes.len()
    );

    for (idx, message) in messages.iter().enumerate() {
        if let Some(target) = args.message
            && idx != target
        {
            continue;
        }

        let value = message.handle.get();
        println!(
            "Message {idx} @ 0x{:04x} ({} byte{}): {}",
            message.offset,
            message.len,
            plural(message.len),
            value.type_name()
        );
        println!("         {}", truncate(&value.to_string(), args.width));

        if args.show_hex {
            println!("         Hex dump:");
            hex_dump(&bytes[message.offset..message.offset + message.len]);
        }
    }

    Ok(())
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

fn truncate(text: &str, width: usize) -> String {
    if width == 0 || text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width).collect();
    out.push('…');
    out
}

fn hex_dump(raw: &[u8]) {
    for (i, chunk) in raw.chunks(16).enumerate() {
        let offset = i * 16;
        let hex: String = chunk
            .iter()
            .fold(String::with_capacity(chunk.len() * 3), |mut s, b| {
                use std::fmt::Write as _;
                if !s.is_empty() {
                    s.push(' ');
                }
                let _ = write!(s, "{b:02x}");
                s
            });
        let ascii: String = chunk
            .iter()
            .map(|&b| if b.is_ascii_graphic() { b as char } else { '.' })
            .collect();
        println!("           {offset:04x}  {hex:<48}  {ascii}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_width() {
        assert_eq!(truncate("abcdef", 0), "abcdef");
        assert_eq!(truncate("abcdef", 6), "abcdef");
        assert_eq!(truncate("abcdef", 3), "abc…");
    }
}
