/// Implementation of `mpack stats`.
///
/// Decodes a stream and reports message count, byte totals, deepest
/// nesting, and how often each tag occurs, in first-seen order.
///
/// # Example output
///
/// ```text
/// File:      /tmp/events.mp  (4213 bytes)
/// Messages:  120 (largest 61 bytes)
/// Max depth: 3
/// Payload:   2874 bytes in str/bin/ext
///
/// Tag                   Count
/// ────────────────────────────
/// map                     120
/// str                    1080
/// positive integer        480
/// array                   120
/// ────────────────────────────
/// Total                  1800
/// ```
use std::collections::HashMap;
use std::fs;

use anyhow::{Context, Result};
use mpack_types::Value;
use serde::Serialize;

use crate::StatsArgs;
use crate::source::read_messages;

/// Aggregated figures for one stream; also the `--json` output shape.
#[derive(Debug, Default, Serialize)]
pub struct StreamStats {
    pub file_bytes: usize,
    pub messages: usize,
    pub largest_message: usize,
    pub max_depth: usize,
    pub payload_bytes: usize,
    pub tags: Vec<TagCount>,
}

#[derive(Debug, Serialize)]
pub struct TagCount {
    pub tag: &'static str,
    pub count: usize,
}

/// Run the `mpack stats` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or any message fails to
/// decode.
pub fn run(args: &StatsArgs) -> Result<()> {
    let bytes =
        fs::read(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;
    let messages = read_messages(&bytes[..], args.limits.config())
        .with_context(|| format!("failed to decode {}", args.file.display()))?;

    let mut tally = Tally::default();
    let mut stats = StreamStats {
        file_bytes: bytes.len(),
        messages: messages.len(),
        ..StreamStats::default()
    };
    for message in &messages {
        stats.largest_message = stats.largest_message.max(message.len);
        let depth = tally.walk(&message.handle.get(), 0);
        stats.max_depth = stats.max_depth.max(depth);
    }
    stats.payload_bytes = tally.payload_bytes;
    stats.tags = tally.into_counts();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("File:      {}  ({} bytes)", args.file.display(), stats.file_bytes);
    println!(
        "Messages:  {} (largest {} bytes)",
        stats.messages, stats.largest_message
    );
    println!("Max depth: {}", stats.max_depth);
    println!("Payload:   {} bytes in str/bin/ext", stats.payload_bytes);
    println!();

    let sep = "─".repeat(28);
    println!("{:<20}{:>8}", "Tag", "Count");
    println!("{sep}");
    for TagCount { tag, count } in &stats.tags {
        println!("{tag:<20}{count:>8}");
    }
    println!("{sep}");
    let total: usize = stats.tags.iter().map(|t| t.count).sum();
    println!("{:<20}{total:>8}", "Total");

    Ok(())
}

#[derive(Default)]
struct Tally {
    counts: HashMap<&'static str, usize>,
    order: Vec<&'static str>,
    payload_bytes: usize,
}

impl Tally {
    /// Count `value` and its children; returns the nesting depth below it.
    fn walk(&mut self, value: &Value<'_>, depth: usize) -> usize {
        let tag = value.type_name();
        *self.counts.entry(tag).or_insert_with(|| {
            self.order.push(tag);
            0
        }) += 1;

        if let Some(payload) = value.as_payload() {
            self.payload_bytes += payload.len();
        }

        match *value {
            Value::Array(items) if !items.is_empty() => items
                .iter()
                .map(|item| self.walk(item, depth + 1))
                .max()
                .unwrap_or(depth + 1),
            Value::Map(pairs) if !pairs.is_empty() => pairs
                .iter()
                .map(|(k, v)| self.walk(k, depth + 1).max(self.walk(v, depth + 1)))
                .max()
                .unwrap_or(depth + 1),
            Value::Array(_) | Value::Map(_) => depth + 1,
            _ => depth,
        }
    }

    fn into_counts(self) -> Vec<TagCount> {
        self.order
            .into_iter()
            .map(|tag| TagCount {
                tag,
                count: self.counts[tag],
            })
            .collect()
    }
}
