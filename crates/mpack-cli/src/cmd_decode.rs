/// Implementation of `mpack decode`.
///
/// Decodes every message of a stream and writes each as one JSON document
/// per line (or pretty-printed with `--pretty`), to stdout or `-o <file>`.
/// See [`to_json`](crate::json::to_json) for how values map onto JSON.
use std::fs::File;
use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};

use crate::DecodeArgs;
use crate::json::to_json;
use crate::source::{open, read_messages};

/// Run the `mpack decode` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read, any message fails to
/// decode, or the output cannot be written.
pub fn run(args: &DecodeArgs) -> Result<()> {
    let messages = read_messages(open(&args.file)?, args.limits.config())
        .with_context(|| format!("failed to decode {}", args.file.display()))?;

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    for message in &messages {
        let json = to_json(&message.handle.get());
        if args.pretty {
            serde_json::to_writer_pretty(&mut out, &json)?;
        } else {
            serde_json::to_writer(&mut out, &json)?;
        }
        writeln!(out)?;
    }
    out.flush().context("cannot write output")?;
    Ok(())
}
