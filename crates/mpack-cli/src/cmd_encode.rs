/// Implementation of `mpack encode`.
///
/// Parses a JSON document and writes it as msgpack. Without `--each` the
/// whole document is one message; with `--each` a top-level array is
/// written as one message per element, producing a concatenated stream.
///
/// # Mapping
///
/// ```text
/// ┌──────────────┬──────────────────────────────────────────────┐
/// │ JSON         │ msgpack                                      │
/// ├──────────────┼──────────────────────────────────────────────┤
/// │ null         │ nil                                          │
/// │ true / false │ bool                                         │
/// │ integer      │ smallest fixint / uint / int encoding        │
/// │ other number │ float64                                      │
/// │ string       │ str                                          │
/// │ array        │ array                                        │
/// │ object       │ map with str keys                            │
/// └──────────────┴──────────────────────────────────────────────┘
/// ```
use std::fs::{self, File};
use std::io::{BufWriter, Write as _};

use anyhow::{Context, Result, bail};
use mpack_encoder::Packer;
use mpack_zone::Zone;
use serde_json::Value as Json;

use crate::EncodeArgs;
use crate::json::from_json;

/// Run the `mpack encode` command.
///
/// # Errors
///
/// Returns an error if the input cannot be read or parsed as JSON, `--each`
/// is given for a non-array document, or the output cannot be written.
pub fn run(args: &EncodeArgs) -> Result<()> {
    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("cannot read {}", args.input.display()))?;
    let doc: Json = serde_json::from_str(&text)
        .with_context(|| format!("invalid JSON in {}", args.input.display()))?;

    let messages: Vec<&Json> = if args.each {
        let Json::Array(items) = &doc else {
            bail!("--each needs a top-level JSON array");
        };
        items.iter().collect()
    } else {
        vec![&doc]
    };

    let file = File::create(&args.output)
        .with_context(|| format!("cannot create {}", args.output.display()))?;
    let mut packer = Packer::new(BufWriter::new(file));

    let mut zone = Zone::new();
    for (idx, message) in messages.iter().enumerate() {
        {
            let value = from_json(message, &zone)
                .with_context(|| format!("cannot build message {idx}"))?;
            packer
                .pack_value(&value)
                .with_context(|| format!("cannot encode message {idx}"))?;
        }
        zone.clear();
    }

    packer
        .into_inner()
        .flush()
        .with_context(|| format!("cannot write {}", args.output.display()))?;

    println!(
        "wrote {} message{} to {}",
        messages.len(),
        if messages.len() == 1 { "" } else { "s" },
        args.output.display()
    );
    Ok(())
}
