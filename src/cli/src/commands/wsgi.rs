//! Latin-1 coercion commands.

use anyhow::{Context, Result};
use clap::Subcommand;
use jobwire_core::wsgi::{bytes_to_wsgi, wsgi_to_bytes};
use serde_json::json;

use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum WsgiCommands {
    /// Encode text to bytes, printed as hex
    Encode {
        /// Text made of characters U+0000 to U+00FF
        text: String,
    },

    /// Decode hex-encoded bytes to text
    Decode {
        /// Hex digits, two per byte
        digits: String,
    },
}

pub fn execute(cmd: WsgiCommands, format: OutputFormat) -> Result<()> {
    match cmd {
        WsgiCommands::Encode { text } => {
            let bytes = wsgi_to_bytes(text.as_str())?;
            match format {
                OutputFormat::Table => output::print_success(&hex::encode(&bytes)),
                _ => {
                    let encoded = json!({ "text": text, "hex": hex::encode(&bytes) });
                    output::print_item(&encoded, format)?
                }
            }
        }
        WsgiCommands::Decode { digits } => {
            let bytes = hex::decode(digits.trim()).context("Invalid hex input")?;
            let text = bytes_to_wsgi(bytes)?;
            match format {
                OutputFormat::Table => output::print_success(&text),
                _ => output::print_item(&json!({ "hex": digits, "text": text }), format)?,
            }
        }
    }
    Ok(())
}
