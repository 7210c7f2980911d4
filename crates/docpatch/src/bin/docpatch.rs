//! `docpatch`: apply patches to, and read paths from, a JSON document.
//!
//! Usage:
//!   docpatch apply '<patch-array-json>' [--ensure-keys]
//!   docpatch apply @patches.json
//!   docpatch get 'items[_key=="a"].title'
//!
//! The document is read from stdin.

use std::io::{self, Read, Write};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use docpatch::cli::{apply_patch_json, get_path_json};
use docpatch::ApplyOptions;

#[derive(Parser, Debug)]
#[command(name = "docpatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a patch list to the document on stdin
    Apply {
        /// Patch array as JSON, or `@file` to read it from a file
        patches: String,

        /// Give keyless array members a generated `_key`
        #[arg(long)]
        ensure_keys: bool,
    },

    /// Print the value at a path, e.g. `items[_key=="a"].title`
    Get {
        path: String,
    },
}

fn read_stdin() -> anyhow::Result<String> {
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read document from stdin")?;
    Ok(buf)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let output = match cli.command {
        Command::Apply {
            patches,
            ensure_keys,
        } => {
            let patches = match patches.strip_prefix('@') {
                Some(file) => std::fs::read_to_string(file)
                    .with_context(|| format!("failed to read patches from {file}"))?,
                None => patches,
            };
            let options = ApplyOptions {
                ensure_keys,
                ..ApplyOptions::default()
            };
            apply_patch_json(read_stdin()?.trim(), &patches, &options)?
        }
        Command::Get { path } => get_path_json(read_stdin()?.trim(), &path)?,
    };

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{output}")?;
    Ok(())
}
