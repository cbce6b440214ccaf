//! Command line argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Cabinets - read, create, delete and list content anywhere
#[derive(Parser, Debug)]
#[command(name = "cabinets")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Read a resource and print it (values as JSON, raw content as bytes)
    Read {
        /// Resource URI or local path
        uri: String,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Create or replace a resource
    Create {
        /// Resource URI or local path
        uri: String,

        /// Content as a JSON value
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        data: Option<String>,

        /// Local file whose content is copied, decoded by its extension
        #[arg(long)]
        file: Option<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Delete a resource
    Delete {
        /// Resource URI or local path
        uri: String,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// List the entries directly inside a directory or prefix
    List {
        /// Directory URI or local path
        uri: String,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Print the registered protocols and extensions
    Keys,
}

#[derive(Args, Debug, Default)]
pub(crate) struct CommonArgs {
    /// Parser selector: default, raw, or a registered extension
    #[arg(short, long, default_value = "default")]
    pub parser: String,

    /// Option passed to the backend and parser (key=value, repeatable)
    #[arg(short = 'o', long = "option", value_name = "KEY=VALUE")]
    pub options: Vec<String>,
}
