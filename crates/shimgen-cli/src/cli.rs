//! Command-line arguments for the `shimgen` binary.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "shimgen")]
#[command(about = "Generate pointer-based C shims and bun:ffi bindings from a C header", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse a header and write the binding module and the C shim
    Generate(GenerateArgs),
}

impl Cli {
    pub fn verbose(&self) -> bool {
        match &self.command {
            Command::Generate(args) => args.verbose,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// C header to read
    #[arg(value_name = "HEADER")]
    pub header: PathBuf,

    /// Where to write the TypeScript bindings
    #[arg(value_name = "BINDINGS_OUT")]
    pub bindings_out: PathBuf,

    /// Where to write the C shim
    #[arg(value_name = "SHIM_OUT")]
    pub shim_out: PathBuf,

    /// Shared library base name the bindings load (default: derived from the header)
    #[arg(long, value_name = "NAME")]
    pub library: Option<String>,

    /// Header name the shim includes (default: the header's file name)
    #[arg(long, value_name = "NAME")]
    pub include: Option<String>,

    /// Configuration file to use instead of ./shimgen.toml
    #[arg(long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Set a configuration value; format $NAME=$VALUE.
    #[arg(long, short)]
    pub config: Vec<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_args() {
        let cli = Cli::parse_from([
            "shimgen",
            "generate",
            "raylib.h",
            "out/raylib.ts",
            "out/raylib_shim.c",
            "--library",
            "raylib_shim",
            "-c",
            "naming.shim_suffix=_byref",
            "--config",
            "types.real=f64",
            "-v",
        ]);
        assert!(cli.verbose());
        let Command::Generate(args) = cli.command;
        assert_eq!(args.header, PathBuf::from("raylib.h"));
        assert_eq!(args.bindings_out, PathBuf::from("out/raylib.ts"));
        assert_eq!(args.shim_out, PathBuf::from("out/raylib_shim.c"));
        assert_eq!(args.library.as_deref(), Some("raylib_shim"));
        assert_eq!(args.include, None);
        assert_eq!(args.config, vec!["naming.shim_suffix=_byref", "types.real=f64"]);
    }

    #[test]
    fn test_missing_outputs_rejected() {
        assert!(Cli::try_parse_from(["shimgen", "generate", "raylib.h"]).is_err());
    }
}
