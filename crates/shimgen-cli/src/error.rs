use std::io;
use std::path::PathBuf;

use shimgen_ast::types::UnknownHostType;
use shimgen_codegen::GenerateError;
use shimgen_parser::ParseError;
use thiserror::Error;

/// Any failure of the `shimgen` binary.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("failed to parse config value {0:?}; no '=' found")]
    InvalidOverride(String),
    #[error("configuration error: type '{c_name}': {source}")]
    HostType {
        c_name: String,
        #[source]
        source: UnknownHostType,
    },
}

impl CliError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Generate(GenerateError::Parse(ParseError::Syntax { .. })) => 1,
            CliError::Generate(GenerateError::Parse(ParseError::UnterminatedMacroBlock { .. })) => 3,
            CliError::Generate(GenerateError::Analysis(_)) => 2,
            CliError::Generate(GenerateError::Codegen(_))
            | CliError::Read { .. }
            | CliError::Write { .. }
            | CliError::Config(_)
            | CliError::InvalidOverride(_)
            | CliError::HostType { .. } => 4,
        }
    }
}
