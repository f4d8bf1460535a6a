mod cli;
mod error;
mod output;
mod settings;

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Command, GenerateArgs};
use error::CliError;
use shimgen_codegen::generate;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // -v forces debug; otherwise RUST_LOG, falling back to info.
    let filter = if cli.verbose() {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Command::Generate(args) => run_generate(args, Path::new(".")),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

/// Read the header, generate both outputs in memory, then write them together.
fn run_generate(args: &GenerateArgs, working_dir: &Path) -> Result<(), CliError> {
    let settings = settings::load_settings(args, working_dir)?;
    let options = settings.generate_options(&args.header)?;

    let source = fs::read_to_string(&args.header).map_err(|source| CliError::Read {
        path: args.header.clone(),
        source,
    })?;
    info!(
        header = %args.header.display(),
        library = %options.library_name,
        "generating bindings"
    );

    let generated = generate(&source, &options)?;

    output::write_outputs(&[
        (args.bindings_out.as_path(), generated.bindings.as_str()),
        (args.shim_out.as_path(), generated.shim.as_str()),
    ])?;
    info!(
        bindings = %args.bindings_out.display(),
        shim = %args.shim_out.display(),
        "done"
    );
    Ok(())
}
