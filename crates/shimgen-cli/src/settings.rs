//! Layered configuration: built-in defaults, then `shimgen.toml` (or `--config-file`), then
//! `-c KEY=VALUE` arguments, then the dedicated command-line flags.

use std::collections::BTreeMap;
use std::path::Path;

use config::FileFormat::Toml;
use serde::Deserialize;
use shimgen_ast::naming::NamingConfig;
use shimgen_ast::{HostType, TypeTable};
use shimgen_codegen::GenerateOptions;

use crate::cli::GenerateArgs;
use crate::error::CliError;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "shimgen.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub naming: NamingSettings,
    #[serde(default)]
    pub library: Option<String>,
    #[serde(default)]
    pub include: Option<String>,
    /// C type name to host type name, e.g. `real = "f64"`.
    #[serde(default)]
    pub types: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamingSettings {
    pub shim_suffix: String,
    pub alloc_prefix: String,
    pub free_prefix: String,
}

impl Settings {
    pub fn naming(&self) -> NamingConfig {
        NamingConfig::new()
            .with_shim_suffix(&self.naming.shim_suffix)
            .with_alloc_prefix(&self.naming.alloc_prefix)
            .with_free_prefix(&self.naming.free_prefix)
    }

    /// The standard table extended with the `[types]` entries.
    pub fn type_table(&self) -> Result<TypeTable, CliError> {
        let mut table = TypeTable::standard();
        for (c_name, host) in &self.types {
            let ty: HostType = host.parse().map_err(|source| CliError::HostType {
                c_name: c_name.clone(),
                source,
            })?;
            table.insert(c_name, ty);
        }
        Ok(table)
    }

    /// Options for generating from `header`.
    pub fn generate_options(&self, header: &Path) -> Result<GenerateOptions, CliError> {
        let mut options = GenerateOptions::for_header(&header.to_string_lossy())
            .with_naming(self.naming())
            .with_type_table(self.type_table()?);
        if let Some(library) = &self.library {
            options = options.with_library_name(library);
        }
        if let Some(include) = &self.include {
            options = options.with_header_include(include);
        }
        Ok(options)
    }
}

/// Load settings for one run. `working_dir` is where `shimgen.toml` is looked up.
pub fn load_settings(args: &GenerateArgs, working_dir: &Path) -> Result<Settings, CliError> {
    let mut builder = config::Config::builder().add_source(config::File::from_str(
        include_str!("../default_config.toml"),
        Toml,
    ));
    builder = match &args.config_file {
        Some(path) => builder.add_source(config::File::from(path.clone()).format(Toml)),
        None => builder.add_source(
            config::File::from(working_dir.join(CONFIG_FILE_NAME))
                .format(Toml)
                .required(false),
        ),
    };
    for entry in &args.config {
        let Some((name, value)) = entry.split_once('=') else {
            return Err(CliError::InvalidOverride(entry.clone()));
        };
        builder = builder.set_override(name, value)?;
    }
    if let Some(library) = &args.library {
        builder = builder.set_override("library", library.as_str())?;
    }
    if let Some(include) = &args.include {
        builder = builder.set_override("include", include.as_str())?;
    }

    let settings: Settings = builder.build()?.try_deserialize()?;
    tracing::debug!(?settings, "configuration loaded");
    Ok(settings)
}
