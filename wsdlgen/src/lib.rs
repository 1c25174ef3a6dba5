use std::{fs, path::PathBuf};

use structopt::StructOpt;
use thiserror::Error;
use tracing::{info, warn};

use wsdlgen_codegen::{self as codegen, CacheMode, Config};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Error generating code")]
    CodegenError(#[from] codegen::error::Error),

    #[error("Error writing {path}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO Error")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, StructOpt)]
#[structopt(about = "Generates Rust types and a service trait from a WSDL document")]
pub struct Args {
    /// URL or path of the WSDL document.
    pub input: String,

    #[structopt(short, long, default_value = "./generated", parse(from_os_str))]
    pub output: PathBuf,

    /// Module the generated code is placed in.
    #[structopt(short, long)]
    pub namespace: Option<String>,

    /// Client feature recorded on the service, may be repeated.
    #[structopt(long = "feature")]
    pub features: Vec<String>,

    /// One of the WSDL_CACHE_* modes.
    #[structopt(long, default_value = "WSDL_CACHE_NONE", parse(from_str))]
    pub cache: CacheMode,

    #[structopt(long)]
    pub compression: Option<String>,

    #[structopt(long)]
    pub one_file: bool,

    /// Keep files that already exist in the output directory.
    #[structopt(long)]
    pub class_exists: bool,

    /// Skip types with invalid enumeration values instead of failing.
    #[structopt(long = "skip-invalid")]
    pub skip_invalid_types: bool,
}

impl Args {
    pub fn config(&self) -> Config {
        Config {
            namespace: self.namespace.clone(),
            features: self.features.clone(),
            cache: self.cache,
            compression: self.compression.clone(),
            one_file: self.one_file,
            class_exists: self.class_exists,
            skip_invalid_types: self.skip_invalid_types,
        }
    }
}

/// Generates the code for `args.input` and writes it below `args.output`.
///
/// Returns the paths written.
pub fn run(args: &Args) -> Result<Vec<PathBuf>, Error> {
    let config = args.config();
    let files = codegen::from_url(&args.input, &config)?;

    let exists = |path: &PathBuf| config.class_exists && args.output.join(path).exists();
    let mut written = Vec::new();

    for file in codegen::pending(&files, exists) {
        let path = args.output.join(&file.path);
        let io_error = |source: std::io::Error| Error::IoError {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        fs::write(&path, &file.contents).map_err(io_error)?;
        info!("wrote {}", path.display());
        written.push(path);
    }

    if written.len() < files.len() {
        warn!("kept {} existing files", files.len() - written.len());
    }

    Ok(written)
}
