use wsdlgen_wsdl::ServiceDocument;

mod codegen;
mod complex;
mod emit;
mod enumeration;

pub mod assembler;
pub mod config;
pub mod error;
pub mod model;
pub mod validator;

pub use codegen::Codegen;
pub use complex::ComplexType;
pub use config::{CacheMode, Config};
pub use emit::{pending, OutputFile};
pub use enumeration::{Enum, EnumEntry, EnumModel};

pub fn from_url<S: AsRef<str>>(url: S, config: &Config) -> Result<Vec<OutputFile>, error::Error> {
    let document = ServiceDocument::load(url)?;
    from_document(&document, config)
}

pub fn from_document(
    document: &ServiceDocument,
    config: &Config,
) -> Result<Vec<OutputFile>, error::Error> {
    let model = assembler::assemble(document, config)?;
    emit::emit(&model, config)
}
