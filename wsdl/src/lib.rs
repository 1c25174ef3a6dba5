use std::path::Path;
use url::Url;

mod parser;
mod xpath;

pub mod document;
pub mod error;
pub mod operation;
pub mod service;
pub mod types;
pub mod xml;

pub use document::ServiceDocument;
pub use operation::{Introspector, OperationDescriptor, SignatureProvider};
pub use service::ServiceDescriptor;
pub use types::{TypeDescriptor, TypeRef};
pub use xml::{Document, SchemaNode};

/// Turns a URL or a local path into a URL.
pub fn resolve<S: AsRef<str>>(location: S) -> Result<Url, error::Error> {
    match Url::parse(location.as_ref()) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::from_file_path(
            &Path::new(location.as_ref())
                .canonicalize()
                .map_err(|err| error::Error::PathConversionError(Some(err)))?,
        )
        .map_err(|()| error::Error::PathConversionError(None)),
        Err(err) => Err(err.into()),
    }
}

/// Loads the document at `location` and every schema it imports or includes.
pub fn load<S: AsRef<str>>(location: S) -> Result<Document, error::Error> {
    parser::parse(resolve(location)?)
}
