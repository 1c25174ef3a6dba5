use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unable to load WSDL {location}")]
    Load {
        location: String,
        status: Option<u16>,
        #[source]
        source: Box<Error>,
    },

    #[error("Unable to parse provided URL")]
    UrlParseError(#[from] url::ParseError),

    #[error("Unable to convert provided path")]
    PathConversionError(Option<std::io::Error>),

    #[error("Unable to open file")]
    FileOpenError(quick_xml::Error),

    #[error("Unable to get file from server")]
    ReqwestError(#[from] reqwest::Error),

    #[error("Unsupported URL scheme {0}")]
    UnsupportedScheme(String),

    #[error("Error parsing XML input")]
    XmlParseError(#[from] quick_xml::Error),

    #[error("Element <{0}> is not closed")]
    UnclosedElement(String),

    #[error("Document has no root element")]
    EmptyDocument,

    #[error("Serialized XML is not valid UTF-8")]
    EncodingError(#[from] std::string::FromUtf8Error),

    #[error("Invalid path expression {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("Unknown namespace prefix {0:?} in path expression")]
    UnknownPrefix(String),

    #[error("Unable to introspect service: {0}")]
    IntrospectionError(String),

    #[error("Invalid operation signature {0:?}")]
    InvalidSignature(String),
}

impl Error {
    /// Transport status code carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Load { status, .. } => *status,
            Error::ReqwestError(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    pub(crate) fn load(location: impl Into<String>, source: Error) -> Self {
        Error::Load {
            location: location.into(),
            status: source.status(),
            source: Box::new(source),
        }
    }
}
