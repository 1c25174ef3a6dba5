use thiserror::Error;

/// An enumeration value that does not fit the declared datatype.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("The value ({0}) is not a string but the restriction demands it")]
    NotText(String),

    #[error("The value ({0}) is not an integer but the restriction demands it")]
    NotInteger(String),

    #[error("The value is null")]
    Null,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Error reading WSDL")]
    WsdlError(#[from] wsdlgen_wsdl::error::Error),

    #[error("Invalid enumeration value in {identifier}")]
    InvalidValue {
        identifier: String,
        #[source]
        source: ValidationError,
    },

    #[error("The class {identifier} has already been generated")]
    AlreadyBuilt { identifier: String },

    #[error("The class {class} already has a member named {member}")]
    DuplicateMember { class: String, member: String },

    #[error("Generated code for {identifier} is not valid Rust")]
    SyntaxError {
        identifier: String,
        #[source]
        source: syn::Error,
    },
}
