//! Classes, constants, fields and methods staged for emission.
//!
//! Classes are only ever appended to. Member names have to be unique per class and
//! kind of member, see [`Class::add_constant`].

use indexmap::{IndexMap, IndexSet};
use std::fmt;

use super::error;

/// Constant aliasing the default value of an enumeration.
pub const DEFAULT_MARKER: &str = "__default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    String,
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    UnsignedByte,
    UnsignedShort,
    UnsignedInt,
    UnsignedLong,
    Integer,
    Float,
    Double,
    Decimal,
    DateTime,
    Binary,
    Any,
}

impl Primitive {
    /// Maps a built-in XML Schema datatype name, without prefix.
    pub fn from_xsd(name: &str) -> Option<Self> {
        let primitive = match name {
            "string" | "normalizedString" | "token" | "language" | "Name" | "NCName" | "ID"
            | "IDREF" | "IDREFS" | "ENTITY" | "ENTITIES" | "NMTOKEN" | "NMTOKENS" | "anyURI"
            | "QName" | "NOTATION" => Self::String,
            "boolean" => Self::Boolean,
            "byte" => Self::Byte,
            "short" => Self::Short,
            "int" => Self::Int,
            "long" => Self::Long,
            "unsignedByte" => Self::UnsignedByte,
            "unsignedShort" => Self::UnsignedShort,
            "unsignedInt" => Self::UnsignedInt,
            "unsignedLong" => Self::UnsignedLong,
            "integer" | "nonNegativeInteger" | "positiveInteger" | "nonPositiveInteger"
            | "negativeInteger" => Self::Integer,
            "float" => Self::Float,
            "double" => Self::Double,
            "decimal" => Self::Decimal,
            "dateTime" | "date" | "time" | "duration" | "gYear" | "gYearMonth" | "gMonth"
            | "gMonthDay" | "gDay" => Self::DateTime,
            "base64Binary" | "hexBinary" => Self::Binary,
            "anyType" | "anySimpleType" => Self::Any,
            _ => return None,
        };

        Some(primitive)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    Primitive(Primitive),
    Class(String),
    Array(Box<TypeRef>),
    Optional(Box<TypeRef>),
    Tuple(Vec<TypeRef>),
}

impl TypeRef {
    pub fn class(identifier: impl Into<String>) -> Self {
        Self::Class(identifier.into())
    }

    pub fn array(self) -> Self {
        Self::Array(Box::new(self))
    }

    pub fn optional(self) -> Self {
        Self::Optional(Box::new(self))
    }
}

/// Datatype declared by the restriction of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datatype {
    String,
    Integer,
    Other(String),
}

impl Datatype {
    pub fn from_restriction(restriction: &str) -> Self {
        match restriction {
            "string" => Self::String,
            "integer" => Self::Integer,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn type_ref(&self) -> TypeRef {
        match self {
            Self::String => TypeRef::Primitive(Primitive::String),
            Self::Integer => TypeRef::Primitive(Primitive::Integer),
            Self::Other(name) => {
                TypeRef::Primitive(Primitive::from_xsd(name).unwrap_or(Primitive::String))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Text(String),
    Integer(i64),
    Null,
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{}", text),
            Self::Integer(value) => write!(f, "{}", value),
            Self::Null => write!(f, "null"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Literal(Literal),
    /// Refers to another constant of the same class.
    Alias(String),
    List(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    pub name: String,
    pub value: ConstantValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub visibility: Visibility,
    pub name: String,
    /// Element name in the schema.
    pub xml_name: String,
    pub ty: TypeRef,
    pub docs: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: TypeRef,
    /// Constant of the class used when the argument is omitted.
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MethodBody {
    /// Initializes the fields named by the parameters, the others are left empty.
    Construct,
    Get { field: String },
    ToString { field: String },
    /// Calls the service operation with that name.
    Operation { name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub visibility: Visibility,
    pub name: String,
    pub params: Vec<Param>,
    pub returns: Option<TypeRef>,
    pub body: MethodBody,
    pub docs: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassKind {
    Struct,
    Enum(Datatype),
    Alias(TypeRef),
    Service,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    pub identifier: String,
    pub xml_name: String,
    pub namespace: String,
    pub kind: ClassKind,
    pub extends: Option<TypeRef>,
    pub is_abstract: bool,
    pub docs: Option<String>,
    /// Classes this one reaches again through its members. Members of those types are boxed.
    pub cyclic: IndexSet<String>,

    constants: IndexMap<String, Constant>,
    fields: IndexMap<String, Field>,
    methods: IndexMap<String, Method>,
}

impl Class {
    pub fn new(identifier: impl Into<String>, xml_name: impl Into<String>, kind: ClassKind) -> Self {
        Self {
            identifier: identifier.into(),
            xml_name: xml_name.into(),
            namespace: String::new(),
            kind,
            extends: None,
            is_abstract: false,
            docs: None,
            cyclic: IndexSet::new(),
            constants: IndexMap::new(),
            fields: IndexMap::new(),
            methods: IndexMap::new(),
        }
    }

    fn duplicate(&self, member: &str) -> error::Error {
        error::Error::DuplicateMember {
            class: self.identifier.clone(),
            member: member.to_owned(),
        }
    }

    pub fn add_constant(
        &mut self,
        name: impl Into<String>,
        value: ConstantValue,
    ) -> Result<(), error::Error> {
        let name = name.into();

        if self.constants.contains_key(&name) {
            return Err(self.duplicate(&name));
        }

        self.constants.insert(name.clone(), Constant { name, value });
        Ok(())
    }

    pub fn add_field(&mut self, field: Field) -> Result<(), error::Error> {
        if self.fields.contains_key(&field.name) {
            return Err(self.duplicate(&field.name));
        }

        self.fields.insert(field.name.clone(), field);
        Ok(())
    }

    pub fn add_method(&mut self, method: Method) -> Result<(), error::Error> {
        if self.methods.contains_key(&method.name) {
            return Err(self.duplicate(&method.name));
        }

        self.methods.insert(method.name.clone(), method);
        Ok(())
    }

    pub fn constants(&self) -> impl Iterator<Item = &Constant> {
        self.constants.values()
    }

    pub fn constant(&self, name: &str) -> Option<&Constant> {
        self.constants.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.methods.values()
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }
}

/// Whether the derived model of a builder has been produced yet.
#[derive(Debug, Clone)]
pub enum BuildState<T> {
    Unbuilt,
    Built(T),
}

impl<T> Default for BuildState<T> {
    fn default() -> Self {
        Self::Unbuilt
    }
}

impl<T> BuildState<T> {
    pub fn built(&self) -> Option<&T> {
        match self {
            Self::Built(model) => Some(model),
            Self::Unbuilt => None,
        }
    }

    pub fn into_built(self) -> Option<T> {
        match self {
            Self::Built(model) => Some(model),
            Self::Unbuilt => None,
        }
    }

    /// Runs `build` once. Building again is an [`error::Error::AlreadyBuilt`].
    pub(crate) fn build(
        &mut self,
        identifier: &str,
        build: impl FnOnce() -> Result<T, error::Error>,
    ) -> Result<&T, error::Error> {
        if let Self::Unbuilt = self {
            *self = Self::Built(build()?);

            if let Self::Built(model) = self {
                return Ok(model);
            }
        }

        Err(error::Error::AlreadyBuilt {
            identifier: identifier.to_owned(),
        })
    }
}

/// Everything generated for one service document.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub classes: Vec<Class>,
    pub service: Option<Class>,
}
