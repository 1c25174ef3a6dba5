use tracing::trace;

use super::{
    error::{Error, ValidationError},
    model::{
        BuildState, Class, ClassKind, ConstantValue, Datatype, Field, Literal, Method, MethodBody,
        Param, Primitive, TypeRef, Visibility, DEFAULT_MARKER,
    },
    validator,
};

const VALUE_FIELD: &str = "value";

#[derive(Debug, Clone, PartialEq)]
pub struct EnumEntry {
    pub identifier: String,
    pub value: Literal,
}

/// The class derived from a finished enumeration.
#[derive(Debug, Clone)]
pub struct EnumModel {
    entries: Vec<EnumEntry>,
    class: Class,
}

impl EnumModel {
    pub fn entries(&self) -> &[EnumEntry] {
        &self.entries
    }

    /// Identifier of the value a new instance starts with.
    pub fn default_identifier(&self) -> Option<&str> {
        self.entries.first().map(|entry| entry.identifier.as_str())
    }

    pub fn class(&self) -> &Class {
        &self.class
    }

    pub fn into_class(self) -> Class {
        self.class
    }
}

/// A restricted simple type with a fixed set of values.
///
/// Values are collected with [`Enum::add_value`] and then turned into a class once
/// by [`Enum::build_model`].
#[derive(Debug, Clone)]
pub struct Enum {
    identifier: String,
    xml_name: String,
    namespace: String,
    datatype: Datatype,
    docs: Option<String>,
    values: Vec<Literal>,
    state: BuildState<EnumModel>,
}

impl Enum {
    pub fn new(
        identifier: impl Into<String>,
        xml_name: impl Into<String>,
        restriction: &str,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            xml_name: xml_name.into(),
            namespace: String::new(),
            datatype: Datatype::from_restriction(restriction),
            docs: None,
            values: Vec::new(),
            state: BuildState::Unbuilt,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_docs(mut self, docs: Option<String>) -> Self {
        self.docs = docs;
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn datatype(&self) -> &Datatype {
        &self.datatype
    }

    pub fn values(&self) -> &[Literal] {
        &self.values
    }

    pub fn model(&self) -> Option<&EnumModel> {
        self.state.built()
    }

    pub fn into_model(self) -> Option<EnumModel> {
        self.state.into_built()
    }

    /// Checks `value` against the datatype and keeps it.
    ///
    /// Integer enumerations accept text that parses as an integer once trimmed.
    pub fn add_value(&mut self, value: impl Into<Literal>) -> Result<(), ValidationError> {
        let value = match (&self.datatype, value.into()) {
            (Datatype::String, Literal::Text(text)) => Literal::Text(text),
            (Datatype::String, other) => return Err(ValidationError::NotText(other.to_string())),

            (Datatype::Integer, Literal::Integer(value)) => Literal::Integer(value),
            (Datatype::Integer, Literal::Text(text)) => match text.trim().parse() {
                Ok(value) => Literal::Integer(value),
                Err(_) => return Err(ValidationError::NotInteger(text)),
            },
            (Datatype::Integer, other) => {
                return Err(ValidationError::NotInteger(other.to_string()))
            }

            (Datatype::Other(_), Literal::Null) => return Err(ValidationError::Null),
            (Datatype::Other(_), value) => value,
        };

        trace!("{} = {}", self.identifier, value);
        self.values.push(value);
        Ok(())
    }

    /// The accepted values joined with `", "`.
    pub fn valid_values(&self) -> String {
        self.values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn build_model(&mut self) -> Result<&EnumModel, Error> {
        self.state.build(&self.identifier, || {
            let mut entries: Vec<EnumEntry> = Vec::new();

            for value in &self.values {
                let name = validator::validate_unique(
                    &validator::validate_constant(&value.to_string()),
                    |candidate| entries.iter().all(|entry| entry.identifier != candidate),
                );

                entries.push(EnumEntry {
                    identifier: name,
                    value: value.clone(),
                });
            }

            let mut class = Class::new(
                self.identifier.clone(),
                self.xml_name.clone(),
                ClassKind::Enum(self.datatype.clone()),
            );
            class.namespace = self.namespace.clone();
            class.docs = self.docs.clone();

            if let Some(first) = entries.first() {
                class.add_constant(DEFAULT_MARKER, ConstantValue::Alias(first.identifier.clone()))?;
            }

            for entry in &entries {
                class.add_constant(&entry.identifier, ConstantValue::Literal(entry.value.clone()))?;
            }

            let value_ty = self.datatype.type_ref();

            class.add_field(Field {
                visibility: Visibility::Private,
                name: VALUE_FIELD.to_owned(),
                xml_name: VALUE_FIELD.to_owned(),
                ty: value_ty.clone(),
                docs: None,
            })?;

            class.add_method(Method {
                visibility: Visibility::Public,
                name: "new".to_owned(),
                params: vec![Param {
                    name: VALUE_FIELD.to_owned(),
                    ty: TypeRef::class(self.identifier.clone()),
                    default: Some(DEFAULT_MARKER.to_owned()),
                }],
                returns: None,
                body: MethodBody::Construct,
                docs: None,
            })?;

            class.add_method(Method {
                visibility: Visibility::Public,
                name: VALUE_FIELD.to_owned(),
                params: Vec::new(),
                returns: Some(value_ty),
                body: MethodBody::Get {
                    field: VALUE_FIELD.to_owned(),
                },
                docs: None,
            })?;

            class.add_method(Method {
                visibility: Visibility::Public,
                name: "to_string".to_owned(),
                params: Vec::new(),
                returns: Some(TypeRef::Primitive(Primitive::String)),
                body: MethodBody::ToString {
                    field: VALUE_FIELD.to_owned(),
                },
                docs: None,
            })?;

            Ok(EnumModel { entries, class })
        })
    }
}
