//! Service operations, as reported by a signature provider and matched against the
//! `<operation>` declarations of the WSDL.

use indexmap::IndexMap;
use std::sync::Arc;
use tracing::trace;

use super::{
    error,
    xml::{capitalize, Document, SchemaNode},
};

/// Lists the operations a SOAP client would expose for a service, one signature string
/// per operation, shaped like `ReturnType name(ParamType $param, ...)`.
pub trait SignatureProvider {
    fn list_operation_signatures(&self) -> Result<Vec<String>, error::Error>;
}

impl<F> SignatureProvider for F
where
    F: Fn() -> Result<Vec<String>, error::Error>,
{
    fn list_operation_signatures(&self) -> Result<Vec<String>, error::Error> {
        self()
    }
}

/// Signature provider reading the `portType` and `message` sections of the document.
#[derive(Debug, Clone)]
pub struct Introspector {
    signatures: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
struct Part {
    name: String,
    ty: String,
}

fn format_parts(parts: &[Part]) -> String {
    parts
        .iter()
        .map(|part| format!("{} ${}", part.ty, part.name))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Introspector {
    pub fn new(document: &Arc<Document>) -> Result<Self, error::Error> {
        if document.query("/wsdl:definitions", &[])?.is_empty() {
            return Err(error::Error::IntrospectionError(
                "document has no WSDL definitions".into(),
            ));
        }

        let elements: IndexMap<String, SchemaNode> = document
            .query("//s:schema/s:element[@name]", &[])?
            .into_iter()
            .rev()
            .filter_map(|element| Some((element.attribute("name")?.to_owned(), element)))
            .collect();

        let mut messages = IndexMap::new();

        for message in document.query("//wsdl:message[@name]", &[])? {
            let mut parts = Vec::new();

            for part in message.query("wsdl:part", &[])? {
                let ty = match (part.attribute_local("element"), part.attribute_local("type")) {
                    (Some(element), _) => match elements.get(element) {
                        Some(declaration) => match declaration.attribute_local("type") {
                            Some(ty) => ty.to_owned(),
                            None => capitalize(element),
                        },
                        None => element.to_owned(),
                    },
                    (None, Some(ty)) => ty.to_owned(),
                    (None, None) => "anyType".to_owned(),
                };

                parts.push(Part {
                    name: part.attribute("name").unwrap_or_default().to_owned(),
                    ty,
                });
            }

            let name = message.attribute("name").unwrap_or_default().to_owned();
            messages.entry(name).or_insert(parts);
        }

        let mut signatures = IndexMap::new();

        for operation in document.query("//wsdl:portType/wsdl:operation[@name]", &[])? {
            let name = operation.attribute("name").unwrap_or_default();

            if signatures.contains_key(name) {
                continue;
            }

            let parts_of = |direction: &str| -> Result<Vec<Part>, error::Error> {
                match operation.query(direction, &[])?.first() {
                    Some(node) => {
                        let message = node.attribute_local("message").unwrap_or_default();
                        messages.get(message).cloned().ok_or_else(|| {
                            error::Error::IntrospectionError(format!(
                                "missing <message> with name {:?}",
                                message
                            ))
                        })
                    }
                    None => Ok(Vec::new()),
                }
            };

            let input = parts_of("wsdl:input")?;
            let output = parts_of("wsdl:output")?;

            let return_type = match output.as_slice() {
                [] => "void".to_owned(),
                [part] => part.ty.clone(),
                parts => format!("list({})", format_parts(parts)),
            };

            let signature = format!("{} {}({})", return_type, name, format_parts(&input));
            trace!("introspected {}", signature);
            signatures.insert(name.to_owned(), signature);
        }

        Ok(Self {
            signatures: signatures.into_values().collect(),
        })
    }
}

impl SignatureProvider for Introspector {
    fn list_operation_signatures(&self) -> Result<Vec<String>, error::Error> {
        Ok(self.signatures.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub ty: String,
}

/// A parsed `ReturnType name(Type $param, ...)` signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub return_type: ReturnType,
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnType {
    Void,
    Single(String),
    List(Vec<Parameter>),
}

fn parse_parameters(list: &str, signature: &str) -> Result<Vec<Parameter>, error::Error> {
    list.split(',')
        .map(str::trim)
        .filter(|parameter| !parameter.is_empty())
        .map(|parameter| {
            let mut words = parameter.split_whitespace();

            match (words.next(), words.next(), words.next()) {
                (Some(ty), Some(name), None) => Ok(Parameter {
                    name: name.trim_start_matches('$').to_owned(),
                    ty: ty.to_owned(),
                }),
                (Some(name), None, None) if name.starts_with('$') => Ok(Parameter {
                    name: name.trim_start_matches('$').to_owned(),
                    ty: "anyType".to_owned(),
                }),
                _ => Err(error::Error::InvalidSignature(signature.to_owned())),
            }
        })
        .collect()
}

impl Signature {
    pub fn parse(signature: &str) -> Result<Self, error::Error> {
        let invalid = || error::Error::InvalidSignature(signature.to_owned());
        let trimmed = signature.trim();

        let (return_type, rest) = if let Some(list) = trimmed.strip_prefix("list(") {
            let end = list.find(')').ok_or_else(invalid)?;
            (
                ReturnType::List(parse_parameters(&list[..end], signature)?),
                &list[end + 1..],
            )
        } else {
            let (ty, rest) = trimmed.split_once(char::is_whitespace).ok_or_else(invalid)?;

            let return_type = match ty {
                "void" => ReturnType::Void,
                ty => ReturnType::Single(ty.to_owned()),
            };

            (return_type, rest)
        };

        let rest = rest.trim();
        let open = rest.find('(').ok_or_else(invalid)?;

        if !rest.ends_with(')') {
            return Err(invalid());
        }

        let name = rest[..open].trim();

        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(invalid());
        }

        Ok(Self {
            name: name.to_owned(),
            return_type,
            parameters: parse_parameters(&rest[open + 1..rest.len() - 1], signature)?,
        })
    }
}

/// An operation present both in the introspected signatures and in the WSDL.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    signature: Signature,
    node: SchemaNode,
}

impl OperationDescriptor {
    pub fn new(signature: Signature, node: SchemaNode) -> Self {
        Self { signature, node }
    }

    pub fn name(&self) -> &str {
        &self.signature.name
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.signature.parameters
    }

    pub fn return_type(&self) -> &ReturnType {
        &self.signature.return_type
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The matching `<operation>` declaration.
    pub fn node(&self) -> &SchemaNode {
        &self.node
    }

    pub fn documentation(&self) -> Option<String> {
        self.node
            .children()
            .find(|child| child.local_name() == "documentation")
            .map(|documentation| documentation.text().trim().to_owned())
            .filter(|text| !text.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parameter(name: &str, ty: &str) -> Parameter {
        Parameter {
            name: name.into(),
            ty: ty.into(),
        }
    }

    #[test]
    fn parses_signatures() {
        let signature = Signature::parse("GetWeatherResponse GetWeather(GetWeather $parameters)").unwrap();

        assert_eq!(
            signature,
            Signature {
                name: "GetWeather".into(),
                return_type: ReturnType::Single("GetWeatherResponse".into()),
                parameters: vec![parameter("parameters", "GetWeather")],
            }
        );
    }

    #[test]
    fn parses_void_and_list_returns() {
        let signature = Signature::parse("void Ping()").unwrap();
        assert_eq!(signature.return_type, ReturnType::Void);
        assert!(signature.parameters.is_empty());

        let signature = Signature::parse("list(int $sum, int $product) Calc(int $a, int $b)").unwrap();
        assert_eq!(signature.name, "Calc");
        assert_eq!(
            signature.return_type,
            ReturnType::List(vec![parameter("sum", "int"), parameter("product", "int")])
        );
        assert_eq!(
            signature.parameters,
            [parameter("a", "int"), parameter("b", "int")]
        );
    }

    #[test]
    fn rejects_malformed_signatures() {
        for signature in ["", "Ping", "void Ping", "void (int $a)", "void Ping(int a b)"] {
            assert!(
                matches!(Signature::parse(signature), Err(error::Error::InvalidSignature(_))),
                "{:?} should not parse",
                signature
            );
        }
    }

    const WSDL: &str = r#"
        <definitions xmlns="http://schemas.xmlsoap.org/wsdl/"
                     xmlns:xs="http://www.w3.org/2001/XMLSchema"
                     xmlns:tns="urn:calc" targetNamespace="urn:calc">
            <types>
                <xs:schema targetNamespace="urn:calc">
                    <xs:element name="add">
                        <xs:complexType><xs:sequence>
                            <xs:element name="a" type="xs:int"/>
                        </xs:sequence></xs:complexType>
                    </xs:element>
                    <xs:element name="addResult" type="tns:Sum"/>
                </xs:schema>
            </types>
            <message name="AddIn"><part name="parameters" element="tns:add"/></message>
            <message name="AddOut"><part name="parameters" element="tns:addResult"/></message>
            <message name="DivIn">
                <part name="a" type="xs:int"/>
                <part name="b" type="xs:int"/>
            </message>
            <message name="DivOut">
                <part name="quotient" type="xs:int"/>
                <part name="remainder" type="xs:int"/>
            </message>
            <portType name="Calc">
                <operation name="Add"><input message="tns:AddIn"/><output message="tns:AddOut"/></operation>
                <operation name="Div"><input message="tns:DivIn"/><output message="tns:DivOut"/></operation>
                <operation name="Notify"><input message="tns:DivIn"/></operation>
            </portType>
            <portType name="CalcCopy">
                <operation name="Add"><input message="tns:AddIn"/><output message="tns:AddOut"/></operation>
            </portType>
        </definitions>
    "#;

    #[test]
    fn introspects_port_types() {
        let document = Arc::new(Document::parse_str(WSDL).unwrap());
        let introspector = Introspector::new(&document).unwrap();

        assert_eq!(
            introspector.list_operation_signatures().unwrap(),
            [
                "Sum Add(Add $parameters)",
                "list(int $quotient, int $remainder) Div(int $a, int $b)",
                "void Notify(int $a, int $b)",
            ]
        );
    }

    #[test]
    fn missing_messages_fail_introspection() {
        let xml = WSDL.replace(r#"<output message="tns:AddOut"/>"#, r#"<output message="tns:Nope"/>"#);
        let document = Arc::new(Document::parse_str(&xml).unwrap());

        assert!(matches!(
            Introspector::new(&document),
            Err(error::Error::IntrospectionError(_))
        ));
    }

    #[test]
    fn plain_schemas_cannot_be_introspected() {
        let document = Arc::new(
            Document::parse_str(r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"/>"#).unwrap(),
        );

        assert!(matches!(
            Introspector::new(&document),
            Err(error::Error::IntrospectionError(_))
        ));
    }
}
