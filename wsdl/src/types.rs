use indexmap::IndexMap;
use std::fmt;

use super::{
    error,
    xml::{capitalize, SchemaNode},
};

/// Suffix marking a type reference as a sequence of the referenced type.
pub const ARRAY_MARKER: &str = "[]";

/// Name prefix of the complex types treated as arrays.
pub const ARRAY_PREFIX: &str = "ArrayOf";

/// Restriction base used by SOAP encoded structures.
const STRUCT_RESTRICTION: &str = "struct";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    pub name: String,
    pub array: bool,
}

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            array: false,
        }
    }

    pub fn array(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            array: true,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.array {
            write!(f, "{}{}", self.name, ARRAY_MARKER)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// A `simpleType` or `complexType` declaration and what it says about the type.
///
/// Everything except the per-element queries is computed once in [`TypeDescriptor::new`].
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    node: SchemaNode,
    name: String,
    namespace: String,
    anonymous: bool,

    restriction: String,
    base: Option<String>,
    elements: IndexMap<String, TypeRef>,
    pattern: Option<String>,
    enumerations: Vec<String>,
    documentation: Option<String>,
}

impl TypeDescriptor {
    pub fn new(
        node: SchemaNode,
        name: impl Into<String>,
        namespace: impl Into<String>,
        anonymous: bool,
    ) -> Result<Self, error::Error> {
        let restriction = node
            .query("s:restriction", &[])?
            .first()
            .and_then(|restriction| restriction.attribute_local("base"))
            .unwrap_or_default()
            .to_owned();

        let base = parse_base(&node);
        let elements = parse_elements(&node)?;

        let pattern = node
            .descendants_by_local_name("pattern")
            .first()
            .and_then(|pattern| pattern.attribute("value"))
            .map(ToOwned::to_owned);

        let enumerations = node
            .descendants_by_local_name("enumeration")
            .iter()
            .map(|enumeration| enumeration.attribute("value").unwrap_or_default().to_owned())
            .collect();

        let documentation = node
            .children()
            .find(|child| child.local_name() == "annotation")
            .and_then(|annotation| annotation.documentation());

        Ok(Self {
            name: name.into(),
            namespace: namespace.into(),
            anonymous,
            restriction,
            base,
            elements,
            pattern,
            enumerations,
            documentation,
            node,
        })
    }

    pub fn node(&self) -> &SchemaNode {
        &self.node
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    /// Base datatype of a direct `restriction`, empty when there is none.
    pub fn restriction(&self) -> &str {
        &self.restriction
    }

    /// Parent type of a `complexContent/extension` declaration.
    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    pub fn elements(&self) -> &IndexMap<String, TypeRef> {
        &self.elements
    }

    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    pub fn enumerations(&self) -> &[String] {
        &self.enumerations
    }

    pub fn documentation(&self) -> Option<&str> {
        self.documentation.as_deref()
    }

    pub fn is_complex(&self) -> bool {
        self.restriction == STRUCT_RESTRICTION || self.node.local_name() == "complexType"
    }

    /// Whether the type is a collection of its single field's type.
    ///
    /// This relies on the `ArrayOf` naming convention of common WSDL generators. A type
    /// holding one repeated element under another name is not detected.
    pub fn is_array(&self) -> bool {
        self.is_complex()
            && self.elements.len() == 1
            && self.name.starts_with(ARRAY_PREFIX)
            && self.elements.values().all(|ty| ty.array)
    }

    pub fn is_abstract(&self) -> bool {
        self.node.attribute("abstract") == Some("true")
    }

    pub fn is_element_array(&self, name: &str) -> bool {
        is_element_array(&self.node, name)
    }

    pub fn is_element_nillable(&self, name: &str) -> bool {
        self.named_elements(name)
            .any(|element| element.attribute("nillable") == Some("true"))
    }

    /// `minOccurs` of the first element called `name`. Absent is not zero.
    pub fn element_min_occurs(&self, name: &str) -> Option<u32> {
        self.named_elements(name)
            .next()?
            .attribute("minOccurs")?
            .trim()
            .parse()
            .ok()
    }

    fn named_elements<'a>(&self, name: &'a str) -> impl Iterator<Item = SchemaNode> + 'a {
        named_elements(&self.node, name)
    }
}

fn named_elements<'a>(node: &SchemaNode, name: &'a str) -> impl Iterator<Item = SchemaNode> + 'a {
    node.descendants_by_local_name("element")
        .into_iter()
        .filter(move |element| element.attribute("name") == Some(name))
}

fn is_element_array(node: &SchemaNode, name: &str) -> bool {
    named_elements(node, name).any(|element| match element.attribute("maxOccurs") {
        Some("unbounded") => true,
        Some(value) => value.trim().parse::<u64>().map_or(false, |max| max >= 2),
        None => false,
    })
}

fn parse_base(node: &SchemaNode) -> Option<String> {
    let content = node.first_child()?;

    if content.local_name() != "complexContent" {
        return None;
    }

    let extension = content.first_child()?;

    if extension.local_name() != "extension" {
        return None;
    }

    extension.attribute_local("base").map(ToOwned::to_owned)
}

/// Name given to an anonymous type declared inside `element`.
///
/// The name is the one of the element's grandparent (the type owning the sequence),
/// followed by the capitalized element name.
pub fn anonymous_type_name(element: &SchemaNode) -> String {
    let owner = element
        .ancestor(2)
        .and_then(|owner| owner.attribute("name").map(ToOwned::to_owned))
        .unwrap_or_default();
    let name = element.attribute("name").unwrap_or_default();

    format!("{}{}", owner, capitalize(name))
}

fn parse_elements(node: &SchemaNode) -> Result<IndexMap<String, TypeRef>, error::Error> {
    let mut elements = IndexMap::new();

    for element in node.query(
        "s:sequence/s:element|s:complexContent/s:extension/s:sequence/s:element",
        &[],
    )? {
        let (name, type_name) = match (element.attribute("name"), element.attribute_local("ref")) {
            (None, Some(reference)) => (reference.to_owned(), reference.to_owned()),

            (name, _) => {
                let name = name.unwrap_or_default().to_owned();

                let type_name = match element.attribute_local("type") {
                    Some(ty) => ty.to_owned(),
                    None => anonymous_type_name(&element),
                };

                (name, type_name)
            }
        };

        let ty = if is_element_array(node, &name) {
            TypeRef::array(type_name)
        } else {
            TypeRef::new(type_name)
        };

        elements.insert(name, ty);
    }

    Ok(elements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::Document;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn descriptor(schema_body: &str, name: &str) -> TypeDescriptor {
        let xml = format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:tns="urn:test">{}</xs:schema>"#,
            schema_body
        );
        let document = Arc::new(Document::parse_str(&xml).unwrap());
        let node = document
            .query("//s:complexType[@name=%s]|//s:simpleType[@name=%s]", &[name, name])
            .unwrap()
            .remove(0);

        TypeDescriptor::new(node, name, "urn:test", false).unwrap()
    }

    #[test]
    fn extension_base_is_inheritance() {
        let employee = descriptor(
            r#"<xs:complexType name="Employee">
                <xs:complexContent>
                    <xs:extension base="tns:Person">
                        <xs:sequence><xs:element name="salary" type="xs:int"/></xs:sequence>
                    </xs:extension>
                </xs:complexContent>
            </xs:complexType>"#,
            "Employee",
        );

        assert_eq!(employee.base(), Some("Person"));
        assert_eq!(employee.elements()["salary"], TypeRef::new("int"));
    }

    #[test]
    fn plain_sequence_has_no_base() {
        let person = descriptor(
            r#"<xs:complexType name="Person">
                <xs:sequence><xs:element name="name" type="xs:string"/></xs:sequence>
            </xs:complexType>"#,
            "Person",
        );

        assert_eq!(person.base(), None);
        assert!(person.is_complex());
        assert!(!person.is_array());
    }

    #[test]
    fn restriction_based_complex_content_is_not_inheritance() {
        let ty = descriptor(
            r#"<xs:complexType name="Restricted">
                <xs:complexContent><xs:restriction base="tns:Person"/></xs:complexContent>
            </xs:complexType>"#,
            "Restricted",
        );

        assert_eq!(ty.base(), None);
        assert_eq!(ty.restriction(), "");
    }

    #[test]
    fn elements_keep_order_and_mark_arrays() {
        let ty = descriptor(
            r#"<xs:complexType name="Order">
                <xs:sequence>
                    <xs:element name="id" type="xs:long" minOccurs="1"/>
                    <xs:element name="lines" type="tns:Line" maxOccurs="unbounded"/>
                    <xs:element name="pair" type="xs:int" maxOccurs="2"/>
                    <xs:element name="note" type="xs:string" minOccurs="0" nillable="true"/>
                    <xs:element name="one" type="xs:string" maxOccurs="1"/>
                </xs:sequence>
            </xs:complexType>"#,
            "Order",
        );

        let elements: Vec<_> = ty
            .elements()
            .iter()
            .map(|(name, ty)| format!("{}: {}", name, ty))
            .collect();

        assert_eq!(
            elements,
            ["id: long", "lines: Line[]", "pair: int[]", "note: string", "one: string"]
        );
        assert!(ty.is_element_nillable("note"));
        assert!(!ty.is_element_nillable("id"));
        assert_eq!(ty.element_min_occurs("id"), Some(1));
        assert_eq!(ty.element_min_occurs("note"), Some(0));
        assert_eq!(ty.element_min_occurs("lines"), None);
        assert_eq!(ty.element_min_occurs("missing"), None);
    }

    #[test]
    fn anonymous_elements_are_named_after_their_owner() {
        let ty = descriptor(
            r#"<xs:complexType name="Foo">
                <xs:sequence>
                    <xs:element name="bar">
                        <xs:complexType>
                            <xs:sequence><xs:element name="x" type="xs:int"/></xs:sequence>
                        </xs:complexType>
                    </xs:element>
                    <xs:element ref="tns:Shared"/>
                </xs:sequence>
            </xs:complexType>"#,
            "Foo",
        );

        assert_eq!(ty.elements()["bar"], TypeRef::new("FooBar"));
        assert_eq!(ty.elements()["Shared"], TypeRef::new("Shared"));
    }

    #[test]
    fn array_convention() {
        let array = descriptor(
            r#"<xs:complexType name="ArrayOfString">
                <xs:sequence>
                    <xs:element name="string" type="xs:string" minOccurs="0" maxOccurs="unbounded"/>
                </xs:sequence>
            </xs:complexType>"#,
            "ArrayOfString",
        );

        assert!(array.is_array());
        assert!(array.is_complex());
        assert_eq!(array.elements().len(), 1);

        let unconventional = descriptor(
            r#"<xs:complexType name="Strings">
                <xs:sequence>
                    <xs:element name="string" type="xs:string" maxOccurs="unbounded"/>
                </xs:sequence>
            </xs:complexType>"#,
            "Strings",
        );

        assert!(!unconventional.is_array());

        let single = descriptor(
            r#"<xs:complexType name="ArrayOfOne">
                <xs:sequence><xs:element name="string" type="xs:string"/></xs:sequence>
            </xs:complexType>"#,
            "ArrayOfOne",
        );

        assert!(!single.is_array());
    }

    #[test]
    fn simple_type_restrictions() {
        let ty = descriptor(
            r#"<xs:simpleType name="Colour">
                <xs:annotation><xs:documentation>A colour.</xs:documentation></xs:annotation>
                <xs:restriction base="xs:string">
                    <xs:enumeration value="Red"/>
                    <xs:enumeration value="Green"/>
                    <xs:pattern value="[A-Z].*"/>
                </xs:restriction>
            </xs:simpleType>"#,
            "Colour",
        );

        assert_eq!(ty.restriction(), "string");
        assert!(!ty.is_complex());
        assert_eq!(ty.enumerations(), ["Red", "Green"]);
        assert_eq!(ty.pattern(), Some("[A-Z].*"));
        assert_eq!(ty.documentation(), Some("A colour."));
        assert!(ty.elements().is_empty());
    }

    #[test]
    fn soap_struct_restriction_is_complex() {
        let ty = descriptor(
            r#"<xs:simpleType name="Encoded"><xs:restriction base="soapenc:struct"/></xs:simpleType>"#,
            "Encoded",
        );

        assert!(ty.is_complex());
    }

    #[test]
    fn abstract_attribute_must_be_literally_true() {
        let yes = descriptor(r#"<xs:complexType name="A" abstract="true"/>"#, "A");
        let no = descriptor(r#"<xs:complexType name="B" abstract="1"/>"#, "B");

        assert!(yes.is_abstract());
        assert!(!no.is_abstract());
    }
}
