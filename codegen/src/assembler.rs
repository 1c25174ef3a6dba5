//! Turns the descriptors of a service document into the classes to emit.
//!
//! Identifiers are assigned to every type first so that fields can refer to types
//! declared later in the document.

use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;
use tracing::{debug, info, warn};
use wsdlgen_wsdl::{
    operation::ReturnType, xml::strip_namespace, OperationDescriptor, ServiceDescriptor,
    ServiceDocument, TypeDescriptor,
};

use super::{
    complex::ComplexType,
    config::Config,
    enumeration::Enum,
    error::Error,
    model::{
        Class, ClassKind, ConstantValue, Datatype, Field, Literal, Method, MethodBody, Model, Param,
        Primitive, TypeRef, Visibility,
    },
    validator,
};

/// Maps schema type names to the identifiers of their classes.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    identifiers: IndexMap<String, String>,
    fallbacks: IndexMap<String, TypeRef>,
    taken: HashSet<String>,
}

impl Registry {
    /// Assigns a fresh identifier for `xml_name`.
    ///
    /// The first type registered under a name is the one references resolve to.
    pub fn register(&mut self, xml_name: &str) -> String {
        let taken = &self.taken;
        let identifier = validator::validate_unique(&validator::validate_class(xml_name), |candidate| {
            !taken.contains(candidate)
        });

        self.taken.insert(identifier.clone());
        self.identifiers
            .entry(xml_name.to_owned())
            .or_insert_with(|| identifier.clone());

        identifier
    }

    pub fn identifier(&self, xml_name: &str) -> Option<&str> {
        self.identifiers.get(xml_name).map(String::as_str)
    }

    /// Makes references to the class `identifier` of `xml_name` resolve to `ty` instead.
    ///
    /// Other types registered under the same name keep their classes.
    pub fn fall_back(&mut self, xml_name: &str, identifier: &str, ty: TypeRef) {
        if self.identifier(xml_name) == Some(identifier) {
            self.identifiers.shift_remove(xml_name);
            self.fallbacks.insert(xml_name.to_owned(), ty);
        }
    }

    /// Declared types win over XML Schema primitives of the same name.
    pub fn resolve(&self, name: &str) -> TypeRef {
        let name = strip_namespace(name);

        if let Some(identifier) = self.identifiers.get(name) {
            return TypeRef::class(identifier.clone());
        }

        if let Some(ty) = self.fallbacks.get(name) {
            return ty.clone();
        }

        if let Some(primitive) = Primitive::from_xsd(name) {
            return TypeRef::Primitive(primitive);
        }

        warn!("unknown type {}, falling back to any", name);
        TypeRef::Primitive(Primitive::Any)
    }
}

pub fn assemble(document: &ServiceDocument, config: &Config) -> Result<Model, Error> {
    let types = document.types()?;

    let mut registry = Registry::default();
    let identifiers: Vec<String> = types.iter().map(|ty| registry.register(ty.name())).collect();

    let skipped = if config.skip_invalid_types {
        skip_invalid(&types, &identifiers, &mut registry)
    } else {
        HashSet::new()
    };

    let mut model = Model::default();

    for (ty, identifier) in types.into_iter().zip(identifiers) {
        if skipped.contains(&identifier) {
            continue;
        }

        let class = build_class(ty, identifier, &registry)?;
        debug!("built {}", class.identifier);
        model.classes.push(class);
    }

    box_cycles(&mut model.classes);

    if let Some(service) = document.service() {
        let operations = document.operations()?;
        let class = build_service(document, &service, &operations, &mut registry, config)?;

        info!(
            "service {} with {} operations",
            class.identifier,
            operations.len()
        );
        model.service = Some(class);
    } else {
        debug!("no service element in {}", document.location());
    }

    Ok(model)
}

/// Enumerations with values their datatype rejects. References to them fall back to
/// the datatype itself.
fn skip_invalid(
    types: &[TypeDescriptor],
    identifiers: &[String],
    registry: &mut Registry,
) -> HashSet<String> {
    let mut skipped = HashSet::new();

    for (ty, identifier) in types.iter().zip(identifiers) {
        if ty.is_complex() || ty.enumerations().is_empty() {
            continue;
        }

        if let Err(Error::InvalidValue { source, .. }) = build_enum(ty, identifier.clone()) {
            warn!("skipping {}: {}", identifier, source);

            let datatype = Datatype::from_restriction(strip_namespace(ty.restriction()));
            registry.fall_back(ty.name(), identifier, datatype.type_ref());
            skipped.insert(identifier.clone());
        }
    }

    skipped
}

/// The class a member of this type is stored inline as, if any.
fn inline_class(ty: &TypeRef) -> Option<&str> {
    match ty {
        TypeRef::Class(identifier) => Some(identifier),
        TypeRef::Optional(inner) => inline_class(inner),
        _ => None,
    }
}

/// Records on every struct the classes it reaches again through inline members, so
/// that those members get boxed.
fn box_cycles(classes: &mut [Class]) {
    let nodes: IndexMap<&str, usize> = classes
        .iter()
        .enumerate()
        .filter(|(_, class)| matches!(class.kind, ClassKind::Struct | ClassKind::Alias(_)))
        .map(|(index, class)| (class.identifier.as_str(), index))
        .collect();

    let edges: Vec<Vec<usize>> = classes
        .iter()
        .map(|class| {
            let targets: Vec<&TypeRef> = match &class.kind {
                ClassKind::Struct => class
                    .extends
                    .iter()
                    .chain(class.fields().map(|field| &field.ty))
                    .collect(),
                ClassKind::Alias(target) => vec![target],
                _ => Vec::new(),
            };

            targets
                .into_iter()
                .filter_map(inline_class)
                .filter_map(|identifier| nodes.get(identifier).copied())
                .collect()
        })
        .collect();

    let component = components(&edges);

    let cyclic: Vec<IndexSet<String>> = edges
        .iter()
        .enumerate()
        .map(|(index, targets)| {
            targets
                .iter()
                .filter(|&&target| component[target] == component[index])
                .map(|&target| classes[target].identifier.clone())
                .collect()
        })
        .collect();

    for (class, cyclic) in classes.iter_mut().zip(cyclic) {
        if class.kind == ClassKind::Struct && !cyclic.is_empty() {
            debug!("{} is recursive through {:?}", class.identifier, cyclic);
            class.cyclic = cyclic;
        }
    }
}

/// Strongly connected component of every node, after Tarjan.
fn components(edges: &[Vec<usize>]) -> Vec<usize> {
    struct Search<'a> {
        edges: &'a [Vec<usize>],
        index: Vec<Option<usize>>,
        low: Vec<usize>,
        stack: Vec<usize>,
        on_stack: Vec<bool>,
        component: Vec<usize>,
        visited: usize,
        found: usize,
    }

    impl Search<'_> {
        fn visit(&mut self, node: usize) {
            let index = self.visited;
            self.visited += 1;
            self.index[node] = Some(index);
            self.low[node] = index;
            self.stack.push(node);
            self.on_stack[node] = true;

            let edges = self.edges;
            for &next in &edges[node] {
                match self.index[next] {
                    None => {
                        self.visit(next);
                        self.low[node] = self.low[node].min(self.low[next]);
                    }
                    Some(next_index) if self.on_stack[next] => {
                        self.low[node] = self.low[node].min(next_index);
                    }
                    Some(_) => {}
                }
            }

            if self.low[node] == index {
                while let Some(member) = self.stack.pop() {
                    self.on_stack[member] = false;
                    self.component[member] = self.found;

                    if member == node {
                        break;
                    }
                }

                self.found += 1;
            }
        }
    }

    let mut search = Search {
        edges,
        index: vec![None; edges.len()],
        low: vec![0; edges.len()],
        stack: Vec::new(),
        on_stack: vec![false; edges.len()],
        component: vec![0; edges.len()],
        visited: 0,
        found: 0,
    };

    for node in 0..edges.len() {
        if search.index[node].is_none() {
            search.visit(node);
        }
    }

    search.component
}

pub fn build_class(
    descriptor: TypeDescriptor,
    identifier: String,
    registry: &Registry,
) -> Result<Class, Error> {
    if descriptor.is_complex() {
        if descriptor.is_array() {
            return Ok(build_array(&descriptor, identifier, registry));
        }

        let mut complex = ComplexType::new(identifier, descriptor);
        return Ok(complex.build(registry)?.clone());
    }

    if !descriptor.enumerations().is_empty() {
        return build_enum(&descriptor, identifier);
    }

    match descriptor.pattern() {
        Some(pattern) => build_pattern(&descriptor, identifier, pattern.to_owned(), registry),
        None => Ok(build_alias(&descriptor, identifier, registry)),
    }
}

fn class(descriptor: &TypeDescriptor, identifier: String, kind: ClassKind) -> Class {
    let mut class = Class::new(identifier, descriptor.name(), kind);
    class.namespace = descriptor.namespace().to_owned();
    class.docs = descriptor.documentation().map(ToOwned::to_owned);
    class
}

fn build_array(descriptor: &TypeDescriptor, identifier: String, registry: &Registry) -> Class {
    let item = descriptor
        .elements()
        .values()
        .next()
        .map(|ty| registry.resolve(&ty.name))
        .unwrap_or(TypeRef::Primitive(Primitive::Any));

    class(descriptor, identifier, ClassKind::Alias(item.array()))
}

fn build_enum(descriptor: &TypeDescriptor, identifier: String) -> Result<Class, Error> {
    let mut enumeration = Enum::new(&identifier, descriptor.name(), descriptor.restriction())
        .with_namespace(descriptor.namespace())
        .with_docs(descriptor.documentation().map(ToOwned::to_owned));

    for value in descriptor.enumerations() {
        enumeration
            .add_value(value.as_str())
            .map_err(|source| Error::InvalidValue {
                identifier: identifier.clone(),
                source,
            })?;
    }

    Ok(enumeration.build_model()?.class().clone())
}

fn build_alias(descriptor: &TypeDescriptor, identifier: String, registry: &Registry) -> Class {
    let target = match descriptor.restriction() {
        "" => TypeRef::Primitive(Primitive::String),
        restriction => registry.resolve(restriction),
    };

    class(descriptor, identifier, ClassKind::Alias(target))
}

/// A restricted simple type checked against a pattern: a struct wrapping the value.
fn build_pattern(
    descriptor: &TypeDescriptor,
    identifier: String,
    pattern: String,
    registry: &Registry,
) -> Result<Class, Error> {
    let value_ty = match descriptor.restriction() {
        "" => TypeRef::Primitive(Primitive::String),
        restriction => registry.resolve(restriction),
    };

    let mut class = class(descriptor, identifier, ClassKind::Struct);
    class.add_constant("PATTERN", ConstantValue::Literal(Literal::Text(pattern)))?;

    class.add_field(Field {
        visibility: Visibility::Private,
        name: "value".to_owned(),
        xml_name: "value".to_owned(),
        ty: value_ty.clone(),
        docs: None,
    })?;

    class.add_method(Method {
        visibility: Visibility::Public,
        name: "new".to_owned(),
        params: vec![Param {
            name: "value".to_owned(),
            ty: value_ty.clone(),
            default: None,
        }],
        returns: None,
        body: MethodBody::Construct,
        docs: None,
    })?;

    class.add_method(Method {
        visibility: Visibility::Public,
        name: "value".to_owned(),
        params: Vec::new(),
        returns: Some(value_ty),
        body: MethodBody::Get {
            field: "value".to_owned(),
        },
        docs: None,
    })?;

    Ok(class)
}

/// The service class: configuration as constants and one method per operation.
fn build_service(
    document: &ServiceDocument,
    service: &ServiceDescriptor,
    operations: &[OperationDescriptor],
    registry: &mut Registry,
    config: &Config,
) -> Result<Class, Error> {
    let identifier = registry.register(service.name());

    let mut class = Class::new(identifier, service.name(), ClassKind::Service);
    class.namespace = document.target_namespace().to_owned();
    class.docs = service.documentation();

    let text = |value: &str| ConstantValue::Literal(Literal::Text(value.to_owned()));

    class.add_constant("WSDL", text(document.location()))?;
    class.add_constant("FEATURES", ConstantValue::List(config.features.clone()))?;
    class.add_constant("CACHE_WSDL", text(config.cache.token()))?;

    if let Some(compression) = &config.compression {
        class.add_constant("COMPRESSION", text(compression))?;
    }

    let mut names = HashSet::new();

    for operation in operations {
        let name = validator::validate_unique(
            &validator::validate_operation(operation.name()),
            |candidate| !names.contains(candidate),
        );
        names.insert(name.clone());

        let mut params: Vec<Param> = Vec::new();

        for parameter in operation.parameters() {
            let param_name = validator::validate_unique(
                &validator::validate_attribute(&parameter.name),
                |candidate| params.iter().all(|param| param.name != candidate),
            );

            params.push(Param {
                name: param_name,
                ty: registry.resolve(&parameter.ty),
                default: None,
            });
        }

        let returns = match operation.return_type() {
            ReturnType::Void => None,
            ReturnType::Single(ty) => Some(registry.resolve(ty)),
            ReturnType::List(parts) => Some(TypeRef::Tuple(
                parts.iter().map(|part| registry.resolve(&part.ty)).collect(),
            )),
        };

        class.add_method(Method {
            visibility: Visibility::Public,
            name,
            params,
            returns,
            body: MethodBody::Operation {
                name: operation.name().to_owned(),
            },
            docs: operation.documentation(),
        })?;
    }

    Ok(class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn letters(values: &[&str], restriction: &str) -> String {
        let values: String = values
            .iter()
            .map(|value| format!(r#"<s:enumeration value="{}"/>"#, value))
            .collect();

        format!(
            r#"<definitions xmlns="http://schemas.xmlsoap.org/wsdl/" xmlns:s="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:letters"><types><s:schema><s:simpleType name="Letter"><s:restriction base="s:{}">{}</s:restriction></s:simpleType><s:simpleType name="Code"><s:restriction base="s:string"/></s:simpleType></s:schema></types></definitions>"#,
            restriction, values
        )
    }

    #[test]
    fn registry_prefers_declared_types() {
        let mut registry = Registry::default();

        assert_eq!(registry.register("string"), "String_");
        assert_eq!(registry.register("Forecast"), "Forecast");
        assert_eq!(registry.register("forecast"), "Forecast1");
        assert_eq!(registry.register("Forecast"), "Forecast2");

        assert_eq!(registry.resolve("tns:string"), TypeRef::class("String_"));
        assert_eq!(registry.resolve("Forecast"), TypeRef::class("Forecast"));
        assert_eq!(registry.resolve("forecast"), TypeRef::class("Forecast1"));
        assert_eq!(
            registry.resolve("s:boolean"),
            TypeRef::Primitive(Primitive::Boolean)
        );
        assert_eq!(
            registry.resolve("Undeclared"),
            TypeRef::Primitive(Primitive::Any)
        );
    }

    #[test]
    fn enumerations_and_aliases() {
        let document = ServiceDocument::parse_str(&letters(&["A", "B", "C"], "string")).unwrap();
        let model = assemble(&document, &Config::default()).unwrap();

        assert_eq!(model.classes.len(), 2);
        assert!(model.service.is_none());

        let letter = &model.classes[0];
        assert_eq!(letter.identifier, "Letter");
        assert_eq!(letter.namespace, "urn:letters");
        assert_eq!(
            letter.constant("__default").unwrap().value,
            ConstantValue::Alias("A".into())
        );

        assert_eq!(
            model.classes[1].kind,
            ClassKind::Alias(TypeRef::Primitive(Primitive::String))
        );
    }

    #[test]
    fn invalid_enumerations_fail_or_are_skipped() {
        let document = ServiceDocument::parse_str(&letters(&["3", "abc"], "integer")).unwrap();

        assert!(matches!(
            assemble(&document, &Config::default()),
            Err(Error::InvalidValue { identifier, .. }) if identifier == "Letter"
        ));

        let config = Config {
            skip_invalid_types: true,
            ..Config::default()
        };
        let model = assemble(&document, &config).unwrap();

        let identifiers: Vec<_> = model
            .classes
            .iter()
            .map(|class| class.identifier.as_str())
            .collect();
        assert_eq!(identifiers, ["Code"]);
    }

    const FAMILY: &str = r#"<definitions xmlns="http://schemas.xmlsoap.org/wsdl/" xmlns:s="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:family">
        <types>
            <s:schema>
                <s:complexType name="Parent">
                    <s:sequence>
                        <s:element name="child" type="Child"/>
                        <s:element name="leaf" type="Leaf"/>
                        <s:element name="level" type="Level"/>
                    </s:sequence>
                </s:complexType>
                <s:complexType name="Child">
                    <s:sequence>
                        <s:element name="parent" type="Parent" minOccurs="0"/>
                    </s:sequence>
                </s:complexType>
                <s:complexType name="Leaf">
                    <s:sequence>
                        <s:element name="name" type="s:string"/>
                    </s:sequence>
                </s:complexType>
                <s:simpleType name="Level">
                    <s:restriction base="s:integer">
                        <s:enumeration value="1"/>
                        <s:enumeration value="abc"/>
                    </s:restriction>
                </s:simpleType>
            </s:schema>
        </types>
    </definitions>"#;

    fn family() -> Model {
        let document = ServiceDocument::parse_str(FAMILY).unwrap();
        let config = Config {
            skip_invalid_types: true,
            ..Config::default()
        };

        assemble(&document, &config).unwrap()
    }

    #[test]
    fn skipped_types_fall_back_to_their_datatype() {
        let model = family();

        assert!(model.classes.iter().all(|class| class.identifier != "Level"));

        let parent = &model.classes[0];
        assert_eq!(
            parent.field("level").unwrap().ty,
            TypeRef::Primitive(Primitive::Integer)
        );
        assert_eq!(
            parent.method("new").unwrap().params[2].ty,
            TypeRef::Primitive(Primitive::Integer)
        );
    }

    #[test]
    fn fallbacks_keep_earlier_types_of_the_same_name() {
        let mut registry = Registry::default();
        let first = registry.register("Level");
        let second = registry.register("Level");

        registry.fall_back("Level", &second, TypeRef::Primitive(Primitive::Integer));
        assert_eq!(registry.resolve("Level"), TypeRef::class(first.clone()));

        registry.fall_back("Level", &first, TypeRef::Primitive(Primitive::Integer));
        assert_eq!(
            registry.resolve("tns:Level"),
            TypeRef::Primitive(Primitive::Integer)
        );
    }

    #[test]
    fn recursive_types_know_their_cycle() {
        let model = family();

        let cyclic = |identifier: &str| -> Vec<String> {
            model
                .classes
                .iter()
                .find(|class| class.identifier == identifier)
                .unwrap()
                .cyclic
                .iter()
                .cloned()
                .collect()
        };

        assert_eq!(cyclic("Parent"), ["Child"]);
        assert_eq!(cyclic("Child"), ["Parent"]);
        assert!(cyclic("Leaf").is_empty());
    }

    #[test]
    fn components_group_mutual_references() {
        let edges = vec![vec![1], vec![0, 2], vec![], vec![3]];
        let component = components(&edges);

        assert_eq!(component[0], component[1]);
        assert_ne!(component[0], component[2]);
        assert_ne!(component[2], component[3]);
    }
}

