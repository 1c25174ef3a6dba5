use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, trace};

use super::{
    error,
    operation::{Introspector, OperationDescriptor, Signature, SignatureProvider},
    service::ServiceDescriptor,
    types::{anonymous_type_name, TypeDescriptor},
    xml::{Document, SchemaNode},
};

/// Location reported for documents parsed from memory.
const IN_MEMORY: &str = "memory:";

/// Entry point to everything the WSDL says about a service: its data types, the
/// service element and the operations it exposes.
pub struct ServiceDocument {
    document: Arc<Document>,
    location: String,
    namespace: String,
    provider: Box<dyn SignatureProvider>,
}

impl ServiceDocument {
    /// Loads the WSDL at `location`, a URL or a local path, with its imports.
    ///
    /// Operations are introspected from the document itself.
    pub fn load<S: AsRef<str>>(location: S) -> Result<Self, error::Error> {
        let location = location.as_ref();

        let open = || -> Result<Self, error::Error> {
            let document = Arc::new(super::load(location)?);
            let provider = Introspector::new(&document)?;
            Ok(Self::with_provider(document, location, provider))
        };

        open().map_err(|err| error::Error::load(location, err))
    }

    pub fn parse_str(xml: &str) -> Result<Self, error::Error> {
        let open = || -> Result<Self, error::Error> {
            let document = Arc::new(Document::parse_str(xml)?);
            let provider = Introspector::new(&document)?;
            Ok(Self::with_provider(document, IN_MEMORY, provider))
        };

        open().map_err(|err| error::Error::load(IN_MEMORY, err))
    }

    pub fn with_provider(
        document: Arc<Document>,
        location: impl Into<String>,
        provider: impl SignatureProvider + 'static,
    ) -> Self {
        let namespace = document
            .elements_by_local_name("definitions")
            .first()
            .and_then(|definitions| definitions.attribute("targetNamespace"))
            .unwrap_or_default()
            .to_owned();

        Self {
            document,
            location: location.into(),
            namespace,
            provider: Box::new(provider),
        }
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn target_namespace(&self) -> &str {
        &self.namespace
    }

    /// Every type declared by the schemas: the named ones first, then the anonymous
    /// types declared inside elements, each in document order.
    pub fn types(&self) -> Result<Vec<TypeDescriptor>, error::Error> {
        let mut types = Vec::new();

        for node in self
            .document
            .query("//s:simpleType[@name]|//s:complexType[@name]", &[])?
        {
            let name = node.attribute("name").unwrap_or_default().to_owned();
            types.push(TypeDescriptor::new(node, name, &self.namespace, false)?);
        }

        for path in ["//s:complexType[not(@name)]", "//s:simpleType[not(@name)]"] {
            for node in self.document.query(path, &[])? {
                let element = match node.parent() {
                    Some(parent) if parent.local_name() == "element" => parent,
                    _ => continue,
                };

                let name = anonymous_type_name(&element);
                trace!("anonymous type {}", name);
                types.push(TypeDescriptor::new(node, name, &self.namespace, true)?);
            }
        }

        debug!("found {} types", types.len());
        Ok(types)
    }

    /// The first `<service>` element.
    pub fn service(&self) -> Option<ServiceDescriptor> {
        self.document
            .elements_by_local_name("service")
            .into_iter()
            .next()
            .map(ServiceDescriptor::new)
    }

    /// Introspected operations that have a matching `<operation>` declaration.
    ///
    /// Signatures without a declaration are dropped.
    pub fn operations(&self) -> Result<Vec<OperationDescriptor>, error::Error> {
        let mut nodes: IndexMap<String, SchemaNode> = IndexMap::new();

        for node in self.document.query("//wsdl:operation[@name]", &[])? {
            let name = node.attribute("name").unwrap_or_default().to_owned();
            nodes.entry(name).or_insert(node);
        }

        let mut operations = Vec::new();

        for signature in self.provider.list_operation_signatures()? {
            let signature = Signature::parse(&signature)?;

            match nodes.get(&signature.name) {
                Some(node) => operations.push(OperationDescriptor::new(signature, node.clone())),
                None => trace!("no declaration for operation {}", signature.name),
            }
        }

        debug!("found {} operations", operations.len());
        Ok(operations)
    }
}
