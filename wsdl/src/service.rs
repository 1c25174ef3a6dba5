use super::xml::SchemaNode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub name: String,
    pub binding: String,
    pub location: Option<String>,
}

/// The `<service>` element of a WSDL document.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    node: SchemaNode,
}

impl ServiceDescriptor {
    pub fn new(node: SchemaNode) -> Self {
        Self { node }
    }

    pub fn node(&self) -> &SchemaNode {
        &self.node
    }

    pub fn name(&self) -> &str {
        self.node.attribute("name").unwrap_or_default()
    }

    pub fn documentation(&self) -> Option<String> {
        self.node
            .children()
            .find(|child| child.local_name() == "documentation")
            .map(|documentation| documentation.text().trim().to_owned())
            .filter(|text| !text.is_empty())
    }

    pub fn ports(&self) -> Vec<Port> {
        self.node
            .children()
            .filter(|child| child.local_name() == "port")
            .map(|port| Port {
                name: port.attribute("name").unwrap_or_default().to_owned(),
                binding: port.attribute_local("binding").unwrap_or_default().to_owned(),
                location: port
                    .children()
                    .find(|child| child.local_name() == "address")
                    .and_then(|address| address.attribute("location").map(ToOwned::to_owned)),
            })
            .collect()
    }
}
