//! Read-only DOM over one or more parsed XML documents.
//!
//! A [`Document`] owns every element of the main document and of the schemas it
//! imports, in load order. [`SchemaNode`] is a cheap handle to one element that keeps
//! the document alive through an [`Arc`].

use quick_xml::{
    events::{BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use std::{fmt, io::Cursor, sync::Arc};

use super::{error, xpath};

pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";
pub const WSDL_NAMESPACE: &str = "http://schemas.xmlsoap.org/wsdl/";
pub const SOAP_NAMESPACE: &str = "http://schemas.xmlsoap.org/wsdl/soap/";
pub const SOAP12_NAMESPACE: &str = "http://schemas.xmlsoap.org/wsdl/soap12/";

/// Removes the `prefix:` part of a qualified name, `tns:Foo` becomes `Foo`.
pub fn strip_namespace(qualified_name: &str) -> &str {
    match qualified_name.rfind(':') {
        Some(index) => &qualified_name[index + 1..],
        None => qualified_name,
    }
}

/// Upper-cases the first character of `name`.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();

    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub(crate) name: String,
    pub(crate) local_name: String,
    pub(crate) namespace: Option<String>,
    pub(crate) attributes: Vec<(String, String)>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) text: String,
}

/// Every element of the loaded documents, allocated in document order.
#[derive(Debug, Default)]
pub struct Document {
    nodes: Vec<NodeData>,
    roots: Vec<NodeId>,
}

impl Document {
    /// Parses a single in-memory document. Imports are not followed.
    pub fn parse_str(xml: &str) -> Result<Self, error::Error> {
        let mut document = Self::default();
        super::parser::parse_str(&mut document, xml)?;
        Ok(document)
    }

    pub(crate) fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());

        match data.parent {
            Some(parent) => self.nodes[parent.0].children.push(id),
            None => self.roots.push(id),
        }

        self.nodes.push(data);
        id
    }

    pub(crate) fn append_text(&mut self, id: NodeId, text: &str) {
        self.nodes[id.0].text.push_str(text);
    }

    pub(crate) fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub(crate) fn all(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Runs `path` from the document set, see [`SchemaNode::query`].
    pub fn query(
        self: &Arc<Self>,
        path: &str,
        args: &[&str],
    ) -> Result<Vec<SchemaNode>, error::Error> {
        let ids = xpath::evaluate(self, None, path, args)?;
        Ok(self.wrap_all(ids))
    }

    /// Root element of the first loaded document.
    pub fn root(self: &Arc<Self>) -> Option<SchemaNode> {
        self.roots.first().map(|&id| SchemaNode::new(self.clone(), id))
    }

    /// Every element in document order whose local name is `local_name`.
    pub fn elements_by_local_name(self: &Arc<Self>, local_name: &str) -> Vec<SchemaNode> {
        let ids = self
            .all()
            .filter(|&id| self.data(id).local_name == local_name)
            .collect();
        self.wrap_all(ids)
    }

    /// Serializes the first loaded document.
    pub fn to_xml(self: &Arc<Self>) -> Result<String, error::Error> {
        match self.root() {
            Some(root) => root.to_xml(),
            None => Err(error::Error::EmptyDocument),
        }
    }

    fn wrap_all(self: &Arc<Self>, ids: Vec<NodeId>) -> Vec<SchemaNode> {
        ids.into_iter()
            .map(|id| SchemaNode::new(self.clone(), id))
            .collect()
    }
}

#[derive(Clone)]
pub struct SchemaNode {
    document: Arc<Document>,
    id: NodeId,
}

impl SchemaNode {
    pub(crate) fn new(document: Arc<Document>, id: NodeId) -> Self {
        Self { document, id }
    }

    fn data(&self) -> &NodeData {
        self.document.data(self.id)
    }

    fn wrap(&self, id: NodeId) -> SchemaNode {
        SchemaNode::new(self.document.clone(), id)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    /// Qualified tag name as written in the source.
    pub fn name(&self) -> &str {
        &self.data().name
    }

    pub fn local_name(&self) -> &str {
        &self.data().local_name
    }

    /// Resolved namespace URI of the element.
    pub fn namespace(&self) -> Option<&str> {
        self.data().namespace.as_deref()
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.data()
            .attributes
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Attribute value with its namespace prefix removed.
    pub fn attribute_local(&self, key: &str) -> Option<&str> {
        self.attribute(key).map(strip_namespace)
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attribute(key).is_some()
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.data()
            .attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn parent(&self) -> Option<SchemaNode> {
        self.data().parent.map(|id| self.wrap(id))
    }

    /// Walks `levels` parents up.
    pub fn ancestor(&self, levels: usize) -> Option<SchemaNode> {
        let mut node = self.clone();

        for _ in 0..levels {
            node = node.parent()?;
        }

        Some(node)
    }

    pub fn children(&self) -> impl Iterator<Item = SchemaNode> + '_ {
        self.data().children.iter().map(move |&id| self.wrap(id))
    }

    pub fn first_child(&self) -> Option<SchemaNode> {
        self.data().children.first().map(|&id| self.wrap(id))
    }

    /// All elements below this one, in document order.
    pub fn descendants(&self) -> Vec<SchemaNode> {
        let mut ids = Vec::new();
        collect_descendants(&self.document, self.id, &mut ids);
        ids.into_iter().map(|id| self.wrap(id)).collect()
    }

    /// Descendants matched by local name only, whatever their namespace.
    pub fn descendants_by_local_name(&self, local_name: &str) -> Vec<SchemaNode> {
        self.descendants()
            .into_iter()
            .filter(|node| node.local_name() == local_name)
            .collect()
    }

    /// Text directly inside this element, trimmed segments concatenated.
    pub fn text(&self) -> &str {
        &self.data().text
    }

    /// Runs a namespace-bound path expression relative to this node.
    pub fn query(&self, path: &str, args: &[&str]) -> Result<Vec<SchemaNode>, error::Error> {
        let ids = xpath::evaluate(&self.document, Some(self.id), path, args)?;
        Ok(ids.into_iter().map(|id| self.wrap(id)).collect())
    }

    /// Text of the first `annotation/documentation` or `documentation` below this node.
    pub fn documentation(&self) -> Option<String> {
        self.descendants_by_local_name("documentation")
            .into_iter()
            .map(|node| node.text().trim().to_owned())
            .find(|text| !text.is_empty())
    }

    pub fn to_xml(&self) -> Result<String, error::Error> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        write_node(&mut writer, self)?;
        Ok(String::from_utf8(writer.into_inner().into_inner())?)
    }
}

fn collect_descendants(document: &Document, id: NodeId, ids: &mut Vec<NodeId>) {
    for &child in &document.data(id).children {
        ids.push(child);
        collect_descendants(document, child, ids);
    }
}

fn write_node(writer: &mut Writer<Cursor<Vec<u8>>>, node: &SchemaNode) -> Result<(), error::Error> {
    let start = BytesStart::owned_name(node.name()).with_attributes(node.attributes());

    if node.data().children.is_empty() && node.text().is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;

    if !node.text().is_empty() {
        writer.write_event(Event::Text(BytesText::from_plain_str(node.text())))?;
    }

    for child in node.children() {
        write_node(writer, &child)?;
    }

    writer.write_event(Event::End(BytesEnd::owned(node.name().as_bytes().to_vec())))?;
    Ok(())
}

impl PartialEq for SchemaNode {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.document, &other.document) && self.id == other.id
    }
}

impl Eq for SchemaNode {}

impl fmt::Debug for SchemaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaNode")
            .field("name", &self.name())
            .field("attributes", &self.data().attributes)
            .finish()
    }
}
