use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};
use std::{
    collections::HashSet,
    io::{BufRead, BufReader},
};
use tracing::{debug, trace};
use url::Url;

use super::{
    error,
    xml::{Document, NodeData, NodeId, WSDL_NAMESPACE, XSD_NAMESPACE},
};

fn split_namespaced_name(prefixed_name: &str) -> (Option<&str>, &str) {
    match prefixed_name.split_once(':') {
        Some((prefix, local_name)) => (Some(prefix), local_name),
        None => (None, prefixed_name),
    }
}

struct Parser {
    document: Document,
    visited: HashSet<Url>,
}

impl Parser {
    fn new() -> Self {
        Self {
            document: Default::default(),
            visited: Default::default(),
        }
    }

    fn parse(mut self, url: Url) -> Result<Document, error::Error> {
        self.parse_url(url)?;
        Ok(self.document)
    }

    fn parse_url(&mut self, url: Url) -> Result<(), error::Error> {
        if !self.visited.insert(url.clone()) {
            trace!("already loaded {}", url);
            return Ok(());
        }

        debug!("loading {}", url);

        let first = self.document.len();

        match url.scheme() {
            "file" => parse_xml(
                &mut self.document,
                Reader::from_file(
                    url.to_file_path()
                        .map_err(|()| error::Error::PathConversionError(None))?,
                )
                .map_err(error::Error::FileOpenError)?,
            )?,

            "http" | "https" => parse_xml(
                &mut self.document,
                Reader::from_reader(BufReader::new(
                    reqwest::blocking::get(url.clone())?.error_for_status()?,
                )),
            )?,

            other => return Err(error::Error::UnsupportedScheme(other.into())),
        };

        for location in self.imports_from(first) {
            let import = url.join(&location)?;
            debug!("{} imports {}", url, import);
            self.parse_url(import)?;
        }

        Ok(())
    }

    /// Locations referenced by imports and includes among the nodes parsed since `first`.
    fn imports_from(&self, first: usize) -> Vec<String> {
        (first..self.document.len())
            .map(|index| self.document.data(NodeId::from_index(index)))
            .filter_map(|data| {
                let key = match (data.namespace.as_deref(), data.local_name.as_str()) {
                    (Some(WSDL_NAMESPACE), "import") => "location",
                    (Some(XSD_NAMESPACE), "import" | "include") => "schemaLocation",
                    _ => return None,
                };

                data.attributes
                    .iter()
                    .find(|(name, _)| name == key)
                    .map(|(_, value)| value.clone())
            })
            .collect()
    }
}

fn element_data<B: BufRead>(
    reader: &Reader<B>,
    start: &BytesStart<'_>,
    namespace: Option<&[u8]>,
    parent: Option<NodeId>,
) -> Result<NodeData, error::Error> {
    let name = reader.decode(start.name())?.to_owned();
    let (_, local_name) = split_namespaced_name(&name);
    let local_name = local_name.to_owned();

    let namespace = match namespace {
        Some(namespace) => Some(reader.decode(namespace)?.to_owned()),
        None => None,
    };

    let mut attributes = Vec::new();

    for attribute in start.attributes() {
        let attribute = attribute?;
        let key = reader.decode(attribute.key)?.to_owned();
        let value = attribute.unescape_and_decode_value(reader)?;
        attributes.push((key, value));
    }

    Ok(NodeData {
        name,
        local_name,
        namespace,
        attributes,
        parent,
        children: Vec::new(),
        text: String::new(),
    })
}

fn parse_xml<B: BufRead>(document: &mut Document, mut reader: Reader<B>) -> Result<(), error::Error> {
    reader.trim_text(true);

    let mut stack: Vec<NodeId> = Vec::new();
    let mut has_root = false;
    let mut buffer = Vec::new();
    let mut namespace_buffer = Vec::new();

    loop {
        let (namespace, event) = reader.read_namespaced_event(&mut buffer, &mut namespace_buffer)?;

        match event {
            Event::Start(start) => {
                let data = element_data(&reader, &start, namespace, stack.last().copied())?;
                has_root |= data.parent.is_none();
                stack.push(document.push(data));
            }

            Event::Empty(start) => {
                let data = element_data(&reader, &start, namespace, stack.last().copied())?;
                has_root |= data.parent.is_none();
                document.push(data);
            }

            Event::End(..) => {
                stack.pop();
            }

            Event::Text(text) => {
                if let Some(&current) = stack.last() {
                    let text = text.unescape_and_decode(&reader)?;
                    document.append_text(current, &text);
                }
            }

            Event::CData(text) => {
                if let Some(&current) = stack.last() {
                    let text = reader.decode(&text)?.to_owned();
                    document.append_text(current, &text);
                }
            }

            Event::Eof => break,

            event => trace!("skipping {:?}", event),
        }

        buffer.clear();
    }

    if let Some(&open) = stack.last() {
        return Err(error::Error::UnclosedElement(document.data(open).name.clone()));
    }

    if !has_root {
        return Err(error::Error::EmptyDocument);
    }

    Ok(())
}

pub(crate) fn parse_str(document: &mut Document, xml: &str) -> Result<(), error::Error> {
    parse_xml(document, Reader::from_str(xml))
}

/// Loads the document at `url` together with everything it imports.
pub fn parse(url: Url) -> Result<Document, error::Error> {
    Parser::new().parse(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_element_namespaces() {
        let xml = r#"<w:definitions xmlns:w="http://schemas.xmlsoap.org/wsdl/"><w:types><schema xmlns="http://www.w3.org/2001/XMLSchema"/></w:types></w:definitions>"#;
        let document = Document::parse_str(xml).unwrap();

        let definitions = document.data(NodeId::from_index(0));
        assert_eq!(definitions.local_name, "definitions");
        assert_eq!(definitions.namespace.as_deref(), Some(WSDL_NAMESPACE));

        let schema = document.data(NodeId::from_index(2));
        assert_eq!(schema.name, "schema");
        assert_eq!(schema.namespace.as_deref(), Some(XSD_NAMESPACE));
        assert_eq!(schema.parent, Some(NodeId::from_index(1)));
    }

    #[test]
    fn unescapes_attributes_and_text() {
        let document = Document::parse_str(r#"<a v="x &lt; y">1 &amp; 2</a>"#).unwrap();
        let root = document.data(NodeId::from_index(0));

        assert_eq!(root.attributes, [("v".to_owned(), "x < y".to_owned())]);
        assert_eq!(root.text, "1 & 2");
    }

    #[test]
    fn malformed_documents_fail() {
        assert!(matches!(
            Document::parse_str("<a><b></a>"),
            Err(error::Error::XmlParseError(_))
        ));
        assert!(matches!(
            Document::parse_str("<a><b/>"),
            Err(error::Error::UnclosedElement(name)) if name == "a"
        ));
        assert!(matches!(
            Document::parse_str("   "),
            Err(error::Error::EmptyDocument)
        ));
    }
}
