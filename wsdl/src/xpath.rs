//! The small XPath subset used to query WSDL and XSD documents.
//!
//! Prefixes are bound to fixed namespace URIs, whatever prefixes the queried
//! document itself declares.

use super::{
    error,
    xml::{Document, NodeId, SOAP12_NAMESPACE, SOAP_NAMESPACE, WSDL_NAMESPACE, XSD_NAMESPACE},
};

fn bound_namespace(prefix: &str) -> Option<&'static str> {
    match prefix {
        "s" | "xs" | "xsd" => Some(XSD_NAMESPACE),
        "wsdl" => Some(WSDL_NAMESPACE),
        "soap" => Some(SOAP_NAMESPACE),
        "soap12" => Some(SOAP12_NAMESPACE),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, PartialEq)]
enum NameTest {
    Any,
    Local(String),
    Qualified {
        namespace: &'static str,
        local: String,
    },
}

#[derive(Debug, PartialEq)]
enum Predicate {
    Has(String),
    Missing(String),
    Equals(String, String),
}

#[derive(Debug, PartialEq)]
struct Step {
    axis: Axis,
    test: NameTest,
    predicates: Vec<Predicate>,
}

#[derive(Debug, PartialEq)]
struct LocationPath {
    absolute: bool,
    steps: Vec<Step>,
}

/// Quotes `value` as an XPath string literal, which cannot hold both quote characters.
fn quote(path: &str, value: &str) -> Result<String, error::Error> {
    match (value.contains('\''), value.contains('"')) {
        (true, true) => Err(invalid(path, "argument contains both quote characters")),
        (true, false) => Ok(format!("\"{}\"", value)),
        (false, _) => Ok(format!("'{}'", value)),
    }
}

fn substitute(path: &str, args: &[&str]) -> Result<String, error::Error> {
    let mut args = args.iter();
    let mut pieces = path.split("%s");
    let mut result = pieces.next().unwrap_or_default().to_owned();

    for piece in pieces {
        let arg = args.next().ok_or_else(|| invalid(path, "not enough arguments"))?;
        result.push_str(&quote(path, arg)?);
        result.push_str(piece);
    }

    if args.next().is_some() {
        return Err(invalid(path, "too many arguments"));
    }

    Ok(result)
}

fn invalid(path: &str, reason: &'static str) -> error::Error {
    error::Error::InvalidPath {
        path: path.to_owned(),
        reason,
    }
}

/// Splits on `|` outside of predicates and string literals.
fn split_union(path: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote = None;
    let mut start = 0;

    for (index, c) in path.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => (),
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, '|') if depth == 0 => {
                parts.push(&path[start..index]);
                start = index + 1;
            }
            _ => (),
        }
    }

    parts.push(&path[start..]);
    parts
}

struct PathParser<'a> {
    path: &'a str,
    rest: &'a str,
}

impl<'a> PathParser<'a> {
    fn new(path: &'a str) -> Self {
        Self {
            path,
            rest: path.trim(),
        }
    }

    fn eat(&mut self, token: &str) -> bool {
        if let Some(rest) = self.rest.strip_prefix(token) {
            self.rest = rest;
            true
        } else {
            false
        }
    }

    fn name(&mut self) -> &'a str {
        let end = self
            .rest
            .find(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':' | '*')))
            .unwrap_or(self.rest.len());
        let (name, rest) = self.rest.split_at(end);
        self.rest = rest;
        name
    }

    fn literal(&mut self) -> Result<String, error::Error> {
        let quote = match self.rest.chars().next() {
            Some(c @ ('\'' | '"')) => c,
            _ => return Err(invalid(self.path, "expected string literal")),
        };

        let body = &self.rest[1..];
        let end = body
            .find(quote)
            .ok_or_else(|| invalid(self.path, "unterminated string literal"))?;
        self.rest = &body[end + 1..];

        Ok(body[..end].to_owned())
    }

    fn attribute_name(&mut self) -> Result<String, error::Error> {
        if !self.eat("@") {
            return Err(invalid(self.path, "expected attribute test"));
        }

        match self.name() {
            "" => Err(invalid(self.path, "expected attribute name")),
            name => Ok(name.to_owned()),
        }
    }

    fn predicate(&mut self) -> Result<Predicate, error::Error> {
        let predicate = if self.eat("not(") {
            let name = self.attribute_name()?;

            if !self.eat(")") {
                return Err(invalid(self.path, "expected `)`"));
            }

            Predicate::Missing(name)
        } else {
            let name = self.attribute_name()?;

            if self.eat("=") {
                Predicate::Equals(name, self.literal()?)
            } else {
                Predicate::Has(name)
            }
        };

        if !self.eat("]") {
            return Err(invalid(self.path, "expected `]`"));
        }

        Ok(predicate)
    }

    fn name_test(&mut self) -> Result<NameTest, error::Error> {
        let name = self.name();

        match name.split_once(':') {
            _ if name == "*" => Ok(NameTest::Any),
            _ if name.is_empty() => Err(invalid(self.path, "expected element name")),

            Some((prefix, local)) => match bound_namespace(prefix) {
                Some(namespace) => Ok(NameTest::Qualified {
                    namespace,
                    local: local.to_owned(),
                }),
                None => Err(error::Error::UnknownPrefix(prefix.to_owned())),
            },

            None => Ok(NameTest::Local(name.to_owned())),
        }
    }

    fn location_path(mut self) -> Result<LocationPath, error::Error> {
        let mut steps = Vec::new();
        let (absolute, mut axis) = if self.eat("//") {
            (true, Axis::Descendant)
        } else if self.eat("/") {
            (true, Axis::Child)
        } else {
            (false, Axis::Child)
        };

        loop {
            let test = self.name_test()?;
            let mut predicates = Vec::new();

            while self.eat("[") {
                predicates.push(self.predicate()?);
            }

            steps.push(Step {
                axis,
                test,
                predicates,
            });

            if self.rest.is_empty() {
                break;
            } else if self.eat("//") {
                axis = Axis::Descendant;
            } else if self.eat("/") {
                axis = Axis::Child;
            } else {
                return Err(invalid(self.path, "unexpected trailing input"));
            }
        }

        Ok(LocationPath { absolute, steps })
    }
}

fn matches(document: &Document, id: NodeId, step: &Step) -> bool {
    let data = document.data(id);

    let name_matches = match &step.test {
        NameTest::Any => true,
        NameTest::Local(local) => data.local_name == *local,
        NameTest::Qualified { namespace, local } => {
            data.local_name == *local && data.namespace.as_deref() == Some(*namespace)
        }
    };

    name_matches
        && step.predicates.iter().all(|predicate| {
            let value = |key: &str| {
                data.attributes
                    .iter()
                    .find(|(name, _)| name == key)
                    .map(|(_, value)| value.as_str())
            };

            match predicate {
                Predicate::Has(key) => value(key).is_some(),
                Predicate::Missing(key) => value(key).is_none(),
                Predicate::Equals(key, expected) => value(key) == Some(expected.as_str()),
            }
        })
}

fn push_descendants(document: &Document, id: NodeId, out: &mut Vec<NodeId>) {
    for &child in &document.data(id).children {
        out.push(child);
        push_descendants(document, child, out);
    }
}

fn evaluate_path(document: &Document, context: Option<NodeId>, path: &LocationPath) -> Vec<NodeId> {
    let mut current: Vec<NodeId> = Vec::new();

    for (index, step) in path.steps.iter().enumerate() {
        let mut candidates = Vec::new();

        if index == 0 && (path.absolute || context.is_none()) {
            match step.axis {
                Axis::Descendant => candidates.extend(document.all()),
                Axis::Child => candidates.extend(document.roots().iter().copied()),
            }
        } else {
            let sources = if index == 0 {
                context.into_iter().collect()
            } else {
                std::mem::take(&mut current)
            };

            for source in sources {
                match step.axis {
                    Axis::Child => candidates.extend(document.data(source).children.iter().copied()),
                    Axis::Descendant => push_descendants(document, source, &mut candidates),
                }
            }
        }

        candidates.sort_unstable();
        candidates.dedup();
        current = candidates
            .into_iter()
            .filter(|&id| matches(document, id, step))
            .collect();
    }

    current
}

/// Evaluates `path` with `%s` placeholders replaced by `args`.
///
/// Without a context node relative paths start at the document roots, like absolute
/// ones. The result is in document order with duplicates removed.
pub(crate) fn evaluate(
    document: &Document,
    context: Option<NodeId>,
    path: &str,
    args: &[&str],
) -> Result<Vec<NodeId>, error::Error> {
    let path = substitute(path, args)?;
    let mut result = Vec::new();

    for part in split_union(&path) {
        let parsed = PathParser::new(part).location_path()?;
        result.extend(evaluate_path(document, context, &parsed));
    }

    result.sort_unstable();
    result.dedup();
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const SCHEMA: &str = r#"
        <xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:other="urn:other">
            <xsd:complexType name="A">
                <xsd:sequence>
                    <xsd:element name="one" type="xsd:string"/>
                    <xsd:element name="two">
                        <xsd:complexType/>
                    </xsd:element>
                </xsd:sequence>
            </xsd:complexType>
            <xsd:simpleType name="B"/>
            <other:complexType name="C"/>
        </xsd:schema>
    "#;

    fn document() -> Arc<Document> {
        Arc::new(Document::parse_str(SCHEMA).unwrap())
    }

    fn names(nodes: &[crate::xml::SchemaNode]) -> Vec<&str> {
        nodes
            .iter()
            .map(|node| node.attribute("name").unwrap_or("-"))
            .collect()
    }

    #[test]
    fn binds_prefixes_to_namespace_uris() {
        let document = document();
        let nodes = document.query("//s:complexType[@name]", &[]).unwrap();

        assert_eq!(names(&nodes), ["A"]);
    }

    #[test]
    fn unions_are_in_document_order() {
        let document = document();
        let nodes = document
            .query("//s:simpleType[@name]|//s:complexType[@name]", &[])
            .unwrap();

        assert_eq!(names(&nodes), ["A", "B"]);
    }

    #[test]
    fn negated_attribute_predicate() {
        let document = document();
        let nodes = document.query("//s:complexType[not(@name)]", &[]).unwrap();

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].parent().unwrap().attribute("name"), Some("two"));
    }

    #[test]
    fn relative_paths_and_arguments() {
        let document = document();
        let a = document.query("//s:complexType[@name=%s]", &["A"]).unwrap().remove(0);

        let elements = a.query("s:sequence/s:element", &[]).unwrap();
        assert_eq!(names(&elements), ["one", "two"]);

        let nested = a.query("s:sequence//s:complexType", &[]).unwrap();
        assert_eq!(nested.len(), 1);

        assert!(a.query("s:complexContent/s:extension", &[]).unwrap().is_empty());
    }

    #[test]
    fn unprefixed_names_match_any_namespace() {
        let document = document();
        let nodes = document.query("//complexType[@name]", &[]).unwrap();

        assert_eq!(names(&nodes), ["A", "C"]);
    }

    #[test]
    fn rejects_unknown_prefix_and_bad_syntax() {
        let document = document();

        assert!(matches!(
            document.query("//tns:complexType", &[]),
            Err(error::Error::UnknownPrefix(prefix)) if prefix == "tns"
        ));
        assert!(matches!(
            document.query("//s:complexType[@name", &[]),
            Err(error::Error::InvalidPath { .. })
        ));
        assert!(matches!(
            document.query("//s:element[@name=%s]", &[]),
            Err(error::Error::InvalidPath { .. })
        ));
    }

    #[test]
    fn quotes_arguments() {
        assert_eq!(quote("%s", "plain").unwrap(), "'plain'");
        assert_eq!(quote("%s", "it's").unwrap(), "\"it's\"");
        assert_eq!(quote("%s", "say \"hi\"").unwrap(), "'say \"hi\"'");
    }

    #[test]
    fn arguments_with_both_quotes_are_rejected() {
        assert!(matches!(
            substitute("//element[@name=%s]", &[r#"it's "quoted""#]),
            Err(error::Error::InvalidPath {
                reason: "argument contains both quote characters",
                ..
            })
        ));
    }
}
