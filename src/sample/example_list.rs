//! Reader for the toolkit's CART example list XML.
//!
//! The document holds one `<properties-definition>` block, a sequence of
//! `<key>` / `<value-map>` pairs describing every property, followed by
//! `<example>` elements:
//!
//! ```xml
//! <example nObservations="12">
//!   <properties>
//!     <key>hmm-state</key><value>0</value>
//!     <key>central</key><value>a</value>
//!   </properties>
//!   <matrix-f64 nRows="2" nColumns="3">1 2 3 4 5 6</matrix-f64>
//! </example>
//! ```
use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
    str::FromStr,
};

use flate2::read::GzDecoder;
use indexmap::IndexMap;
use xmlem::{Document, Element, Node};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("malformed XML: {0}")]
    Xml(String),
    #[error("unknown property: {0}")]
    UnknownProperty(String),
    #[error("<{element}> is missing attribute {attribute:?}")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
    #[error("<{element}>: {value:?} is not a number")]
    InvalidNumber { element: &'static str, value: String },
    #[error("<{0}> without a preceding <key>")]
    MissingKey(&'static str),
    #[error("<value> in a value map without an id")]
    MissingValueId,
}

/// Property names recognised in a properties definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyName {
    HmmState,
    Boundary,
    Central,
    History,
    Future,
}

impl PropertyName {
    pub const ALL: [PropertyName; 5] = [
        PropertyName::HmmState,
        PropertyName::Boundary,
        PropertyName::Central,
        PropertyName::History,
        PropertyName::Future,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyName::HmmState => "hmm-state",
            PropertyName::Boundary => "boundary",
            PropertyName::Central => "central",
            PropertyName::History => "history[0]",
            PropertyName::Future => "future[0]",
        }
    }
}

impl FromStr for PropertyName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hmm-state" => Ok(PropertyName::HmmState),
            "boundary" => Ok(PropertyName::Boundary),
            "central" => Ok(PropertyName::Central),
            "history[0]" => Ok(PropertyName::History),
            "future[0]" => Ok(PropertyName::Future),
            other => Err(Error::UnknownProperty(other.to_string())),
        }
    }
}

impl std::fmt::Display for PropertyName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value id to label.
pub type ValueMap = IndexMap<String, String>;

#[derive(Debug, Default, Clone)]
pub struct PropertiesDefinition {
    pub hmm_state: ValueMap,
    pub boundary: ValueMap,
    pub central: ValueMap,
    pub history: ValueMap,
    pub future: ValueMap,
}

impl PropertiesDefinition {
    pub fn set(&mut self, name: PropertyName, map: ValueMap) {
        *self.get_mut(name) = map;
    }

    pub fn get(&self, name: PropertyName) -> &ValueMap {
        match name {
            PropertyName::HmmState => &self.hmm_state,
            PropertyName::Boundary => &self.boundary,
            PropertyName::Central => &self.central,
            PropertyName::History => &self.history,
            PropertyName::Future => &self.future,
        }
    }

    fn get_mut(&mut self, name: PropertyName) -> &mut ValueMap {
        match name {
            PropertyName::HmmState => &mut self.hmm_state,
            PropertyName::Boundary => &mut self.boundary,
            PropertyName::Central => &mut self.central,
            PropertyName::History => &mut self.history,
            PropertyName::Future => &mut self.future,
        }
    }
}

/// One observation record.
#[derive(Debug, Default, Clone)]
pub struct Example {
    pub properties: IndexMap<String, String>,
    pub observations: u64,
    pub rows: usize,
    pub columns: usize,
    /// Matrix entries in row-major order, exactly as written in the document.
    pub data: Vec<String>,
}

impl Example {
    pub fn property(&self, name: PropertyName) -> Option<&str> {
        self.properties.get(name.as_str()).map(String::as_str)
    }
}

#[derive(Debug, Default)]
pub struct ExampleList {
    pub properties: PropertiesDefinition,
    pub examples: Vec<Example>,
}

/// Read an example list from a file, decompressing gzip input.
pub fn read_example_list<P: AsRef<Path>>(path: P) -> Result<ExampleList, Error> {
    let path = path.as_ref();
    let mut bytes = Vec::new();
    BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;

    let is_gz = path.extension().is_some_and(|x| x == "gz") || bytes.starts_with(&GZIP_MAGIC);
    if is_gz {
        let mut inflated = Vec::new();
        GzDecoder::new(bytes.as_slice()).read_to_end(&mut inflated)?;
        bytes = inflated;
    }

    parse_example_list(&decode(bytes))
}

/// Documents are usually declared ISO-8859-1; fall back to Latin-1 when the
/// bytes are not UTF-8.
fn decode(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    }
}

pub fn parse_example_list(xml_content: &str) -> Result<ExampleList, Error> {
    let doc = xml_content
        .parse::<Document>()
        .map_err(|e| Error::Xml(e.to_string()))?;

    let mut list = ExampleList::default();
    visit(&doc.root(), &doc, &mut list)?;
    Ok(list)
}

fn visit(element: &Element, doc: &Document, list: &mut ExampleList) -> Result<(), Error> {
    match element.name(doc) {
        "properties-definition" => parse_definition(element, doc, &mut list.properties),
        "example" => {
            list.examples.push(parse_example(element, doc)?);
            Ok(())
        }
        _ => {
            for child in element.children(doc) {
                visit(&child, doc, list)?;
            }
            Ok(())
        }
    }
}

fn parse_definition(
    element: &Element,
    doc: &Document,
    properties: &mut PropertiesDefinition,
) -> Result<(), Error> {
    let mut key = None;

    for child in element.children(doc) {
        match child.name(doc) {
            "key" => {
                key = Some(get_element_text(&child, doc).parse::<PropertyName>()?);
            }
            "value-map" => {
                let name = key.take().ok_or(Error::MissingKey("value-map"))?;
                let map = parse_value_map(&child, doc)?;
                tracing::debug!("property {} has {} values", name, map.len());
                properties.set(name, map);
            }
            _ => {}
        }
    }

    Ok(())
}

fn parse_value_map(element: &Element, doc: &Document) -> Result<ValueMap, Error> {
    let mut map = ValueMap::new();

    for child in element.children(doc) {
        if child.name(doc) == "value" {
            let id = child.attribute(doc, "id").ok_or(Error::MissingValueId)?;
            map.insert(id.to_string(), get_element_text(&child, doc));
        }
    }

    Ok(map)
}

fn parse_example(element: &Element, doc: &Document) -> Result<Example, Error> {
    let observations = element
        .attribute(doc, "nObservations")
        .ok_or(Error::MissingAttribute {
            element: "example",
            attribute: "nObservations",
        })?;
    let mut example = Example {
        observations: parse_number("example", observations)?,
        ..Default::default()
    };

    parse_example_children(element, doc, &mut example)?;
    Ok(example)
}

fn parse_example_children(
    element: &Element,
    doc: &Document,
    example: &mut Example,
) -> Result<(), Error> {
    for child in element.children(doc) {
        match child.name(doc) {
            "properties" => parse_properties(&child, doc, &mut example.properties)?,
            "matrix-f64" => parse_matrix(&child, doc, example)?,
            _ => parse_example_children(&child, doc, example)?,
        }
    }
    Ok(())
}

fn parse_properties(
    element: &Element,
    doc: &Document,
    properties: &mut IndexMap<String, String>,
) -> Result<(), Error> {
    let mut key = None;

    for child in element.children(doc) {
        match child.name(doc) {
            "key" => key = Some(get_element_text(&child, doc)),
            "value" => {
                let key = key.take().ok_or(Error::MissingKey("value"))?;
                properties.insert(key, get_element_text(&child, doc));
            }
            _ => {}
        }
    }

    Ok(())
}

fn parse_matrix(element: &Element, doc: &Document, example: &mut Example) -> Result<(), Error> {
    let attribute = |name: &'static str| {
        element.attribute(doc, name).ok_or(Error::MissingAttribute {
            element: "matrix-f64",
            attribute: name,
        })
    };
    example.rows = parse_number("matrix-f64", attribute("nRows")?)?;
    example.columns = parse_number("matrix-f64", attribute("nColumns")?)?;

    example.data = get_element_text(element, doc)
        .split_whitespace()
        .map(|token| match token.parse::<f64>() {
            Ok(_) => Ok(token.to_string()),
            Err(_) => Err(Error::InvalidNumber {
                element: "matrix-f64",
                value: token.to_string(),
            }),
        })
        .collect::<Result<_, _>>()?;

    Ok(())
}

fn parse_number<T: FromStr>(element: &'static str, value: &str) -> Result<T, Error> {
    value.trim().parse().map_err(|_| Error::InvalidNumber {
        element,
        value: value.to_string(),
    })
}

fn get_element_text(element: &Element, doc: &Document) -> String {
    let mut text = String::new();
    for node in element.child_nodes(doc) {
        if let Node::Text(text_node) = node {
            text.push_str(text_node.as_str(doc));
        }
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sprint>
  <properties-definition>
    <key>hmm-state</key>
    <value-map>
      <value id="0">0</value>
      <value id="1">1</value>
    </value-map>
    <key>central</key>
    <value-map>
      <value id="0">#</value>
      <value id="1">a</value>
    </value-map>
  </properties-definition>
  <example-list>
    <example nObservations="12">
      <properties>
        <key>hmm-state</key> <value>1</value>
        <key>central</key> <value>a</value>
        <key>history[0]</key> <value>#</value>
      </properties>
      <matrix-f64 nRows="2" nColumns="2">
        0.5 1.5
        2.5e-3 4
      </matrix-f64>
    </example>
    <example nObservations="3">
      <properties>
        <key>central</key> <value>b</value>
      </properties>
    </example>
  </example-list>
</sprint>
"#;

    #[test]
    fn test_parse_document() {
        let list = parse_example_list(DOCUMENT).unwrap();

        assert_eq!(list.properties.hmm_state.len(), 2);
        let central = list.properties.get(PropertyName::Central);
        assert_eq!(central.get("1").map(String::as_str), Some("a"));
        assert!(list.properties.boundary.is_empty());

        assert_eq!(list.examples.len(), 2);
        let first = &list.examples[0];
        assert_eq!(first.observations, 12);
        assert_eq!(first.property(PropertyName::HmmState), Some("1"));
        assert_eq!(first.property(PropertyName::History), Some("#"));
        assert_eq!(first.property(PropertyName::Future), None);
        assert_eq!((first.rows, first.columns), (2, 2));
        assert_eq!(first.data, vec!["0.5", "1.5", "2.5e-3", "4"]);

        let second = &list.examples[1];
        assert_eq!(second.observations, 3);
        assert_eq!(second.rows, 0);
        assert!(second.data.is_empty());
    }

    #[test]
    fn test_unknown_property() {
        let xml = r#"<sprint><properties-definition>
            <key>history[1]</key><value-map></value-map>
        </properties-definition></sprint>"#;
        let err = parse_example_list(xml).unwrap_err();
        assert!(matches!(err, Error::UnknownProperty(name) if name == "history[1]"));
    }

    #[test]
    fn test_property_names() {
        for name in PropertyName::ALL {
            assert_eq!(name.as_str().parse::<PropertyName>().unwrap(), name);
        }
    }

    #[test]
    fn test_invalid_matrix_token() {
        let xml = r#"<sprint><example nObservations="1">
            <matrix-f64 nRows="2" nColumns="1">1 x</matrix-f64>
        </example></sprint>"#;
        let err = parse_example_list(xml).unwrap_err();
        assert!(matches!(err, Error::InvalidNumber { value, .. } if value == "x"));
    }

    #[test]
    fn test_huge_matrix_header() {
        let xml = r#"<sprint><example nObservations="1">
            <properties><key>hmm-state</key> <value>0</value></properties>
            <matrix-f64 nRows="2" nColumns="18446744073709551615">1 2</matrix-f64>
        </example></sprint>"#;
        let list = parse_example_list(xml).unwrap();
        let example = &list.examples[0];
        assert_eq!(example.columns, usize::MAX);
        assert_eq!(example.data, vec!["1", "2"]);
    }

    #[test]
    fn test_missing_observations() {
        let xml = r#"<sprint><example></example></sprint>"#;
        let err = parse_example_list(xml).unwrap_err();
        assert!(matches!(err, Error::MissingAttribute { .. }));
    }

    #[test]
    fn test_read_gzip() {
        use flate2::{Compression, write::GzEncoder};
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examples.xml.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(DOCUMENT.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let list = read_example_list(&path).unwrap();
        assert_eq!(list.examples.len(), 2);
    }

    #[test]
    fn test_decode_latin1() {
        assert_eq!(decode(vec![b'a', 0xe6, b'b']), "a\u{e6}b");
        assert_eq!(decode("ø".as_bytes().to_vec()), "ø");
    }
}
