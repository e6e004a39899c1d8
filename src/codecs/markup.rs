//! Root-preserving XML ↔ JSON document conversion.
//!
//! `<root><a>1</a></root>` becomes `{"root":{"a":"1"}}` and back. Attributes
//! are carried under `@`-prefixed keys, repeated child elements collapse into
//! arrays, and element text sits under `$text` when it shares the element
//! with children or attributes.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use serde_json::{Map, Value};

use crate::codecs::Encode;
use crate::error::{ProxyError, Result};

const TEXT_KEY: &str = "$text";
const ATTR_PREFIX: char = '@';

/// Parses each message as one XML document and emits the equivalent JSON.
pub struct XmlToJson;

impl Encode for XmlToJson {
    fn encode(&mut self, message: &[u8]) -> Result<Vec<u8>> {
        let text = std::str::from_utf8(message)
            .map_err(|e| ProxyError::InvalidData(format!("xml input is not UTF-8: {e}")))?;
        let document = xml_to_value(text)?;
        serde_json::to_vec(&document)
            .map_err(|e| ProxyError::InvalidData(format!("json serialise: {e}")))
    }
}

/// Parses each message as one JSON document and emits the equivalent XML.
/// The document must be an object with a single key, which becomes the root
/// element.
pub struct JsonToXml;

impl Encode for JsonToXml {
    fn encode(&mut self, message: &[u8]) -> Result<Vec<u8>> {
        let document: Value = serde_json::from_slice(message)
            .map_err(|e| ProxyError::InvalidData(format!("json parse: {e}")))?;

        let Some(object) = document.as_object() else {
            return Err(ProxyError::InvalidData(
                "json document must be an object with a single root key".into(),
            ));
        };
        let mut entries = object.iter();
        let (root, value) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => {
                return Err(ProxyError::InvalidData(
                    "json document must have exactly one root key".into(),
                ));
            }
        };

        let mut writer = Writer::new(Vec::new());
        write_element(&mut writer, root, value)?;
        Ok(writer.into_inner())
    }
}

/// In-flight XML element while its subtree is still being read.
struct PendingElement {
    name: String,
    attributes: Map<String, Value>,
    children: Vec<(String, Value)>,
    text: String,
}

impl PendingElement {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = std::str::from_utf8(start.name().as_ref())
            .map_err(|e| ProxyError::InvalidData(format!("xml element name: {e}")))?
            .to_string();

        let mut attributes = Map::new();
        for attribute in start.attributes() {
            let attribute =
                attribute.map_err(|e| ProxyError::InvalidData(format!("xml attribute: {e}")))?;
            let key = std::str::from_utf8(attribute.key.as_ref())
                .map_err(|e| ProxyError::InvalidData(format!("xml attribute name: {e}")))?;
            let value = attribute
                .unescape_value()
                .map_err(|e| ProxyError::InvalidData(format!("xml attribute value: {e}")))?;
            attributes.insert(
                format!("{ATTR_PREFIX}{key}"),
                Value::String(value.into_owned()),
            );
        }

        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
            text: String::new(),
        })
    }

    fn into_value(self) -> Value {
        if self.attributes.is_empty() && self.children.is_empty() {
            return if self.text.is_empty() {
                Value::Null
            } else {
                Value::String(self.text)
            };
        }

        let mut object = self.attributes;
        for (name, value) in self.children {
            match object.get_mut(&name) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    object.insert(name, value);
                }
            }
        }
        if !self.text.is_empty() {
            object.insert(TEXT_KEY.to_string(), Value::String(self.text));
        }
        Value::Object(object)
    }
}

fn xml_to_value(text: &str) -> Result<Value> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<PendingElement> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ProxyError::InvalidData(format!("xml parse: {e}")))?;
        match event {
            Event::Start(start) => {
                if stack.is_empty() && root.is_some() {
                    return Err(ProxyError::InvalidData(
                        "xml document has more than one root element".into(),
                    ));
                }
                stack.push(PendingElement::from_start(&start)?);
            }
            Event::Empty(start) => {
                let element = PendingElement::from_start(&start)?;
                let (name, value) = (element.name.clone(), element.into_value());
                attach(&mut stack, &mut root, name, value)?;
            }
            Event::End(_) => {
                let element = stack.pop().ok_or_else(|| {
                    ProxyError::InvalidData("xml close tag without an open element".into())
                })?;
                let (name, value) = (element.name.clone(), element.into_value());
                attach(&mut stack, &mut root, name, value)?;
            }
            Event::Text(bytes) => {
                let unescaped = bytes
                    .unescape()
                    .map_err(|e| ProxyError::InvalidData(format!("xml text: {e}")))?;
                append_text(&mut stack, unescaped.trim())?;
            }
            Event::CData(bytes) => {
                let raw = std::str::from_utf8(bytes.as_ref())
                    .map_err(|e| ProxyError::InvalidData(format!("xml cdata: {e}")))?;
                append_text(&mut stack, raw)?;
            }
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    if !stack.is_empty() {
        return Err(ProxyError::InvalidData(
            "xml document ended with unclosed elements".into(),
        ));
    }
    let (name, value) = root
        .ok_or_else(|| ProxyError::InvalidData("xml document has no root element".into()))?;

    let mut document = Map::new();
    document.insert(name, value);
    Ok(Value::Object(document))
}

fn attach(
    stack: &mut [PendingElement],
    root: &mut Option<(String, Value)>,
    name: String,
    value: Value,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push((name, value)),
        None if root.is_none() => *root = Some((name, value)),
        None => {
            return Err(ProxyError::InvalidData(
                "xml document has more than one root element".into(),
            ));
        }
    }
    Ok(())
}

fn append_text(stack: &mut [PendingElement], text: &str) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    match stack.last_mut() {
        Some(element) => {
            element.text.push_str(text);
            Ok(())
        }
        None => Err(ProxyError::InvalidData(
            "xml text outside the root element".into(),
        )),
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, name: &str, value: &Value) -> Result<()> {
    match value {
        // A JSON array fans out into repeated sibling elements.
        Value::Array(items) => {
            for item in items {
                write_element(writer, name, item)?;
            }
            Ok(())
        }
        Value::Object(object) => {
            let mut start = BytesStart::new(name);
            for (key, attribute) in object {
                if let Some(key) = key.strip_prefix(ATTR_PREFIX) {
                    start.push_attribute((key, scalar_text(attribute)?.as_str()));
                }
            }

            let children: Vec<(&String, &Value)> = object
                .iter()
                .filter(|(key, _)| !key.starts_with(ATTR_PREFIX) && key.as_str() != TEXT_KEY)
                .collect();
            let text = object.get(TEXT_KEY);

            if children.is_empty() && text.is_none() {
                return write_event(writer, Event::Empty(start));
            }

            write_event(writer, Event::Start(start))?;
            if let Some(text) = text {
                write_event(writer, Event::Text(BytesText::new(&scalar_text(text)?)))?;
            }
            for (child_name, child) in children {
                write_element(writer, child_name, child)?;
            }
            write_event(writer, Event::End(BytesEnd::new(name)))
        }
        Value::Null => write_event(writer, Event::Empty(BytesStart::new(name))),
        scalar => {
            write_event(writer, Event::Start(BytesStart::new(name)))?;
            write_event(writer, Event::Text(BytesText::new(&scalar_text(scalar)?)))?;
            write_event(writer, Event::End(BytesEnd::new(name)))
        }
    }
}

fn scalar_text(value: &Value) -> Result<String> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Bool(_) | Value::Number(_) => Ok(value.to_string()),
        Value::Null => Ok(String::new()),
        _ => Err(ProxyError::InvalidData(
            "expected a scalar value in json document".into(),
        )),
    }
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| ProxyError::InvalidData(format!("xml write: {e}")))
}
