//! RDF/XML reader for XMP packets.
//!
//! Flattens the packet into `(path, value)` pairs where every path step is
//! either a namespaced field or a 1-based array index, e.g.
//! `xmpMM:History[2]/stEvt:softwareAgent`. Namespaces are resolved to their
//! URIs, so the prefix chosen by the writing application does not matter.

use super::{ImageMetadata, PathStep};
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;

pub const NS_RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const NS_X: &str = "adobe:ns:meta/";
pub const NS_XML: &str = "http://www.w3.org/XML/1998/namespace";
pub const NS_XMP: &str = "http://ns.adobe.com/xap/1.0/";
pub const NS_XMP_MM: &str = "http://ns.adobe.com/xap/1.0/mm/";
pub const NS_ST_EVT: &str = "http://ns.adobe.com/xap/1.0/sType/ResourceEvent#";

#[derive(Debug)]
enum Frame {
    /// `x:xmpmeta`, `rdf:RDF` and anything else that does not change the path
    Transparent,
    /// `rdf:Description`, whose attributes and children are fields
    Description,
    /// `rdf:Seq`, `rdf:Bag` or `rdf:Alt`; counts its items
    Container(usize),
    /// A property element or `rdf:li`; owns one path step and collects text
    Value { text: String, has_children: bool },
}

struct Parser {
    metadata: ImageMetadata,
    path: Vec<PathStep>,
    frames: Vec<Frame>,
    saw_rdf: bool,
}

fn owned_namespace(resolved: &ResolveResult<'_>) -> Option<String> {
    match resolved {
        ResolveResult::Bound(Namespace(ns)) => Some(String::from_utf8_lossy(ns).into_owned()),
        _ => None,
    }
}

fn unescape_lossy(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    match quick_xml::escape::unescape(&text) {
        Ok(unescaped) => unescaped.into_owned(),
        Err(_) => text.into_owned(),
    }
}

impl Parser {
    fn new() -> Self {
        Self {
            metadata: ImageMetadata::default(),
            path: Vec::new(),
            frames: Vec::new(),
            saw_rdf: false,
        }
    }

    fn mark_parent_has_children(&mut self) {
        if let Some(Frame::Value { has_children, .. }) = self.frames.last_mut() {
            *has_children = true;
        }
    }

    /// Records non-RDF attributes as fields below the current path.
    fn attribute_fields(
        &mut self,
        reader: &NsReader<&[u8]>,
        element: &BytesStart<'_>,
    ) -> Result<(), String> {
        for attr in element.attributes() {
            let attr = attr.map_err(|e| e.to_string())?;
            let key = attr.key.as_ref();
            if key == b"xmlns" || key.starts_with(b"xmlns:") {
                continue;
            }
            let (resolved, local) = reader.resolver().resolve_attribute(attr.key);
            let Some(ns) = owned_namespace(&resolved) else {
                continue;
            };
            if ns == NS_RDF || ns == NS_XML {
                continue;
            }
            let name = String::from_utf8_lossy(local.as_ref()).into_owned();
            let mut path = self.path.clone();
            path.push(PathStep::Field { ns, name });
            self.metadata.push(path, unescape_lossy(&attr.value));
        }
        Ok(())
    }

    fn rdf_resource(
        reader: &NsReader<&[u8]>,
        element: &BytesStart<'_>,
    ) -> Result<Option<String>, String> {
        for attr in element.attributes() {
            let attr = attr.map_err(|e| e.to_string())?;
            let (resolved, local) = reader.resolver().resolve_attribute(attr.key);
            if owned_namespace(&resolved).as_deref() == Some(NS_RDF)
                && local.as_ref() == b"resource"
            {
                return Ok(Some(unescape_lossy(&attr.value)));
            }
        }
        Ok(None)
    }

    fn start(
        &mut self,
        reader: &NsReader<&[u8]>,
        ns: Option<String>,
        element: &BytesStart<'_>,
    ) -> Result<(), String> {
        let local = element.local_name();
        let local = local.as_ref();

        let frame = match ns.as_deref() {
            Some(NS_X) => Frame::Transparent,
            Some(NS_RDF) => match local {
                b"RDF" => {
                    self.saw_rdf = true;
                    Frame::Transparent
                }
                b"Description" => {
                    self.mark_parent_has_children();
                    self.attribute_fields(reader, element)?;
                    Frame::Description
                }
                b"Seq" | b"Bag" | b"Alt" => {
                    self.mark_parent_has_children();
                    Frame::Container(0)
                }
                b"li" => {
                    let index = match self.frames.last_mut() {
                        Some(Frame::Container(count)) => {
                            *count += 1;
                            *count
                        }
                        _ => return Err("rdf:li outside of an RDF container".to_string()),
                    };
                    self.path.push(PathStep::Item(index));
                    self.attribute_fields(reader, element)?;
                    Frame::Value {
                        text: String::new(),
                        has_children: false,
                    }
                }
                _ => Frame::Transparent,
            },
            Some(uri) if self.saw_rdf => {
                self.mark_parent_has_children();
                let name = String::from_utf8_lossy(local).into_owned();
                self.path.push(PathStep::Field {
                    ns: uri.to_string(),
                    name,
                });
                let text = Self::rdf_resource(reader, element)?.unwrap_or_default();
                self.attribute_fields(reader, element)?;
                Frame::Value {
                    text,
                    has_children: false,
                }
            }
            _ => Frame::Transparent,
        };

        self.frames.push(frame);
        Ok(())
    }

    fn text(&mut self, raw: &[u8]) {
        if let Some(Frame::Value { text, .. }) = self.frames.last_mut() {
            text.push_str(&unescape_lossy(raw));
        }
    }

    /// Appends a character or predefined entity reference to the open value.
    /// Unknown entities are kept verbatim.
    fn reference(&mut self, reference: &BytesRef<'_>) -> Result<(), String> {
        let Some(Frame::Value { text, .. }) = self.frames.last_mut() else {
            return Ok(());
        };
        if let Some(ch) = reference.resolve_char_ref().map_err(|e| e.to_string())? {
            text.push(ch);
            return Ok(());
        }
        let name = reference.decode().map_err(|e| e.to_string())?;
        match resolve_predefined_entity(&name) {
            Some(resolved) => text.push_str(resolved),
            None => {
                text.push('&');
                text.push_str(&name);
                text.push(';');
            }
        }
        Ok(())
    }

    fn end(&mut self) {
        if let Some(Frame::Value { text, has_children }) = self.frames.pop() {
            let value = text.trim();
            if !has_children && !value.is_empty() {
                self.metadata.push(self.path.clone(), value.to_string());
            }
            self.path.pop();
        }
    }
}

/// Parses one serialized XMP packet.
///
/// Fails on malformed XML or when the packet holds no `rdf:RDF` element.
pub fn parse_packet(packet: &[u8]) -> Result<ImageMetadata, String> {
    // Text is not trimmed per event: references split it into fragments and
    // the surrounding spaces belong to the value. `end` trims the joined text.
    let mut reader = NsReader::from_reader(packet);

    let mut parser = Parser::new();
    let mut buf = Vec::new();

    loop {
        let (resolved, event) = reader
            .read_resolved_event_into(&mut buf)
            .map_err(|e| e.to_string())?;
        let ns = owned_namespace(&resolved);

        match event {
            Event::Start(e) => parser.start(&reader, ns, &e)?,
            Event::Empty(e) => {
                parser.start(&reader, ns, &e)?;
                parser.end();
            }
            Event::End(_) => parser.end(),
            Event::Text(e) => parser.text(e.as_ref()),
            Event::GeneralRef(e) => parser.reference(&e)?,
            Event::CData(e) => {
                if let Some(Frame::Value { text, .. }) = parser.frames.last_mut() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::Eof => break,
            _ => (),
        }
        buf.clear();
    }

    if !parser.saw_rdf {
        return Err("packet contains no rdf:RDF element".to_string());
    }

    Ok(parser.metadata)
}
