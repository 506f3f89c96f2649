pub mod container;
pub mod date;
pub mod xmp;

pub use container::ContainerType;
pub use date::XmpDateTime;

use bytes::Bytes;
use std::collections::BTreeSet;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to open staged file: {0}")]
    Open(#[source] io::Error),

    #[error("malformed {container} container: {reason}")]
    MalformedContainer {
        container: ContainerType,
        reason: String,
    },

    #[error("no XMP packet in {0} container")]
    MissingMetadata(ContainerType),

    #[error("malformed XMP packet: {0}")]
    MalformedMetadata(String),

    #[error("unsupported container type: {0}")]
    UnsupportedContainer(ContainerType),
}

impl ExtractError {
    /// Short label for log fields.
    pub fn cause(&self) -> &'static str {
        match self {
            ExtractError::Open(_) => "open",
            ExtractError::MalformedContainer { .. } => "malformed_container",
            ExtractError::MissingMetadata(_) => "missing_metadata",
            ExtractError::MalformedMetadata(_) => "malformed_metadata",
            ExtractError::UnsupportedContainer(_) => "unsupported_container",
        }
    }
}

/// One step of an XMP property path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathStep {
    Field { ns: String, name: String },
    /// 1-based position inside an `rdf:Seq`, `rdf:Bag` or `rdf:Alt`
    Item(usize),
}

impl PathStep {
    fn is_field(&self, ns: &str, name: &str) -> bool {
        matches!(self, PathStep::Field { ns: n, name: m } if n == ns && m == name)
    }
}

/// Structured XMP properties of one image, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageMetadata {
    properties: Vec<(Vec<PathStep>, String)>,
}

impl ImageMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: Vec<PathStep>, value: String) {
        self.properties.push((path, value));
    }

    /// Sets a simple top-level property.
    pub fn with_property(mut self, ns: &str, name: &str, value: &str) -> Self {
        self.push(
            vec![PathStep::Field {
                ns: ns.to_string(),
                name: name.to_string(),
            }],
            value.to_string(),
        );
        self
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Value of a simple top-level property.
    pub fn property(&self, ns: &str, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(path, _)| path.len() == 1 && path[0].is_field(ns, name))
            .map(|(_, value)| value.as_str())
    }

    /// A top-level date property; unparseable values count as absent.
    pub fn date(&self, ns: &str, name: &str) -> Option<XmpDateTime> {
        let raw = self.property(ns, name)?;
        match raw.parse() {
            Ok(date) => Some(date),
            Err(e) => {
                tracing::debug!("Ignoring {}: {}", name, e);
                None
            }
        }
    }

    /// Number of items in a top-level array property.
    pub fn array_len(&self, ns: &str, name: &str) -> usize {
        self.properties
            .iter()
            .filter(|(path, _)| path.len() >= 2 && path[0].is_field(ns, name))
            .filter_map(|(path, _)| match path[1] {
                PathStep::Item(i) => Some(i),
                PathStep::Field { .. } => None,
            })
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Simple item values of a top-level array, e.g. each `dc:subject` keyword.
    pub fn array_items<'a>(&'a self, ns: &'a str, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.properties
            .iter()
            .filter(move |(path, _)| {
                path.len() == 2 && path[0].is_field(ns, name) && matches!(path[1], PathStep::Item(_))
            })
            .map(|(_, value)| value.as_str())
    }

    /// Values of one struct field across every item of a top-level array,
    /// e.g. each `stEvt:softwareAgent` in `xmpMM:History`.
    pub fn array_field_values<'a>(
        &'a self,
        ns: &'a str,
        name: &'a str,
        field_ns: &'a str,
        field_name: &'a str,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.properties
            .iter()
            .filter(move |(path, _)| {
                path.len() == 3
                    && path[0].is_field(ns, name)
                    && matches!(path[1], PathStep::Item(_))
                    && path[2].is_field(field_ns, field_name)
            })
            .map(|(_, value)| value.as_str())
    }
}

/// Reads the staged bytes, identifies the container and parses its XMP packet.
///
/// The whole file is released before this returns, on success or failure.
pub fn extract(path: &Path) -> Result<(ImageMetadata, ContainerType), ExtractError> {
    let bytes = Bytes::from(std::fs::read(path).map_err(ExtractError::Open)?);
    extract_from_bytes(bytes)
}

pub fn extract_from_bytes(bytes: Bytes) -> Result<(ImageMetadata, ContainerType), ExtractError> {
    let container = ContainerType::sniff(&bytes);

    let packet = container::find_xmp_packet(container, bytes)
        .map_err(|reason| ExtractError::MalformedContainer { container, reason })?
        .ok_or(ExtractError::MissingMetadata(container))?;

    let metadata = xmp::parse_packet(&packet).map_err(ExtractError::MalformedMetadata)?;

    tracing::debug!(
        "Extracted {} XMP properties from {} container",
        metadata.len(),
        container
    );

    Ok((metadata, container))
}

#[cfg(test)]
mod tests {
    use super::xmp::{NS_ST_EVT, NS_XMP, NS_XMP_MM};
    use super::*;

    #[test]
    fn test_date_treats_garbage_as_absent() {
        let meta = ImageMetadata::new()
            .with_property(NS_XMP, "CreateDate", "2020-01-01T00:00:00Z")
            .with_property(NS_XMP, "ModifyDate", "last tuesday");

        assert!(meta.date(NS_XMP, "CreateDate").is_some());
        assert!(meta.date(NS_XMP, "ModifyDate").is_none());
        assert!(meta.date(NS_XMP, "MetadataDate").is_none());
    }

    #[test]
    fn test_property_ignores_nested_paths() {
        let mut meta = ImageMetadata::new();
        meta.push(
            vec![
                PathStep::Field {
                    ns: NS_XMP_MM.to_string(),
                    name: "History".to_string(),
                },
                PathStep::Item(1),
                PathStep::Field {
                    ns: NS_ST_EVT.to_string(),
                    name: "softwareAgent".to_string(),
                },
            ],
            "Lightroom".to_string(),
        );

        assert_eq!(meta.property(NS_ST_EVT, "softwareAgent"), None);
        assert_eq!(meta.array_len(NS_XMP_MM, "History"), 1);
        assert_eq!(
            meta.array_field_values(NS_XMP_MM, "History", NS_ST_EVT, "softwareAgent")
                .collect::<Vec<_>>(),
            ["Lightroom"]
        );
    }

    #[test]
    fn test_extract_unknown_bytes_without_packet() {
        let err = extract_from_bytes(Bytes::from_static(b"just some text")).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::MissingMetadata(ContainerType::Unknown)
        ));
    }

    #[test]
    fn test_extract_scans_unknown_container() {
        let data = b"GIF89a\x01\x00\x01\x00<x:xmpmeta xmlns:x=\"adobe:ns:meta/\">\
            <rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">\
            <rdf:Description xmlns:xmp=\"http://ns.adobe.com/xap/1.0/\" xmp:CreatorTool=\"GIMP\"/>\
            </rdf:RDF></x:xmpmeta>";

        let (meta, container) = extract_from_bytes(Bytes::from_static(data)).unwrap();
        assert_eq!(container, ContainerType::Gif);
        assert_eq!(meta.property(NS_XMP, "CreatorTool"), Some("GIMP"));
    }

    #[test]
    fn test_extract_reports_malformed_packet() {
        let data = b"<?xpacket begin=\"\"?><x:xmpmeta>no rdf here</x:xmpmeta><?xpacket end=\"w\"?>";
        let err = extract_from_bytes(Bytes::from_static(data)).unwrap_err();
        assert!(matches!(err, ExtractError::MalformedMetadata(_)));
    }

    #[test]
    fn test_extract_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract(&dir.path().join("gone")).unwrap_err();
        assert!(matches!(err, ExtractError::Open(_)));
        assert_eq!(err.cause(), "open");
    }
}
