use bytes::Bytes;
use img_parts::jpeg::{Jpeg, markers};
use img_parts::png::Png;
use std::fmt;

/// Signature that prefixes an XMP packet inside a JPEG APP1 segment
pub const JPEG_XMP_HEADER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";

/// Keyword of the PNG iTXt chunk carrying XMP
pub const PNG_XMP_KEYWORD: &[u8] = b"XML:com.adobe.xmp";

const PNG_ITXT: [u8; 4] = *b"iTXt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerType {
    Jpeg,
    Png,
    Gif,
    Tiff,
    Webp,
    Unknown,
}

impl ContainerType {
    /// Identifies the container from its magic bytes.
    pub fn sniff(bytes: &[u8]) -> Self {
        match infer::get(bytes).map(|kind| kind.mime_type()) {
            Some("image/jpeg") => ContainerType::Jpeg,
            Some("image/png") => ContainerType::Png,
            Some("image/gif") => ContainerType::Gif,
            Some("image/tiff") => ContainerType::Tiff,
            Some("image/webp") => ContainerType::Webp,
            _ => ContainerType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerType::Jpeg => "jpeg",
            ContainerType::Png => "png",
            ContainerType::Gif => "gif",
            ContainerType::Tiff => "tiff",
            ContainerType::Webp => "webp",
            ContainerType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the first XMP packet embedded in `bytes`, `Ok(None)` if there is
/// none, or an error when the container structure itself cannot be read.
pub fn find_xmp_packet(container: ContainerType, bytes: Bytes) -> Result<Option<Bytes>, String> {
    match container {
        ContainerType::Jpeg => jpeg_packet(bytes),
        ContainerType::Png => png_packet(bytes),
        _ => Ok(scan_packet(&bytes).map(|range| bytes.slice(range))),
    }
}

fn jpeg_packet(bytes: Bytes) -> Result<Option<Bytes>, String> {
    let jpeg = Jpeg::from_bytes(bytes).map_err(|e| format!("invalid JPEG structure: {e}"))?;

    Ok(jpeg
        .segments()
        .iter()
        .filter(|segment| segment.marker() == markers::APP1)
        .map(|segment| segment.contents())
        .find(|contents| contents.starts_with(JPEG_XMP_HEADER))
        .map(|contents| contents.slice(JPEG_XMP_HEADER.len()..)))
}

fn png_packet(bytes: Bytes) -> Result<Option<Bytes>, String> {
    let png = Png::from_bytes(bytes).map_err(|e| format!("invalid PNG structure: {e}"))?;

    for chunk in png.chunks().iter().filter(|chunk| chunk.kind() == PNG_ITXT) {
        if let Some(text) = itxt_xmp_text(chunk.contents()) {
            return Ok(Some(text));
        }
    }
    Ok(None)
}

/// iTXt layout: keyword NUL, compression flag, compression method,
/// language tag NUL, translated keyword NUL, text.
fn itxt_xmp_text(contents: &Bytes) -> Option<Bytes> {
    let keyword_end = contents.iter().position(|&b| b == 0)?;
    if &contents[..keyword_end] != PNG_XMP_KEYWORD {
        return None;
    }

    let mut pos = keyword_end + 1;
    let compressed = *contents.get(pos)?;
    if compressed != 0 {
        tracing::debug!("Skipping compressed XMP iTXt chunk");
        return None;
    }
    pos += 2;

    // language tag, then translated keyword
    for _ in 0..2 {
        let end = contents.get(pos..)?.iter().position(|&b| b == 0)?;
        pos += end + 1;
    }

    Some(contents.slice(pos.min(contents.len())..))
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|i| i + from)
}

/// Locates a serialized packet by its `<?xpacket` wrapper, falling back to a
/// bare `x:xmpmeta` element.
fn scan_packet(bytes: &[u8]) -> Option<std::ops::Range<usize>> {
    if let Some(start) = find(bytes, b"<?xpacket begin", 0) {
        let trailer = find(bytes, b"<?xpacket end", start)?;
        let end = find(bytes, b"?>", trailer)? + 2;
        return Some(start..end);
    }

    let start = find(bytes, b"<x:xmpmeta", 0)?;
    let end = find(bytes, b"</x:xmpmeta>", start)? + b"</x:xmpmeta>".len();
    Some(start..end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_by_magic() {
        assert_eq!(
            ContainerType::sniff(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0]),
            ContainerType::Jpeg
        );
        assert_eq!(
            ContainerType::sniff(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"),
            ContainerType::Png
        );
        assert_eq!(ContainerType::sniff(b"GIF89a\x01\x00"), ContainerType::Gif);
        assert_eq!(ContainerType::sniff(b"hello"), ContainerType::Unknown);
        assert_eq!(ContainerType::sniff(b""), ContainerType::Unknown);
    }

    #[test]
    fn test_scan_packet_prefers_xpacket_wrapper() {
        let data = b"junk<?xpacket begin=\"\"?><x:xmpmeta/><?xpacket end=\"w\"?>tail";
        let range = scan_packet(data).unwrap();
        assert_eq!(
            &data[range],
            b"<?xpacket begin=\"\"?><x:xmpmeta/><?xpacket end=\"w\"?>"
        );
    }

    #[test]
    fn test_scan_packet_falls_back_to_xmpmeta() {
        let data = b"GIF89a....<x:xmpmeta xmlns:x=\"adobe:ns:meta/\"></x:xmpmeta>...";
        let range = scan_packet(data).unwrap();
        assert!(data[range].starts_with(b"<x:xmpmeta"));

        assert!(scan_packet(b"<?xpacket begin=\"\"?> never closed").is_none());
        assert!(scan_packet(b"nothing here").is_none());
    }

    #[test]
    fn test_itxt_xmp_text() {
        let mut chunk = Vec::new();
        chunk.extend_from_slice(PNG_XMP_KEYWORD);
        chunk.extend_from_slice(&[0, 0, 0]);
        chunk.extend_from_slice(b"\0\0<x:xmpmeta/>");
        let text = itxt_xmp_text(&Bytes::from(chunk)).unwrap();
        assert_eq!(&text[..], b"<x:xmpmeta/>");

        let mut other = Vec::new();
        other.extend_from_slice(b"Comment\0\0\0\0\0hello");
        assert!(itxt_xmp_text(&Bytes::from(other)).is_none());
    }
}
