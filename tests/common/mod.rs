#![allow(dead_code)]

use axum::body::Body;
use axum::http::Request;
use bytes::Bytes;
use http_body_util::BodyExt;
use image::ImageEncoder;
use img_parts::jpeg::{Jpeg, JpegSegment, markers};
use img_parts::png::{Png, PngChunk};
use picserver::config::AnalyzerConfig;
use picserver::services::metadata::container::{JPEG_XMP_HEADER, PNG_XMP_KEYWORD};
use picserver::{AppState, create_app};
use std::path::Path;

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// XMP packet with the given `xmp:` properties in element form.
pub fn xmp_packet(properties: &[(&str, &str)]) -> String {
    let body: String = properties
        .iter()
        .map(|(name, value)| format!("      <xmp:{name}>{value}</xmp:{name}>\n"))
        .collect();
    wrap_description(&body)
}

/// XMP packet with an `xmpMM:History` sequence of the given agents.
pub fn xmp_with_history(creator_tool: &str, agents: &[&str]) -> String {
    let items: String = agents
        .iter()
        .map(|agent| {
            format!("          <rdf:li stEvt:action=\"saved\" stEvt:softwareAgent=\"{agent}\"/>\n")
        })
        .collect();
    wrap_description(&format!(
        "      <xmp:CreatorTool>{creator_tool}</xmp:CreatorTool>\n      <xmpMM:History>\n        <rdf:Seq>\n{items}        </rdf:Seq>\n      </xmpMM:History>\n"
    ))
}

fn wrap_description(body: &str) -> String {
    format!(
        r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/">
  <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
    <rdf:Description rdf:about=""
        xmlns:xmp="http://ns.adobe.com/xap/1.0/"
        xmlns:xmpMM="http://ns.adobe.com/xap/1.0/mm/"
        xmlns:stEvt="http://ns.adobe.com/xap/1.0/sType/ResourceEvent#">
{body}    </rdf:Description>
  </rdf:RDF>
</x:xmpmeta>
<?xpacket end="w"?>"#
    )
}

/// A 1x1 baseline JPEG.
pub fn plain_jpeg() -> Vec<u8> {
    let mut encoded = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut encoded)
        .encode(&[200, 120, 40], 1, 1, image::ColorType::Rgb8)
        .unwrap();
    encoded
}

/// A 1x1 JPEG carrying `packet` in an APP1 segment.
pub fn jpeg_with_xmp(packet: &str) -> Vec<u8> {
    let mut jpeg = Jpeg::from_bytes(Bytes::from(plain_jpeg())).unwrap();

    let mut contents = JPEG_XMP_HEADER.to_vec();
    contents.extend_from_slice(packet.as_bytes());
    let segment = JpegSegment::new_with_contents(markers::APP1, Bytes::from(contents));

    let at = jpeg.segments().len().min(1);
    jpeg.segments_mut().insert(at, segment);
    jpeg.encoder().bytes().to_vec()
}

/// A 1x1 PNG carrying `packet` in an uncompressed iTXt chunk.
pub fn png_with_xmp(packet: &str) -> Vec<u8> {
    let mut encoded = Vec::new();
    image::codecs::png::PngEncoder::new(&mut encoded)
        .write_image(&[200, 120, 40], 1, 1, image::ColorType::Rgb8)
        .unwrap();
    let mut png = Png::from_bytes(Bytes::from(encoded)).unwrap();

    let mut contents = PNG_XMP_KEYWORD.to_vec();
    // NUL, compression flag, compression method, empty language, empty translation
    contents.extend_from_slice(&[0, 0, 0, 0, 0]);
    contents.extend_from_slice(packet.as_bytes());
    let chunk = PngChunk::new(*b"iTXt", Bytes::from(contents));

    let at = png.chunks().len().min(1);
    png.chunks_mut().insert(at, chunk);
    png.encoder().bytes().to_vec()
}

pub fn upload(path: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("Content-Type", FORM_URLENCODED)
        .header("Content-Length", body.len().to_string())
        .body(Body::from(body))
        .unwrap()
}

pub fn app_with(config: AnalyzerConfig) -> axum::Router {
    create_app(AppState::new(config))
}

pub fn app(staging_dir: &Path) -> axum::Router {
    app_with(AnalyzerConfig::for_staging_dir(staging_dir))
}

pub async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn staged_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
