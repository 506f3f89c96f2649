use crate::models::UploadRequest;
use percent_encoding::percent_decode_str;
use thiserror::Error;

/// Maximum accepted upload: 128 MiB
pub const MAX_IMAGE_SIZE: u64 = 128 * 1024 * 1024;

/// Maximum length of the echoed basename
pub const MAX_FILENAME_LEN: usize = 64;

/// The only body type accepted; multipart is deliberately unsupported
pub const ACCEPTED_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Why a request was turned away before any staging happened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("path must contain exactly one segment, found {0}")]
    PathShape(usize),

    #[error("path segment is not valid UTF-8 after decoding")]
    PathEncoding,

    #[error("filename '{0}' contains disallowed characters or is too long")]
    Filename(String),

    #[error("content length is unknown")]
    UnknownLength,

    #[error("content length {0} exceeds maximum of {max} bytes", max = MAX_IMAGE_SIZE)]
    TooLarge(u64),

    #[error("content type '{0}' is not accepted")]
    ContentType(String),
}

/// Checks a candidate filename against the allow-list `[A-Za-z0-9_.-]` and
/// the length ceiling.
///
/// Overly restrictive on purpose: nothing that could act as a path separator,
/// whitespace or shell metacharacter gets through.
pub fn sanitize(candidate: &str) -> bool {
    candidate.len() <= MAX_FILENAME_LEN
        && candidate
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.')
}

/// Splits a request path into percent-decoded, non-empty segments.
fn path_segments(path: &str) -> Result<Vec<String>, RejectReason> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            percent_decode_str(s)
                .decode_utf8()
                .map(|decoded| decoded.into_owned())
                .map_err(|_| RejectReason::PathEncoding)
        })
        .collect()
}

/// Runs the upload preconditions in order, stopping at the first failure.
///
/// Returns the accepted basename, which is only ever echoed back.
pub fn validate_request(req: &UploadRequest) -> Result<String, RejectReason> {
    // 1. Exactly one path segment
    let mut segments = path_segments(&req.path)?;
    if segments.len() != 1 {
        return Err(RejectReason::PathShape(segments.len()));
    }
    let basename = segments.remove(0);

    // 2. Allow-listed name
    if !sanitize(&basename) {
        tracing::debug!("Rejected filename: {:?}", basename);
        return Err(RejectReason::Filename(basename));
    }

    // 3. Known, bounded length
    match req.declared_length {
        None => return Err(RejectReason::UnknownLength),
        Some(len) if len > MAX_IMAGE_SIZE => return Err(RejectReason::TooLarge(len)),
        Some(_) => {}
    }

    // 4. Exact content type
    let content_type = req.content_type.as_deref().unwrap_or("");
    if content_type != ACCEPTED_CONTENT_TYPE {
        return Err(RejectReason::ContentType(content_type.to_string()));
    }

    Ok(basename)
}
