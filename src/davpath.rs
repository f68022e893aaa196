//! Utility module to handle the path part of an URL as a filesystem path.
//!
use std::fmt;
use std::path::PathBuf;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::errors::{DavError, DavResult};

// Encode all non-unreserved characters, except '/'.
// See RFC3986, and https://en.wikipedia.org/wiki/Percent-encoding .
const PATH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// URL path, with hidden prefix.
///
/// The path is stored decoded and normalized: it always starts with
/// a `/`, has no empty, `.` or `..` segments, and only ends in a `/`
/// if it refers to a collection.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DavPath {
    path: String,
    prefix: String,
}

impl fmt::Debug for DavPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self.as_url_string_with_prefix())
    }
}

impl fmt::Display for DavPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_url_string_with_prefix())
    }
}

// decode and normalize a path. the result starts with '/'.
fn normalize_path(raw: &str) -> DavResult<String> {
    let decoded = percent_decode_str(raw).decode_utf8()?;
    if decoded.contains('\0') {
        return Err(DavError::InvalidPath);
    }
    let mut segments: Vec<&str> = Vec::new();
    for seg in decoded.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(DavError::ForbiddenPath);
                }
            }
            s => segments.push(s),
        }
    }
    let mut path = String::from("/");
    path.push_str(&segments.join("/"));
    if decoded.ends_with('/') && !segments.is_empty() {
        path.push('/');
    }
    Ok(path)
}

impl DavPath {
    /// from URL encoded path
    pub fn new(src: &str) -> DavResult<DavPath> {
        if !src.starts_with('/') {
            return Err(DavError::InvalidPath);
        }
        Ok(DavPath {
            path: normalize_path(src)?,
            prefix: String::new(),
        })
    }

    /// Parse the path of an `http::Uri`, and strip `prefix` off.
    ///
    /// `*` (as in `OPTIONS *`) is accepted and maps to the root.
    pub fn from_uri_and_prefix(uri: &http::uri::Uri, prefix: &str) -> DavResult<Self> {
        let raw = uri.path();
        if raw == "*" {
            return Ok(DavPath {
                path: "/".to_string(),
                prefix: String::new(),
            });
        }
        if !raw.starts_with('/') {
            return Err(DavError::InvalidPath);
        }
        let prefix = prefix.trim_end_matches('/');
        let rest = match raw.strip_prefix(prefix) {
            Some(rest) if rest.is_empty() => "/",
            Some(rest) if rest.starts_with('/') => rest,
            _ => return Err(DavError::IllegalPath),
        };
        Ok(DavPath {
            path: normalize_path(rest)?,
            prefix: prefix.to_string(),
        })
    }

    /// Is this a collection i.e. does the original URL path end in "/".
    pub fn is_collection(&self) -> bool {
        self.path.ends_with('/')
    }

    /// Add a slash to the end of the path (if not already present).
    pub(crate) fn add_slash(&mut self) {
        if !self.is_collection() {
            self.path.push('/');
        }
    }

    /// The decoded path, without the prefix and without a trailing slash.
    ///
    /// Two `DavPath`s that refer to the same resource have the same key.
    pub(crate) fn key(&self) -> &str {
        if self.path.len() > 1 {
            self.path.trim_end_matches('/')
        } else {
            &self.path
        }
    }

    /// The parent collection, or the root itself.
    pub fn parent(&self) -> DavPath {
        let key = self.key();
        let path = match key.rfind('/') {
            Some(0) | None => "/".to_string(),
            Some(idx) => format!("{}/", &key[..idx]),
        };
        DavPath {
            path,
            prefix: self.prefix.clone(),
        }
    }

    /// as URL encoded string, without the prefix.
    pub fn as_url_string(&self) -> String {
        utf8_percent_encode(&self.path, PATH_ENCODE_SET).to_string()
    }

    /// as URL encoded string, with the prefix.
    pub fn as_url_string_with_prefix(&self) -> String {
        let p = utf8_percent_encode(&self.prefix, PATH_ENCODE_SET).to_string();
        p + &self.as_url_string()
    }

    /// Return a relative filesystem path (no leading slash).
    pub(crate) fn as_rel_ospath(&self) -> PathBuf {
        PathBuf::from(self.key().trim_start_matches('/'))
    }
}
