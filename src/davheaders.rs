use headers::{ContentType, Header, HeaderMapExt};
use http::header::{HeaderName, HeaderValue};
use mime::Mime;

use crate::updaterange::UpdateRange;

pub(crate) const PARTIALUPDATE_CONTENT_TYPE: &str = "application/x-sabredav-partialupdate";

lazy_static! {
    static ref X_UPDATE_RANGE: HeaderName = HeaderName::from_static("x-update-range");
}

// helper.
fn one<'i, I>(values: &mut I) -> Result<&'i HeaderValue, headers::Error>
where
    I: Iterator<Item = &'i HeaderValue>,
{
    let v = values.next().ok_or_else(invalid)?;
    if values.next().is_some() {
        Err(invalid())
    } else {
        Ok(v)
    }
}

// helper
fn invalid() -> headers::Error {
    headers::Error::invalid()
}

// helper
fn map_invalid(_e: impl std::error::Error) -> headers::Error {
    headers::Error::invalid()
}

/// X-Update-Range header (SabreDAV partial update).
#[derive(Debug, Clone, PartialEq)]
pub struct XUpdateRange(pub UpdateRange);

impl Header for XUpdateRange {
    fn name() -> &'static HeaderName {
        &X_UPDATE_RANGE
    }

    fn decode<'i, I>(values: &mut I) -> Result<XUpdateRange, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        let value = one(values)?.to_str().map_err(map_invalid)?;
        UpdateRange::parse(value)
            .map(XUpdateRange)
            .ok_or_else(invalid)
    }

    fn encode<E>(&self, values: &mut E)
    where
        E: Extend<HeaderValue>,
    {
        let value = match self.0 {
            UpdateRange::Append => "append".to_string(),
            UpdateRange::StartEnd { start, end: None } => format!("bytes={start}-"),
            UpdateRange::StartEnd {
                start,
                end: Some(end),
            } => format!("bytes={start}-{end}"),
            UpdateRange::EndOffset(offset) => format!("bytes=-{offset}"),
        };
        values.extend(std::iter::once(HeaderValue::from_str(&value).unwrap()));
    }
}

/// Does the request's Content-Type name the partial update media type.
///
/// Parameters (`; charset=...`) are ignored, the comparison is case-insensitive.
pub(crate) fn is_partialupdate(headers: &http::HeaderMap) -> bool {
    match headers.typed_get::<ContentType>() {
        Some(ct) => Mime::from(ct)
            .essence_str()
            .eq_ignore_ascii_case(PARTIALUPDATE_CONTENT_TYPE),
        None => false,
    }
}
