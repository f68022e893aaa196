//! The `X-Update-Range` grammar of SabreDAV's partial update extension.
//!
//! A `PATCH` request with `Content-Type: application/x-sabredav-partialupdate`
//! carries one of:
//!
//! - `X-Update-Range: append`
//! - `X-Update-Range: bytes=<start>-<end>` (end optional)
//! - `X-Update-Range: bytes=-<offset>` (offset counted from the end)
//!
use http::StatusCode;
use regex::Regex;

use crate::errors::{DavError, DavResult};

lazy_static! {
    static ref RE_UPDATE_RANGE: Regex =
        Regex::new(r"(?i)^\s*(?:(append)|bytes=([0-9]+)-([0-9]*)|bytes=-([0-9]+))\s*$").unwrap();
}

/// Where the body of a partial update goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateRange {
    /// Write at the end of the resource.
    Append,
    /// Write at `start`. `end` is inclusive; `None` until it has been
    /// derived from the content length by [`UpdateRange::resolve`].
    StartEnd { start: u64, end: Option<u64> },
    /// Write starting this many bytes before the end of the resource.
    EndOffset(u64),
}

impl UpdateRange {
    /// Parse a header value. Returns `None` if it matches none of the forms.
    pub fn parse(value: &str) -> Option<UpdateRange> {
        let caps = RE_UPDATE_RANGE.captures(value)?;
        if caps.get(1).is_some() {
            return Some(UpdateRange::Append);
        }
        if let Some(start) = caps.get(2) {
            let start = start.as_str().parse::<u64>().ok()?;
            let end = match caps.get(3).map(|m| m.as_str()) {
                Some("") | None => None,
                Some(end) => Some(end.parse::<u64>().ok()?),
            };
            return Some(UpdateRange::StartEnd { start, end });
        }
        let offset = caps.get(4)?.as_str().parse::<u64>().ok()?;
        Some(UpdateRange::EndOffset(offset))
    }

    /// Parse an optional header value, `None` if absent or not recognized.
    pub fn from_header(value: Option<&str>) -> Option<UpdateRange> {
        value.and_then(UpdateRange::parse)
    }

    /// Check the range against the declared length of the request body,
    /// and fill in the end of a `StartEnd` range if it was left open.
    pub fn resolve(self, content_length: u64) -> DavResult<UpdateRange> {
        match self {
            UpdateRange::StartEnd { start, end: None } => {
                if content_length == 0 {
                    // an inclusive range cannot be empty.
                    debug!("X-Update-Range: open range at {start} without data");
                    return Err(StatusCode::RANGE_NOT_SATISFIABLE.into());
                }
                let end = start
                    .checked_add(content_length - 1)
                    .ok_or(DavError::Status(StatusCode::RANGE_NOT_SATISFIABLE))?;
                Ok(UpdateRange::StartEnd {
                    start,
                    end: Some(end),
                })
            }
            UpdateRange::StartEnd {
                start,
                end: Some(end),
            } => {
                if end < start {
                    debug!("X-Update-Range: end offset {end} is lower than start offset {start}");
                    return Err(StatusCode::RANGE_NOT_SATISFIABLE.into());
                }
                let span = (end - start)
                    .checked_add(1)
                    .ok_or(DavError::Status(StatusCode::RANGE_NOT_SATISFIABLE))?;
                if span != content_length {
                    debug!(
                        "X-Update-Range: data length {content_length} does not match {start}-{end}"
                    );
                    return Err(StatusCode::RANGE_NOT_SATISFIABLE.into());
                }
                Ok(self)
            }
            _ => Ok(self),
        }
    }

    /// The start offset, for the kinds that have one.
    pub fn start(&self) -> Option<u64> {
        match self {
            UpdateRange::StartEnd { start, .. } => Some(*start),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append() {
        assert_eq!(UpdateRange::parse("append"), Some(UpdateRange::Append));
        assert_eq!(UpdateRange::parse("APPEND"), Some(UpdateRange::Append));
        assert_eq!(UpdateRange::parse("Append"), Some(UpdateRange::Append));
    }

    #[test]
    fn start_end() {
        assert_eq!(
            UpdateRange::parse("bytes=10-15"),
            Some(UpdateRange::StartEnd {
                start: 10,
                end: Some(15)
            })
        );
        assert_eq!(
            UpdateRange::parse("BYTES=0-0"),
            Some(UpdateRange::StartEnd {
                start: 0,
                end: Some(0)
            })
        );
        let open = UpdateRange::parse("bytes=10-").unwrap();
        assert_eq!(
            open,
            UpdateRange::StartEnd {
                start: 10,
                end: None
            }
        );
        assert_eq!(
            open.resolve(6).unwrap(),
            UpdateRange::StartEnd {
                start: 10,
                end: Some(15)
            }
        );
        assert_eq!(open.start(), Some(10));
    }

    #[test]
    fn end_offset() {
        assert_eq!(
            UpdateRange::parse("bytes=-5"),
            Some(UpdateRange::EndOffset(5))
        );
        assert_eq!(UpdateRange::EndOffset(5).start(), None);
    }

    #[test]
    fn invalid() {
        assert_eq!(UpdateRange::parse("garbage"), None);
        assert_eq!(UpdateRange::parse("bytes=-"), None);
        assert_eq!(UpdateRange::parse("bytes=a-b"), None);
        assert_eq!(UpdateRange::parse("bytes=1-2,4-5"), None);
        assert_eq!(UpdateRange::parse("appendix"), None);
        assert_eq!(UpdateRange::parse("bytes=99999999999999999999999-"), None);
        assert_eq!(UpdateRange::from_header(None), None);
        assert_eq!(
            UpdateRange::from_header(Some("append")),
            Some(UpdateRange::Append)
        );
    }

    #[test]
    fn length_mismatch() {
        let range = UpdateRange::parse("bytes=10-15").unwrap();
        assert!(range.resolve(6).is_ok());
        for len in [0, 5, 7, 100] {
            let err = range.resolve(len).unwrap_err();
            assert_eq!(err.statuscode(), StatusCode::RANGE_NOT_SATISFIABLE);
        }
    }

    #[test]
    fn end_before_start() {
        let range = UpdateRange::parse("bytes=15-10").unwrap();
        let err = range.resolve(6).unwrap_err();
        assert_eq!(err.statuscode(), StatusCode::RANGE_NOT_SATISFIABLE);
    }

    #[test]
    fn full_width_range() {
        let range = UpdateRange::parse("bytes=0-18446744073709551615").unwrap();
        for len in [0, 6, u64::MAX] {
            let err = range.resolve(len).unwrap_err();
            assert_eq!(err.statuscode(), StatusCode::RANGE_NOT_SATISFIABLE);
        }
    }

    #[test]
    fn open_range_without_data() {
        let range = UpdateRange::parse("bytes=10-").unwrap();
        let err = range.resolve(0).unwrap_err();
        assert_eq!(err.statuscode(), StatusCode::RANGE_NOT_SATISFIABLE);

        let range = UpdateRange::parse("bytes=18446744073709551615-").unwrap();
        assert_eq!(
            range.resolve(1).unwrap(),
            UpdateRange::StartEnd {
                start: u64::MAX,
                end: Some(u64::MAX)
            }
        );
        assert!(range.resolve(2).is_err());
    }

    #[test]
    fn resolve_passthrough() {
        assert_eq!(
            UpdateRange::Append.resolve(3).unwrap(),
            UpdateRange::Append
        );
        assert_eq!(
            UpdateRange::EndOffset(2).resolve(3).unwrap(),
            UpdateRange::EndOffset(2)
        );
    }
}
