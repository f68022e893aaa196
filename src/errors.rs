use std::error::Error;
use std::fmt;
use std::io::{self, ErrorKind};

use http::StatusCode;
use xml::writer::Error as XmlWriterError;

use crate::fs::FsError;

pub(crate) type DavResult<T> = Result<T, DavError>;

/// Errors that end a request early.
///
/// Every variant maps to a HTTP status code via [`DavError::statuscode`].
#[derive(Debug)]
pub enum DavError {
    XmlParseError, // error interpreting xml
    InvalidPath,   // error parsing path
    IllegalPath,   // path not valid here
    ForbiddenPath, // too many dotdots
    UnknownDavMethod,
    Utf8Error,
    Status(StatusCode),
    StatusClose(StatusCode),
    FsError(FsError),
    IoError(io::Error),
    XmlWriterError(XmlWriterError),
}

impl Error for DavError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DavError::FsError(e) => Some(e),
            DavError::IoError(e) => Some(e),
            DavError::XmlWriterError(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for DavError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DavError::XmlWriterError(_) => write!(f, "XML generate error"),
            DavError::IoError(_) => write!(f, "I/O error"),
            _ => write!(f, "{self:?}"),
        }
    }
}

impl From<FsError> for DavError {
    fn from(e: FsError) -> Self {
        DavError::FsError(e)
    }
}

impl From<io::Error> for DavError {
    fn from(e: io::Error) -> Self {
        DavError::IoError(e)
    }
}

impl From<StatusCode> for DavError {
    fn from(e: StatusCode) -> Self {
        DavError::Status(e)
    }
}

impl From<XmlWriterError> for DavError {
    fn from(e: XmlWriterError) -> Self {
        DavError::XmlWriterError(e)
    }
}

impl From<std::str::Utf8Error> for DavError {
    fn from(_: std::str::Utf8Error) -> Self {
        DavError::Utf8Error
    }
}

pub(crate) fn ioerror_to_status(ioerror: &io::Error) -> StatusCode {
    match ioerror.kind() {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
        ErrorKind::AlreadyExists => StatusCode::CONFLICT,
        ErrorKind::TimedOut => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    }
}

pub(crate) fn fserror_to_status(e: &FsError) -> StatusCode {
    match e {
        FsError::NotImplemented => StatusCode::NOT_IMPLEMENTED,
        FsError::GeneralFailure => StatusCode::INTERNAL_SERVER_ERROR,
        FsError::NotFound => StatusCode::NOT_FOUND,
        FsError::Forbidden => StatusCode::FORBIDDEN,
        FsError::InsufficientStorage => StatusCode::INSUFFICIENT_STORAGE,
        FsError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
    }
}

impl DavError {
    /// HTTP status code this error turns into.
    pub fn statuscode(&self) -> StatusCode {
        match self {
            DavError::XmlParseError => StatusCode::BAD_REQUEST,
            DavError::InvalidPath => StatusCode::BAD_REQUEST,
            DavError::IllegalPath => StatusCode::BAD_GATEWAY,
            DavError::ForbiddenPath => StatusCode::FORBIDDEN,
            DavError::UnknownDavMethod => StatusCode::NOT_IMPLEMENTED,
            DavError::Utf8Error => StatusCode::BAD_REQUEST,
            DavError::IoError(e) => ioerror_to_status(e),
            DavError::FsError(e) => fserror_to_status(e),
            DavError::Status(e) => *e,
            DavError::StatusClose(e) => *e,
            DavError::XmlWriterError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Should the connection be closed after sending the error response.
    pub(crate) fn must_close(&self) -> bool {
        !matches!(
            self,
            &DavError::Status(_)
                | &DavError::FsError(FsError::NotFound)
                | &DavError::FsError(FsError::Forbidden)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            DavError::from(FsError::NotFound).statuscode(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            DavError::from(StatusCode::RANGE_NOT_SATISFIABLE).statuscode(),
            StatusCode::RANGE_NOT_SATISFIABLE
        );
        assert_eq!(DavError::XmlParseError.statuscode(), StatusCode::BAD_REQUEST);
        assert_eq!(
            DavError::from(FsError::InsufficientStorage).statuscode(),
            StatusCode::INSUFFICIENT_STORAGE
        );
        assert_eq!(
            DavError::UnknownDavMethod.statuscode(),
            StatusCode::NOT_IMPLEMENTED
        );
    }

    #[test]
    fn closing() {
        assert!(!DavError::Status(StatusCode::BAD_REQUEST).must_close());
        assert!(!DavError::FsError(FsError::NotFound).must_close());
        assert!(DavError::StatusClose(StatusCode::METHOD_NOT_ALLOWED).must_close());
        assert!(DavError::XmlParseError.must_close());
    }
}
