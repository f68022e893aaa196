//! Contains the structs and traits that define a filesystem backend.
//!
//! You only need this if you are going to implement your own
//! filesystem backend. Otherwise, just use the bundled `LocalFs` or `MemFs`.
//!
//! The backend serves two collaborators of the handler:
//!
//! - the storage node, which receives partial updates (`PATCH`)
//! - the property store, which keeps dead properties set by `PROPPATCH`
//!
use std::error::Error;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use futures_util::future::{self, BoxFuture, FutureExt};

use crate::davpath::DavPath;
use crate::updaterange::UpdateRange;

macro_rules! notimplemented_fut {
    ($method:expr) => {{
        trace!("FS: {} not implemented", $method);
        Box::pin(future::ready(Err(FsError::NotImplemented)))
    }};
}

#[cfg(any(docsrs, feature = "localfs"))]
pub(crate) mod localfs;
#[cfg(any(docsrs, feature = "memfs"))]
pub(crate) mod memfs;

/// Errors generated by a filesystem implementation.
///
/// These are more result-codes than errors, really.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// Operation not implemented (501)
    NotImplemented,
    /// Something went wrong (500)
    GeneralFailure,
    /// Resource or property not found (404)
    NotFound,
    /// Not allowed (403)
    Forbidden,
    /// Out of space (507)
    InsufficientStorage,
    /// The value or body is too large (413)
    TooLarge,
}

/// The Result type.
pub type FsResult<T> = std::result::Result<T, FsError>;

/// Future returned by almost all of the DavFileSystem methods.
pub type FsFuture<'a, T> = BoxFuture<'a, FsResult<T>>;

/// The webdav handler needs an implementation of this trait.
///
/// Only `metadata` and `patch` are required. A backend that can store
/// dead properties overrides `have_props` and the three property methods.
pub trait DavFileSystem: Sync + Send {
    /// Return the metadata of a file or directory.
    fn metadata<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Box<dyn DavMetaData>>;

    /// Write `data` into an existing file at the position that `range`
    /// describes. The range has been validated and resolved already,
    /// so a `StartEnd` range always carries its end offset.
    ///
    /// Returns the new ETag of the file, if the backend has one.
    fn patch<'a>(
        &'a self,
        path: &'a DavPath,
        data: Bytes,
        range: UpdateRange,
    ) -> FsFuture<'a, Option<String>>;

    /// Indicator that tells if this filesystem supports dead properties.
    #[allow(unused_variables)]
    fn have_props<'a>(&'a self, path: &'a DavPath) -> BoxFuture<'a, bool> {
        future::ready(false).boxed()
    }

    /// Get the value of one dead property. `NotFound` if it is not set.
    #[allow(unused_variables)]
    fn get_prop<'a>(
        &'a self,
        path: &'a DavPath,
        namespace: &'a str,
        name: &'a str,
    ) -> FsFuture<'a, String> {
        notimplemented_fut!("get_prop")
    }

    /// Set (create or replace) one dead property.
    ///
    /// Must either store the value completely or leave the resource untouched.
    #[allow(unused_variables)]
    fn set_prop<'a>(
        &'a self,
        path: &'a DavPath,
        namespace: &'a str,
        name: &'a str,
        value: String,
    ) -> FsFuture<'a, ()> {
        notimplemented_fut!("set_prop")
    }

    /// Remove one dead property. `NotFound` if it was not set.
    #[allow(unused_variables)]
    fn remove_prop<'a>(
        &'a self,
        path: &'a DavPath,
        namespace: &'a str,
        name: &'a str,
    ) -> FsFuture<'a, ()> {
        notimplemented_fut!("remove_prop")
    }
}

/// Metadata of a file or collection.
pub trait DavMetaData: fmt::Debug + Send + Sync {
    /// Size of the file.
    fn len(&self) -> u64;
    /// `Modified` timestamp.
    fn modified(&self) -> FsResult<SystemTime>;
    /// File or directory (aka collection).
    fn is_dir(&self) -> bool;

    /// Is this a file.
    fn is_file(&self) -> bool {
        !self.is_dir()
    }

    /// Is the file empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Simplistic implementation of etag()
    ///
    /// Returns a simple etag that basically is `<length>-<timestamp_in_ms>`
    /// with the numbers in hex. Enough for most implementations.
    fn etag(&self) -> Option<String> {
        if let Ok(t) = self.modified() {
            if let Ok(t) = t.duration_since(UNIX_EPOCH) {
                let t = t.as_secs() * 1000000 + t.subsec_nanos() as u64 / 1000;
                let tag = if self.is_file() && self.len() > 0 {
                    format!("{:x}-{:x}", self.len(), t)
                } else {
                    format!("{t:x}")
                };
                return Some(tag);
            }
        }
        None
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for FsError {}

impl From<&std::io::Error> for FsError {
    fn from(e: &std::io::Error) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::NotFound => FsError::NotFound,
            ErrorKind::PermissionDenied => FsError::Forbidden,
            ErrorKind::InvalidInput => FsError::Forbidden,
            _ => FsError::GeneralFailure,
        }
    }
}

impl From<std::io::Error> for FsError {
    fn from(e: std::io::Error) -> Self {
        (&e).into()
    }
}
