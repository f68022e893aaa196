//! ## Async WebDAV property patching and partial updates
//!
//! This library is a `handler` for two of the write paths of a WebDAV
//! server:
//!
//! - `PROPPATCH` (RFC4918 section 9.2): a `DAV:propertyupdate` document
//!   sets or removes dead properties on a resource. The reply is a
//!   `207 Multi-Status` with one `propstat` per property.
//! - `PATCH` with the `X-Update-Range` header, the partial update
//!   extension from SabreDAV: overwrite a byte range of an existing file,
//!   append to it, or overwrite its last N bytes.
//!
//! `OPTIONS` advertises both (`DAV: 1,sabredav-partialupdate`).
//!
//! The pieces can also be used on their own: [`propupdate`] is a
//! streaming parser for the request document, [`UpdateRange`] parses and
//! checks the range header, and [`apply_propertyupdate`] runs a parsed
//! update against a [`DavFileSystem`].
//!
//! ## Backends.
//!
//! Included are two filesystems:
//!
//! - `LocalFs`: patches files in a directory on the local filesystem. It
//!   does not store properties.
//! - [`MemFs`]: ephemeral in-memory filesystem. supports DAV properties.
//!
//! ## Example.
//!
//! Example server using [hyper] that serves the /tmp directory.
//!
//! ```no_run
//! use std::convert::Infallible;
//! use dav_patch::{DavHandler, FileSystem};
//!
//! #[tokio::main]
//! async fn main() {
//!     let dir = "/tmp";
//!     let addr = ([127, 0, 0, 1], 4918).into();
//!
//!     let dav_server = DavHandler::builder(FileSystem::local(dir)).build();
//!
//!     let make_service = hyper::service::make_service_fn(move |_| {
//!         let dav_server = dav_server.clone();
//!         async move {
//!             let func = move |req| {
//!                 let dav_server = dav_server.clone();
//!                 async move {
//!                     Ok::<_, Infallible>(dav_server.handle(req).await)
//!                 }
//!             };
//!             Ok::<_, Infallible>(hyper::service::service_fn(func))
//!         }
//!     });
//!
//!     println!("Serving {} on {}", dir, addr);
//!     let _ = hyper::Server::bind(&addr)
//!         .serve(make_service)
//!         .await
//!         .map_err(|e| eprintln!("server error: {}", e));
//! }
//! ```
//!
//! [hyper]: https://hyper.rs/

#![cfg_attr(docsrs, feature(doc_cfg))]

#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;

mod davhandler;
mod davheaders;
mod errors;
mod util;

pub mod body;
pub mod davpath;
pub mod fs;
pub mod proppatch;
pub mod propupdate;
pub mod updaterange;

#[cfg(any(docsrs, feature = "warp-compat"))]
#[cfg_attr(docsrs, doc(cfg(feature = "warp-compat")))]
pub mod warp;

pub use crate::davhandler::{DavBuilder, DavHandler, FileSystem, MAX_PATCH_SIZE, MAX_REQUEST_SIZE};
pub use crate::davheaders::XUpdateRange;
pub use crate::davpath::DavPath;
pub use crate::errors::DavError;
pub use crate::fs::{DavFileSystem, DavMetaData, FsError, FsFuture, FsResult};
pub use crate::proppatch::apply_propertyupdate;
pub use crate::propupdate::{
    parse_chunks, parse_file, parse_reader, PropMode, PropUpdateReader, PropertyOperation,
    PropertyUpdate,
};
pub use crate::updaterange::UpdateRange;
pub use crate::util::DavMethod;

#[cfg(any(docsrs, feature = "memfs"))]
#[cfg_attr(docsrs, doc(cfg(feature = "memfs")))]
pub use crate::fs::memfs::MemFs;
