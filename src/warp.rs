//! Adapter for the `warp` HTTP server framework.
//!
//! The filters in this module will always succeed and never
//! return an error. For example, if a file is not found, the
//! filter will return a 404 reply, and not an internal
//! rejection.
//!
use std::convert::Infallible;
use std::path::Path;

use crate::{DavHandler, FileSystem};
use warp::{filters::BoxedFilter, Filter, Reply};

/// Reply-filter that runs a DavHandler.
///
/// Just pass in a pre-configured DavHandler. If a prefix was not
/// configured, it will be the request path up to this point.
pub fn dav_handler(handler: DavHandler) -> BoxedFilter<(impl Reply,)> {
    use http::header::HeaderMap;
    use http::Response;
    use warp::path::{FullPath, Tail};

    warp::method()
        .and(warp::path::full())
        .and(warp::path::tail())
        .and(warp::header::headers_cloned())
        .and(warp::body::stream())
        .and_then(
            move |method, path_full: FullPath, path_tail: Tail, headers: HeaderMap, body| {
                let handler = handler.clone();

                async move {
                    // rebuild an http::Request struct.
                    let path_str = path_full.as_str();
                    let mut builder = http::Request::builder().method(method).uri(path_str);
                    if let Some(h) = builder.headers_mut() {
                        h.extend(headers);
                    }
                    let response = match builder.body(body) {
                        Ok(request) => {
                            let prefix = path_str
                                .strip_suffix(path_tail.as_str())
                                .unwrap_or(path_str)
                                .to_string();
                            handler.handle_stream_with(request, Some(prefix)).await
                        }
                        Err(e) => {
                            debug!("warp: cannot rebuild request for {}: {}", path_str, e);
                            let mut res = Response::new(crate::body::Body::empty());
                            *res.status_mut() = http::StatusCode::BAD_REQUEST;
                            res
                        }
                    };

                    // Need to remap the http_body::Body to a hyper::Body.
                    let (parts, body) = response.into_parts();
                    let response = Response::from_parts(parts, hyper::Body::wrap_stream(body));
                    Ok::<_, Infallible>(response)
                }
            },
        )
        .boxed()
}

/// Creates a Filter that patches files and directories at the
/// base path joined with the remainder of the request path,
/// like `warp::filters::fs::dir`.
pub fn dav_dir(base: impl AsRef<Path>) -> BoxedFilter<(impl Reply,)> {
    dav_handler(DavHandler::builder(FileSystem::local(base.as_ref())).build())
}

/// Creates a Filter that serves a single file, ignoring the request path,
/// like `warp::filters::fs::file`.
pub fn dav_file(file: impl AsRef<Path>) -> BoxedFilter<(impl Reply,)> {
    dav_handler(DavHandler::builder(FileSystem::local_file(file.as_ref())).build())
}
