use std::error::Error as StdError;

use bytes::{Buf, Bytes};
use headers::HeaderMapExt;
use http::header::HeaderValue;
use http::{Request, Response, StatusCode};
use http_body::Body as HttpBody;

use crate::body::Body;
use crate::davheaders::{self, XUpdateRange};
use crate::davpath::DavPath;
use crate::errors::{DavError, DavResult};
use crate::updaterange::UpdateRange;

impl crate::DavHandler {
    // SabreDAV style partial update: PATCH with an X-Update-Range header.
    pub(crate) async fn handle_patch<ReqBody, ReqData, ReqError>(
        &self,
        req: &Request<()>,
        path: &DavPath,
        body: ReqBody,
    ) -> DavResult<Response<Body>>
    where
        ReqBody: HttpBody<Data = ReqData, Error = ReqError>,
        ReqData: Buf + Send + 'static,
        ReqError: StdError + Send + Sync + 'static,
    {
        // only existing files can be patched.
        let meta = self.fs.metadata(path).await?;
        if meta.is_dir() {
            debug!("PATCH {}: is a collection", path);
            return Err(DavError::Status(StatusCode::METHOD_NOT_ALLOWED));
        }

        let range = match req.headers().typed_try_get::<XUpdateRange>() {
            Ok(Some(XUpdateRange(range))) => range,
            Ok(None) => {
                debug!("PATCH {}: no X-Update-Range header", path);
                return Err(StatusCode::BAD_REQUEST.into());
            }
            Err(_) => {
                debug!("PATCH {}: invalid X-Update-Range header", path);
                return Err(StatusCode::BAD_REQUEST.into());
            }
        };

        if !davheaders::is_partialupdate(req.headers()) {
            debug!("PATCH {}: wrong Content-Type", path);
            return Err(StatusCode::UNSUPPORTED_MEDIA_TYPE.into());
        }

        let len = match req.headers().typed_get::<headers::ContentLength>() {
            Some(headers::ContentLength(len)) => len,
            None => return Err(StatusCode::LENGTH_REQUIRED.into()),
        };
        if len > self.max_patch_size as u64 {
            return Err(StatusCode::PAYLOAD_TOO_LARGE.into());
        }

        let range = range.resolve(len)?;
        if let UpdateRange::EndOffset(offset) = range {
            if offset > meta.len() {
                debug!(
                    "PATCH {}: offset {} from end is beyond file length {}",
                    path,
                    offset,
                    meta.len()
                );
                return Err(StatusCode::RANGE_NOT_SATISFIABLE.into());
            }
        }

        let data = self.read_request(body, len as usize).await?;
        if data.len() as u64 != len {
            debug!(
                "PATCH {}: got {} bytes, Content-Length is {}",
                path,
                data.len(),
                len
            );
            return Err(StatusCode::BAD_REQUEST.into());
        }

        trace!("PATCH {}: {:?} {} bytes", path, range, len);
        let etag = self.fs.patch(path, Bytes::from(data), range).await?;

        let mut res = Response::new(Body::empty());
        *res.status_mut() = StatusCode::NO_CONTENT;
        res.headers_mut().typed_insert(headers::ContentLength(0));
        if let Some(etag) = etag {
            if let Ok(v) = HeaderValue::from_str(&format!("\"{}\"", etag)) {
                res.headers_mut().insert(http::header::ETAG, v);
            }
        }
        Ok(res)
    }
}
