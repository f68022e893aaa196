use headers::HeaderMapExt;
use http::header::HeaderValue;
use http::{Request, Response, StatusCode};

use crate::body::Body;
use crate::davpath::DavPath;
use crate::errors::DavResult;
use crate::util::DavMethod;

impl crate::DavHandler {
    pub(crate) async fn handle_options(
        &self,
        req: &Request<()>,
        path: &DavPath,
    ) -> DavResult<Response<Body>> {
        let mut res = Response::new(Body::empty());

        let h = res.headers_mut();

        // class 1, plus SabreDAV's partial update extension.
        h.insert("DAV", HeaderValue::from_static("1,sabredav-partialupdate"));
        h.insert("MS-Author-Via", HeaderValue::from_static("DAV"));
        h.typed_insert(headers::ContentLength(0));

        // Helper to add method to array if method is in fact allowed.
        let mm = |v: &mut Vec<&str>, m: &'static str, y: DavMethod| {
            if self.allow.contains(y) {
                v.push(m);
            }
        };

        let meta = self.fs.metadata(path).await;
        let is_unmapped = meta.is_err();
        let is_file = meta.map(|m| m.is_file()).unwrap_or_default();
        let is_star = req.uri().path() == "*";

        let mut v = Vec::new();
        mm(&mut v, "OPTIONS", DavMethod::OPTIONS);
        if !is_unmapped || is_star {
            mm(&mut v, "PROPPATCH", DavMethod::PROPPATCH);
        }
        if is_file || is_star {
            mm(&mut v, "PATCH", DavMethod::PATCH);
        }

        let allow = HeaderValue::from_str(&v.join(","))
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        res.headers_mut().insert("allow", allow);

        Ok(res)
    }
}
