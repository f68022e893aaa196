use std::borrow::Cow;

use http::{Response, StatusCode};
use xml::common::XmlVersion;
use xml::writer::{EmitterConfig, EventWriter, XmlEvent as XmlWEvent};

use crate::body::Body;
use crate::davpath::DavPath;
use crate::errors::DavResult;
use crate::proppatch::apply_propertyupdate;
use crate::propupdate::{self, PropertyOperation, NS_DAV_URI};
use crate::util::MemBuffer;

type Emitter = EventWriter<MemBuffer>;

// Writes the multistatus reply for one resource. Every property gets
// its own propstat, in the order of the request.
struct PropStatWriter {
    emitter: Emitter,
}

impl PropStatWriter {
    fn new() -> DavResult<PropStatWriter> {
        let mut emitter = EventWriter::new_with_config(
            MemBuffer::new(),
            EmitterConfig {
                normalize_empty_elements: false,
                perform_indent: false,
                indent_string: Cow::Borrowed(""),
                ..Default::default()
            },
        );
        emitter.write(XmlWEvent::StartDocument {
            version: XmlVersion::Version10,
            encoding: Some("utf-8"),
            standalone: None,
        })?;
        emitter.write(XmlWEvent::start_element("D:multistatus").ns("D", NS_DAV_URI))?;
        Ok(PropStatWriter { emitter })
    }

    fn write_prop(&mut self, op: &PropertyOperation) -> DavResult<()> {
        self.emitter.write(XmlWEvent::start_element("D:propstat"))?;
        self.emitter.write(XmlWEvent::start_element("D:prop"))?;

        // properties without a namespace get no prefix.
        let qname = match op.namespace.as_str() {
            "" => op.name.clone(),
            NS_DAV_URI => format!("D:{}", op.name),
            _ => format!("R:{}", op.name),
        };
        let mut ev = XmlWEvent::start_element(qname.as_str());
        if !op.namespace.is_empty() && op.namespace != NS_DAV_URI {
            ev = ev.ns("R", op.namespace.as_str());
        }
        self.emitter.write(ev)?;
        self.emitter.write(XmlWEvent::end_element())?;

        self.emitter.write(XmlWEvent::end_element())?; // prop
        self.emitter.write(XmlWEvent::start_element("D:status"))?;
        let status = format!("HTTP/1.1 {}", op.status);
        self.emitter.write(XmlWEvent::characters(&status))?;
        self.emitter.write(XmlWEvent::end_element())?;
        self.emitter.write(XmlWEvent::end_element())?; // propstat
        Ok(())
    }

    fn write_response(&mut self, path: &DavPath, ops: &[PropertyOperation]) -> DavResult<()> {
        self.emitter.write(XmlWEvent::start_element("D:response"))?;
        self.emitter.write(XmlWEvent::start_element("D:href"))?;
        let href = path.as_url_string_with_prefix();
        self.emitter.write(XmlWEvent::characters(&href))?;
        self.emitter.write(XmlWEvent::end_element())?;
        for op in ops {
            self.write_prop(op)?;
        }
        self.emitter.write(XmlWEvent::end_element())?; // response
        Ok(())
    }

    fn close(mut self) -> DavResult<Body> {
        self.emitter.write(XmlWEvent::end_element())?;
        Ok(Body::from(self.emitter.into_inner().take()))
    }
}

impl crate::DavHandler {
    pub(crate) async fn handle_proppatch(
        &self,
        path: &DavPath,
        xmldata: &[u8],
    ) -> DavResult<Response<Body>> {
        // file must exist.
        let meta = self.fs.metadata(path).await?;
        let mut path = path.clone();
        if meta.is_dir() {
            path.add_slash();
        }

        debug!(target: "xml", "proppatch input:\n{}]\n",
               String::from_utf8_lossy(xmldata));

        let mut ops = propupdate::parse_reader(xmldata).into_result()?;
        if !apply_propertyupdate(&*self.fs, &path, &mut ops).await {
            debug!("proppatch {}: not all properties were updated", path);
        }

        let mut pw = PropStatWriter::new()?;
        pw.write_response(&path, &ops)?;
        let body = pw.close()?;

        let mut res = Response::new(body);
        *res.status_mut() = StatusCode::MULTI_STATUS;
        res.headers_mut().insert(
            "content-type",
            http::HeaderValue::from_static("application/xml; charset=utf-8"),
        );
        Ok(res)
    }
}
