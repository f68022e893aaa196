//! Apply the operations of a `PROPPATCH` request to a property store.
//!
//! Operations are applied one by one, in document order. A failing
//! operation gets an error status and does not stop the operations
//! after it, so the multistatus reply can report a status for
//! each property.
//!
use http::StatusCode;

use crate::davpath::DavPath;
use crate::errors::fserror_to_status;
use crate::fs::DavFileSystem;
use crate::propupdate::{PropMode, PropertyOperation};

/// Apply `ops` to the dead properties of `path`, setting the `status`
/// of every operation.
///
/// Returns `true` if every operation succeeded.
pub async fn apply_propertyupdate(
    fs: &dyn DavFileSystem,
    path: &DavPath,
    ops: &mut [PropertyOperation],
) -> bool {
    let can_deadprop = fs.have_props(path).await;

    for op in ops.iter_mut() {
        op.status = if !can_deadprop || op.is_live() {
            // live properties are computed, not stored.
            StatusCode::FORBIDDEN
        } else {
            let res = match op.mode {
                PropMode::Set => {
                    let value = op.value.clone().unwrap_or_default();
                    fs.set_prop(path, &op.namespace, &op.name, value).await
                }
                PropMode::Remove => fs.remove_prop(path, &op.namespace, &op.name).await,
            };
            match res {
                Ok(()) => StatusCode::OK,
                Err(e) => {
                    debug!(
                        "proppatch {:?} {{{}}}{} on {}: {:?}",
                        op.mode, op.namespace, op.name, path, e
                    );
                    fserror_to_status(&e)
                }
            }
        };
    }

    ops.iter().all(|op| op.status == StatusCode::OK)
}

#[cfg(all(test, feature = "memfs"))]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use futures_util::future::{self, BoxFuture, FutureExt};

    use super::*;
    use crate::fs::memfs::MemFs;
    use crate::fs::{DavMetaData, FsError, FsFuture};
    use crate::propupdate::parse_reader;
    use crate::updaterange::UpdateRange;

    const Z: &str = "http://ns.example.com/z/";

    fn op(mode: PropMode, name: &str, value: Option<&str>) -> PropertyOperation {
        PropertyOperation {
            name: name.to_string(),
            namespace: Z.to_string(),
            mode,
            value: value.map(|v| v.to_string()),
            status: StatusCode::OK,
        }
    }

    async fn memfs_with_file() -> (Arc<MemFs>, DavPath) {
        let fs = MemFs::new();
        let path = DavPath::new("/file.txt").unwrap();
        fs.create_file(&path, Bytes::from_static(b"hello")).unwrap();
        (fs, path)
    }

    #[tokio::test]
    async fn displayname_on_empty_store() {
        let (fs, path) = memfs_with_file().await;
        let mut ops = parse_reader(
            &b"<propertyupdate><set><prop><displayname>Bob</displayname></prop></set></propertyupdate>"[..],
        )
        .into_result()
        .unwrap();
        assert!(apply_propertyupdate(&*fs, &path, &mut ops).await);
        assert_eq!(ops[0].status, StatusCode::OK);
        assert_eq!(fs.get_prop(&path, "", "displayname").await.unwrap(), "Bob");
    }

    #[tokio::test]
    async fn partial_failure() {
        let (fs, path) = memfs_with_file().await;
        let mut ops = vec![
            op(PropMode::Set, "a", Some("1")),
            op(PropMode::Remove, "missing", None),
            op(PropMode::Set, "c", Some("3")),
        ];
        assert!(!apply_propertyupdate(&*fs, &path, &mut ops).await);
        let status: Vec<_> = ops.iter().map(|o| o.status).collect();
        assert_eq!(
            status,
            vec![StatusCode::OK, StatusCode::NOT_FOUND, StatusCode::OK]
        );
        assert_eq!(fs.get_prop(&path, Z, "a").await.unwrap(), "1");
        assert_eq!(fs.get_prop(&path, Z, "c").await.unwrap(), "3");
    }

    #[tokio::test]
    async fn last_write_wins() {
        let (fs, path) = memfs_with_file().await;
        let mut ops = vec![
            op(PropMode::Set, "a", Some("1")),
            op(PropMode::Set, "a", Some("2")),
            op(PropMode::Set, "b", Some("x")),
            op(PropMode::Remove, "b", None),
        ];
        assert!(apply_propertyupdate(&*fs, &path, &mut ops).await);
        assert_eq!(fs.get_prop(&path, Z, "a").await.unwrap(), "2");
        assert_eq!(
            fs.get_prop(&path, Z, "b").await.unwrap_err(),
            FsError::NotFound
        );
    }

    #[tokio::test]
    async fn live_properties_are_protected() {
        let (fs, path) = memfs_with_file().await;
        let mut ops = vec![
            PropertyOperation {
                namespace: "DAV:".to_string(),
                ..op(PropMode::Set, "getetag", Some("x"))
            },
            op(PropMode::Set, "a", Some("1")),
        ];
        assert!(!apply_propertyupdate(&*fs, &path, &mut ops).await);
        assert_eq!(ops[0].status, StatusCode::FORBIDDEN);
        assert_eq!(ops[1].status, StatusCode::OK);
        assert!(fs.get_prop(&path, "DAV:", "getetag").await.is_err());
    }

    // A backend without a property store.
    struct NoProps;

    impl DavFileSystem for NoProps {
        fn metadata<'a>(&'a self, _path: &'a DavPath) -> FsFuture<'a, Box<dyn DavMetaData>> {
            future::ready(Err(FsError::NotFound)).boxed()
        }

        fn patch<'a>(
            &'a self,
            _path: &'a DavPath,
            _data: Bytes,
            _range: UpdateRange,
        ) -> FsFuture<'a, Option<String>> {
            future::ready(Err(FsError::NotImplemented)).boxed()
        }
    }

    // A store that rejects large values.
    struct SmallProps(Arc<MemFs>);

    impl DavFileSystem for SmallProps {
        fn metadata<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Box<dyn DavMetaData>> {
            self.0.metadata(path)
        }

        fn patch<'a>(
            &'a self,
            path: &'a DavPath,
            data: Bytes,
            range: UpdateRange,
        ) -> FsFuture<'a, Option<String>> {
            self.0.patch(path, data, range)
        }

        fn have_props<'a>(&'a self, path: &'a DavPath) -> BoxFuture<'a, bool> {
            self.0.have_props(path)
        }

        fn set_prop<'a>(
            &'a self,
            path: &'a DavPath,
            namespace: &'a str,
            name: &'a str,
            value: String,
        ) -> FsFuture<'a, ()> {
            if value.len() > 4 {
                return future::ready(Err(FsError::TooLarge)).boxed();
            }
            self.0.set_prop(path, namespace, name, value)
        }

        fn remove_prop<'a>(
            &'a self,
            path: &'a DavPath,
            namespace: &'a str,
            name: &'a str,
        ) -> FsFuture<'a, ()> {
            self.0.remove_prop(path, namespace, name)
        }
    }

    #[tokio::test]
    async fn no_property_store() {
        let path = DavPath::new("/x").unwrap();
        let mut ops = vec![op(PropMode::Set, "a", Some("1")), op(PropMode::Remove, "b", None)];
        assert!(!apply_propertyupdate(&NoProps, &path, &mut ops).await);
        assert!(ops.iter().all(|o| o.status == StatusCode::FORBIDDEN));
    }

    #[tokio::test]
    async fn store_rejects_value() {
        let (fs, path) = memfs_with_file().await;
        let small = SmallProps(fs.clone());
        let mut ops = vec![
            op(PropMode::Set, "big", Some("too large")),
            op(PropMode::Set, "ok", Some("tiny")),
        ];
        assert!(!apply_propertyupdate(&small, &path, &mut ops).await);
        assert_eq!(ops[0].status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ops[1].status, StatusCode::OK);
        assert!(fs.get_prop(&path, Z, "big").await.is_err());
    }

    #[tokio::test]
    async fn nothing_to_do() {
        let (fs, path) = memfs_with_file().await;
        assert!(apply_propertyupdate(&*fs, &path, &mut []).await);
    }
}
