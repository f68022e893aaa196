//! Simple in-memory filesystem.
//!
//! This implementation has state, so if you create a
//! new instance in a handler(), it will be empty every time.
//!
//! This means you have to create the instance once, using `MemFs::new`, store
//! it in your handler struct, and clone() it every time you pass
//! it to the DavHandler. As a MemFs struct is just a handle, cloning is cheap.
//!
//! Files and collections carry dead properties.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use futures_util::future::{self, BoxFuture, FutureExt};
use parking_lot::Mutex;

use crate::davpath::DavPath;
use crate::fs::*;
use crate::updaterange::UpdateRange;

// Largest hole a write past the end of a file may leave.
const MAX_GAP: u64 = 16 * 1024 * 1024;

// (namespace, name)
type PropKey = (String, String);

#[derive(Debug)]
struct MemNode {
    is_dir: bool,
    data: Vec<u8>,
    mtime: SystemTime,
    props: HashMap<PropKey, String>,
}

#[derive(Debug, Clone)]
struct MemMetaData {
    is_dir: bool,
    size: u64,
    mtime: SystemTime,
}

/// Ephemeral in-memory filesystem.
#[derive(Debug)]
pub struct MemFs {
    tree: Mutex<HashMap<String, MemNode>>,
}

impl MemNode {
    fn new(is_dir: bool, data: Vec<u8>) -> MemNode {
        MemNode {
            is_dir,
            data,
            mtime: SystemTime::now(),
            props: HashMap::new(),
        }
    }

    fn meta(&self) -> MemMetaData {
        MemMetaData {
            is_dir: self.is_dir,
            size: self.data.len() as u64,
            mtime: self.mtime,
        }
    }

    // write data at the position the (resolved) range points to.
    fn patch(&mut self, data: &[u8], range: UpdateRange) -> FsResult<()> {
        let len = self.data.len() as u64;
        let offset = match range {
            UpdateRange::Append => len,
            UpdateRange::StartEnd { start, .. } => start,
            UpdateRange::EndOffset(n) => len.checked_sub(n).ok_or(FsError::Forbidden)?,
        };
        if offset.saturating_sub(len) > MAX_GAP {
            debug!("memfs: refusing to zero-fill {} bytes", offset - len);
            return Err(FsError::InsufficientStorage);
        }
        let offset = usize::try_from(offset).map_err(|_| FsError::TooLarge)?;
        let end = offset.checked_add(data.len()).ok_or(FsError::TooLarge)?;
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[offset..end].copy_from_slice(data);
        self.mtime = SystemTime::now();
        Ok(())
    }
}

impl MemFs {
    /// Create a new, empty "memfs" filesystem. It only has a root collection.
    pub fn new() -> Arc<MemFs> {
        let mut tree = HashMap::new();
        tree.insert("/".to_string(), MemNode::new(true, Vec::new()));
        Arc::new(MemFs {
            tree: Mutex::new(tree),
        })
    }

    fn create(&self, path: &DavPath, node: MemNode) -> FsResult<()> {
        let mut tree = self.tree.lock();
        let parent = path.parent();
        match tree.get(parent.key()) {
            Some(p) if p.is_dir => {}
            Some(_) => return Err(FsError::Forbidden),
            None => return Err(FsError::NotFound),
        }
        if tree.contains_key(path.key()) {
            return Err(FsError::Forbidden);
        }
        tree.insert(path.key().to_string(), node);
        Ok(())
    }

    /// Create a collection. The parent must exist.
    pub fn create_dir(&self, path: &DavPath) -> FsResult<()> {
        trace!("FS: create_dir {path:?}");
        self.create(path, MemNode::new(true, Vec::new()))
    }

    /// Create a file with initial content. The parent must exist.
    pub fn create_file(&self, path: &DavPath, data: Bytes) -> FsResult<()> {
        trace!("FS: create_file {path:?}");
        self.create(path, MemNode::new(false, data.to_vec()))
    }

    /// The content of a file.
    pub fn read_file(&self, path: &DavPath) -> FsResult<Bytes> {
        let tree = self.tree.lock();
        match tree.get(path.key()) {
            Some(node) if !node.is_dir => Ok(Bytes::from(node.data.clone())),
            Some(_) => Err(FsError::Forbidden),
            None => Err(FsError::NotFound),
        }
    }

    fn with_node<T>(
        &self,
        path: &DavPath,
        f: impl FnOnce(&mut MemNode) -> FsResult<T>,
    ) -> FsResult<T> {
        let mut tree = self.tree.lock();
        let node = tree.get_mut(path.key()).ok_or(FsError::NotFound)?;
        f(node)
    }
}

impl DavFileSystem for MemFs {
    fn metadata<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Box<dyn DavMetaData>> {
        let res = self.with_node(path, |node| Ok(Box::new(node.meta()) as Box<dyn DavMetaData>));
        future::ready(res).boxed()
    }

    fn patch<'a>(
        &'a self,
        path: &'a DavPath,
        data: Bytes,
        range: UpdateRange,
    ) -> FsFuture<'a, Option<String>> {
        trace!("FS: patch {path:?} {range:?} ({} bytes)", data.len());
        let res = self.with_node(path, |node| {
            if node.is_dir {
                return Err(FsError::Forbidden);
            }
            node.patch(&data, range)?;
            Ok(node.meta().etag())
        });
        future::ready(res).boxed()
    }

    fn have_props<'a>(&'a self, _path: &'a DavPath) -> BoxFuture<'a, bool> {
        future::ready(true).boxed()
    }

    fn get_prop<'a>(
        &'a self,
        path: &'a DavPath,
        namespace: &'a str,
        name: &'a str,
    ) -> FsFuture<'a, String> {
        let res = self.with_node(path, |node| {
            let key = (namespace.to_string(), name.to_string());
            node.props.get(&key).cloned().ok_or(FsError::NotFound)
        });
        future::ready(res).boxed()
    }

    fn set_prop<'a>(
        &'a self,
        path: &'a DavPath,
        namespace: &'a str,
        name: &'a str,
        value: String,
    ) -> FsFuture<'a, ()> {
        trace!("FS: set_prop {path:?} {{{namespace}}}{name}");
        let res = self.with_node(path, |node| {
            node.props
                .insert((namespace.to_string(), name.to_string()), value);
            Ok(())
        });
        future::ready(res).boxed()
    }

    fn remove_prop<'a>(
        &'a self,
        path: &'a DavPath,
        namespace: &'a str,
        name: &'a str,
    ) -> FsFuture<'a, ()> {
        trace!("FS: remove_prop {path:?} {{{namespace}}}{name}");
        let res = self.with_node(path, |node| {
            let key = (namespace.to_string(), name.to_string());
            node.props.remove(&key).map(|_| ()).ok_or(FsError::NotFound)
        });
        future::ready(res).boxed()
    }
}

impl DavMetaData for MemMetaData {
    fn len(&self) -> u64 {
        self.size
    }

    fn modified(&self) -> FsResult<SystemTime> {
        Ok(self.mtime)
    }

    fn is_dir(&self) -> bool {
        self.is_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> DavPath {
        DavPath::new(s).unwrap()
    }

    #[tokio::test]
    async fn tree() {
        let fs = MemFs::new();
        assert!(fs.metadata(&path("/")).await.unwrap().is_dir());
        fs.create_dir(&path("/dir/")).unwrap();
        fs.create_file(&path("/dir/f"), Bytes::from_static(b"abc"))
            .unwrap();
        assert_eq!(
            fs.create_file(&path("/nope/f"), Bytes::new()).unwrap_err(),
            FsError::NotFound
        );
        assert_eq!(
            fs.create_file(&path("/dir/f/g"), Bytes::new()).unwrap_err(),
            FsError::Forbidden
        );
        let meta = fs.metadata(&path("/dir/f")).await.unwrap();
        assert!(meta.is_file());
        assert_eq!(meta.len(), 3);
        assert!(meta.etag().unwrap().starts_with("3-"));
        assert!(fs.metadata(&path("/dir")).await.unwrap().is_dir());
    }

    #[tokio::test]
    async fn patch_ranges() {
        let fs = MemFs::new();
        let p = path("/f");
        fs.create_file(&p, Bytes::from_static(b"0123456789")).unwrap();

        fs.patch(&p, Bytes::from_static(b"ab"), UpdateRange::Append)
            .await
            .unwrap();
        assert_eq!(&fs.read_file(&p).unwrap()[..], b"0123456789ab");

        let range = UpdateRange::StartEnd {
            start: 2,
            end: Some(3),
        };
        fs.patch(&p, Bytes::from_static(b"XY"), range).await.unwrap();
        assert_eq!(&fs.read_file(&p).unwrap()[..], b"01XY456789ab");

        fs.patch(&p, Bytes::from_static(b"ZZZ"), UpdateRange::EndOffset(3))
            .await
            .unwrap();
        assert_eq!(&fs.read_file(&p).unwrap()[..], b"01XY45678ZZZ");

        // past the end: the gap is zero-filled.
        let range = UpdateRange::StartEnd {
            start: 14,
            end: Some(14),
        };
        let etag = fs.patch(&p, Bytes::from_static(b"!"), range).await.unwrap();
        assert_eq!(fs.read_file(&p).unwrap().len(), 15);
        assert_eq!(fs.read_file(&p).unwrap()[12], 0);
        assert!(etag.unwrap().starts_with("f-"));

        let range = UpdateRange::StartEnd {
            start: 100_000_000_000,
            end: Some(100_000_000_000),
        };
        assert_eq!(
            fs.patch(&p, Bytes::from_static(b"x"), range)
                .await
                .unwrap_err(),
            FsError::InsufficientStorage
        );
        assert_eq!(fs.read_file(&p).unwrap().len(), 15);

        assert_eq!(
            fs.patch(&p, Bytes::from_static(b"x"), UpdateRange::EndOffset(100))
                .await
                .unwrap_err(),
            FsError::Forbidden
        );
        assert_eq!(
            fs.patch(&path("/"), Bytes::from_static(b"x"), UpdateRange::Append)
                .await
                .unwrap_err(),
            FsError::Forbidden
        );
        assert_eq!(
            fs.patch(&path("/missing"), Bytes::new(), UpdateRange::Append)
                .await
                .unwrap_err(),
            FsError::NotFound
        );
    }

    #[tokio::test]
    async fn props() {
        let fs = MemFs::new();
        let p = path("/f");
        fs.create_file(&p, Bytes::new()).unwrap();
        assert!(fs.have_props(&p).await);
        fs.set_prop(&p, "urn:x", "a", "1".to_string()).await.unwrap();
        fs.set_prop(&p, "urn:y", "a", "2".to_string()).await.unwrap();
        assert_eq!(fs.get_prop(&p, "urn:x", "a").await.unwrap(), "1");
        assert_eq!(fs.get_prop(&p, "urn:y", "a").await.unwrap(), "2");
        fs.remove_prop(&p, "urn:x", "a").await.unwrap();
        assert_eq!(
            fs.remove_prop(&p, "urn:x", "a").await.unwrap_err(),
            FsError::NotFound
        );
        assert_eq!(
            fs.set_prop(&path("/g"), "urn:x", "a", String::new())
                .await
                .unwrap_err(),
            FsError::NotFound
        );
    }
}
