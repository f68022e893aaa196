//! Local filesystem access.
//!
//! This implementation is stateless. So the easiest way to use it
//! is to create a new instance in your handler every time
//! you need one.
//!
//! Dead properties are not supported, every `PROPPATCH` on a
//! local file is answered with `403 Forbidden` per property.

use std::io::SeekFrom;
#[cfg(unix)]
use std::os::unix::fs::MetadataExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use futures_util::FutureExt;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

use crate::davpath::DavPath;
use crate::fs::*;
use crate::updaterange::UpdateRange;

/// Local Filesystem implementation.
#[derive(Debug)]
pub(crate) struct LocalFs {
    pub basedir: PathBuf,
    pub is_file: bool,
}

impl LocalFs {
    /// Create a new LocalFs DavFileSystem, serving "base".
    pub fn new(base: PathBuf) -> Arc<LocalFs> {
        Arc::new(LocalFs {
            basedir: base,
            is_file: false,
        })
    }

    /// Create a new LocalFs DavFileSystem, serving "file".
    ///
    /// This is like `new()`, but it always serves this single file.
    /// The request path is ignored.
    pub fn new_file(file: PathBuf) -> Arc<LocalFs> {
        Arc::new(LocalFs {
            basedir: file,
            is_file: true,
        })
    }

    fn abs_path(&self, path: &DavPath) -> PathBuf {
        let mut pathbuf = self.basedir.clone();
        if !self.is_file {
            pathbuf.push(path.as_rel_ospath());
        }
        pathbuf
    }
}

impl DavFileSystem for LocalFs {
    fn metadata<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Box<dyn DavMetaData>> {
        async move {
            let path = self.abs_path(path);
            let meta = tokio::fs::metadata(path).await?;
            Ok(Box::new(meta) as _)
        }
        .boxed()
    }

    fn patch<'a>(
        &'a self,
        path: &'a DavPath,
        data: Bytes,
        range: UpdateRange,
    ) -> FsFuture<'a, Option<String>> {
        async move {
            trace!("FS: patch {path:?} {range:?}");
            let abs = self.abs_path(path);
            let mut file = tokio::fs::OpenOptions::new()
                .write(true)
                .open(&abs)
                .await?;
            let pos = match range {
                UpdateRange::Append => SeekFrom::End(0),
                UpdateRange::StartEnd { start, .. } => SeekFrom::Start(start),
                UpdateRange::EndOffset(n) => {
                    let n = i64::try_from(n).map_err(|_| FsError::Forbidden)?;
                    SeekFrom::End(-n)
                }
            };
            // seeking to before the start of the file is an error.
            file.seek(pos).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
            let meta = file.metadata().await?;
            Ok(meta.etag())
        }
        .boxed()
    }
}

impl DavMetaData for std::fs::Metadata {
    fn len(&self) -> u64 {
        self.len()
    }
    fn modified(&self) -> FsResult<SystemTime> {
        self.modified().map_err(|e| e.into())
    }
    fn is_dir(&self) -> bool {
        self.is_dir()
    }
    fn is_file(&self) -> bool {
        self.is_file()
    }

    // same as the default apache etag.
    fn etag(&self) -> Option<String> {
        let modified = self.modified().ok()?;
        let t = modified.duration_since(UNIX_EPOCH).ok()?;
        let t = t.as_secs() * 1000000 + t.subsec_nanos() as u64 / 1000;
        #[cfg(unix)]
        if self.is_file() {
            Some(format!("{:x}-{:x}-{:x}", self.ino(), self.len(), t))
        } else {
            Some(format!("{:x}-{:x}", self.ino(), t))
        }
        #[cfg(not(unix))]
        if self.is_file() {
            Some(format!("{:x}-{:x}", self.len(), t))
        } else {
            Some(format!("{:x}", t))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn patch_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.txt"), b"0123456789").unwrap();
        let fs = LocalFs::new(dir.path().to_path_buf());
        let p = DavPath::new("/f.txt").unwrap();

        let meta = fs.metadata(&p).await.unwrap();
        assert!(meta.is_file());
        assert_eq!(meta.len(), 10);

        fs.patch(&p, Bytes::from_static(b"ab"), UpdateRange::Append)
            .await
            .unwrap();
        let range = UpdateRange::StartEnd {
            start: 1,
            end: Some(2),
        };
        fs.patch(&p, Bytes::from_static(b"XY"), range).await.unwrap();
        let etag = fs
            .patch(&p, Bytes::from_static(b"Z"), UpdateRange::EndOffset(1))
            .await
            .unwrap();
        assert!(etag.is_some());
        assert_eq!(std::fs::read(dir.path().join("f.txt")).unwrap(), b"0XY3456789aZ");

        assert!(fs
            .patch(&p, Bytes::from_static(b"Z"), UpdateRange::EndOffset(100))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn missing() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFs::new(dir.path().to_path_buf());
        let p = DavPath::new("/nope").unwrap();
        assert_eq!(fs.metadata(&p).await.unwrap_err(), FsError::NotFound);
        assert_eq!(
            fs.patch(&p, Bytes::new(), UpdateRange::Append)
                .await
                .unwrap_err(),
            FsError::NotFound
        );
        assert!(!fs.have_props(&p).await);
    }

    #[tokio::test]
    async fn single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("only.txt");
        std::fs::write(&file, b"x").unwrap();
        let fs = LocalFs::new_file(file);
        let meta = fs.metadata(&DavPath::new("/whatever").unwrap()).await.unwrap();
        assert_eq!(meta.len(), 1);
    }
}
