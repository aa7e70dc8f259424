//! An in-memory [`StorageBackend`] holding files in a map. It backs the
//! test suite and is handy for demos; it is not meant to store anything
//! you want to keep.

use super::{DataBlock, Error, ErrorKind, FtpFile, Metadata, Result, StorageBackend, WriteMode};

use async_trait::async_trait;
use bytes::Bytes;
use std::{
    collections::{HashMap, HashSet},
    fmt::Debug,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

#[derive(Debug, Default)]
struct MemState {
    files: HashMap<PathBuf, Vec<u8>>,
    dirs: HashSet<PathBuf>,
}

/// The in-memory backend. Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct Mem {
    state: Arc<Mutex<MemState>>,
}

impl Mem {
    /// Creates an empty backend containing only the root directory.
    pub fn new() -> Self {
        let mem = Mem::default();
        mem.state.lock().unwrap().dirs.insert(PathBuf::from("/"));
        mem
    }

    /// Creates a backend pre-seeded with the given files. Parent
    /// directories of every file are created implicitly.
    pub fn with_files<I, P, B>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, B)>,
        P: Into<PathBuf>,
        B: Into<Vec<u8>>,
    {
        let mem = Mem::new();
        {
            let mut state = mem.state.lock().unwrap();
            for (path, content) in files {
                let path: PathBuf = path.into();
                let mut dir = path.parent().map(Path::to_path_buf);
                while let Some(d) = dir {
                    state.dirs.insert(d.clone());
                    dir = d.parent().map(Path::to_path_buf);
                }
                state.files.insert(path, content.into());
            }
        }
        mem
    }

    /// Returns the current content of a file, if present.
    pub fn content(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.state.lock().unwrap().files.get(path.as_ref()).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemState> {
        // The map is only held across short, non-panicking sections.
        self.state.lock().unwrap()
    }
}

/// Metadata for an in-memory path.
#[derive(Debug)]
pub struct MemMetadata {
    len: u64,
    is_dir: bool,
}

impl Metadata for MemMetadata {
    fn len(&self) -> u64 {
        self.len
    }

    fn is_dir(&self) -> bool {
        self.is_dir
    }

    fn is_file(&self) -> bool {
        !self.is_dir
    }
}

/// An open in-memory file.
#[derive(Debug)]
pub struct MemFile {
    state: Arc<Mutex<MemState>>,
    path: PathBuf,
    // Read side: a snapshot taken at open time.
    snapshot: Vec<u8>,
    pos: usize,
    done: bool,
    // Write side: buffered until close.
    write_buf: Option<Vec<u8>>,
}

#[async_trait]
impl FtpFile for MemFile {
    async fn read_block(&mut self, max_len: usize) -> Result<DataBlock> {
        if self.done || self.pos >= self.snapshot.len() {
            self.done = true;
            return Ok(DataBlock::terminator());
        }
        let end = (self.pos + max_len).min(self.snapshot.len());
        let chunk = Bytes::copy_from_slice(&self.snapshot[self.pos..end]);
        self.pos = end;
        if self.pos >= self.snapshot.len() {
            self.done = true;
            Ok(DataBlock::last(chunk))
        } else {
            Ok(DataBlock::new(chunk))
        }
    }

    async fn write_block(&mut self, block: DataBlock) -> Result<u64> {
        let buf = self.write_buf.as_mut().ok_or(ErrorKind::LocalError)?;
        buf.extend_from_slice(&block.data);
        Ok(block.len() as u64)
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(buf) = self.write_buf.take() {
            self.state.lock().unwrap().files.insert(self.path.clone(), buf);
        }
        self.done = true;
        Ok(())
    }
}

fn parent_exists(state: &MemState, path: &Path) -> bool {
    match path.parent() {
        Some(parent) => state.dirs.contains(parent),
        None => false,
    }
}

#[async_trait]
impl<User: Send + Sync + Debug + 'static> StorageBackend<User> for Mem {
    type File = MemFile;
    type Metadata = MemMetadata;

    async fn metadata(&self, _user: &Option<User>, path: &Path) -> Result<Self::Metadata> {
        let state = self.lock();
        if state.dirs.contains(path) {
            return Ok(MemMetadata { len: 0, is_dir: true });
        }
        match state.files.get(path) {
            Some(content) => Ok(MemMetadata {
                len: content.len() as u64,
                is_dir: false,
            }),
            None => Err(ErrorKind::PermanentFileNotAvailable.into()),
        }
    }

    async fn open_read(&self, _user: &Option<User>, path: &Path, offset: u64) -> Result<Self::File> {
        let state = self.lock();
        let content = state.files.get(path).ok_or(ErrorKind::PermanentFileNotAvailable)?;
        let offset = (offset as usize).min(content.len());
        Ok(MemFile {
            state: Arc::clone(&self.state),
            path: path.to_path_buf(),
            snapshot: content[offset..].to_vec(),
            pos: 0,
            done: false,
            write_buf: None,
        })
    }

    async fn open_write(&self, _user: &Option<User>, path: &Path, offset: u64, mode: WriteMode) -> Result<Self::File> {
        let state = self.lock();
        if state.dirs.contains(path) {
            return Err(ErrorKind::FileNameNotAllowedError.into());
        }
        if !parent_exists(&state, path) {
            return Err(ErrorKind::PermanentFileNotAvailable.into());
        }
        let existing = state.files.get(path);
        let buf = match (mode, existing) {
            (WriteMode::Append, Some(content)) => content.clone(),
            (WriteMode::Append, None) => Vec::new(),
            (WriteMode::Replace, Some(content)) => {
                // REST k + STOR keeps the first k bytes.
                let keep = (offset as usize).min(content.len());
                content[..keep].to_vec()
            }
            (WriteMode::Replace, None) => Vec::new(),
        };
        Ok(MemFile {
            state: Arc::clone(&self.state),
            path: path.to_path_buf(),
            snapshot: Vec::new(),
            pos: 0,
            done: false,
            write_buf: Some(buf),
        })
    }

    async fn list(&self, user: &Option<User>, path: &Path) -> Result<Vec<String>> {
        let names = self.list_names(user, path).await?;
        let state = self.lock();
        Ok(names
            .into_iter()
            .map(|name| {
                let full = path.join(&name);
                if state.dirs.contains(&full) {
                    format!("drwxr-xr-x 1 ftp ftp 0 {}", name)
                } else {
                    let len = state.files.get(&full).map(Vec::len).unwrap_or(0);
                    format!("-rw-r--r-- 1 ftp ftp {} {}", len, name)
                }
            })
            .collect())
    }

    async fn list_names(&self, _user: &Option<User>, path: &Path) -> Result<Vec<String>> {
        let state = self.lock();
        if !state.dirs.contains(path) {
            return Err(ErrorKind::PermanentFileNotAvailable.into());
        }
        let mut names: Vec<String> = state
            .files
            .keys()
            .chain(state.dirs.iter())
            .filter(|p| p.parent() == Some(path) && *p != path)
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    async fn del(&self, _user: &Option<User>, path: &Path) -> Result<()> {
        match self.lock().files.remove(path) {
            Some(_) => Ok(()),
            None => Err(ErrorKind::PermanentFileNotAvailable.into()),
        }
    }

    async fn mkd(&self, _user: &Option<User>, path: &Path) -> Result<()> {
        let mut state = self.lock();
        if !parent_exists(&state, path) {
            return Err(ErrorKind::PermanentFileNotAvailable.into());
        }
        if !state.dirs.insert(path.to_path_buf()) {
            return Err(Error::new(ErrorKind::FileNameNotAllowedError));
        }
        Ok(())
    }

    async fn rmd(&self, _user: &Option<User>, path: &Path) -> Result<()> {
        let mut state = self.lock();
        let occupied = state.files.keys().any(|p| p.parent() == Some(path)) || state.dirs.iter().any(|p| p.parent() == Some(path) && p != path);
        if occupied {
            return Err(ErrorKind::PermissionDenied.into());
        }
        if state.dirs.remove(path) {
            Ok(())
        } else {
            Err(ErrorKind::PermanentFileNotAvailable.into())
        }
    }

    async fn rename(&self, _user: &Option<User>, from: &Path, to: &Path) -> Result<()> {
        let mut state = self.lock();
        if !parent_exists(&state, to) {
            return Err(ErrorKind::FileNameNotAllowedError.into());
        }
        match state.files.remove(from) {
            Some(content) => {
                state.files.insert(to.to_path_buf(), content);
                Ok(())
            }
            None => Err(ErrorKind::PermanentFileNotAvailable.into()),
        }
    }

    async fn cwd(&self, _user: &Option<User>, path: &Path) -> Result<()> {
        if self.lock().dirs.contains(path) {
            Ok(())
        } else {
            Err(ErrorKind::PermanentFileNotAvailable.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn read_blocks_end_with_eof() {
        let mem = Mem::with_files(vec![("/f", b"hello world".to_vec())]);
        let mut file = <Mem as StorageBackend<()>>::open_read(&mem, &None, Path::new("/f"), 0).await.unwrap();
        let first = file.read_block(6).await.unwrap();
        assert_eq!(&first.data[..], b"hello ");
        assert!(!first.eof);
        let second = file.read_block(64).await.unwrap();
        assert_eq!(&second.data[..], b"world");
        assert!(second.eof);
    }

    #[tokio::test]
    async fn read_honors_offset() {
        let mem = Mem::with_files(vec![("/f", b"0123456789".to_vec())]);
        let mut file = <Mem as StorageBackend<()>>::open_read(&mem, &None, Path::new("/f"), 4).await.unwrap();
        let block = file.read_block(64).await.unwrap();
        assert_eq!(&block.data[..], b"456789");
    }

    #[tokio::test]
    async fn write_commits_on_close() {
        let mem = Mem::new();
        let mut file = <Mem as StorageBackend<()>>::open_write(&mem, &None, Path::new("/out"), 0, WriteMode::Replace)
            .await
            .unwrap();
        file.write_block(DataBlock::new(Bytes::from_static(b"abc"))).await.unwrap();
        assert_eq!(mem.content("/out"), None);
        file.close().await.unwrap();
        assert_eq!(mem.content("/out").unwrap(), b"abc");
    }

    #[tokio::test]
    async fn write_to_missing_directory_is_permanent_error() {
        let mem = Mem::new();
        let err = <Mem as StorageBackend<()>>::open_write(&mem, &None, Path::new("/nodir/f"), 0, WriteMode::Replace)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermanentFileNotAvailable);
    }

    #[tokio::test]
    async fn listing_includes_directories() {
        let mem = Mem::with_files(vec![("/a/x", b"1".to_vec()), ("/b", b"22".to_vec())]);
        let names = <Mem as StorageBackend<()>>::list_names(&mem, &None, Path::new("/")).await.unwrap();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }
}
