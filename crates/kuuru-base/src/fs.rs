//! Whole-file helpers that load into allocator-owned memory.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

use kuuru_log::debug;

use crate::allocator::Allocator;
use crate::error::{Error, Result};
use crate::slice::OwnedSlice;

/// Longest accepted path, in bytes, exclusive.
pub const MAX_PATH_SIZE: usize = 4096;

fn check_path(path: &Path) -> Result<()> {
    let len = path.as_os_str().len();
    if len >= MAX_PATH_SIZE {
        return Err(Error::PathTooLong { len });
    }
    Ok(())
}

/// Reads the whole file at `path` into a buffer from `allocator`.
///
/// An empty file yields an empty slice.
///
/// # Errors
///
/// [`Error::PathTooLong`] for paths of [`MAX_PATH_SIZE`] bytes or more,
/// [`Error::Io`] if the file cannot be opened or read, and
/// [`Error::OutOfMemory`] if the allocator cannot hold its contents.
///
/// # Examples
///
/// ```no_run
/// use kuuru_base::{fs::read_whole_file, utf8, HeapAllocator};
///
/// let source = read_whole_file("main.yu", HeapAllocator::get())?;
/// let runes = utf8::Iter::new(&source).count();
/// println!("{runes} code points");
/// # Ok::<(), kuuru_base::Error>(())
/// ```
pub fn read_whole_file<'a>(path: impl AsRef<Path>, allocator: Allocator<'a>) -> Result<OwnedSlice<'a, u8>> {
    let path = path.as_ref();
    check_path(path)?;

    let mut file = File::open(path)?;
    let size = usize::try_from(file.metadata()?.len()).map_err(|_| Error::oom(usize::MAX, 1))?;

    let mut data = allocator.make_slice::<u8>(size).ok_or(Error::oom(size, 1))?;
    file.read_exact(&mut data)?;

    debug!("loaded {size} bytes from {}", path.display());
    Ok(data)
}

/// Writes `data` to `path`, truncating any existing file. Returns the number
/// of bytes written.
///
/// # Errors
///
/// [`Error::PathTooLong`] or [`Error::Io`].
pub fn write_file(path: impl AsRef<Path>, data: &[u8]) -> Result<usize> {
    let path = path.as_ref();
    check_path(path)?;
    File::create(path)?.write_all(data)?;
    Ok(data.len())
}

/// Appends `data` to `path`, creating the file if needed. Returns the number
/// of bytes written.
///
/// # Errors
///
/// [`Error::PathTooLong`] or [`Error::Io`].
pub fn append_file(path: impl AsRef<Path>, data: &[u8]) -> Result<usize> {
    let path = path.as_ref();
    check_path(path)?;
    OpenOptions::new().create(true).append(true).open(path)?.write_all(data)?;
    Ok(data.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HeapAllocator;

    #[test]
    fn test_path_too_long() {
        let long = "a".repeat(MAX_PATH_SIZE);
        let err = read_whole_file(&long, HeapAllocator::get()).unwrap_err();
        assert!(matches!(err, Error::PathTooLong { len: MAX_PATH_SIZE }));
        assert!(matches!(write_file(&long, b"x"), Err(Error::PathTooLong { .. })));
    }

    #[test]
    fn test_missing_file() {
        let err = read_whole_file("/definitely/not/here.yu", HeapAllocator::get()).unwrap_err();
        match err {
            Error::Io(io) => assert_eq!(io.kind(), std::io::ErrorKind::NotFound),
            other => panic!("unexpected error: {other}"),
        }
    }
}
