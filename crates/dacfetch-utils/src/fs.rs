use std::{
    fs,
    io::{self, Read, Write as _},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use crate::error::{FileSystemError, FileSystemResult};

/// Creates a directory structure if it doesn't exist.
///
/// If the directory already exists, this function does nothing. If the path
/// exists but is not a directory, this function returns an error.
///
/// # Errors
///
/// * [`FileSystemError::Directory`] if the directory could not be created.
/// * [`FileSystemError::NotADirectory`] if the path exists but is not a directory.
pub fn ensure_dir_exists<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    let path = path.as_ref();
    if !path.exists() {
        fs::create_dir_all(path).map_err(|err| {
            FileSystemError::Directory {
                path: path.to_path_buf(),
                action: "create",
                source: err,
            }
        })?;
    } else if !path.is_dir() {
        return Err(FileSystemError::NotADirectory {
            path: path.to_path_buf(),
        });
    }

    Ok(())
}

/// Writes the contents of `reader` to `dir/file_name` atomically.
///
/// The data is first streamed into a temporary file inside `dir` and then
/// renamed over the destination, so the destination either holds the full
/// content or is left untouched. An existing destination is replaced.
///
/// `file_name` must be a single path component.
///
/// # Returns
///
/// The path of the written file and the number of bytes written.
pub fn write_atomic<R: Read>(
    dir: &Path,
    file_name: &str,
    reader: &mut R,
) -> FileSystemResult<(PathBuf, u64)> {
    if !is_plain_file_name(file_name) {
        return Err(FileSystemError::InvalidFileName {
            name: file_name.to_string(),
        });
    }

    let destination = dir.join(file_name);
    let file_error = |action, source| {
        FileSystemError::File {
            path: destination.clone(),
            action,
            source,
        }
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(|err| file_error("create", err))?;
    let written = io::copy(reader, &mut temp).map_err(|err| file_error("write", err))?;
    temp.flush().map_err(|err| file_error("flush", err))?;
    temp.persist(&destination)
        .map_err(|err| file_error("persist", err.error))?;

    Ok((destination, written))
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_ensure_dir_exists() {
        let dir = tempdir().unwrap();
        let new_dir = dir.path().join("new_dir").join("nested");
        ensure_dir_exists(&new_dir).unwrap();
        assert!(new_dir.is_dir());
    }

    #[test]
    fn test_ensure_dir_exists_already_exists() {
        let dir = tempdir().unwrap();
        ensure_dir_exists(dir.path()).unwrap();
        assert!(dir.path().is_dir());
    }

    #[test]
    fn test_ensure_dir_exists_file_collision() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("file.txt");
        fs::write(&file_path, "hello").unwrap();
        assert!(matches!(
            ensure_dir_exists(&file_path),
            Err(FileSystemError::NotADirectory { .. })
        ));
    }

    #[test]
    fn test_write_atomic_creates_file() {
        let dir = tempdir().unwrap();
        let (path, written) =
            write_atomic(dir.path(), "db.dacpac", &mut Cursor::new(b"payload")).unwrap();

        assert_eq!(path, dir.path().join("db.dacpac"));
        assert_eq!(written, 7);
        assert_eq!(fs::read(&path).unwrap(), b"payload");
    }

    #[test]
    fn test_write_atomic_overwrites_existing() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("db.dacpac"), "old content that is longer").unwrap();

        write_atomic(dir.path(), "db.dacpac", &mut Cursor::new(b"new")).unwrap();

        assert_eq!(fs::read(dir.path().join("db.dacpac")).unwrap(), b"new");
        let entries = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_write_atomic_rejects_nested_names() {
        let dir = tempdir().unwrap();
        for name in ["../escape.dacpac", "a/b.dacpac", "", ".."] {
            assert!(matches!(
                write_atomic(dir.path(), name, &mut Cursor::new(b"x")),
                Err(FileSystemError::InvalidFileName { .. })
            ));
        }
    }

    #[test]
    fn test_write_atomic_leaves_nothing_on_read_failure() {
        struct FailingReader;

        impl Read for FailingReader {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("boom"))
            }
        }

        let dir = tempdir().unwrap();
        let result = write_atomic(dir.path(), "db.dacpac", &mut FailingReader);

        assert!(result.is_err());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
