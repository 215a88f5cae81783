//! Atomic file copy implementation

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Suffix of the sibling file a copy is staged in before the final rename
pub const PART_SUFFIX: &str = ".hashmirror-part";

const COPY_BUFFER: usize = 128 * 1024;

/// Copy a file atomically using the write-then-rename strategy
///
/// 1. Write to a sibling `<name>.hashmirror-part` file
/// 2. Flush and sync to disk
/// 3. Preserve metadata (permissions, mtime)
/// 4. Atomic rename over the final destination
///
/// The destination is never observed half-written. On any error the part
/// file is removed and the previous destination content is left untouched.
///
/// # Example
/// ```no_run
/// use hashmirror::executor::copy_file_atomic;
/// use std::path::Path;
///
/// let bytes = copy_file_atomic(Path::new("source.txt"), Path::new("dest.txt"))?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn copy_file_atomic(src: &Path, dest: &Path) -> io::Result<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    let part_path = part_path_for(dest);
    match write_part(src, &part_path) {
        Ok(total_bytes) => match fs::rename(&part_path, dest) {
            Ok(()) => Ok(total_bytes),
            Err(e) => {
                let _ = fs::remove_file(&part_path);
                Err(e)
            }
        },
        Err(e) => {
            let _ = fs::remove_file(&part_path);
            Err(e)
        }
    }
}

fn write_part(src: &Path, part_path: &Path) -> io::Result<u64> {
    let mut src_file = File::open(src)?;
    let mut part_file = File::create(part_path)?;

    let mut buffer = vec![0u8; COPY_BUFFER];
    let mut total_bytes = 0u64;

    loop {
        let bytes_read = src_file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        part_file.write_all(&buffer[..bytes_read])?;
        total_bytes += bytes_read as u64;
    }

    part_file.sync_all()?;
    // Drop the handle before rename (required on Windows)
    drop(part_file);

    let src_metadata = src_file.metadata()?;
    fs::set_permissions(part_path, src_metadata.permissions())?;
    let mtime = filetime::FileTime::from_last_modification_time(&src_metadata);
    filetime::set_file_mtime(part_path, mtime)?;

    Ok(total_bytes)
}

/// `dir/name.ext` → `dir/name.ext.hashmirror-part`
pub fn part_path_for(dest: &Path) -> PathBuf {
    let mut name: OsString = dest.file_name().map(OsString::from).unwrap_or_default();
    name.push(PART_SUFFIX);
    dest.with_file_name(name)
}

/// Recreate a symlink at `dest` pointing at `target`, without dereferencing it
///
/// An existing file or symlink at `dest` is replaced; an existing directory is an error.
pub fn copy_symlink(target: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    match fs::symlink_metadata(dest) {
        Ok(metadata) if metadata.is_dir() => {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{} is a directory", dest.display()),
            ));
        }
        Ok(_) => fs::remove_file(dest)?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    create_symlink(target, dest)
}

#[cfg(unix)]
pub(crate) fn create_symlink(target: &Path, link_path: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link_path)
}

#[cfg(windows)]
pub(crate) fn create_symlink(target: &Path, link_path: &Path) -> io::Result<()> {
    use std::os::windows::fs::{symlink_dir, symlink_file};
    match symlink_file(target, link_path) {
        Ok(()) => Ok(()),
        Err(file_err) => match symlink_dir(target, link_path) {
            Ok(()) => Ok(()),
            Err(_) => Err(file_err),
        },
    }
}
