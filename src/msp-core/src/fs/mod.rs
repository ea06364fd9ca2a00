use crate::error::fs::FsError;
use crate::error::fs::FsError::{
    CreateDirectoryFailed, ReadFileFailed, ReadPermissionsFailed, RemoveFileFailed,
    WriteFileFailed, WritePermissionsFailed,
};
use std::fs::Permissions;
use std::path::{Path, PathBuf};

pub fn create_dir_all(path: &Path) -> Result<(), FsError> {
    std::fs::create_dir_all(path).map_err(|err| CreateDirectoryFailed(path.to_path_buf(), err))
}

pub fn parent(path: &Path) -> Result<PathBuf, FsError> {
    match path.parent() {
        None => Err(FsError::NoParent(path.to_path_buf())),
        Some(parent) => Ok(parent.to_path_buf()),
    }
}

pub fn read(path: &Path) -> Result<Vec<u8>, FsError> {
    std::fs::read(path).map_err(|err| ReadFileFailed(path.to_path_buf(), err))
}

pub fn read_to_string(path: &Path) -> Result<String, FsError> {
    std::fs::read_to_string(path).map_err(|err| ReadFileFailed(path.to_path_buf(), err))
}

pub fn remove_file(path: &Path) -> Result<(), FsError> {
    std::fs::remove_file(path).map_err(|err| RemoveFileFailed(path.to_path_buf(), err))
}

pub fn write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<(), FsError> {
    std::fs::write(path.as_ref(), contents)
        .map_err(|err| WriteFileFailed(path.as_ref().to_path_buf(), err))
}

pub fn read_permissions(path: &Path) -> Result<Permissions, FsError> {
    std::fs::metadata(path)
        .map_err(|err| ReadPermissionsFailed(path.to_path_buf(), err))
        .map(|x| x.permissions())
}

pub fn set_permissions(path: &Path, permissions: Permissions) -> Result<(), FsError> {
    std::fs::set_permissions(path, permissions)
        .map_err(|err| WritePermissionsFailed(path.to_path_buf(), err))
}

/// Writes a secret PEM file with owner-only read permissions.
pub fn write_secret(path: &Path, contents: &[u8]) -> Result<(), FsError> {
    let containing_folder = parent(path)?;
    create_dir_all(&containing_folder)?;
    write(path, contents)?;

    let mut permissions = read_permissions(path)?;
    permissions.set_readonly(true);
    // On *nix, set the read permission to owner-only.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        permissions.set_mode(0o400);
    }
    set_permissions(path, permissions)
}
