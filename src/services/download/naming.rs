//! Collision-safe destination names.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::sync::Mutex;
use tracing::debug;

use crate::utils::{sanitize_filename, split_extension};

/// Inserted before the extension each time a name is taken.
pub const COLLISION_MARKER: &str = "_I";

/// `Anexo_I.pdf` -> `Anexo_I_I.pdf`.
pub fn disambiguate(name: &str) -> String {
    match split_extension(name) {
        (stem, Some(ext)) => format!("{}{}.{}", stem, COLLISION_MARKER, ext),
        (stem, None) => format!("{}{}", stem, COLLISION_MARKER),
    }
}

/// Create a new, empty file for `suggested_name` in `dir` without touching
/// anything already there.
///
/// The name is sanitized first. While the name is taken the marker is
/// applied again, so `Anexo_I.pdf` becomes `Anexo_I_I.pdf`, then
/// `Anexo_I_I_I.pdf`. Choice and creation happen under `lock`, and
/// `create_new` makes creation itself atomic.
pub async fn resolve_collision_free_path(
    lock: &Mutex<()>,
    dir: &Path,
    suggested_name: &str,
) -> io::Result<(PathBuf, File)> {
    let _guard = lock.lock().await;
    let mut name = sanitize_filename(suggested_name);

    loop {
        let path = dir.join(&name);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let next = disambiguate(&name);
                debug!("{} exists, trying {}", path.display(), next);
                name = next;
            }
            Err(e) => return Err(e),
        }
    }
}
