use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::console::{Console, ask_until};
use crate::error::{LibraryError, Result};
use crate::formats::has_extension;

/// Directorios que contienen directamente al menos un fichero de origen,
/// del más reciente al más antiguo (mtime del propio directorio).
///
/// Con discos múltiples cada `CD1`, `CD2`... cuenta como un álbum distinto.
pub fn find_album_dirs(root: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut albums = Vec::new();

    for file in walk_files(root, extensions) {
        if let Some(parent) = file.parent() {
            if seen.insert(parent.to_path_buf()) {
                albums.push(parent.to_path_buf());
            }
        }
    }

    if albums.is_empty() {
        return Err(LibraryError::NoAlbums(root.to_path_buf()));
    }

    let mut dated: Vec<(SystemTime, PathBuf)> = albums
        .into_iter()
        .map(|dir| (modified(&dir), dir))
        .collect();
    // sort_by es estable: los empates conservan el orden del recorrido
    dated.sort_by(|a, b| b.0.cmp(&a.0));

    debug!(count = dated.len(), root = %root.display(), "album directories found");
    Ok(dated.into_iter().map(|(_, dir)| dir).collect())
}

fn modified(path: &Path) -> SystemTime {
    fs::symlink_metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or(UNIX_EPOCH)
}

/// Elige un álbum: el más reciente si `latest`, si no pregunta por índice.
pub fn choose_album(
    console: &mut dyn Console,
    root: &Path,
    albums: &[PathBuf],
    albums_to_show: usize,
    latest: bool,
) -> Result<PathBuf> {
    let first = albums
        .first()
        .ok_or_else(|| LibraryError::NoAlbums(root.to_path_buf()))?;

    if latest {
        info!(album = %first.display(), "using the most recently modified album");
        return Ok(first.clone());
    }

    let shown = albums_to_show.min(albums.len());
    console.say("\n--- Albums ---\n")?;
    for (i, album) in albums.iter().take(shown).enumerate() {
        let rel = album.strip_prefix(root).unwrap_or(album);
        console.say(&format!("{i}: {}", rel.display()))?;
    }

    let index = ask_until(console, "\nChoose the album", |answer| parse_index(answer, shown))?;
    Ok(albums[index].clone())
}

/// Un único índice `0 <= i < len`.
pub fn parse_index(answer: &str, len: usize) -> std::result::Result<usize, String> {
    let answer = answer.trim();
    let index: usize = answer
        .parse()
        .map_err(|_| format!("'{answer}' is not a valid number."))?;
    if index >= len {
        return Err(format!("Pick a number between 0 and {}.", len.saturating_sub(1)));
    }
    Ok(index)
}

/// Ficheros de origen bajo `album_dir`, recursivo, en orden de recorrido.
pub fn list_songs(album_dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let songs = walk_files(album_dir, extensions);
    if songs.is_empty() {
        return Err(LibraryError::NoSongs(album_dir.to_path_buf()));
    }
    Ok(songs)
}

/// Ficheros bajo `root` con alguna de las extensiones, ordenados por nombre
/// en cada directorio. Lo que no se puede leer (permisos, bucles de enlaces)
/// se avisa y se salta.
pub(crate) fn walk_files(root: &Path, extensions: &[String]) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file() && has_extension(e.path(), extensions))
        .map(|e| e.into_path())
        .collect()
}
