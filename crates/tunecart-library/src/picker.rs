use std::path::{Path, PathBuf};

use tracing::info;

use crate::console::{Console, ask_until};
use crate::error::Result;

/// Elige canciones de `songs` (el listado de `scanner::list_songs`).
///
/// El menú se numera en el mismo orden que el listado, así que el número que
/// ve el usuario es siempre el del fichero que se encola.
pub fn pick_songs(
    console: &mut dyn Console,
    album_dir: &Path,
    songs: &[PathBuf],
    entire: bool,
) -> Result<Vec<PathBuf>> {
    if entire {
        info!(count = songs.len(), album = %album_dir.display(), "queuing the entire folder");
        return Ok(songs.to_vec());
    }

    console.say("\n--- Songs ---\n")?;
    for (i, song) in songs.iter().enumerate() {
        let rel = song.strip_prefix(album_dir).unwrap_or(song);
        console.say(&format!("{i}: {}", rel.display()))?;
    }
    console.say("")?;

    let picks = ask_until(console, "Choose songs, comma separated", |answer| {
        parse_selection(answer, songs.len())
    })?;
    Ok(picks.into_iter().map(|i| songs[i].clone()).collect())
}

/// Lista de índices separados por comas.
///
/// Todos los tokens deben ser enteros dentro de rango y no puede haber más
/// tokens que ficheros. Los repetidos se quedan con la primera aparición.
pub fn parse_selection(answer: &str, available: usize) -> std::result::Result<Vec<usize>, String> {
    let tokens: Vec<&str> = answer.split(',').map(str::trim).collect();
    if tokens.len() > available {
        return Err(format!("Too many picks: {} given, only {available} songs.", tokens.len()));
    }

    let mut picks = Vec::with_capacity(tokens.len());
    for token in tokens {
        let index: usize = token
            .parse()
            .map_err(|_| format!("'{token}' is not a valid number."))?;
        if index >= available {
            return Err(format!("{index} is out of range (0-{}).", available.saturating_sub(1)));
        }
        if !picks.contains(&index) {
            picks.push(index);
        }
    }
    Ok(picks)
}
