use std::path::{Path, PathBuf};

use tracing::debug;

use crate::console::{Console, ask_non_blank};
use crate::error::{LibraryError, Result};
use crate::metadata::{MetadataReader, TagField, lookup};

/// Carpeta de destino de un álbum y los nombres con los que se construyó.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDestination {
    pub dir: PathBuf,
    pub artist: Option<String>,
    pub album: Option<String>,
}

/// Artista y álbum según los tags del primer fichero elegido.
pub fn tag_names(reader: &dyn MetadataReader, picks: &[PathBuf]) -> Result<(Option<String>, Option<String>)> {
    let first = picks.first().ok_or_else(|| LibraryError::NoSongs(PathBuf::new()))?;
    let info = reader.read(first)?;
    Ok((lookup(&info, TagField::Artist), lookup(&info, TagField::Album)))
}

/// Construye `<root>/<artist>/<album>[/<extra>]`.
///
/// Sin `prompt`, los tags se usan tal cual; si falta alguno se pregunta
/// igualmente, porque no hay otro nombre posible.
pub fn resolve_destination(
    console: &mut dyn Console,
    reader: &dyn MetadataReader,
    picks: &[PathBuf],
    root: &Path,
    prompt: bool,
) -> Result<ResolvedDestination> {
    let (artist_tag, album_tag) = tag_names(reader, picks)?;

    if prompt {
        console.say("\n--- Destination folder name ---\n")?;
    }
    let artist = choose_name(console, "artist", artist_tag.as_deref(), prompt)?;
    let album = choose_name(console, "album", album_tag.as_deref(), prompt)?;

    let mut dir = root.join(&artist).join(&album);

    if prompt {
        console.say(&format!(
            "\nIf the destination {} needs another directory (for example 'CD1' for multi-CD albums), \
             type it in now. Otherwise, leave blank.",
            dir.display()
        ))?;
        let extra = console.ask("Extra directory")?;
        if !extra.trim().is_empty() {
            dir.push(sanitize(&extra));
        }
    }

    debug!(dir = %dir.display(), "destination resolved");
    Ok(ResolvedDestination {
        dir,
        artist: Some(artist),
        album: Some(album),
    })
}

fn choose_name(console: &mut dyn Console, kind: &str, proposal: Option<&str>, prompt: bool) -> Result<String> {
    let label = format!("{}{} folder", kind[..1].to_uppercase(), &kind[1..]);

    match (proposal, prompt) {
        (Some(name), false) => Ok(sanitize(name)),
        (Some(name), true) => {
            console.say(&format!("Proposed {kind} folder name: {name}"))?;
            console.say(&format!("Type \"y\" to confirm or enter the desired {kind} name instead"))?;
            let answer = ask_non_blank(console, &label)?;
            if answer.eq_ignore_ascii_case("y") {
                Ok(sanitize(name))
            } else {
                Ok(sanitize(&answer))
            }
        }
        (None, _) => {
            console.say(&format!("No {kind} name found. Please enter the desired name."))?;
            Ok(sanitize(&ask_non_blank(console, &label)?))
        }
    }
}

/// Un único componente de ruta: sin separadores ni `.`/`..`.
pub fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    match cleaned.as_str() {
        "." | ".." => cleaned.replace('.', "_"),
        _ => cleaned,
    }
}
