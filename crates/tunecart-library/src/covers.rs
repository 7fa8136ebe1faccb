use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

pub use reqwest::Url;
use tracing::{info, warn};

use crate::console::{Console, ask_until, confirm};
use crate::destination::ResolvedDestination;
use crate::error::{LibraryError, Result};
use crate::scanner::walk_files;
use crate::settings::Settings;

/// Ventana de previsualización: bloquea hasta que el usuario la cierra.
pub trait ImagePreview {
    fn show(&mut self, path: &Path) -> Result<()>;
}

/// Búsqueda remota de portadas.
pub trait CoverSearch {
    /// Abre la página de resultados en el navegador.
    fn open(&self, url: &Url) -> Result<()>;

    /// Descarga `link` en `target`; devuelve los bytes escritos.
    fn download(&self, link: &Url, target: &Path) -> Result<u64>;
}

/// Navegador por defecto + descarga HTTP bloqueante.
#[derive(Debug, Default)]
pub struct WebCoverSearch {
    client: reqwest::blocking::Client,
}

impl WebCoverSearch {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CoverSearch for WebCoverSearch {
    fn open(&self, url: &Url) -> Result<()> {
        open::that(url.as_str())?;
        Ok(())
    }

    fn download(&self, link: &Url, target: &Path) -> Result<u64> {
        let mut response = self.client.get(link.clone()).send()?.error_for_status()?;
        save_body(&mut response, target)
    }
}

/// Vuelca `body` en `target`. Si se corta a medias, borra el fichero.
fn save_body(body: &mut impl Read, target: &Path) -> Result<u64> {
    let written = File::create(target).and_then(|mut file| io::copy(body, &mut file));
    written.map_err(|e| {
        if target.exists() {
            if let Err(rm) = fs::remove_file(target) {
                warn!(error = %rm, output = %target.display(), "could not remove partial download");
            }
        }
        e.into()
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverOptions {
    pub default_name: String,
    pub suffixes: Vec<String>,
    pub search_url: String,
}

impl From<&Settings> for CoverOptions {
    fn from(settings: &Settings) -> Self {
        CoverOptions {
            default_name: settings.default_cover_art_name.clone(),
            suffixes: settings.cover_art_suffixes.clone(),
            search_url: settings.cover_search_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverCommand {
    Main(usize),
    Copy(usize),
    Preview(usize),
    Download,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied(PathBuf),
    Skipped(PathBuf),
}

/// Interpreta una orden del menú de portadas; `count` es el nº de imágenes.
pub fn parse_command(answer: &str, count: usize) -> std::result::Result<CoverCommand, String> {
    let answer = answer.trim();
    let index = |raw: &str| -> std::result::Result<usize, String> {
        let i: usize = raw.parse().map_err(|_| format!("'{raw}' is not a valid number."))?;
        if i >= count {
            return Err(format!("{i} is out of range (0-{}).", count.saturating_sub(1)));
        }
        Ok(i)
    };

    match answer {
        "" => Err("Type h for help.".to_string()),
        "d" => Ok(CoverCommand::Download),
        "h" => Ok(CoverCommand::Help),
        "q" => Ok(CoverCommand::Quit),
        _ if answer.starts_with('p') => index(&answer[1..]).map(CoverCommand::Preview),
        _ if answer.starts_with('c') => index(&answer[1..]).map(CoverCommand::Copy),
        _ if answer.chars().all(|c| c.is_ascii_digit()) => index(answer).map(CoverCommand::Main),
        _ => Err(format!("Unknown command '{answer}', type h for help.")),
    }
}

/// Imágenes bajo `album_dir` con alguno de los sufijos configurados.
pub fn find_images(album_dir: &Path, suffixes: &[String]) -> Vec<PathBuf> {
    walk_files(album_dir, suffixes)
}

/// `<dst>/<default_name>.<ext de src>`, saltando si ya existe.
pub fn copy_main_cover(src: &Path, dst_dir: &Path, default_name: &str) -> Result<CopyOutcome> {
    let ext = src
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let target = dst_dir.join(format!("{default_name}{ext}"));
    copy_if_absent(src, target)
}

/// Copia manteniendo la subruta relativa a `album_dir`, saltando si ya existe.
pub fn copy_preserving(src: &Path, album_dir: &Path, dst_dir: &Path) -> Result<CopyOutcome> {
    let rel = src.strip_prefix(album_dir).unwrap_or(src);
    copy_if_absent(src, dst_dir.join(rel))
}

fn copy_if_absent(src: &Path, target: PathBuf) -> Result<CopyOutcome> {
    if target.exists() {
        return Ok(CopyOutcome::Skipped(target));
    }
    if let Some(parent) = target.parent() {
        tunecart_paths::ensure_dir(parent)?;
    }
    fs::copy(src, &target)?;
    Ok(CopyOutcome::Copied(target))
}

/// URL de búsqueda con `artist` (opcional) y `album` en la query.
pub fn search_url(base: &str, artist: Option<&str>, album: Option<&str>) -> Result<Url> {
    let mut params = Vec::new();
    if let Some(artist) = artist {
        params.push(("artist", artist));
    }
    if let Some(album) = album {
        params.push(("album", album));
    }
    let url = if params.is_empty() {
        Url::parse(base)
    } else {
        Url::parse_with_params(base, &params)
    };
    url.map_err(|e| LibraryError::InvalidLink(format!("{base}: {e}")))
}

/// Extensión (con punto) del último segmento del enlace; `.jpg` si no tiene.
pub fn link_extension(link: &Url) -> String {
    link.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| Path::new(name).extension())
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_else(|| ".jpg".to_string())
}

const HELP: &str = "\n<number> - pick cover art to be copied to the destination folder as the main cover\n\
p<number> - preview the image\n\
c<number> - copy an additional file without changing its name\n\
d - download main cover art from the search site\n\
q - finish copying cover art and proceed\n\
h - see this prompt again\n";

pub struct CoverArtManager<'a> {
    console: &'a mut dyn Console,
    preview: &'a mut dyn ImagePreview,
    search: &'a dyn CoverSearch,
    options: CoverOptions,
}

impl<'a> CoverArtManager<'a> {
    pub fn new(
        console: &'a mut dyn Console,
        preview: &'a mut dyn ImagePreview,
        search: &'a dyn CoverSearch,
        options: CoverOptions,
    ) -> Self {
        Self {
            console,
            preview,
            search,
            options,
        }
    }

    pub fn run(&mut self, album_dir: &Path, dest: &ResolvedDestination) -> Result<()> {
        let images = find_images(album_dir, &self.options.suffixes);

        self.console.say("\n--- Cover Art ---\n")?;
        if images.is_empty() {
            let prompt = format!(
                "No cover art found. Would you like to download cover art from {}? [y/n]",
                self.options.search_url
            );
            if confirm(self.console, &prompt)? {
                self.download(dest)?;
            }
            return Ok(());
        }

        self.list(album_dir, &images)?;
        self.console.say(HELP)?;

        loop {
            let answer = self.console.ask("Cover art")?;
            let command = match parse_command(&answer, images.len()) {
                Ok(c) => c,
                Err(msg) => {
                    self.console.say(&msg)?;
                    continue;
                }
            };

            match command {
                CoverCommand::Main(i) => {
                    let outcome = copy_main_cover(&images[i], &dest.dir, &self.options.default_name)?;
                    self.report("Main cover art", outcome)?;
                }
                CoverCommand::Copy(i) => {
                    let outcome = copy_preserving(&images[i], album_dir, &dest.dir)?;
                    self.report("Misc cover art", outcome)?;
                }
                CoverCommand::Preview(i) => {
                    if let Err(e) = self.preview.show(&images[i]) {
                        warn!(error = %e, image = %images[i].display(), "preview failed");
                        self.console.say(&format!("Could not preview the image: {e}"))?;
                    }
                }
                CoverCommand::Download => {
                    self.download(dest)?;
                    self.console.say(HELP)?;
                }
                CoverCommand::Help => {
                    self.list(album_dir, &images)?;
                    self.console.say(HELP)?;
                }
                CoverCommand::Quit => return Ok(()),
            }
        }
    }

    fn list(&mut self, album_dir: &Path, images: &[PathBuf]) -> Result<()> {
        for (i, path) in images.iter().enumerate() {
            let rel = path.strip_prefix(album_dir).unwrap_or(path);
            let size = match image::image_dimensions(path) {
                Ok((w, h)) => format!("{w}x{h}"),
                Err(e) => {
                    warn!(error = %e, image = %path.display(), "could not read image dimensions");
                    "?x?".to_string()
                }
            };
            self.console.say(&format!("{i}: {} ({size})", rel.display()))?;
        }
        Ok(())
    }

    fn report(&mut self, what: &str, outcome: CopyOutcome) -> Result<()> {
        match outcome {
            CopyOutcome::Copied(target) => {
                info!(output = %target.display(), "{what} copied");
                self.console.say(&format!("{what} successfully copied as {}", target.display()))
            }
            CopyOutcome::Skipped(target) => {
                info!(output = %target.display(), "{what} already present, skipping");
                self.console.say(&format!("{what} already copied, skipping..."))
            }
        }
    }

    /// Búsqueda remota + descarga de la portada principal. Sin reintentos.
    fn download(&mut self, dest: &ResolvedDestination) -> Result<()> {
        self.console.say("\n--- Searching and downloading cover art ---\n")?;

        let proposed = dest.artist.as_deref();
        match proposed {
            Some(artist) => {
                self.console.say(&format!("Proposed artist name: {artist}"))?;
                self.console.say(
                    "Type \"y\" to confirm or enter the desired artist name instead, \
                     leave blank to not search for a specific artist",
                )?;
            }
            None => self
                .console
                .say("Enter the artist name to search for, leave blank to not search for a specific artist")?,
        }
        let answer = self.console.ask("Artist")?;
        let answer = answer.trim();
        let artist = match (answer, proposed) {
            ("", _) => None,
            (a, Some(p)) if a.eq_ignore_ascii_case("y") => Some(p.to_string()),
            (a, _) => Some(a.to_string()),
        };

        let url = search_url(&self.options.search_url, artist.as_deref(), dest.album.as_deref())?;
        info!(url = %url, "opening cover art search");
        self.search.open(&url)?;

        self.console.say("\nChoose a cover art, click on it, then paste its link here")?;
        let link = ask_until(self.console, "Link", |answer| {
            let answer = answer.trim();
            Url::parse(answer).map_err(|e| format!("'{answer}' is not a valid link: {e}"))
        })?;

        tunecart_paths::ensure_dir(&dest.dir)?;
        let target = dest
            .dir
            .join(format!("{}{}", self.options.default_name, link_extension(&link)));
        let bytes = self.search.download(&link, &target)?;

        info!(output = %target.display(), bytes, "cover art downloaded");
        let name = target.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        self.console.say(&format!("\nSuccessfully downloaded {name}"))
    }
}
