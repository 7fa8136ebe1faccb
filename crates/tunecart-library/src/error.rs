use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Configuration parse error: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("Configuration file not found: {0}")]
    Missing(PathBuf),

    #[error("The source albums directory (flac_albums_dir) is empty")]
    EmptySourceRoot,

    #[error("num_albums_to_show must be greater than zero")]
    NoAlbumsToShow,
}

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("No directories with source audio files found under {0}")]
    NoAlbums(PathBuf),

    #[error("No source audio files found in {0}")]
    NoSongs(PathBuf),

    #[error("Picked file {path} is not inside the album directory {album}")]
    PickOutsideAlbum { path: PathBuf, album: PathBuf },

    #[error("Picked file does not exist: {0}")]
    PickMissing(PathBuf),

    #[error("Input closed while waiting for an answer")]
    InputClosed,

    #[error("Failure executing {program}: {detail}")]
    Subprocess { program: String, detail: String },

    #[error("Transcoding {source_path} failed: {detail}")]
    Transcode { source_path: PathBuf, detail: String },

    #[error("Could not read tags from {path}: {detail}")]
    Metadata { path: PathBuf, detail: String },

    #[error("Invalid cover art link: {0}")]
    InvalidLink(String),

    #[error("Cover art download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("Image preview failed: {0}")]
    Preview(String),

    #[error(transparent)]
    Paths(#[from] tunecart_paths::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T, E = LibraryError> = std::result::Result<T, E>;
