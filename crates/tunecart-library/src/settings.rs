use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use derive_builder::Builder;
use serde::{Deserialize, Deserializer, Serialize};
use sugar_path::SugarPath;
use tracing::debug;

use crate::error::SettingsError;
use crate::formats::AudioFormat;
use crate::metadata::MetadataBackend;

/// Prefijo de las variables de entorno que sobrescriben el fichero.
pub const ENV_PREFIX: &str = "TUNECART";

pub const DEFAULT_COVER_SEARCH_URL: &str = "https://covers.musichoarders.xyz/";

/// Configuración de la sesión: fichero YAML + entorno + flags de la CLI.
///
/// Se carga una vez y a partir de ahí es de solo lectura.
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[builder(setter(into), default)]
pub struct Settings {
    #[serde(rename = "flac_albums_dir")]
    pub source_root: PathBuf,
    #[serde(rename = "dst_albums_dir")]
    pub destination_root: PathBuf,
    #[serde(default)]
    pub entire: bool,
    #[serde(rename = "num_albums_to_show", default = "default_albums_to_show")]
    pub albums_to_show: usize,
    #[serde(default = "enabled")]
    pub dir_name_prompts: bool,
    #[serde(default)]
    pub latest: bool,
    #[serde(default = "enabled")]
    pub get_cover_art: bool,
    #[serde(default = "default_cover_art_name")]
    pub default_cover_art_name: String,
    #[serde(default = "default_cover_art_suffixes")]
    pub cover_art_suffixes: Vec<String>,
    #[serde(deserialize_with = "deserialize_format")]
    pub destination_format: AudioFormat,
    #[serde(default)]
    pub ffmpeg_params: String,
    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,
    #[serde(default)]
    pub metadata_backend: MetadataBackend,
    #[serde(default = "default_ffmpeg_bin")]
    pub ffmpeg_bin: PathBuf,
    #[serde(default = "default_ffprobe_bin")]
    pub ffprobe_bin: PathBuf,
    #[serde(default = "default_cover_search_url")]
    pub cover_search_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            source_root: PathBuf::new(),
            destination_root: PathBuf::new(),
            entire: false,
            albums_to_show: default_albums_to_show(),
            dir_name_prompts: true,
            latest: false,
            get_cover_art: true,
            default_cover_art_name: default_cover_art_name(),
            cover_art_suffixes: default_cover_art_suffixes(),
            destination_format: AudioFormat::Mp3,
            ffmpeg_params: String::new(),
            source_extensions: default_source_extensions(),
            metadata_backend: MetadataBackend::default(),
            ffmpeg_bin: default_ffmpeg_bin(),
            ffprobe_bin: default_ffprobe_bin(),
            cover_search_url: default_cover_search_url(),
        }
    }
}

/// Valores que la línea de comandos puede forzar sobre el fichero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsOverrides {
    pub entire: Option<bool>,
    pub latest: Option<bool>,
    pub get_cover_art: Option<bool>,
    pub dir_name_prompts: Option<bool>,
}

impl Settings {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SettingsError::Missing(path.to_path_buf()));
        }

        let cfg = Config::builder()
            .add_source(File::new(&path.to_string_lossy(), FileFormat::Yaml))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;
        let settings = cfg.try_deserialize::<Settings>()?;

        debug!(path = %path.display(), "configuration loaded");
        settings.validated()
    }

    /// Comprueba los invariantes y normaliza la raíz de origen.
    pub fn validated(mut self) -> Result<Self, SettingsError> {
        if self.source_root.as_os_str().is_empty() {
            return Err(SettingsError::EmptySourceRoot);
        }
        if self.albums_to_show == 0 {
            return Err(SettingsError::NoAlbumsToShow);
        }
        self.source_root = normalize_path(&self.source_root);
        Ok(self)
    }

    pub fn with_overrides(mut self, overrides: SettingsOverrides) -> Self {
        if let Some(entire) = overrides.entire {
            self.entire = entire;
        }
        if let Some(latest) = overrides.latest {
            self.latest = latest;
        }
        if let Some(cover_art) = overrides.get_cover_art {
            self.get_cover_art = cover_art;
        }
        if let Some(prompts) = overrides.dir_name_prompts {
            self.dir_name_prompts = prompts;
        }
        self
    }

    /// `ffmpeg_params` partido en tokens, igual que lo haría un shell sin comillas.
    pub fn ffmpeg_param_tokens(&self) -> Vec<String> {
        self.ffmpeg_params.split_whitespace().map(str::to_string).collect()
    }
}

/// Ruta absoluta; canónica cuando existe en disco.
pub fn normalize_path(p: &Path) -> PathBuf {
    let abs = p.absolutize();

    #[cfg(target_os = "windows")]
    let canon_res = dunce::canonicalize(&abs);

    #[cfg(not(target_os = "windows"))]
    let canon_res = std::fs::canonicalize(&abs);

    canon_res.unwrap_or(abs)
}

fn deserialize_format<'de, D>(deserializer: D) -> Result<AudioFormat, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

fn enabled() -> bool {
    true
}

fn default_albums_to_show() -> usize {
    10
}

fn default_cover_art_name() -> String {
    "cover".into()
}

fn default_cover_art_suffixes() -> Vec<String> {
    vec!["jpg".into(), "jpeg".into(), "png".into()]
}

fn default_source_extensions() -> Vec<String> {
    vec!["flac".into()]
}

fn default_ffmpeg_bin() -> PathBuf {
    "ffmpeg".into()
}

fn default_ffprobe_bin() -> PathBuf {
    "ffprobe".into()
}

fn default_cover_search_url() -> String {
    DEFAULT_COVER_SEARCH_URL.into()
}
