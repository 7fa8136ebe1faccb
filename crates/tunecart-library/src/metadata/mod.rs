mod ffprobe;
mod lofty;

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::settings::Settings;

pub use self::ffprobe::FfprobeReader;
pub use self::lofty::LoftyReader;

/// Tags planos de un fichero: nombre → valor.
pub type TagMap = BTreeMap<String, String>;

/// Grupo en el que los lectores publican los tags del fichero.
pub const TAG_GROUP: &str = "TAG";

/// Variantes de grupo probadas en orden; el uso de mayúsculas depende del fichero de origen.
const GROUP_CANDIDATES: [&str; 3] = ["TAG", "tag", "Tag"];

/// Resultado de un lector: grupo → tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaInfo {
    groups: BTreeMap<String, TagMap>,
}

impl MediaInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(mut self, name: impl Into<String>, tags: TagMap) -> Self {
        self.groups.insert(name.into(), tags);
        self
    }

    pub fn group(&self, name: &str) -> Option<&TagMap> {
        self.groups.get(name)
    }

    pub fn get(&self, group: &str, key: &str) -> Option<&str> {
        self.groups.get(group)?.get(key).map(String::as_str)
    }

    /// Primer grupo de tags presente, en el orden de `GROUP_CANDIDATES`.
    pub fn tags(&self) -> TagMap {
        GROUP_CANDIDATES
            .iter()
            .find_map(|g| self.group(g))
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagField {
    Artist,
    Album,
}

impl TagField {
    fn candidates(&self) -> [&'static str; 3] {
        match self {
            TagField::Artist => ["ARTIST", "artist", "Artist"],
            TagField::Album => ["ALBUM", "album", "Album"],
        }
    }
}

/// Busca `field` probando cada par (grupo, clave) en orden de prioridad.
///
/// Devuelve el primer valor no vacío (recortado).
pub fn lookup(info: &MediaInfo, field: TagField) -> Option<String> {
    GROUP_CANDIDATES
        .iter()
        .flat_map(|group| field.candidates().into_iter().map(move |key| (*group, key)))
        .find_map(|(group, key)| {
            info.get(group, key)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        })
}

pub trait MetadataReader {
    fn read(&self, path: &Path) -> Result<MediaInfo>;
}

/// Backends de lectura de tags
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MetadataBackend {
    #[default]
    Lofty,
    Ffprobe,
}

pub fn reader_for(settings: &Settings) -> Box<dyn MetadataReader> {
    match settings.metadata_backend {
        MetadataBackend::Lofty => Box::new(LoftyReader::new()),
        MetadataBackend::Ffprobe => Box::new(FfprobeReader::new(settings.ffprobe_bin.clone())),
    }
}
