use std::path::Path;

use lofty::{
    file::{TaggedFile, TaggedFileExt},
    probe::Probe,
    tag::{ItemKey, Tag, TagType},
};
use tracing::trace;

use super::{MediaInfo, MetadataReader, TAG_GROUP, TagMap};
use crate::error::{LibraryError, Result};

/// Lector en proceso basado en `lofty`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyReader;

impl LoftyReader {
    pub fn new() -> Self {
        Self
    }

    fn find_best_tag<'a>(&self, tagged: &'a TaggedFile) -> Option<&'a Tag> {
        tagged
            .primary_tag()
            .filter(|t| matches!(t.tag_type(), TagType::VorbisComments | TagType::Id3v2 | TagType::Ape))
            .or_else(|| tagged.tags().iter().find(|t| t.tag_type() == TagType::VorbisComments))
            .or_else(|| tagged.first_tag())
    }

    /// Todos los items de texto, con nombres estilo Vorbis.
    ///
    /// Los valores repetidos de una misma clave (p. ej. varios `ARTIST`) se
    /// unen con `; `.
    fn collect(&self, tag: &Tag) -> TagMap {
        let mut out = TagMap::new();
        for item in tag.items() {
            let Some(value) = item.value().text() else {
                continue;
            };
            let Some(key) = key_name(item.key(), tag.tag_type()) else {
                trace!(key = ?item.key(), "tag ignored");
                continue;
            };
            out.entry(key)
                .and_modify(|joined: &mut String| {
                    joined.push_str(MULTI_VALUE_SEPARATOR);
                    joined.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }
        out
    }
}

const MULTI_VALUE_SEPARATOR: &str = "; ";

/// Nombre Vorbis de la clave; si no tiene, el nativo del formato de origen.
fn key_name(key: &ItemKey, native: TagType) -> Option<String> {
    key.map_key(TagType::VorbisComments, true)
        .or_else(|| key.map_key(native, true))
        .map(str::to_string)
}

impl MetadataReader for LoftyReader {
    fn read(&self, path: &Path) -> Result<MediaInfo> {
        let tagged = Probe::open(path)
            .and_then(|p| p.read())
            .map_err(|e| LibraryError::Metadata {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;

        let tags = self.find_best_tag(&tagged).map(|t| self.collect(t)).unwrap_or_default();
        Ok(MediaInfo::new().with_group(TAG_GROUP, tags))
    }
}
