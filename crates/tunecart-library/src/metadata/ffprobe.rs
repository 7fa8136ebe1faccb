use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use serde_json::Value;
use tracing::{Level, instrument};

use super::{MediaInfo, MetadataReader, TAG_GROUP, TagMap};
use crate::error::{LibraryError, Result};

/// Lector que delega en `ffprobe` (salida JSON).
#[derive(Debug, Clone)]
pub struct FfprobeReader {
    program: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: Option<ProbeSection>,
    #[serde(default)]
    streams: Vec<ProbeSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeSection {
    #[serde(default)]
    tags: BTreeMap<String, Value>,
}

impl FfprobeReader {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    /// Tags de los streams primero; los del contenedor los sobrescriben.
    fn parse(json: &[u8]) -> serde_json::Result<TagMap> {
        let out: ProbeOutput = serde_json::from_slice(json)?;
        let mut tags = TagMap::new();
        let sections = out.streams.iter().chain(out.format.as_ref());
        for section in sections {
            for (key, value) in &section.tags {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                tags.insert(key.clone(), value);
            }
        }
        Ok(tags)
    }
}

impl MetadataReader for FfprobeReader {
    #[instrument(level = Level::TRACE, skip(self), err)]
    fn read(&self, path: &Path) -> Result<MediaInfo> {
        let output = Command::new(&self.program)
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .output()
            .map_err(|e| LibraryError::Subprocess {
                program: self.program.display().to_string(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(LibraryError::Metadata {
                path: path.to_path_buf(),
                detail: format!("ffprobe exited with {}", output.status),
            });
        }

        let tags = Self::parse(&output.stdout).map_err(|e| LibraryError::Metadata {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        Ok(MediaInfo::new().with_group(TAG_GROUP, tags))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn format_tags_override_stream_tags() {
        let json = indoc! {r#"
            {
              "streams": [ { "index": 0, "tags": { "ARTIST": "Stream", "TRACK": 3 } } ],
              "format": { "filename": "x.flac", "tags": { "ARTIST": "Format", "album": "Bar" } }
            }
        "#};

        let tags = FfprobeReader::parse(json.as_bytes()).unwrap();
        assert_eq!(tags.get("ARTIST").map(String::as_str), Some("Format"));
        assert_eq!(tags.get("album").map(String::as_str), Some("Bar"));
        assert_eq!(tags.get("TRACK").map(String::as_str), Some("3"));
    }

    #[test]
    fn no_tags_is_empty_map() {
        let tags = FfprobeReader::parse(br#"{"format": {"filename": "x"}}"#).unwrap();
        assert!(tags.is_empty());
    }

    #[test]
    fn missing_program_is_subprocess_error() {
        let reader = FfprobeReader::new("/definitely/not/here/ffprobe");
        let err = reader.read(Path::new("x.flac")).unwrap_err();
        assert!(matches!(err, LibraryError::Subprocess { .. }));
    }
}
