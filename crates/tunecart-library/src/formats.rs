use serde::{Deserialize, Serialize};

/// Formatos de destino soportados
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Aac,
    M4a,
    Ogg,
    Opus,
    Wav,
    Flac,
}

impl AudioFormat {
    pub const ALL: &'static [AudioFormat] = &[
        AudioFormat::Mp3,
        AudioFormat::Aac,
        AudioFormat::M4a,
        AudioFormat::Ogg,
        AudioFormat::Opus,
        AudioFormat::Wav,
        AudioFormat::Flac,
    ];

    /// Extensión del fichero de salida, sin punto.
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Aac => "aac",
            AudioFormat::M4a => "m4a",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Opus => "opus",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
        }
    }

    /// Nombre del muxer de ffmpeg (`-f`).
    pub fn muxer(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Aac => "adts",
            AudioFormat::M4a => "ipod",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Opus => "opus",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
        }
    }
}

impl std::str::FromStr for AudioFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().trim_start_matches('.').to_ascii_lowercase();
        AudioFormat::ALL
            .iter()
            .find(|fmt| fmt.as_str() == lower)
            .copied()
            .ok_or_else(|| format!("Format not supported: {}", s))
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Compara la extensión de `path` (sin distinguir mayúsculas) con la lista dada.
pub fn has_extension(path: &std::path::Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(std::ffi::OsStr::to_str)
        .is_some_and(|ext| {
            extensions
                .iter()
                .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn parses_format_names_loosely() {
        assert_eq!("MP3".parse::<AudioFormat>().unwrap(), AudioFormat::Mp3);
        assert_eq!(".opus".parse::<AudioFormat>().unwrap(), AudioFormat::Opus);
        assert!("wma".parse::<AudioFormat>().is_err());
        assert_eq!(AudioFormat::M4a.muxer(), "ipod");
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let exts = vec!["flac".to_string(), ".JPG".to_string()];
        assert!(has_extension(Path::new("a/01.FLAC"), &exts));
        assert!(has_extension(Path::new("cover.jpg"), &exts));
        assert!(!has_extension(Path::new("notes.txt"), &exts));
        assert!(!has_extension(Path::new("flac"), &exts));
    }
}
