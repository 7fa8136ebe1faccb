use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use indicatif::ProgressBar;
use tracing::{Level, debug, info, instrument, warn};

use crate::error::{LibraryError, Result};
use crate::formats::AudioFormat;
use crate::metadata::{MetadataReader, TagMap};

/// Clave inyectada en los tags de los álbumes recopilatorios.
pub const COMPILATION_TAG: &str = "compilation";

/// Un álbum listo para convertir. Inmutable una vez creado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedAlbum {
    destination_dir: PathBuf,
    picks: Vec<PathBuf>,
    source_dir: PathBuf,
    ffmpeg_params: Vec<String>,
    format: AudioFormat,
    is_compilation: bool,
}

impl QueuedAlbum {
    /// Falla si algún fichero elegido no existe o no cuelga de `source_dir`.
    pub fn new(
        destination_dir: PathBuf,
        picks: Vec<PathBuf>,
        source_dir: PathBuf,
        ffmpeg_params: Vec<String>,
        format: AudioFormat,
        is_compilation: bool,
    ) -> Result<Self> {
        for pick in &picks {
            if !pick.starts_with(&source_dir) {
                return Err(LibraryError::PickOutsideAlbum {
                    path: pick.clone(),
                    album: source_dir,
                });
            }
            if !pick.is_file() {
                return Err(LibraryError::PickMissing(pick.clone()));
            }
        }

        Ok(Self {
            destination_dir,
            picks,
            source_dir,
            ffmpeg_params,
            format,
            is_compilation,
        })
    }

    pub fn destination_dir(&self) -> &Path {
        &self.destination_dir
    }

    pub fn picks(&self) -> &[PathBuf] {
        &self.picks
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn is_compilation(&self) -> bool {
        self.is_compilation
    }

    /// Ruta de salida de `pick`: su subruta relativa al álbum de origen,
    /// con la extensión del formato de destino.
    ///
    /// Si la carpeta de destino ya termina en esa subcarpeta (p. ej. el
    /// usuario añadió `CD1` a mano) no se repite.
    pub fn target_for(&self, pick: &Path) -> PathBuf {
        let stem = pick.file_stem().unwrap_or_default().to_string_lossy();
        let file_name = format!("{stem}.{}", self.format.as_str());

        let rel_parent = pick
            .parent()
            .and_then(|p| p.strip_prefix(&self.source_dir).ok())
            .unwrap_or(Path::new(""));

        if rel_parent.as_os_str().is_empty() || self.destination_dir.file_name() == Some(rel_parent.as_os_str()) {
            self.destination_dir.join(file_name)
        } else {
            self.destination_dir.join(rel_parent).join(file_name)
        }
    }
}

/// Cola de álbumes de la sesión; la posee el controlador y se consume una vez.
#[derive(Debug, Default)]
pub struct AlbumQueue {
    albums: Vec<QueuedAlbum>,
}

impl AlbumQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, album: QueuedAlbum) {
        self.albums.push(album);
    }

    pub fn len(&self) -> usize {
        self.albums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.albums.is_empty()
    }

    pub fn track_count(&self) -> usize {
        self.albums.iter().map(|a| a.picks.len()).sum()
    }
}

impl IntoIterator for AlbumQueue {
    type Item = QueuedAlbum;
    type IntoIter = std::vec::IntoIter<QueuedAlbum>;

    fn into_iter(self) -> Self::IntoIter {
        self.albums.into_iter()
    }
}

/// Petición de conversión de un fichero.
#[derive(Debug)]
pub struct TranscodeJob<'a> {
    pub source: &'a Path,
    pub target: &'a Path,
    pub format: AudioFormat,
    pub params: &'a [String],
    pub tags: &'a TagMap,
}

pub trait Transcoder {
    fn transcode(&self, job: &TranscodeJob<'_>) -> Result<()>;
}

/// Conversión delegada en el binario `ffmpeg`.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    /// Solo el audio; los tags salen únicamente de `job.tags`.
    fn args(job: &TranscodeJob<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-n", "-i"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push(job.source.into());
        args.extend(["-map", "0:a", "-map_metadata", "-1", "-f", job.format.muxer()].map(OsString::from));
        args.extend(job.params.iter().map(OsString::from));
        for (key, value) in job.tags {
            args.push("-metadata".into());
            args.push(format!("{key}={value}").into());
        }
        args.push(job.target.into());
        args
    }
}

impl Transcoder for FfmpegTranscoder {
    #[instrument(level = Level::TRACE, skip(self), err)]
    fn transcode(&self, job: &TranscodeJob<'_>) -> Result<()> {
        let output = Command::new(&self.program)
            .args(Self::args(job))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| LibraryError::Subprocess {
                program: self.program.display().to_string(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LibraryError::Transcode {
                source_path: job.source.to_path_buf(),
                detail: format!("{} ({})", stderr.trim(), output.status),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertReport {
    pub converted: usize,
    pub skipped: usize,
}

/// Convierte la cola en orden, un fichero cada vez.
pub struct BatchConverter<'a> {
    reader: &'a dyn MetadataReader,
    transcoder: &'a dyn Transcoder,
}

impl<'a> BatchConverter<'a> {
    pub fn new(reader: &'a dyn MetadataReader, transcoder: &'a dyn Transcoder) -> Self {
        Self { reader, transcoder }
    }

    /// Cualquier fallo del transcodificador aborta el lote; lo ya convertido se queda.
    pub fn run(&self, queue: AlbumQueue, progress: &ProgressBar) -> Result<ConvertReport> {
        progress.set_length(queue.track_count() as u64);
        let mut report = ConvertReport::default();

        for album in queue {
            progress.suspend(|| {
                info!(album = %album.source_dir.display(), dest = %album.destination_dir.display(), "converting album")
            });
            for pick in &album.picks {
                let target = album.target_for(pick);
                progress.set_message(display_name(pick));

                if target.exists() {
                    progress.suspend(|| info!(output = %target.display(), "already exists, skipping"));
                    report.skipped += 1;
                    progress.inc(1);
                    continue;
                }

                self.convert_one(&album, pick, &target)?;
                report.converted += 1;
                progress.inc(1);
            }
        }

        progress.finish_with_message("All conversions done.");
        Ok(report)
    }

    fn convert_one(&self, album: &QueuedAlbum, pick: &Path, target: &Path) -> Result<()> {
        if let Some(parent) = target.parent() {
            tunecart_paths::ensure_dir(parent)?;
        }

        let tags = compilation_tags(self.reader.read(pick)?.tags(), album.is_compilation);
        let job = TranscodeJob {
            source: pick,
            target,
            format: album.format,
            params: &album.ffmpeg_params,
            tags: &tags,
        };

        debug!(source = %pick.display(), output = %target.display(), "transcoding");
        if let Err(e) = self.transcoder.transcode(&job) {
            // un fichero a medias se saltaría en la siguiente pasada
            if target.exists() {
                if let Err(rm) = fs::remove_file(target) {
                    warn!(error = %rm, output = %target.display(), "could not remove partial output");
                }
            }
            return Err(e);
        }

        debug!(output = %target.display(), "converted");
        Ok(())
    }
}

/// `compilation=1` solo en recopilatorios; si no, la clave no aparece.
pub fn compilation_tags(mut tags: TagMap, is_compilation: bool) -> TagMap {
    tags.retain(|key, _| !key.eq_ignore_ascii_case(COMPILATION_TAG));
    if is_compilation {
        tags.insert(COMPILATION_TAG.to_string(), "1".to_string());
    }
    tags
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{MediaInfo, TAG_GROUP};
    use std::cell::RefCell;
    use std::fs::File;
    use tempfile::tempdir;

    struct FixedTags;

    impl MetadataReader for FixedTags {
        fn read(&self, path: &Path) -> Result<MediaInfo> {
            let mut tags = TagMap::new();
            tags.insert("TITLE".into(), path.file_stem().unwrap().to_string_lossy().into_owned());
            tags.insert("COMPILATION".into(), "0".into());
            Ok(MediaInfo::new().with_group(TAG_GROUP, tags))
        }
    }

    /// Escribe el fichero de salida y apunta los tags recibidos.
    #[derive(Default)]
    struct FakeTranscoder {
        calls: RefCell<Vec<(PathBuf, TagMap)>>,
        fail_on: Option<String>,
    }

    impl Transcoder for FakeTranscoder {
        fn transcode(&self, job: &TranscodeJob<'_>) -> Result<()> {
            fs::write(job.target, b"encoded")?;
            if let Some(name) = &self.fail_on {
                if job.source.ends_with(name) {
                    return Err(LibraryError::Transcode {
                        source_path: job.source.to_path_buf(),
                        detail: "boom".into(),
                    });
                }
            }
            self.calls.borrow_mut().push((job.target.to_path_buf(), job.tags.clone()));
            Ok(())
        }
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(path).unwrap();
    }

    fn album(src: &Path, dst: &Path, names: &[&str], compilation: bool) -> QueuedAlbum {
        let picks = names.iter().map(|n| src.join(n)).collect::<Vec<_>>();
        for p in &picks {
            touch(p);
        }
        QueuedAlbum::new(dst.to_path_buf(), picks, src.to_path_buf(), vec![], AudioFormat::Mp3, compilation).unwrap()
    }

    #[test]
    fn scenario_two_tracks_to_mp3() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src/Artist/Album");
        let dst = tmp.path().join("dst/Artist/Album");

        let mut queue = AlbumQueue::new();
        queue.push(album(&src, &dst, &["track1.flac", "track2.flac"], false));

        let transcoder = FakeTranscoder::default();
        let report = BatchConverter::new(&FixedTags, &transcoder)
            .run(queue, &ProgressBar::hidden())
            .unwrap();

        assert_eq!(report, ConvertReport { converted: 2, skipped: 0 });
        assert!(dst.join("track1.mp3").is_file());
        assert!(dst.join("track2.mp3").is_file());
    }

    #[test]
    fn second_run_skips_everything() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        let make_queue = || {
            let mut q = AlbumQueue::new();
            q.push(album(&src, &dst, &["a.flac", "CD2/b.flac"], false));
            q
        };

        let transcoder = FakeTranscoder::default();
        let converter = BatchConverter::new(&FixedTags, &transcoder);

        let first = converter.run(make_queue(), &ProgressBar::hidden()).unwrap();
        assert_eq!(first, ConvertReport { converted: 2, skipped: 0 });

        let second = converter.run(make_queue(), &ProgressBar::hidden()).unwrap();
        assert_eq!(second, ConvertReport { converted: 0, skipped: 2 });
        assert_eq!(transcoder.calls.borrow().len(), 2);
    }

    #[test]
    fn progress_counts_converted_and_skipped_tracks() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        fs::create_dir_all(&dst).unwrap();
        fs::write(dst.join("a.mp3"), b"old").unwrap();

        let mut queue = AlbumQueue::new();
        queue.push(album(&src, &dst, &["a.flac", "b.flac", "c.flac"], false));

        let progress = ProgressBar::hidden();
        let transcoder = FakeTranscoder::default();
        let report = BatchConverter::new(&FixedTags, &transcoder).run(queue, &progress).unwrap();

        assert_eq!(report, ConvertReport { converted: 2, skipped: 1 });
        assert_eq!(progress.length(), Some(3));
        assert_eq!(progress.position(), 3);
        assert!(progress.is_finished());
    }

    #[test]
    fn compilation_flag_controls_the_tag() {
        let tmp = tempdir().unwrap();
        let mut queue = AlbumQueue::new();
        queue.push(album(&tmp.path().join("s1"), &tmp.path().join("d1"), &["a.flac", "b.flac"], true));
        queue.push(album(&tmp.path().join("s2"), &tmp.path().join("d2"), &["c.flac"], false));

        let transcoder = FakeTranscoder::default();
        BatchConverter::new(&FixedTags, &transcoder)
            .run(queue, &ProgressBar::hidden())
            .unwrap();

        let calls = transcoder.calls.borrow();
        assert_eq!(calls.len(), 3);
        for (target, tags) in calls.iter() {
            let flagged = !target.starts_with(tmp.path().join("d2"));
            assert_eq!(tags.get(COMPILATION_TAG).map(String::as_str), flagged.then_some("1"));
            assert!(!tags.contains_key("COMPILATION"));
            assert!(tags.contains_key("TITLE"));
        }
    }

    #[test]
    fn targets_mirror_subdirectories() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("Album");
        let a = album(&src, Path::new("/out/A/B"), &["01.flac", "CD1/01.flac"], false);

        assert_eq!(a.target_for(&src.join("01.flac")), PathBuf::from("/out/A/B/01.mp3"));
        assert_eq!(a.target_for(&src.join("CD1/01.flac")), PathBuf::from("/out/A/B/CD1/01.mp3"));

        // el usuario ya añadió CD1 como carpeta extra
        let b = album(&src, Path::new("/out/A/B/CD1"), &["CD1/01.flac"], false);
        assert_eq!(b.target_for(&src.join("CD1/01.flac")), PathBuf::from("/out/A/B/CD1/01.mp3"));
    }

    #[test]
    fn picks_must_exist_under_the_album() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("Album");
        touch(&tmp.path().join("elsewhere.flac"));

        let outside = QueuedAlbum::new(
            "/out".into(),
            vec![tmp.path().join("elsewhere.flac")],
            src.clone(),
            vec![],
            AudioFormat::Mp3,
            false,
        );
        assert!(matches!(outside, Err(LibraryError::PickOutsideAlbum { .. })));

        let missing = QueuedAlbum::new("/out".into(), vec![src.join("gone.flac")], src, vec![], AudioFormat::Mp3, false);
        assert!(matches!(missing, Err(LibraryError::PickMissing(_))));
    }

    #[test]
    fn failure_aborts_and_keeps_earlier_output() {
        let tmp = tempdir().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        let mut queue = AlbumQueue::new();
        queue.push(album(&src, &dst, &["1.flac", "2.flac", "3.flac"], false));

        let transcoder = FakeTranscoder {
            fail_on: Some("2.flac".into()),
            ..Default::default()
        };
        let err = BatchConverter::new(&FixedTags, &transcoder)
            .run(queue, &ProgressBar::hidden())
            .unwrap_err();

        assert!(matches!(err, LibraryError::Transcode { .. }));
        assert!(dst.join("1.mp3").is_file());
        assert!(!dst.join("2.mp3").exists());
        assert!(!dst.join("3.mp3").exists());
    }

    #[test]
    fn ffmpeg_arguments() {
        let mut tags = TagMap::new();
        tags.insert("ARTIST".into(), "Foo".into());
        let params = vec!["-q:a".to_string(), "2".to_string()];
        let job = TranscodeJob {
            source: Path::new("/s/a.flac"),
            target: Path::new("/d/a.mp3"),
            format: AudioFormat::Mp3,
            params: &params,
            tags: &tags,
        };

        let args: Vec<String> = FfmpegTranscoder::args(&job)
            .into_iter()
            .map(|a| a.into_string().unwrap())
            .collect();
        assert_eq!(
            args,
            [
                "-hide_banner", "-loglevel", "error", "-n", "-i", "/s/a.flac", "-map", "0:a", "-map_metadata", "-1",
                "-f", "mp3", "-q:a", "2", "-metadata", "ARTIST=Foo", "/d/a.mp3",
            ]
        );
    }

    #[test]
    fn missing_ffmpeg_is_a_subprocess_error() {
        let tags = TagMap::new();
        let job = TranscodeJob {
            source: Path::new("a.flac"),
            target: Path::new("a.mp3"),
            format: AudioFormat::Mp3,
            params: &[],
            tags: &tags,
        };
        let err = FfmpegTranscoder::new("/definitely/not/here/ffmpeg").transcode(&job).unwrap_err();
        assert!(matches!(err, LibraryError::Subprocess { .. }));
    }
}
