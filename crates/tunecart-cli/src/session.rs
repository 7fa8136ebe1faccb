use std::path::PathBuf;

use tracing::info;
use tunecart_library::{
    AlbumQueue, Console, CoverArtManager, CoverOptions, CoverSearch, ImagePreview, MetadataReader, QueuedAlbum,
    ResolvedDestination, Result, Settings, choose_album, confirm, find_album_dirs, list_songs, normalize_path,
    pick_songs, resolve_destination, tag_names,
};

/// Lo que la línea de comandos fija para toda la sesión.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOptions {
    pub source: Option<PathBuf>,
    pub destination: Option<PathBuf>,
    pub compilation: Option<bool>,
}

impl SessionOptions {
    /// Con origen o destino explícitos solo se procesa un álbum.
    fn single_album(&self) -> bool {
        self.source.is_some() || self.destination.is_some()
    }
}

/// Bucle interactivo que llena la cola de álbumes.
pub struct Session<'a> {
    pub settings: &'a Settings,
    pub options: SessionOptions,
    pub console: &'a mut dyn Console,
    pub reader: &'a dyn MetadataReader,
    pub preview: &'a mut dyn ImagePreview,
    pub search: &'a dyn CoverSearch,
}

impl Session<'_> {
    pub fn collect(&mut self) -> Result<AlbumQueue> {
        let mut queue = AlbumQueue::new();
        loop {
            let album = self.queue_album()?;
            info!(
                album = %album.source_dir().display(),
                dest = %album.destination_dir().display(),
                tracks = album.picks().len(),
                "album queued"
            );
            queue.push(album);

            if self.options.single_album() || !confirm(self.console, "\nProcess more albums? [y/n]")? {
                return Ok(queue);
            }
        }
    }

    fn queue_album(&mut self) -> Result<QueuedAlbum> {
        let settings = self.settings;

        let source_dir = match &self.options.source {
            Some(source) => normalize_path(source),
            None => {
                let albums = find_album_dirs(&settings.source_root, &settings.source_extensions)?;
                choose_album(
                    self.console,
                    &settings.source_root,
                    &albums,
                    settings.albums_to_show,
                    settings.latest,
                )?
            }
        };
        self.console.say(&format!("\nSelected album: {}", source_dir.display()))?;

        let is_compilation = match self.options.compilation {
            Some(forced) => forced,
            None => confirm(self.console, "Is this album a compilation? [y/n]")?,
        };

        let songs = list_songs(&source_dir, &settings.source_extensions)?;
        let picks = pick_songs(self.console, &source_dir, &songs, settings.entire)?;

        let destination = match &self.options.destination {
            Some(dir) => {
                let (artist, album) = tag_names(self.reader, &picks)?;
                ResolvedDestination {
                    dir: dir.clone(),
                    artist,
                    album,
                }
            }
            None => resolve_destination(
                self.console,
                self.reader,
                &picks,
                &settings.destination_root,
                settings.dir_name_prompts,
            )?,
        };

        if settings.get_cover_art {
            CoverArtManager::new(self.console, self.preview, self.search, CoverOptions::from(settings))
                .run(&source_dir, &destination)?;
        }

        QueuedAlbum::new(
            destination.dir,
            picks,
            source_dir,
            settings.ffmpeg_param_tokens(),
            settings.destination_format,
            is_compilation,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Cursor;
    use std::path::Path;

    use tempfile::tempdir;
    use tunecart_library::covers::Url;
    use tunecart_library::{LibraryError, LineConsole, MediaInfo, SettingsBuilder, TagMap};

    struct FixedTags;

    impl MetadataReader for FixedTags {
        fn read(&self, _: &Path) -> Result<MediaInfo> {
            let tags: TagMap = [("ARTIST", "Artist"), ("ALBUM", "Album")]
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            Ok(MediaInfo::new().with_group("TAG", tags))
        }
    }

    struct NoPreview;

    impl ImagePreview for NoPreview {
        fn show(&mut self, _: &Path) -> Result<()> {
            Ok(())
        }
    }

    struct NoSearch;

    impl CoverSearch for NoSearch {
        fn open(&self, _: &Url) -> Result<()> {
            Err(LibraryError::InvalidLink("offline".into()))
        }

        fn download(&self, _: &Url, _: &Path) -> Result<u64> {
            Err(LibraryError::InvalidLink("offline".into()))
        }
    }

    fn library(root: &Path) -> PathBuf {
        let album = root.join("flac/Artist/Album");
        fs::create_dir_all(&album).unwrap();
        File::create(album.join("track1.flac")).unwrap();
        File::create(album.join("track2.flac")).unwrap();
        album
    }

    fn settings(root: &Path) -> Settings {
        SettingsBuilder::default()
            .source_root(root.join("flac"))
            .destination_root(root.join("mp3"))
            .entire(true)
            .dir_name_prompts(false)
            .get_cover_art(false)
            .build()
            .unwrap()
            .validated()
            .unwrap()
    }

    fn run(settings: &Settings, options: SessionOptions, answers: &str) -> (Result<AlbumQueue>, String) {
        let mut console = LineConsole::new(Cursor::new(answers.as_bytes().to_vec()), Vec::new());
        let result = Session {
            settings,
            options,
            console: &mut console,
            reader: &FixedTags,
            preview: &mut NoPreview,
            search: &NoSearch,
        }
        .collect();
        (result, String::from_utf8(console.into_output()).unwrap())
    }

    #[test]
    fn one_album_from_the_list() {
        let tmp = tempdir().unwrap();
        library(tmp.path());
        let settings = settings(tmp.path());

        let (queue, out) = run(&settings, SessionOptions::default(), "0\nn\nn\n");
        let queue = queue.unwrap();

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.track_count(), 2);
        assert!(out.contains("0: Artist/Album"));
        assert!(out.contains("Process more albums?"));

        let album = queue.into_iter().next().unwrap();
        assert_eq!(album.destination_dir(), tmp.path().join("mp3/Artist/Album"));
        assert!(!album.is_compilation());
    }

    #[test]
    fn explicit_paths_skip_the_questions() {
        let tmp = tempdir().unwrap();
        let album_dir = library(tmp.path());
        let settings = settings(tmp.path());
        let options = SessionOptions {
            source: Some(album_dir),
            destination: Some(tmp.path().join("out")),
            compilation: Some(true),
        };

        let (queue, out) = run(&settings, options, "");
        let album = queue.unwrap().into_iter().next().unwrap();

        assert_eq!(album.destination_dir(), tmp.path().join("out"));
        assert!(album.is_compilation());
        assert!(!out.contains("Process more albums?"));
        assert!(!out.contains("compilation"));
    }

    #[test]
    fn several_albums_until_no() {
        let tmp = tempdir().unwrap();
        library(tmp.path());
        let settings = settings(tmp.path());

        let (queue, _) = run(&settings, SessionOptions::default(), "0\ny\ny\n0\nn\nn\n");
        let queue = queue.unwrap();
        assert_eq!(queue.len(), 2);
    }
}
