pub mod console;
pub mod convert;
pub mod covers;
pub mod destination;
pub mod error;
pub mod formats;
pub mod metadata;
pub mod picker;
pub mod scanner;
pub mod settings;

pub use console::{Console, LineConsole, ask_non_blank, ask_until, confirm};
pub use convert::{AlbumQueue, BatchConverter, ConvertReport, FfmpegTranscoder, QueuedAlbum, Transcoder};
pub use covers::{CoverArtManager, CoverOptions, CoverSearch, ImagePreview, WebCoverSearch};
pub use destination::{ResolvedDestination, resolve_destination, tag_names};
pub use error::{LibraryError, Result, SettingsError};
pub use formats::AudioFormat;
pub use metadata::{MediaInfo, MetadataBackend, MetadataReader, TagField, TagMap, lookup, reader_for};
pub use picker::pick_songs;
pub use scanner::{choose_album, find_album_dirs, list_songs};
pub use settings::{Settings, SettingsBuilder, SettingsOverrides, normalize_path};
