use std::io;
use std::path::PathBuf;

/// Errores genéricos del crate
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// No se pudo determinar el directorio base (HOME, XDG, etc)
    #[error(
        "Could not determine the project directory, the call to ProjectDirs failed, \
         the system probably does not provide a valid $HOME path."
    )]
    NoHome,

    /// Ningún `config.yaml` en las rutas conocidas
    #[error("No configuration file found, looked in: {}", .0.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "))]
    ConfigNotFound(Vec<PathBuf>),

    /// La ruta existe pero no es un directorio
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Error de IO al crear dirs o comprobar permisos
    #[error(transparent)]
    Io(#[from] io::Error),
}
