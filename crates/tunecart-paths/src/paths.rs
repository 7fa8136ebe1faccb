use std::{
    env,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use tracing::debug;

use crate::{errors::Error, fs_utils};

/// Nombre de la ENV var para override de ruta base (modo “portable”)
pub const ENV_BASE_DIR: &str = "TUNECART_BASE_DIR";

/// Nombre del fichero de configuración buscado en cada ubicación.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Rutas por usuario de tunecart.
#[derive(Debug, Clone)]
pub struct TunecartPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
}

impl TunecartPaths {
    pub fn new() -> Result<Self, Error> {
        let config_dir = if let Ok(base) = env::var(ENV_BASE_DIR) {
            PathBuf::from(base).join("config")
        } else {
            let proj = ProjectDirs::from("org", "tunecart", "tunecart").ok_or(Error::NoHome)?;
            proj.config_dir().to_path_buf()
        };

        Ok(TunecartPaths {
            config_file: config_dir.join(CONFIG_FILE_NAME),
            config_dir,
        })
    }

    /// Crea la carpeta de configuración si no existe.
    pub fn ensure_structure(&self) -> Result<(), Error> {
        fs_utils::ensure_dir(&self.config_dir)
    }

    /// Decide qué fichero de configuración usar.
    ///
    /// Orden de búsqueda:
    ///   1. `explicit` (flag `--config`), se devuelve tal cual aunque no exista
    ///   2. `<cwd>/config.yaml`
    ///   3. `<config_dir>/config.yaml`
    pub fn locate_config(&self, explicit: Option<&Path>, cwd: &Path) -> Result<PathBuf, Error> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }

        let candidates = [cwd.join(CONFIG_FILE_NAME), self.config_file.clone()];
        for candidate in &candidates {
            if candidate.is_file() {
                debug!(path = %candidate.display(), "using configuration file");
                return Ok(candidate.clone());
            }
        }

        Err(Error::ConfigNotFound(candidates.to_vec()))
    }
}
