//! Crate `tunecart_paths`: rutas por usuario y utilidades de sistema de ficheros

mod errors;
mod fs_utils;
mod paths;

pub use errors::Error;
pub use fs_utils::{check_writable, ensure_dir};
pub use paths::{CONFIG_FILE_NAME, ENV_BASE_DIR, TunecartPaths};

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    /// RAII-guard que setea y luego restaura (o elimina) una variable de entorno.
    struct EnvVarGuard {
        key: String,
        original: Option<String>,
    }

    impl EnvVarGuard {
        /// Guarda el valor actual de `key` (si existe), y luego la setea a `value`.
        fn new(key: &str, value: &str) -> Self {
            let original = std::env::var(key).ok();
            // set_var es unsafe en edition 2024:
            unsafe { std::env::set_var(key, value) };
            EnvVarGuard {
                key: key.to_owned(),
                original,
            }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match &self.original {
                Some(val) => unsafe { std::env::set_var(&self.key, val) },
                None => unsafe { std::env::remove_var(&self.key) },
            }
        }
    }

    fn paths_in(dir: &std::path::Path) -> TunecartPaths {
        TunecartPaths {
            config_dir: dir.join("config"),
            config_file: dir.join("config").join(CONFIG_FILE_NAME),
        }
    }

    #[test]
    fn base_dir_env_override() {
        let tmp = tempdir().unwrap();
        let _env = EnvVarGuard::new(ENV_BASE_DIR, tmp.path().to_str().unwrap());

        let paths = TunecartPaths::new().unwrap();
        let expected: PathBuf = tmp.path().join("config").join("config.yaml");
        assert_eq!(paths.config_file, expected);

        assert!(!paths.config_dir.exists());
        paths.ensure_structure().unwrap();
        assert!(paths.config_dir.is_dir());
    }

    #[test]
    fn explicit_config_wins_even_if_missing() {
        let tmp = tempdir().unwrap();
        let paths = paths_in(tmp.path());
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "x: 1").unwrap();

        let explicit = tmp.path().join("other.yaml");
        let found = paths.locate_config(Some(&explicit), tmp.path()).unwrap();
        assert_eq!(found, explicit);
    }

    #[test]
    fn cwd_config_before_user_config() {
        let tmp = tempdir().unwrap();
        let paths = paths_in(tmp.path());
        paths.ensure_structure().unwrap();
        fs::write(&paths.config_file, "x: 1").unwrap();

        let cwd = tmp.path().join("work");
        fs::create_dir_all(&cwd).unwrap();
        assert_eq!(paths.locate_config(None, &cwd).unwrap(), paths.config_file);

        fs::write(cwd.join(CONFIG_FILE_NAME), "x: 2").unwrap();
        assert_eq!(paths.locate_config(None, &cwd).unwrap(), cwd.join(CONFIG_FILE_NAME));
    }

    #[test]
    fn missing_config_lists_candidates() {
        let tmp = tempdir().unwrap();
        let paths = paths_in(tmp.path());

        match paths.locate_config(None, tmp.path()).unwrap_err() {
            Error::ConfigNotFound(candidates) => {
                assert_eq!(candidates.len(), 2);
                assert_eq!(candidates[0], tmp.path().join(CONFIG_FILE_NAME));
            }
            other => panic!("Esperaba ConfigNotFound, obtuve {other:?}"),
        }
    }

    #[test]
    fn ensure_dir_rejects_files() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("plain");
        fs::write(&file, b"").unwrap();

        assert!(matches!(ensure_dir(&file), Err(Error::NotADirectory(_))));
        assert!(matches!(check_writable(&file), Err(Error::NotADirectory(_))));

        let nested = tmp.path().join("a").join("b");
        ensure_dir(&nested).unwrap();
        check_writable(&nested).unwrap();
    }
}
