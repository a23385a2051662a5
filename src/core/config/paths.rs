use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::service::PathsConfig;

/// Absolute locations of every file the service reads or writes.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub pdf_path: PathBuf,
    pub text_store: PathBuf,
    pub image_store: PathBuf,
    pub chat_log: PathBuf,
    pub image_dir: PathBuf,
    pub log_dir: PathBuf,
    pub env_file: PathBuf,
}

impl AppPaths {
    pub fn new(config: &PathsConfig) -> Self {
        Self::with_root(discover_project_root(), config)
    }

    pub fn with_root(project_root: PathBuf, config: &PathsConfig) -> Self {
        let resolve = |raw: &str| absolutize(&project_root, raw);

        let paths = AppPaths {
            pdf_path: resolve(&config.pdf_path),
            text_store: resolve(&config.text_store),
            image_store: resolve(&config.image_store),
            chat_log: resolve(&config.chat_log),
            image_dir: resolve(&config.image_dir),
            log_dir: resolve(&config.log_dir),
            env_file: resolve(&config.env_file),
            project_root,
        };

        let _ = fs::create_dir_all(&paths.log_dir);
        paths
    }
}

pub fn discover_project_root() -> PathBuf {
    if let Ok(root) = env::var("MANUAL_RAG_ROOT") {
        return PathBuf::from(root);
    }

    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn absolutize(root: &Path, raw: &str) -> PathBuf {
    let candidate = PathBuf::from(raw);
    if candidate.is_absolute() {
        candidate
    } else {
        root.join(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_resolve_against_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = AppPaths::with_root(dir.path().to_path_buf(), &PathsConfig::default());

        assert_eq!(paths.chat_log, dir.path().join("chat_logs.json"));
        assert_eq!(paths.image_dir, dir.path().join("static").join("images"));
        assert!(paths.log_dir.exists());
    }

    #[test]
    fn absolute_paths_are_kept() {
        let dir = tempfile::tempdir().expect("tempdir");
        let absolute = dir.path().join("elsewhere").join("manual.pdf");
        let config = PathsConfig {
            pdf_path: absolute.to_string_lossy().to_string(),
            ..PathsConfig::default()
        };

        let paths = AppPaths::with_root(dir.path().to_path_buf(), &config);
        assert_eq!(paths.pdf_path, absolute);
    }
}
