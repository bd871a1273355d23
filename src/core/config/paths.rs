//! Where configuration is read from and logs are written to.
//!
//! `PAGECHAT_ROOT` names the directory holding `config.yml` (default: the
//! working directory). `PAGECHAT_DATA_DIR` names the directory that receives
//! `logs/` and may hold a user `config.yml` (default: the root).

use std::env;
use std::fs;
use std::path::PathBuf;

const ROOT_VAR: &str = "PAGECHAT_ROOT";
const DATA_DIR_VAR: &str = "PAGECHAT_DATA_DIR";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let (project_root, user_data_dir) = resolve_dirs(|key| env::var(key).ok(), cwd);
        Self::with_dirs(project_root, user_data_dir)
    }

    pub fn with_dirs(project_root: PathBuf, user_data_dir: PathBuf) -> Self {
        let log_dir = user_data_dir.join("logs");
        let _ = fs::create_dir_all(&log_dir);

        AppPaths {
            project_root,
            user_data_dir,
            log_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

/// Blank variables count as unset.
fn resolve_dirs<F>(lookup: F, cwd: PathBuf) -> (PathBuf, PathBuf)
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| {
        lookup(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    };

    let project_root = var(ROOT_VAR).unwrap_or(cwd);
    let data_dir = var(DATA_DIR_VAR).unwrap_or_else(|| project_root.clone());
    (project_root, data_dir)
}
