use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ForumConfig {
    pub paths: ForumPaths,
    pub posts_per_page: usize,
    pub vote_limit: u32,
    pub vote_window_secs: i64,
}

impl ForumConfig {
    pub fn from_env() -> Result<Self> {
        let paths = ForumPaths::discover()?;
        Ok(Self::with_paths(paths))
    }

    pub fn with_paths(paths: ForumPaths) -> Self {
        let posts_per_page = env::var("ROSTRA_POSTS_PER_PAGE")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(10);
        let vote_limit = env::var("ROSTRA_VOTE_LIMIT")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(10);
        let vote_window_secs = env::var("ROSTRA_VOTE_WINDOW_SECS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(3600);
        Self {
            paths,
            posts_per_page,
            vote_limit,
            vote_window_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ForumPaths {
    pub base: PathBuf,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
}

impl ForumPaths {
    pub fn discover() -> Result<Self> {
        let exe_path = std::env::current_exe()
            .map_err(|err| anyhow!("failed to resolve current executable: {err}"))?;
        let base = exe_path
            .parent()
            .ok_or_else(|| anyhow!("executable path missing parent"))?
            .to_path_buf();
        Self::from_base_dir(base)
    }

    pub fn from_base_dir<P: AsRef<Path>>(base: P) -> Result<Self> {
        let base = base.as_ref().to_path_buf();
        let data_dir = base.join("data");
        let db_path = data_dir.join("rostra.db");
        Ok(Self {
            base,
            data_dir,
            db_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_hang_off_the_base_dir() {
        let paths = ForumPaths::from_base_dir("/tmp/forum").unwrap();
        assert_eq!(paths.data_dir, PathBuf::from("/tmp/forum/data"));
        assert_eq!(paths.db_path, PathBuf::from("/tmp/forum/data/rostra.db"));
    }
}
