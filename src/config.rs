//! Runtime configuration: where to find the input-selector and value models.
//! Precedence is CLI flag, then environment variable, then compiled-in
//! default. Ground: the teacher's `REDIS_URL`/`DATABASE_URL` env-override
//! pattern (`std::env::var(..).unwrap_or_else(|_| default.to_string())`).

use std::path::Path;
use std::path::PathBuf;

const MODEL_DIR_ENV: &str = "FINGERPRINT_FORGE_MODEL_DIR";
const DEFAULT_MODEL_DIR: &str = "./models";

#[derive(Debug, Clone)]
pub struct Config {
    pub model_dir: PathBuf,
}

impl Config {
    /// Resolve configuration from an optional CLI override, falling back to
    /// [`MODEL_DIR_ENV`] and then [`DEFAULT_MODEL_DIR`].
    pub fn resolve(model_dir_flag: Option<&str>) -> Self {
        let model_dir = model_dir_flag
            .map(PathBuf::from)
            .or_else(|| std::env::var(MODEL_DIR_ENV).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_DIR));
        Config { model_dir }
    }

    pub fn input_model_path(&self) -> PathBuf {
        self.model_dir.join("input.json")
    }

    pub fn value_model_path(&self) -> PathBuf {
        self.model_dir.join("value.json")
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }
}
