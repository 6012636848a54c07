use std::io;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use rand::RngCore;
use regex::Regex;
use tokio::io::AsyncWriteExt;

use crate::error::AppError;

pub const AUDIO_EXTENSION: &str = "mp3";

lazy_static! {
    // 128-bit hex token plus extension; nothing else is ever served.
    static ref FILENAME_REGEX: Regex = Regex::new(r"^[0-9a-f]{32}\.mp3$").unwrap();
}

/// Flat directory of generated audio files, named by random tokens.
#[derive(Debug, Clone)]
pub struct AudioStore {
    dir: PathBuf,
}

impl AudioStore {
    /// Open the store, creating the directory if it does not exist yet.
    pub async fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `audio` under a fresh random name and return that name.
    pub async fn save(&self, audio: &[u8]) -> io::Result<String> {
        let filename = generate_filename();
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.dir.join(&filename))
            .await?;
        file.write_all(audio).await?;
        file.flush().await?;
        Ok(filename)
    }

    /// Resolve a requested filename to a file inside the store.
    ///
    /// Names that could not have been generated are reported as missing
    /// without touching the filesystem.
    pub async fn locate(&self, filename: &str) -> Result<PathBuf, AppError> {
        if !is_valid_filename(filename) {
            return Err(AppError::AudioNotFound(filename.to_string()));
        }

        let path = self.dir.join(filename);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(AppError::AudioNotFound(filename.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(AppError::AudioNotFound(filename.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

pub fn generate_filename() -> String {
    let mut token = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut token);
    format!("{}.{}", hex::encode(token), AUDIO_EXTENSION)
}

pub fn is_valid_filename(name: &str) -> bool {
    FILENAME_REGEX.is_match(name)
}
