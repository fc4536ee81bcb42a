use crate::encode::{decode, write_jpeg};
use crate::error::StorageError;
use crate::models::{InternalStoragePhoto, PHOTO_EXTENSION};
use image::DynamicImage;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// Suffix of files still being written; never ends in `.jpg`
const PARTIAL_SUFFIX: &str = ".partial";

/// One directory entry as seen by the private store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub is_file: bool,
    pub readable: bool,
}

/// The app's private file area
///
/// Names are plain filenames; path separators are rejected.
pub trait PrivateFileArea: Send + Sync {
    /// Creates or truncates `name` for writing
    fn open_file_output(&self, name: &str) -> Result<Box<dyn Write>, StorageError>;

    /// Entries directly inside the area, in directory order
    fn list_files(&self) -> Result<Vec<FileEntry>, StorageError>;

    fn read_file(&self, name: &str) -> Result<Vec<u8>, StorageError>;

    fn delete_file(&self, name: &str) -> Result<(), StorageError>;

    /// Moves `from` over `to`, replacing any existing file
    fn rename_file(&self, from: &str, to: &str) -> Result<(), StorageError>;
}

/// [`PrivateFileArea`] backed by a directory on the local filesystem
#[derive(Debug, Clone)]
pub struct DirFileArea {
    dir: PathBuf,
}

impl DirFileArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StorageError> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(StorageError::NotFound(format!("invalid file name {:?}", name)));
        }
        Ok(self.dir.join(name))
    }
}

impl PrivateFileArea for DirFileArea {
    fn open_file_output(&self, name: &str) -> Result<Box<dyn Write>, StorageError> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.dir)?;
        Ok(Box::new(BufWriter::new(File::create(path)?)))
    }

    fn list_files(&self) -> Result<Vec<FileEntry>, StorageError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                let path = entry.path();
                let is_file = path.is_file();
                let readable = is_file && File::open(&path).is_ok();
                Some(FileEntry {
                    name,
                    is_file,
                    readable,
                })
            })
            .collect();

        Ok(entries)
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        Ok(fs::read(self.path_for(name)?)?)
    }

    fn delete_file(&self, name: &str) -> Result<(), StorageError> {
        let path = self.path_for(name)?;
        if !path.is_file() {
            return Err(StorageError::NotFound(name.to_string()));
        }
        fs::remove_file(path)?;
        Ok(())
    }

    fn rename_file(&self, from: &str, to: &str) -> Result<(), StorageError> {
        fs::rename(self.path_for(from)?, self.path_for(to)?)?;
        Ok(())
    }
}

/// Photos stored as JPEG files in the private file area
#[derive(Clone)]
pub struct InternalStorage {
    area: Arc<dyn PrivateFileArea>,
    quality: u8,
}

impl InternalStorage {
    pub fn new(area: Arc<dyn PrivateFileArea>, quality: u8) -> Self {
        Self { area, quality }
    }

    /// Store over a plain directory
    pub fn in_dir(dir: impl Into<PathBuf>, quality: u8) -> Self {
        Self::new(Arc::new(DirFileArea::new(dir)), quality)
    }

    /// Writes `image` to `<name>.jpg`, replacing any file of that name
    ///
    /// Returns `false` on any failure; the cause is logged.
    pub fn save(&self, name: &str, image: &DynamicImage) -> bool {
        let file_name = format!("{}{}", name, PHOTO_EXTENSION);
        match self.write(&file_name, image) {
            Ok(()) => {
                log::debug!("Saved private photo {}", file_name);
                true
            }
            Err(e) => {
                log::error!("Could not save private photo {}: {}", file_name, e);
                false
            }
        }
    }

    /// Encodes into a temporary file and moves it into place once complete
    ///
    /// A failed write leaves neither a partial `<name>.jpg` nor a damaged
    /// older file of the same name.
    fn write(&self, file_name: &str, image: &DynamicImage) -> Result<(), StorageError> {
        let partial_name = format!(".{}{}", file_name, PARTIAL_SUFFIX);
        let written = self.write_partial(&partial_name, image);
        let result = written.and_then(|()| self.area.rename_file(&partial_name, file_name));

        if result.is_err() {
            if let Err(e) = self.area.delete_file(&partial_name) {
                log::debug!("No partial file {} to remove: {}", partial_name, e);
            }
        }
        result
    }

    fn write_partial(&self, partial_name: &str, image: &DynamicImage) -> Result<(), StorageError> {
        let mut stream = self.area.open_file_output(partial_name)?;
        write_jpeg(image, self.quality, &mut stream)?;
        stream.flush()?;
        Ok(())
    }

    /// Decodes every readable `.jpg` file in the area
    ///
    /// Order follows the directory listing. Files that do not decode are
    /// skipped.
    pub fn list(&self) -> Vec<InternalStoragePhoto> {
        let entries = match self.area.list_files() {
            Ok(entries) => entries,
            Err(e) => {
                log::error!("Could not list private photos: {}", e);
                return Vec::new();
            }
        };

        entries
            .into_iter()
            .filter(|entry| entry.is_file && entry.readable && entry.name.ends_with(PHOTO_EXTENSION))
            .filter_map(|entry| {
                let bytes = match self.area.read_file(&entry.name) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        log::warn!("Could not read {}: {}", entry.name, e);
                        return None;
                    }
                };
                match decode(&bytes) {
                    Ok(image) => Some(InternalStoragePhoto {
                        name: entry.name,
                        image,
                    }),
                    Err(e) => {
                        log::warn!("Skipping undecodable photo {}: {}", entry.name, e);
                        None
                    }
                }
            })
            .collect()
    }

    /// Removes the file called `name` (extension included)
    pub fn delete(&self, name: &str) -> bool {
        match self.area.delete_file(name) {
            Ok(()) => {
                log::debug!("Deleted private photo {}", name);
                true
            }
            Err(e) => {
                log::warn!("Could not delete private photo {}: {}", name, e);
                false
            }
        }
    }
}
