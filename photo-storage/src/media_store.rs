//! Shared media index
//!
//! The index is a catalog of image rows, each addressed by a [`ContentUri`].
//! Writers insert a row, stream the bytes to its locator and then publish
//! it; readers only ever see published rows. Every mutation is broadcast to
//! registered observers.

use crate::content_uri::{ContentUri, VOLUME_EXTERNAL, VOLUME_EXTERNAL_PRIMARY};
use crate::error::StorageError;
use crate::schema::init_media_schema;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use tokio::sync::broadcast;

/// Notifications buffered per observer before it starts lagging
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Pending rows older than this are left over from an interrupted write
pub const STALE_PENDING_SECS: i64 = 60 * 60;

/// Metadata written on insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaValues {
    pub display_name: String,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

/// A published row as returned by [`MediaIndex::query`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRow {
    pub id: i64,
    pub display_name: String,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    IdAscending,
    IdDescending,
}

impl SortOrder {
    fn sql(self) -> &'static str {
        match self {
            SortOrder::IdAscending => "_id ASC",
            SortOrder::IdDescending => "_id DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A row-level change in the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaChange {
    pub uri: ContentUri,
    pub kind: ChangeKind,
}

/// OS-managed shared image catalog
pub trait MediaIndex: Send + Sync {
    /// Adds a pending row to `collection`; `None` if no entry could be created
    fn insert(
        &self,
        collection: &ContentUri,
        values: &MediaValues,
    ) -> Result<Option<ContentUri>, StorageError>;

    /// Byte stream for a freshly inserted entry
    fn open_output_stream(&self, uri: &ContentUri) -> Result<Box<dyn Write>, StorageError>;

    fn open_input_stream(&self, uri: &ContentUri) -> Result<Box<dyn Read>, StorageError>;

    /// Marks a fully written entry visible to queries
    fn publish(&self, uri: &ContentUri) -> Result<(), StorageError>;

    /// Removes the row and its bytes; `false` if there was no such row
    fn delete(&self, uri: &ContentUri) -> Result<bool, StorageError>;

    /// Published rows of `collection`; `None` when the collection is unknown
    fn query(
        &self,
        collection: &ContentUri,
        order: SortOrder,
    ) -> Result<Option<Vec<MediaRow>>, StorageError>;

    fn register_observer(&self) -> broadcast::Receiver<MediaChange>;
}

/// [`MediaIndex`] backed by SQLite rows and a directory of image files
#[derive(Clone)]
pub struct SqliteMediaIndex {
    db_path: PathBuf,
    media_dir: PathBuf,
    changes: broadcast::Sender<MediaChange>,
}

impl SqliteMediaIndex {
    /// Opens the index, creating the schema and directories as needed
    pub fn open(
        db_path: impl Into<PathBuf>,
        media_dir: impl Into<PathBuf>,
    ) -> Result<Self, StorageError> {
        let db_path = db_path.into();
        let media_dir = media_dir.into();

        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::create_dir_all(media_dir.join("images"))?;

        let conn = Connection::open(&db_path)?;
        init_media_schema(&conn)?;

        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let index = Self {
            db_path,
            media_dir,
            changes,
        };

        let swept = index.sweep_stale_pending(STALE_PENDING_SECS)?;
        if swept > 0 {
            log::warn!("Removed {} abandoned pending media rows", swept);
        }
        log::info!("Media index ready at {:?}", index.db_path);

        Ok(index)
    }

    /// Deletes pending rows added more than `max_age_secs` ago, with their bytes
    ///
    /// Returns the number of rows removed. Fresh pending rows may still be in
    /// the middle of a write and are kept.
    pub fn sweep_stale_pending(&self, max_age_secs: i64) -> Result<usize, StorageError> {
        let cutoff = chrono::Utc::now().timestamp() - max_age_secs;
        let conn = self.connection()?;

        let mut stmt =
            conn.prepare("SELECT _id FROM images WHERE is_pending = 1 AND date_added < ?1")?;
        let ids = stmt
            .query_map(params![cutoff], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        for &id in &ids {
            conn.execute("DELETE FROM images WHERE _id = ?1", params![id])?;
            self.remove_blob(id);
            log::debug!("Swept pending media row {}", id);
        }
        Ok(ids.len())
    }

    fn connection(&self) -> Result<Connection, StorageError> {
        Ok(Connection::open(&self.db_path)?)
    }

    fn blob_path(&self, id: i64) -> PathBuf {
        self.media_dir.join("images").join(id.to_string())
    }

    fn remove_blob(&self, id: i64) {
        match fs::remove_file(self.blob_path(id)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Could not remove media bytes for row {}: {}", id, e),
        }
    }

    fn entry_id(uri: &ContentUri) -> Result<i64, StorageError> {
        uri.id()
            .ok_or_else(|| StorageError::InvalidUri(uri.to_string()))
    }

    fn row_exists(&self, conn: &Connection, id: i64) -> Result<bool, StorageError> {
        let found: Option<i64> = conn
            .query_row("SELECT _id FROM images WHERE _id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    fn notify(&self, uri: ContentUri, kind: ChangeKind) {
        // No observers is fine
        let _ = self.changes.send(MediaChange { uri, kind });
    }
}

impl MediaIndex for SqliteMediaIndex {
    fn insert(
        &self,
        collection: &ContentUri,
        values: &MediaValues,
    ) -> Result<Option<ContentUri>, StorageError> {
        if collection.id().is_some() {
            return Err(StorageError::InvalidUri(collection.to_string()));
        }
        let volume = match collection.volume()? {
            VOLUME_EXTERNAL => VOLUME_EXTERNAL_PRIMARY,
            other => other,
        };

        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO images (volume, display_name, mime_type, width, height, is_pending, date_added)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
            params![
                volume,
                &values.display_name,
                &values.mime_type,
                values.width,
                values.height,
                chrono::Utc::now().timestamp(),
            ],
        )?;
        let uri = collection.with_appended_id(conn.last_insert_rowid());

        log::debug!("Inserted pending media row {}", uri);
        self.notify(uri.clone(), ChangeKind::Insert);
        Ok(Some(uri))
    }

    fn open_output_stream(&self, uri: &ContentUri) -> Result<Box<dyn Write>, StorageError> {
        let id = Self::entry_id(uri)?;
        if !self.row_exists(&self.connection()?, id)? {
            return Err(StorageError::NotFound(uri.to_string()));
        }
        Ok(Box::new(BufWriter::new(File::create(self.blob_path(id))?)))
    }

    fn open_input_stream(&self, uri: &ContentUri) -> Result<Box<dyn Read>, StorageError> {
        let id = Self::entry_id(uri)?;
        if !self.row_exists(&self.connection()?, id)? {
            return Err(StorageError::NotFound(uri.to_string()));
        }
        Ok(Box::new(BufReader::new(File::open(self.blob_path(id))?)))
    }

    fn publish(&self, uri: &ContentUri) -> Result<(), StorageError> {
        let id = Self::entry_id(uri)?;
        let size = fs::metadata(self.blob_path(id))?.len();

        let conn = self.connection()?;
        let rows = conn.execute(
            "UPDATE images SET is_pending = 0, size = ?1 WHERE _id = ?2",
            params![size as i64, id],
        )?;
        if rows == 0 {
            return Err(StorageError::NotFound(uri.to_string()));
        }

        self.notify(uri.clone(), ChangeKind::Update);
        Ok(())
    }

    fn delete(&self, uri: &ContentUri) -> Result<bool, StorageError> {
        let id = Self::entry_id(uri)?;
        let conn = self.connection()?;
        let rows = conn.execute("DELETE FROM images WHERE _id = ?1", params![id])?;
        self.remove_blob(id);

        if rows == 0 {
            return Ok(false);
        }
        self.notify(uri.clone(), ChangeKind::Delete);
        Ok(true)
    }

    fn query(
        &self,
        collection: &ContentUri,
        order: SortOrder,
    ) -> Result<Option<Vec<MediaRow>>, StorageError> {
        let volume = match collection.volume() {
            Ok(volume) if collection.id().is_none() => volume,
            _ => return Ok(None),
        };

        let conn = self.connection()?;
        let all_volumes = volume == VOLUME_EXTERNAL;
        let sql = format!(
            "SELECT _id, display_name, mime_type, width, height, size
             FROM images
             WHERE is_pending = 0 AND (?1 OR volume = ?2)
             ORDER BY {}",
            order.sql()
        );
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt.query_map(params![all_volumes, volume], |row| {
            let size: i64 = row.get(5)?;
            Ok(MediaRow {
                id: row.get(0)?,
                display_name: row.get(1)?,
                mime_type: row.get(2)?,
                width: row.get(3)?,
                height: row.get(4)?,
                size: size.max(0) as u64,
            })
        })?;

        Ok(Some(rows.collect::<Result<Vec<_>, _>>()?))
    }

    fn register_observer(&self) -> broadcast::Receiver<MediaChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_index(dir: &tempfile::TempDir) -> SqliteMediaIndex {
        SqliteMediaIndex::open(dir.path().join("external.db"), dir.path().join("media")).unwrap()
    }

    fn values(name: &str) -> MediaValues {
        MediaValues {
            display_name: name.to_string(),
            mime_type: "image/jpeg".to_string(),
            width: 4,
            height: 3,
        }
    }

    fn insert_published(index: &SqliteMediaIndex, name: &str) -> ContentUri {
        let uri = index
            .insert(&ContentUri::images(VOLUME_EXTERNAL_PRIMARY), &values(name))
            .unwrap()
            .unwrap();
        let mut out = index.open_output_stream(&uri).unwrap();
        out.write_all(b"bytes").unwrap();
        out.flush().unwrap();
        drop(out);
        index.publish(&uri).unwrap();
        uri
    }

    #[test]
    fn test_pending_rows_are_hidden() {
        let dir = tempfile::tempdir().unwrap();
        let index = open_index(&dir);
        index
            .insert(&ContentUri::images(VOLUME_EXTERNAL_PRIMARY), &values("a.jpg"))
            .unwrap();

        let rows = index
            .query(&ContentUri::external_content_uri(), SortOrder::IdAscending)
            .unwrap()
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_publish_and_query_order() {
        let dir = tempfile::tempdir().unwrap();
        let index = open_index(&dir);
        insert_published(&index, "a.jpg");
        insert_published(&index, "b.jpg");
        insert_published(&index, "c.jpg");

        let rows = index
            .query(&ContentUri::external_content_uri(), SortOrder::IdAscending)
            .unwrap()
            .unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.display_name.as_str()).collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg", "c.jpg"]);
        assert!(rows.windows(2).all(|w| w[0].id < w[1].id));
        assert!(rows.iter().all(|r| r.size == 5));

        let desc = index
            .query(&ContentUri::external_content_uri(), SortOrder::IdDescending)
            .unwrap()
            .unwrap();
        assert_eq!(desc[0].display_name, "c.jpg");
    }

    #[test]
    fn test_query_by_volume() {
        let dir = tempfile::tempdir().unwrap();
        let index = open_index(&dir);
        insert_published(&index, "a.jpg");

        let other = index
            .query(&ContentUri::images("external_sd"), SortOrder::IdAscending)
            .unwrap()
            .unwrap();
        assert!(other.is_empty());

        let primary = index
            .query(&ContentUri::images(VOLUME_EXTERNAL_PRIMARY), SortOrder::IdAscending)
            .unwrap()
            .unwrap();
        assert_eq!(primary.len(), 1);
    }

    #[test]
    fn test_query_entry_uri_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let index = open_index(&dir);
        let uri = insert_published(&index, "a.jpg");
        assert!(index.query(&uri, SortOrder::IdAscending).unwrap().is_none());
    }

    fn insert_pending(index: &SqliteMediaIndex, name: &str, age_secs: i64) -> i64 {
        let uri = index
            .insert(&ContentUri::images(VOLUME_EXTERNAL_PRIMARY), &values(name))
            .unwrap()
            .unwrap();
        let id = uri.id().unwrap();
        let mut out = index.open_output_stream(&uri).unwrap();
        out.write_all(b"half").unwrap();
        out.flush().unwrap();

        let conn = index.connection().unwrap();
        conn.execute(
            "UPDATE images SET date_added = date_added - ?1 WHERE _id = ?2",
            params![age_secs, id],
        )
        .unwrap();
        id
    }

    fn row_count(index: &SqliteMediaIndex) -> i64 {
        let conn = index.connection().unwrap();
        conn.query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_sweep_removes_only_stale_pending() {
        let dir = tempfile::tempdir().unwrap();
        let index = open_index(&dir);
        let stale = insert_pending(&index, "stale.jpg", STALE_PENDING_SECS + 60);
        let fresh = insert_pending(&index, "fresh.jpg", 0);
        let published = insert_published(&index, "old.jpg");
        index
            .connection()
            .unwrap()
            .execute(
                "UPDATE images SET date_added = 0 WHERE _id = ?1",
                params![published.id().unwrap()],
            )
            .unwrap();

        assert_eq!(index.sweep_stale_pending(STALE_PENDING_SECS).unwrap(), 1);
        assert_eq!(row_count(&index), 2);
        assert!(!index.blob_path(stale).exists());
        assert!(index.blob_path(fresh).exists());
        assert!(index.row_exists(&index.connection().unwrap(), fresh).unwrap());
        assert!(!index.row_exists(&index.connection().unwrap(), stale).unwrap());
    }

    #[test]
    fn test_open_sweeps_abandoned_rows() {
        let dir = tempfile::tempdir().unwrap();
        let stale = {
            let index = open_index(&dir);
            insert_pending(&index, "crashed.jpg", STALE_PENDING_SECS * 2)
        };

        let index = open_index(&dir);
        assert_eq!(row_count(&index), 0);
        assert!(!index.blob_path(stale).exists());
    }

    #[test]
    fn test_delete_removes_row_and_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let index = open_index(&dir);
        let uri = insert_published(&index, "a.jpg");

        assert!(index.delete(&uri).unwrap());
        assert!(!index.delete(&uri).unwrap());
        assert!(index.open_input_stream(&uri).is_err());
        assert!(!dir.path().join("media/images").join(uri.id().unwrap().to_string()).exists());
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let dir = tempfile::tempdir().unwrap();
        let index = open_index(&dir);
        let first = insert_published(&index, "a.jpg");
        index.delete(&first).unwrap();
        let second = insert_published(&index, "b.jpg");
        assert!(second.id().unwrap() > first.id().unwrap());
    }

    #[test]
    fn test_read_back_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let index = open_index(&dir);
        let uri = insert_published(&index, "a.jpg");

        let mut bytes = Vec::new();
        index
            .open_input_stream(&uri)
            .unwrap()
            .read_to_end(&mut bytes)
            .unwrap();
        assert_eq!(bytes, b"bytes");
    }

    #[test]
    fn test_observer_sees_changes() {
        let dir = tempfile::tempdir().unwrap();
        let index = open_index(&dir);
        let mut changes = index.register_observer();

        let uri = insert_published(&index, "a.jpg");
        index.delete(&uri).unwrap();

        let kinds: Vec<_> = std::iter::from_fn(|| changes.try_recv().ok())
            .map(|c| c.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete]
        );
    }

    #[test]
    fn test_insert_into_entry_uri_fails() {
        let dir = tempfile::tempdir().unwrap();
        let index = open_index(&dir);
        let entry = ContentUri::external_content_uri().with_appended_id(3);
        assert!(index.insert(&entry, &values("x.jpg")).is_err());
    }
}
