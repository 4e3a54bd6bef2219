//! Durable pothole record store.
//!
//! Records live in a single comma-separated file with a mandatory header row.
//! Creates append one row; deletes rewrite the whole file through a temporary
//! file that is atomically renamed over the original, so readers never see a
//! half-written collection.
//!
//! # Concurrency
//!
//! All mutations hold the write half of one [`RwLock`], which serializes the
//! read-max-id-then-append sequence and keeps a rewrite from racing an
//! append. Listing and lookups share the read half. File I/O runs on the
//! blocking pool.
//!
//! Malformed rows are skipped with a warning when listing, and carried over
//! verbatim when the file is rewritten.
//!
//! # Identifiers
//!
//! The highest id ever assigned or retired is kept in a sidecar file next to
//! the records (`potholes.csv.seq` for `potholes.csv`), so a deleted maximum
//! id is not handed out again after a restart. A missing sidecar counts as
//! zero and the ids in the file still act as a floor.
//!
//! # Images
//!
//! Deleting a record removes its image only when the stored path resolves
//! inside the configured images directory.

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::codec::{self, Row};
use crate::detect::DEFAULT_IMAGES_DIR;
use crate::error::{PotholeError, Result};
use crate::record::{NewPothole, PotholeRecord};

/// Outcome of a successful delete.
#[derive(Debug, Clone, PartialEq)]
pub struct Deletion {
    /// The record that was removed
    pub record: PotholeRecord,
    /// Number of readable records left in the store
    pub remaining_count: usize,
    /// Whether the associated image file was removed
    pub image_removed: bool,
}

/// File-backed store of pothole records.
pub struct RecordStore {
    path: PathBuf,
    images_dir: PathBuf,
    /// Highest id assigned or retired by this process. Guarded together with the file.
    high_water: RwLock<u64>,
}

impl RecordStore {
    /// Create a store backed by the file at `path`.
    ///
    /// The file is not touched until [`initialize`](Self::initialize) or the
    /// first operation. Images are only deleted from [`DEFAULT_IMAGES_DIR`]
    /// unless [`with_images_dir`](Self::with_images_dir) says otherwise.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            images_dir: PathBuf::from(DEFAULT_IMAGES_DIR),
            high_water: RwLock::new(0),
        }
    }

    /// Restrict image cleanup on delete to `dir`.
    pub fn with_images_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.images_dir = dir.into();
        self
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory that deleted records' images may be removed from.
    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    /// Create the backing file with only the header row if it is missing.
    ///
    /// Idempotent: an existing file is left untouched.
    pub async fn initialize(&self) -> Result<()> {
        let _guard = self.high_water.write().await;
        let path = self.path.clone();
        run_blocking(PotholeError::StorageWrite, move || ensure_file(&path)).await
    }

    /// Append a new record and return it with its assigned id.
    #[instrument(level = "debug", skip_all, fields(latitude = candidate.latitude, longitude = candidate.longitude))]
    pub async fn create(&self, candidate: NewPothole) -> Result<PotholeRecord> {
        let mut high_water = self.high_water.write().await;
        let floor = *high_water;
        let path = self.path.clone();

        let record = run_blocking(PotholeError::StorageWrite, move || {
            ensure_file(&path)?;
            let rows = read_rows(&path).map_err(into_write_error)?;
            let max_id = rows.iter().filter_map(Row::id).max().unwrap_or(0);
            let floor = floor.max(read_mark(&path)?);
            let id = max_id.max(floor).checked_add(1).ok_or_else(|| {
                PotholeError::StorageWrite("identifier space exhausted".to_string())
            })?;

            // Reserve the id before appending the row
            write_mark(&path, id)?;
            let record = candidate.into_record(id);
            append_row(&path, &codec::encode(&record))?;
            Ok(record)
        })
        .await?;

        *high_water = record.id;
        info!(
            id = record.id,
            latitude = record.latitude,
            longitude = record.longitude,
            confidence = ?record.confidence,
            "Pothole saved"
        );
        Ok(record)
    }

    /// All readable records in file order.
    pub async fn list_all(&self) -> Result<Vec<PotholeRecord>> {
        let _guard = self.high_water.read().await;
        let path = self.path.clone();

        let records = run_blocking(PotholeError::StorageRead, move || {
            if !path.exists() {
                return Ok(Vec::new());
            }
            Ok(decode_rows(&read_rows(&path)?))
        })
        .await?;

        debug!(count = records.len(), "Retrieved potholes");
        Ok(records)
    }

    /// Look up a single record by id.
    pub async fn get_by_id(&self, id: u64) -> Result<PotholeRecord> {
        self.list_all()
            .await?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or(PotholeError::NotFound(id))
    }

    /// Number of readable records.
    pub async fn count(&self) -> Result<usize> {
        Ok(self.list_all().await?.len())
    }

    /// Remove the record with `id` and, best effort, its image file.
    ///
    /// Fails with [`PotholeError::NotFound`] without touching the file when no
    /// such record exists.
    #[instrument(level = "debug", skip(self))]
    pub async fn delete_by_id(&self, id: u64) -> Result<Deletion> {
        let mut high_water = self.high_water.write().await;
        let path = self.path.clone();
        let images_dir = self.images_dir.clone();

        let (deletion, max_id) = run_blocking(PotholeError::StorageWrite, move || {
            ensure_file(&path)?;
            let rows = read_rows(&path).map_err(into_write_error)?;
            let data: Vec<Row> = rows.into_iter().filter(|r| !r.is_header()).collect();
            let max_id = data.iter().filter_map(Row::id).max().unwrap_or(0);

            let position = data
                .iter()
                .position(|row| row.id() == Some(id) && row.decode().is_ok())
                .ok_or(PotholeError::NotFound(id))?;
            let mut remaining = data;
            let removed = remaining.remove(position);
            let record = removed.decode()?;

            // The removed id must stay retired even if it was the maximum
            if max_id > read_mark(&path)? {
                write_mark(&path, max_id)?;
            }
            rewrite(&path, &remaining)?;

            let image_removed = record
                .image_path
                .as_deref()
                .map(|image_path| remove_image(&images_dir, image_path))
                .unwrap_or(false);

            let deletion = Deletion {
                remaining_count: decode_rows(&remaining).len(),
                record,
                image_removed,
            };
            Ok((deletion, max_id))
        })
        .await?;

        *high_water = (*high_water).max(max_id);

        info!(
            id,
            remaining = deletion.remaining_count,
            image_removed = deletion.image_removed,
            "Pothole deleted"
        );
        Ok(deletion)
    }
}

async fn run_blocking<T, F>(kind: fn(String) -> PotholeError, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| kind(format!("storage task failed: {e}")))?
}

fn into_write_error(e: PotholeError) -> PotholeError {
    match e {
        PotholeError::StorageRead(msg) => PotholeError::StorageWrite(msg),
        other => other,
    }
}

/// Create the file (and its directory) with a header row unless it exists
/// with content.
fn ensure_file(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            PotholeError::StorageWrite(format!("cannot create {}: {e}", parent.display()))
        })?;
    }

    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            file.write_all(codec::header().as_bytes())
                .and_then(|_| file.sync_all())
                .map_err(|e| {
                    PotholeError::StorageWrite(format!("cannot write header: {e}"))
                })?;
            info!(path = %path.display(), "Created new pothole file");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let len = fs::metadata(path)
                .map_err(|e| PotholeError::StorageWrite(format!("cannot stat file: {e}")))?
                .len();
            if len == 0 {
                rewrite(path, &[])?;
            }
            Ok(())
        }
        Err(e) => Err(PotholeError::StorageWrite(format!(
            "cannot create {}: {e}",
            path.display()
        ))),
    }
}

fn read_rows(path: &Path) -> Result<Vec<Row>> {
    let text = fs::read_to_string(path).map_err(|e| {
        PotholeError::StorageRead(format!("cannot read {}: {e}", path.display()))
    })?;
    let rows = codec::parse_rows(&text);
    if let Some(first) = rows.first() {
        if first.is_header() && !codec::is_exact_header(&first.fields) {
            warn!(header = ?first.fields, "Pothole file header does not match schema");
        }
    }
    Ok(rows)
}

fn decode_rows(rows: &[Row]) -> Vec<PotholeRecord> {
    rows.iter()
        .filter(|row| !row.is_header())
        .filter_map(|row| match row.decode() {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(line = row.line, error = %e, "Skipping malformed pothole row");
                None
            }
        })
        .collect()
}

/// Append one encoded row. On failure the file is truncated back to its
/// previous length so no partial row is left behind.
fn append_row(path: &Path, row: &str) -> Result<()> {
    let write_error =
        |e: std::io::Error| PotholeError::StorageWrite(format!("cannot append row: {e}"));

    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(write_error)?;
    let original_len = file.seek(SeekFrom::End(0)).map_err(write_error)?;

    // A hand-edited file may lack the final newline
    let mut prefix = "";
    if original_len > 0 {
        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1)).map_err(write_error)?;
        file.read_exact(&mut last).map_err(write_error)?;
        if last[0] != b'\n' {
            prefix = "\n";
        }
    }

    let result = file
        .write_all(format!("{prefix}{row}").as_bytes())
        .and_then(|_| file.sync_data());
    if let Err(e) = result {
        if let Err(truncate_err) = file.set_len(original_len) {
            warn!(error = %truncate_err, "Failed to roll back partial append");
        }
        return Err(write_error(e));
    }
    Ok(())
}

/// Replace the file with a header followed by `rows`.
fn rewrite(path: &Path, rows: &[Row]) -> Result<()> {
    let mut contents = codec::header();
    for row in rows {
        contents.push_str(&row.encode());
    }
    replace_atomically(path, &contents)
        .map_err(|e| PotholeError::StorageWrite(format!("cannot rewrite file: {e}")))
}

/// Write `contents` to a temporary file beside `path`, then rename it over `path`.
fn replace_atomically(path: &Path, contents: &str) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Sidecar file holding the id high-water mark for the store at `path`.
fn mark_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("potholes"));
    name.push(".seq");
    path.with_file_name(name)
}

fn read_mark(path: &Path) -> Result<u64> {
    let mark = mark_path(path);
    match fs::read_to_string(&mark) {
        Ok(text) => Ok(text.trim().parse().unwrap_or_else(|_| {
            warn!(path = %mark.display(), "Ignoring unreadable id high-water mark");
            0
        })),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
        Err(e) => Err(PotholeError::StorageWrite(format!(
            "cannot read {}: {e}",
            mark.display()
        ))),
    }
}

fn write_mark(path: &Path, id: u64) -> Result<()> {
    let mark = mark_path(path);
    replace_atomically(&mark, &format!("{id}\n")).map_err(|e| {
        PotholeError::StorageWrite(format!("cannot write {}: {e}", mark.display()))
    })
}

/// Remove an image file if it exists inside `images_dir`. Failures are
/// logged, never returned.
fn remove_image(images_dir: &Path, image_path: &str) -> bool {
    let resolved = match fs::canonicalize(image_path) {
        Ok(resolved) => resolved,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(image_path, "Image already absent");
            return false;
        }
        Err(e) => {
            warn!(image_path, error = %e, "Could not resolve image path");
            return false;
        }
    };

    let contained = fs::canonicalize(images_dir)
        .map(|dir| resolved != dir && resolved.starts_with(&dir))
        .unwrap_or(false);
    if !contained {
        warn!(
            image_path,
            images_dir = %images_dir.display(),
            "Refusing to delete file outside images directory"
        );
        return false;
    }

    match fs::remove_file(&resolved) {
        Ok(()) => {
            info!(image_path, "Deleted image");
            true
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(image_path, "Image already absent");
            false
        }
        Err(e) => {
            warn!(image_path, error = %e, "Could not delete image");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read_raw(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    fn store_in(dir: &TempDir) -> RecordStore {
        RecordStore::new(dir.path().join("potholes.csv")).with_images_dir(dir.path().join("images"))
    }

    #[tokio::test]
    async fn test_initialize_writes_header_once() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.initialize().await.unwrap();
        store.initialize().await.unwrap();

        assert_eq!(read_raw(store.path()), codec::header());
    }

    #[tokio::test]
    async fn test_initialize_leaves_existing_file_untouched() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let existing = "id,latitude,longitude,timestamp,confidence,image_path\n5,1,2,t,,\n";
        fs::write(store.path(), existing).unwrap();

        store.initialize().await.unwrap();

        assert_eq!(read_raw(store.path()), existing);
    }

    #[tokio::test]
    async fn test_initialize_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path().join("nested/data/potholes.csv"));

        store.initialize().await.unwrap();

        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_empty_store_lists_nothing_and_assigns_one() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.initialize().await.unwrap();

        assert!(store.list_all().await.unwrap().is_empty());

        let record = store
            .create(NewPothole::new(40.0, -73.0, "2025-01-01T00:00:00Z"))
            .await
            .unwrap();
        assert_eq!(record.id, 1);
    }

    #[tokio::test]
    async fn test_list_without_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.list_all().await.unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_create_list_delete_scenario() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.initialize().await.unwrap();

        let first = store
            .create(NewPothole::new(40.0, -73.0, "2025-01-01T00:00:00Z"))
            .await
            .unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(first.confidence, None);
        assert_eq!(first.image_path, None);

        let second = store
            .create(
                NewPothole::new(41.0, -74.0, "2025-01-02T00:00:00Z").with_detection(0.9, "a.jpg"),
            )
            .await
            .unwrap();
        assert_eq!(second.id, 2);

        assert_eq!(store.list_all().await.unwrap(), vec![first, second.clone()]);

        let deletion = store.delete_by_id(1).await.unwrap();
        assert_eq!(deletion.record.id, 1);
        assert_eq!(deletion.remaining_count, 1);

        assert_eq!(store.list_all().await.unwrap(), vec![second]);
    }

    #[tokio::test]
    async fn test_ids_continue_after_existing_rows() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            "id,latitude,longitude,timestamp,confidence,image_path\n3,1,2,t,,\n10,1,2,t,,\n",
        )
        .unwrap();

        let record = store.create(NewPothole::new(0.0, 0.0, "t")).await.unwrap();
        assert_eq!(record.id, 11);
    }

    #[tokio::test]
    async fn test_deleted_max_id_is_not_reassigned() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.create(NewPothole::new(1.0, 1.0, "a")).await.unwrap();
        let second = store.create(NewPothole::new(2.0, 2.0, "b")).await.unwrap();
        store.delete_by_id(second.id).await.unwrap();

        let third = store.create(NewPothole::new(3.0, 3.0, "c")).await.unwrap();
        assert_eq!(third.id, 3);
    }

    #[tokio::test]
    async fn test_deleting_preexisting_max_id_retires_it() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            "id,latitude,longitude,timestamp,confidence,image_path\n1,1,2,t,,\n2,1,2,t,,\n",
        )
        .unwrap();

        store.delete_by_id(2).await.unwrap();
        let record = store.create(NewPothole::new(0.0, 0.0, "t")).await.unwrap();

        assert_eq!(record.id, 3);
    }

    #[tokio::test]
    async fn test_delete_missing_id_is_not_found_and_untouched() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.create(NewPothole::new(1.0, 1.0, "a")).await.unwrap();
        let before = read_raw(store.path());

        let err = store.delete_by_id(42).await.unwrap_err();

        assert!(matches!(err, PotholeError::NotFound(42)));
        assert_eq!(read_raw(store.path()), before);
    }

    #[tokio::test]
    async fn test_delete_keeps_other_records_unchanged() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let a = store.create(NewPothole::new(1.5, -2.25, "a")).await.unwrap();
        let b = store
            .create(NewPothole::new(3.0, 4.0, "b").with_detection(0.75, "x.jpg"))
            .await
            .unwrap();
        let c = store.create(NewPothole::new(5.0, 6.0, "c")).await.unwrap();

        store.delete_by_id(b.id).await.unwrap();

        assert_eq!(store.list_all().await.unwrap(), vec![a, c]);
    }

    #[tokio::test]
    async fn test_delete_removes_existing_image() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.images_dir()).unwrap();
        let image = store.images_dir().join("pothole.jpg");
        fs::write(&image, b"jpeg").unwrap();

        let record = store
            .create(
                NewPothole::new(1.0, 1.0, "a").with_detection(0.8, image.to_string_lossy()),
            )
            .await
            .unwrap();
        let deletion = store.delete_by_id(record.id).await.unwrap();

        assert!(deletion.image_removed);
        assert!(!image.exists());
    }

    #[tokio::test]
    async fn test_delete_succeeds_when_image_missing() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let missing = dir.path().join("gone.jpg");

        let record = store
            .create(
                NewPothole::new(1.0, 1.0, "a").with_detection(0.8, missing.to_string_lossy()),
            )
            .await
            .unwrap();
        let deletion = store.delete_by_id(record.id).await.unwrap();

        assert!(!deletion.image_removed);
        assert_eq!(deletion.remaining_count, 0);
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_rows_are_skipped_and_preserved() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            "id,latitude,longitude,timestamp,confidence,image_path\n1,1,2,t,,\n2,oops,2,t,,\n3,5,6,u,0.6,\n",
        )
        .unwrap();

        let ids: Vec<u64> = store.list_all().await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);

        let deletion = store.delete_by_id(1).await.unwrap();
        assert_eq!(deletion.remaining_count, 1);
        assert!(read_raw(store.path()).contains("2,oops,2,t,,\n"));

        // The malformed row's id still counts toward assignment
        let fresh = store.create(NewPothole::new(0.0, 0.0, "v")).await.unwrap();
        assert_eq!(fresh.id, 4);
    }

    #[tokio::test]
    async fn test_append_repairs_missing_trailing_newline() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            "id,latitude,longitude,timestamp,confidence,image_path\n1,1,2,t,,",
        )
        .unwrap();

        store.create(NewPothole::new(3.0, 4.0, "u")).await.unwrap();

        let ids: Vec<u64> = store.list_all().await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_get_by_id_and_count() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let record = store.create(NewPothole::new(1.0, 2.0, "t")).await.unwrap();

        assert_eq!(store.get_by_id(record.id).await.unwrap(), record);
        assert!(matches!(
            store.get_by_id(99).await,
            Err(PotholeError::NotFound(99))
        ));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_never_removes_files_outside_images_dir() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.images_dir()).unwrap();
        let a = store.create(NewPothole::new(1.0, 1.0, "a")).await.unwrap();
        let b = store.create(NewPothole::new(2.0, 2.0, "b")).await.unwrap();
        let store_file = store.path().to_string_lossy().into_owned();
        let hostile = store
            .create(NewPothole::new(3.0, 3.0, "c").with_detection(0.9, store_file))
            .await
            .unwrap();

        let deletion = store.delete_by_id(hostile.id).await.unwrap();

        assert!(!deletion.image_removed);
        assert_eq!(deletion.remaining_count, 2);
        assert!(store.path().exists());
        assert_eq!(store.list_all().await.unwrap(), vec![a, b]);
    }

    #[tokio::test]
    async fn test_delete_refuses_path_escaping_images_dir() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.images_dir()).unwrap();
        let outside = dir.path().join("keep.jpg");
        fs::write(&outside, b"jpeg").unwrap();
        let escaping = store.images_dir().join("..").join("keep.jpg");

        let record = store
            .create(NewPothole::new(1.0, 1.0, "a").with_detection(0.8, escaping.to_string_lossy()))
            .await
            .unwrap();
        let deletion = store.delete_by_id(record.id).await.unwrap();

        assert!(!deletion.image_removed);
        assert!(outside.exists());
    }

    #[tokio::test]
    async fn test_create_at_max_id_fails_without_writing() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let contents = format!(
            "id,latitude,longitude,timestamp,confidence,image_path\n{},1,2,t,,\n",
            u64::MAX
        );
        fs::write(store.path(), &contents).unwrap();

        let err = store.create(NewPothole::new(0.0, 0.0, "t")).await.unwrap_err();

        assert!(matches!(&err, PotholeError::StorageWrite(msg) if msg.contains("exhausted")));
        assert_eq!(read_raw(store.path()), contents);
    }

    #[tokio::test]
    async fn test_retired_max_id_survives_restart() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.create(NewPothole::new(1.0, 1.0, "a")).await.unwrap();
        let second = store.create(NewPothole::new(2.0, 2.0, "b")).await.unwrap();
        store.delete_by_id(second.id).await.unwrap();
        drop(store);

        let reopened = store_in(&dir);
        let third = reopened.create(NewPothole::new(3.0, 3.0, "c")).await.unwrap();

        assert_eq!(third.id, 3);
        assert_eq!(read_raw(&mark_path(reopened.path())), "3\n");
    }

    #[tokio::test]
    async fn test_unreadable_mark_falls_back_to_file_ids() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.create(NewPothole::new(1.0, 1.0, "a")).await.unwrap();
        fs::write(mark_path(store.path()), "garbage").unwrap();

        let record = store_in(&dir).create(NewPothole::new(2.0, 2.0, "b")).await.unwrap();

        assert_eq!(record.id, 2);
    }
}
