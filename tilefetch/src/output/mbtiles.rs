//! MBTiles output: every tile in one SQLite file.
//!
//! Rows use the TMS scheme, so the stored row is `2^z - 1 - y`.

use std::fs;
use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, trace, warn};

use super::{BackendGuard, OutputBackend, OutputError, TilesetMetadata};
use crate::coord::TileCoord;
use crate::fetch::Scale;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS metadata (name TEXT, value TEXT);
    CREATE UNIQUE INDEX IF NOT EXISTS name ON metadata (name);
    CREATE TABLE IF NOT EXISTS tiles (
        zoom_level INTEGER,
        tile_column INTEGER,
        tile_row INTEGER,
        tile_data BLOB
    );
    CREATE UNIQUE INDEX IF NOT EXISTS tile_index ON tiles (zoom_level, tile_column, tile_row);
";

/// SQLite-backed container.
///
/// The connection is opened at construction and released by `close`.
pub struct MbtilesBackend {
    conn: Mutex<Option<Connection>>,
}

impl MbtilesBackend {
    /// Opens or creates the database at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, OutputError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| OutputError::io(parent, e))?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        debug!(path = %path.display(), "MBTiles database opened");

        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, OutputError> {
        let conn = self.conn.lock();
        let conn = conn.as_ref().ok_or(OutputError::Closed)?;
        Ok(f(conn)?)
    }

    fn put_metadata(conn: &Connection, name: &str, value: &str) -> rusqlite::Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO metadata (name, value) VALUES (?1, ?2)",
            params![name, value],
        )?;
        Ok(())
    }

    /// Reads one metadata value, mostly for inspection and tests.
    pub fn metadata_value(&self, name: &str) -> Result<Option<String>, OutputError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM metadata WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
        })
    }
}

fn tms_row(tile: &TileCoord) -> u32 {
    ((1u64 << tile.z) - 1 - u64::from(tile.y)) as u32
}

fn join_numbers(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl OutputBackend for MbtilesBackend {
    fn name(&self) -> &'static str {
        "mbtiles"
    }

    fn exists(&self, _target: &Path, tile: &TileCoord) -> bool {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT 1 FROM tiles WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3",
                params![tile.z, tile.x, tms_row(tile)],
                |_| Ok(()),
            )
            .optional()
        })
        .map(|row| row.is_some())
        .unwrap_or_else(|e| {
            warn!(tile = %tile, error = %e, "MBTiles lookup failed; treating tile as missing");
            false
        })
    }

    fn add_tile(
        &self,
        _guard: &BackendGuard<'_>,
        _target: &Path,
        source: &Path,
        tile: &TileCoord,
        _scale: Scale,
    ) -> Result<(), OutputError> {
        let data = fs::read(source).map_err(|e| OutputError::io(source, e))?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO tiles (zoom_level, tile_column, tile_row, tile_data)
                 VALUES (?1, ?2, ?3, ?4)",
                params![tile.z, tile.x, tms_row(tile), data],
            )
        })?;
        trace!(tile = %tile, bytes = data.len(), "Tile stored in MBTiles");
        Ok(())
    }

    fn add_metadata(
        &self,
        _guard: &BackendGuard<'_>,
        metadata: &TilesetMetadata,
    ) -> Result<(), OutputError> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let rows = [
                ("name", metadata.file_name.clone()),
                ("type", "baselayer".to_string()),
                ("version", "1.1".to_string()),
                ("description", metadata.description.clone()),
                ("format", metadata.format.clone()),
                ("bounds", join_numbers(&metadata.bounds)),
                ("center", join_numbers(&metadata.center)),
                ("minzoom", metadata.min_zoom.to_string()),
                ("maxzoom", metadata.max_zoom.to_string()),
                ("profile", metadata.profile.clone()),
                ("tilesize", metadata.tile_size.to_string()),
            ];
            for (name, value) in &rows {
                Self::put_metadata(&tx, name, value)?;
            }
            tx.commit()
        })
    }

    fn close(
        &self,
        _guard: &BackendGuard<'_>,
        _output_dir: &Path,
        full_path: &Path,
        min_zoom: u8,
        max_zoom: u8,
    ) -> Result<(), OutputError> {
        let conn = self.conn.lock().take().ok_or(OutputError::Closed)?;
        Self::put_metadata(&conn, "minzoom", &min_zoom.to_string())?;
        Self::put_metadata(&conn, "maxzoom", &max_zoom.to_string())?;
        conn.close().map_err(|(_, e)| OutputError::Sqlite(e))?;
        debug!(path = %full_path.display(), "MBTiles database closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::BackendLock;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    fn metadata(full_path: PathBuf) -> TilesetMetadata {
        TilesetMetadata {
            output_dir: full_path.parent().unwrap().to_path_buf(),
            full_path,
            file_name: "tiles.mbtiles".to_string(),
            description: "test".to_string(),
            format: "png".to_string(),
            bounds: [-10.0, 40.0, 10.0, 50.0],
            center: [0.0, 45.0, 3.0],
            min_zoom: 1,
            max_zoom: 5,
            profile: "mercator".to_string(),
            tile_size: 256,
        }
    }

    #[test]
    fn test_tms_row_flip() {
        assert_eq!(tms_row(&TileCoord::new(0, 0, 0)), 0);
        assert_eq!(tms_row(&TileCoord::new(0, 0, 2)), 3);
        assert_eq!(tms_row(&TileCoord::new(0, 3, 2)), 0);
    }

    #[tokio::test]
    async fn test_add_tile_and_exists() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("job/tiles.mbtiles");
        let source = dir.path().join("tile.png");
        fs::write(&source, b"png-data").unwrap();

        let backend = MbtilesBackend::open(&db).unwrap();
        let lock = BackendLock::new();
        let guard = lock.lock().await;
        let tile = TileCoord::new(1, 2, 3);

        assert!(!backend.exists(&db, &tile));
        backend
            .add_tile(&guard, &db, &source, &tile, Scale::One)
            .unwrap();
        assert!(backend.exists(&db, &tile));
        assert!(!backend.exists(&db, &TileCoord::new(1, 5, 3)));

        // Writing the same tile again replaces it.
        backend
            .add_tile(&guard, &db, &source, &tile, Scale::One)
            .unwrap();

        let data: Vec<u8> = backend
            .with_conn(|conn| {
                conn.query_row(
                    "SELECT tile_data FROM tiles WHERE zoom_level = 3 AND tile_column = 1 AND tile_row = 5",
                    [],
                    |row| row.get(0),
                )
            })
            .unwrap();
        assert_eq!(data, b"png-data");
        let count: i64 = backend
            .with_conn(|conn| conn.query_row("SELECT COUNT(*) FROM tiles", [], |row| row.get(0)))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_metadata_rows() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("tiles.mbtiles");
        let backend = MbtilesBackend::open(&db).unwrap();
        let lock = BackendLock::new();
        let guard = lock.lock().await;

        backend.add_metadata(&guard, &metadata(db.clone())).unwrap();

        assert_eq!(backend.metadata_value("type").unwrap().as_deref(), Some("baselayer"));
        assert_eq!(backend.metadata_value("version").unwrap().as_deref(), Some("1.1"));
        assert_eq!(
            backend.metadata_value("bounds").unwrap().as_deref(),
            Some("-10,40,10,50")
        );
        assert_eq!(backend.metadata_value("center").unwrap().as_deref(), Some("0,45,3"));
        assert_eq!(backend.metadata_value("minzoom").unwrap().as_deref(), Some("1"));
        assert_eq!(backend.metadata_value("missing").unwrap(), None);
    }

    #[tokio::test]
    async fn test_close_updates_zoom_and_releases() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("tiles.mbtiles");
        let backend = MbtilesBackend::open(&db).unwrap();
        let lock = BackendLock::new();
        let guard = lock.lock().await;

        backend.add_metadata(&guard, &metadata(db.clone())).unwrap();
        backend.close(&guard, dir.path(), &db, 2, 4).unwrap();

        assert!(matches!(
            backend.close(&guard, dir.path(), &db, 2, 4),
            Err(OutputError::Closed)
        ));
        assert!(!backend.exists(&db, &TileCoord::new(0, 0, 0)));

        let reopened = MbtilesBackend::open(&db).unwrap();
        assert_eq!(reopened.metadata_value("minzoom").unwrap().as_deref(), Some("2"));
        assert_eq!(reopened.metadata_value("maxzoom").unwrap().as_deref(), Some("4"));
    }

    /// Counts WARN events.
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_lookup_error_is_logged_and_reads_as_missing() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("tiles.mbtiles");
        let backend = MbtilesBackend::open(&db).unwrap();
        backend
            .with_conn(|conn| conn.execute_batch("DROP TABLE tiles;"))
            .unwrap();

        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(Arc::clone(&warnings)));
        let found = tracing::subscriber::with_default(subscriber, || {
            backend.exists(&db, &TileCoord::new(0, 0, 0))
        });

        assert!(!found);
        assert_eq!(warnings.load(Ordering::SeqCst), 1);
    }
}
