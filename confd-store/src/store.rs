//! SQLite-backed property store.
//!
//! One `property_keys` row per key carries the type tag; the value lives in
//! the table matching that tag (none for null). Value tables cascade on
//! delete of the key row, so removing a key is a single statement. Every
//! mutation runs inside a transaction covering the key row, the value row,
//! and the `updated_at` stamp.

use crate::error::StoreError;
use confd_protocol::Value;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::fmt;
use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current schema version. Monotonically increasing; a database created by a
/// newer schema is refused at open.
pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_SQL: &str = r#"
CREATE TABLE meta (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    key TEXT,
    value TEXT
);
CREATE UNIQUE INDEX meta_key ON meta(key);

CREATE TABLE property_keys (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    key TEXT,
    value_type INTEGER,
    created_at INTEGER DEFAULT (strftime('%s','now')),
    updated_at INTEGER DEFAULT (strftime('%s','now'))
);
CREATE UNIQUE INDEX property_keys_key ON property_keys(key);

CREATE TABLE property_values_string (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    property_id INTEGER,
    value TEXT,
    FOREIGN KEY(property_id) REFERENCES property_keys(id) ON DELETE CASCADE
);
CREATE UNIQUE INDEX property_values_string_property
    ON property_values_string(property_id);

CREATE TABLE property_values_blob (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    property_id INTEGER,
    value BLOB,
    FOREIGN KEY(property_id) REFERENCES property_keys(id) ON DELETE CASCADE
);
CREATE UNIQUE INDEX property_values_blob_property
    ON property_values_blob(property_id);

CREATE TABLE property_values_integer (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    property_id INTEGER,
    value INTEGER,
    FOREIGN KEY(property_id) REFERENCES property_keys(id) ON DELETE CASCADE
);
CREATE UNIQUE INDEX property_values_integer_property
    ON property_values_integer(property_id);

CREATE TABLE property_values_real (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    property_id INTEGER,
    value REAL,
    FOREIGN KEY(property_id) REFERENCES property_keys(id) ON DELETE CASCADE
);
CREATE UNIQUE INDEX property_values_real_property
    ON property_values_real(property_id);
"#;

/// Type tag stored in the `value_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    Null,
    String,
    Blob,
    Integer,
    Real,
}

impl PropertyType {
    /// Raw column value for this tag.
    pub fn raw(&self) -> i64 {
        match self {
            PropertyType::Null => 0,
            PropertyType::String => 1,
            PropertyType::Blob => 2,
            PropertyType::Integer => 3,
            PropertyType::Real => 4,
        }
    }

    /// Parses a raw column value.
    pub fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            0 => Some(PropertyType::Null),
            1 => Some(PropertyType::String),
            2 => Some(PropertyType::Blob),
            3 => Some(PropertyType::Integer),
            4 => Some(PropertyType::Real),
            _ => None,
        }
    }

    /// Returns the tag a value is stored under. Booleans store as integers.
    pub fn for_value(value: &Value) -> Self {
        match value {
            Value::Null => PropertyType::Null,
            Value::Text(_) => PropertyType::String,
            Value::Bytes(_) => PropertyType::Blob,
            Value::UInt(_) | Value::Bool(_) => PropertyType::Integer,
            Value::Real(_) => PropertyType::Real,
        }
    }

    /// Name of the value table for this tag, if any.
    fn table(&self) -> Option<&'static str> {
        match self {
            PropertyType::Null => None,
            PropertyType::String => Some("property_values_string"),
            PropertyType::Blob => Some("property_values_blob"),
            PropertyType::Integer => Some("property_values_integer"),
            PropertyType::Real => Some("property_values_real"),
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertyType::Null => "null",
            PropertyType::String => "string",
            PropertyType::Blob => "blob",
            PropertyType::Integer => "integer",
            PropertyType::Real => "real",
        };
        f.write_str(name)
    }
}

/// Handle to the on-disk configuration data.
///
/// All public operations serialize on one mutex; the store presents a total
/// order on mutations.
pub struct PropertyStore {
    conn: Mutex<Connection>,
}

impl PropertyStore {
    /// Opens (creating and bootstrapping if necessary) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "opening property store");

        let mut conn = Connection::open(path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let have_meta: Option<String> = conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'meta'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        if have_meta.is_none() {
            tracing::warn!("store is empty, initializing schema");
            Self::init_schema(&mut conn)?;
        }

        let version = Self::meta_value_on(&conn, "schema.version")?
            .ok_or_else(|| StoreError::Inconsistent("missing schema version".into()))?;
        let version: u32 = version.parse().map_err(|_| {
            StoreError::Inconsistent(format!("unparseable schema version '{version}'"))
        })?;
        tracing::debug!(version, "store schema version");

        if version > SCHEMA_VERSION {
            return Err(StoreError::SchemaVersion {
                found: version,
                supported: SCHEMA_VERSION,
            });
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Applies the initial schema and metadata inside a single transaction,
    /// so the store is either fully initialized or not at all.
    fn init_schema(conn: &mut Connection) -> Result<(), StoreError> {
        let tx = conn.transaction()?;
        tx.execute_batch(SCHEMA_SQL)?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let meta = [
            ("creator.version", env!("CARGO_PKG_VERSION").to_string()),
            ("creator.timestamp", now.to_string()),
            ("schema.version", SCHEMA_VERSION.to_string()),
        ];
        for (key, value) in meta {
            tx.execute(
                "INSERT INTO meta (key, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Returns the value of a property, or `None` if the key does not exist.
    pub fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let row: Option<(i64, i64)> = conn
            .query_row(
                "SELECT id, value_type FROM property_keys WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((id, raw_type)) = row else {
            return Ok(None);
        };

        let tag = PropertyType::from_raw(raw_type).ok_or_else(|| {
            StoreError::Inconsistent(format!("unknown type tag {raw_type} for key '{key}'"))
        })?;

        let missing_row = || {
            StoreError::Inconsistent(format!(
                "property '{key}' ({id}) of type {tag} has no value row"
            ))
        };

        let value = match tag {
            PropertyType::Null => Value::Null,
            PropertyType::String => {
                let text: String = conn
                    .query_row(
                        "SELECT value FROM property_values_string WHERE property_id = ?1",
                        params![id],
                        |row| row.get(0),
                    )
                    .optional()?
                    .ok_or_else(missing_row)?;
                Value::Text(text)
            }
            PropertyType::Blob => {
                let blob: Vec<u8> = conn
                    .query_row(
                        "SELECT value FROM property_values_blob WHERE property_id = ?1",
                        params![id],
                        |row| row.get(0),
                    )
                    .optional()?
                    .ok_or_else(missing_row)?;
                Value::Bytes(blob)
            }
            PropertyType::Integer => {
                let v: i64 = conn
                    .query_row(
                        "SELECT value FROM property_values_integer WHERE property_id = ?1",
                        params![id],
                        |row| row.get(0),
                    )
                    .optional()?
                    .ok_or_else(missing_row)?;
                Value::UInt(v as u64)
            }
            PropertyType::Real => {
                let v: f64 = conn
                    .query_row(
                        "SELECT value FROM property_values_real WHERE property_id = ?1",
                        params![id],
                        |row| row.get(0),
                    )
                    .optional()?
                    .ok_or_else(missing_row)?;
                Value::Real(v)
            }
        };

        Ok(Some(value))
    }

    /// Inserts or updates a property.
    ///
    /// A new key takes the type of `value`. An existing key may be updated
    /// with a value of its stored type or with null; a stored null may be
    /// promoted to any type. Any other combination fails with
    /// [`StoreError::TypeChange`] and leaves the stored value untouched.
    pub fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey);
        }

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let existing: Option<(i64, i64)> = tx
            .query_row(
                "SELECT id, value_type FROM property_keys WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match existing {
            None => Self::insert_key(&tx, key, value)?,
            Some((id, raw_type)) => {
                let stored = PropertyType::from_raw(raw_type).ok_or_else(|| {
                    StoreError::Inconsistent(format!(
                        "unknown type tag {raw_type} for key '{key}'"
                    ))
                })?;
                let requested = PropertyType::for_value(value);

                if stored != PropertyType::Null
                    && requested != PropertyType::Null
                    && stored != requested
                {
                    return Err(StoreError::TypeChange {
                        key: key.to_owned(),
                        stored,
                        requested,
                    });
                }

                Self::update_key(&tx, id, stored, value)?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Deletes a single key, which must match exactly.
    ///
    /// Fails with [`StoreError::HasChildren`] if keys exist below this path.
    /// Returns the number of deleted keys (0 or 1).
    pub fn delete(&self, key: &str) -> Result<usize, StoreError> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey);
        }

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let children: i64 = tx.query_row(
            "SELECT COUNT(*) FROM property_keys WHERE key LIKE ?1 ESCAPE '\\'",
            params![format!("{}.%", escape_like(key))],
            |row| row.get(0),
        )?;
        if children != 0 {
            return Err(StoreError::HasChildren(key.to_owned()));
        }

        // Value rows follow by the cascade constraint.
        let removed = tx.execute("DELETE FROM property_keys WHERE key = ?1", params![key])?;
        tx.commit()?;
        Ok(removed)
    }

    /// Deletes every key underneath `prefix` (that is, `prefix` followed by a
    /// dot and at least one more character). The key equal to `prefix` itself
    /// is kept. Returns the number of deleted keys.
    pub fn delete_prefix(&self, prefix: &str) -> Result<usize, StoreError> {
        if prefix.is_empty() {
            return Err(StoreError::InvalidKey);
        }

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let removed = tx.execute(
            "DELETE FROM property_keys WHERE key LIKE ?1 ESCAPE '\\'",
            params![format!("{}.%", escape_like(prefix))],
        )?;
        tx.commit()?;
        Ok(removed)
    }

    /// Returns a metadata value.
    pub fn meta_value(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock().unwrap();
        Self::meta_value_on(&conn, key)
    }

    /// Returns the `(created_at, updated_at)` stamps of a key, in whole
    /// seconds.
    pub fn timestamps(&self, key: &str) -> Result<Option<(i64, i64)>, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT created_at, updated_at FROM property_keys WHERE key = ?1",
            params![key],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(Into::into)
    }

    fn meta_value_on(conn: &Connection, key: &str) -> Result<Option<String>, StoreError> {
        conn.query_row(
            "SELECT value FROM meta WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(Into::into)
    }

    /// Creates the key row and, for non-null values, its value row.
    fn insert_key(tx: &Transaction<'_>, key: &str, value: &Value) -> Result<(), StoreError> {
        let tag = PropertyType::for_value(value);
        tracing::debug!(key, value_type = %tag, "creating property");

        tx.execute(
            "INSERT INTO property_keys (key, value_type) VALUES (?1, ?2)",
            params![key, tag.raw()],
        )?;
        let id = tx.last_insert_rowid();

        if let Some(table) = tag.table() {
            Self::write_value(tx, table, id, value, false)?;
        }
        Ok(())
    }

    /// Rewrites an existing key: adjusts the type tag and value tables when
    /// the type changes (only ever to or from null), upserts the value row,
    /// and stamps `updated_at`.
    fn update_key(
        tx: &Transaction<'_>,
        id: i64,
        stored: PropertyType,
        value: &Value,
    ) -> Result<(), StoreError> {
        let requested = PropertyType::for_value(value);
        tracing::debug!(id, from = %stored, to = %requested, "updating property");

        if stored != requested {
            tx.execute(
                "UPDATE property_keys SET value_type = ?1 WHERE id = ?2",
                params![requested.raw(), id],
            )?;
            if let Some(table) = stored.table() {
                tx.execute(
                    &format!("DELETE FROM {table} WHERE property_id = ?1"),
                    params![id],
                )?;
            }
        }

        if let Some(table) = requested.table() {
            Self::write_value(tx, table, id, value, true)?;
        }

        tx.execute(
            "UPDATE property_keys SET updated_at = strftime('%s','now') WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    }

    fn write_value(
        tx: &Transaction<'_>,
        table: &str,
        id: i64,
        value: &Value,
        upsert: bool,
    ) -> Result<(), StoreError> {
        let sql = if upsert {
            format!(
                "INSERT INTO {table} (property_id, value) VALUES (?1, ?2) \
                 ON CONFLICT(property_id) DO UPDATE SET value = excluded.value"
            )
        } else {
            format!("INSERT INTO {table} (property_id, value) VALUES (?1, ?2)")
        };

        match value {
            Value::Text(s) => tx.execute(&sql, params![id, s])?,
            Value::Bytes(b) => tx.execute(&sql, params![id, b])?,
            Value::UInt(v) => tx.execute(&sql, params![id, *v as i64])?,
            Value::Bool(b) => tx.execute(&sql, params![id, *b as i64])?,
            Value::Real(r) => tx.execute(&sql, params![id, r])?,
            Value::Null => 0,
        };
        Ok(())
    }
}

/// Escapes SQL LIKE metacharacters in a key so it can be used as a literal
/// prefix in a pattern.
fn escape_like(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, PropertyStore) {
        let dir = TempDir::new().unwrap();
        let store = PropertyStore::open(dir.path().join("config.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_bootstrap_metadata() {
        let (_dir, store) = open_store();
        assert_eq!(
            store.meta_value("schema.version").unwrap().as_deref(),
            Some("1")
        );
        assert!(store.meta_value("creator.version").unwrap().is_some());
        assert!(store.meta_value("creator.timestamp").unwrap().is_some());
        assert_eq!(store.meta_value("nope").unwrap(), None);
    }

    #[test]
    fn test_reopen_preserves_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.db");

        {
            let store = PropertyStore::open(&path).unwrap();
            store.set("sys.name", &Value::Text("alpha".into())).unwrap();
        }

        let store = PropertyStore::open(&path).unwrap();
        assert_eq!(
            store.get("sys.name").unwrap(),
            Some(Value::Text("alpha".into()))
        );
    }

    #[test]
    fn test_schema_version_too_new() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.db");
        drop(PropertyStore::open(&path).unwrap());

        let conn = Connection::open(&path).unwrap();
        conn.execute(
            "UPDATE meta SET value = '99' WHERE key = 'schema.version'",
            [],
        )
        .unwrap();
        drop(conn);

        let result = PropertyStore::open(&path);
        assert!(matches!(
            result,
            Err(StoreError::SchemaVersion {
                found: 99,
                supported: SCHEMA_VERSION
            })
        ));
    }

    #[test]
    fn test_get_missing_key() {
        let (_dir, store) = open_store();
        assert_eq!(store.get("no.such.key").unwrap(), None);
    }

    #[test]
    fn test_type_persistence() {
        let (_dir, store) = open_store();

        store.set("t.string", &Value::Text("hi".into())).unwrap();
        store.set("t.blob", &Value::Bytes(vec![1, 2, 3])).unwrap();
        store.set("t.int", &Value::UInt(42)).unwrap();
        store.set("t.real", &Value::Real(0.25)).unwrap();
        store.set("t.null", &Value::Null).unwrap();

        assert_eq!(store.get("t.string").unwrap(), Some(Value::Text("hi".into())));
        assert_eq!(store.get("t.blob").unwrap(), Some(Value::Bytes(vec![1, 2, 3])));
        assert_eq!(store.get("t.int").unwrap(), Some(Value::UInt(42)));
        assert_eq!(store.get("t.real").unwrap(), Some(Value::Real(0.25)));
        assert_eq!(store.get("t.null").unwrap(), Some(Value::Null));
    }

    #[test]
    fn test_bool_stored_as_integer() {
        let (_dir, store) = open_store();
        store.set("flag", &Value::Bool(true)).unwrap();
        assert_eq!(store.get("flag").unwrap(), Some(Value::UInt(1)));

        // Same type tag, so an integer update is legal.
        store.set("flag", &Value::UInt(0)).unwrap();
        assert_eq!(store.get("flag").unwrap(), Some(Value::UInt(0)));
    }

    #[test]
    fn test_large_integer_roundtrip() {
        let (_dir, store) = open_store();
        store.set("big", &Value::UInt(u64::MAX)).unwrap();
        assert_eq!(store.get("big").unwrap(), Some(Value::UInt(u64::MAX)));
    }

    #[test]
    fn test_type_lock() {
        let (_dir, store) = open_store();
        store.set("sys.boot.count", &Value::UInt(42)).unwrap();

        let err = store
            .set("sys.boot.count", &Value::Text("x".into()))
            .unwrap_err();
        assert!(err.is_type_change());

        // The stored value is unchanged.
        assert_eq!(store.get("sys.boot.count").unwrap(), Some(Value::UInt(42)));
    }

    #[test]
    fn test_update_in_place() {
        let (_dir, store) = open_store();
        store.set("k", &Value::UInt(1)).unwrap();
        store.set("k", &Value::UInt(2)).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(Value::UInt(2)));
    }

    #[test]
    fn test_null_promotion() {
        let (_dir, store) = open_store();
        store.set("new.k", &Value::Null).unwrap();
        assert_eq!(store.get("new.k").unwrap(), Some(Value::Null));

        store.set("new.k", &Value::Text("hi".into())).unwrap();
        assert_eq!(store.get("new.k").unwrap(), Some(Value::Text("hi".into())));
    }

    #[test]
    fn test_demote_to_null_keeps_key() {
        let (_dir, store) = open_store();
        store.set("k", &Value::Real(1.5)).unwrap();
        store.set("k", &Value::Null).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(Value::Null));

        // And may be promoted to a different type afterwards.
        store.set("k", &Value::UInt(9)).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(Value::UInt(9)));
    }

    #[test]
    fn test_empty_key_rejected() {
        let (_dir, store) = open_store();
        assert!(matches!(
            store.set("", &Value::UInt(1)),
            Err(StoreError::InvalidKey)
        ));
        assert!(matches!(store.delete(""), Err(StoreError::InvalidKey)));
        assert!(matches!(
            store.delete_prefix(""),
            Err(StoreError::InvalidKey)
        ));
    }

    #[test]
    fn test_delete_exact() {
        let (_dir, store) = open_store();
        store.set("a.b", &Value::UInt(1)).unwrap();

        assert_eq!(store.delete("a.b").unwrap(), 1);
        assert_eq!(store.get("a.b").unwrap(), None);
        assert_eq!(store.delete("a.b").unwrap(), 0);
    }

    #[test]
    fn test_delete_refuses_parent() {
        let (_dir, store) = open_store();
        store.set("a.b", &Value::UInt(1)).unwrap();
        store.set("a.b.c", &Value::UInt(2)).unwrap();

        assert!(matches!(
            store.delete("a.b"),
            Err(StoreError::HasChildren(_))
        ));
        assert_eq!(store.get("a.b").unwrap(), Some(Value::UInt(1)));

        // Removing the child unblocks the parent.
        assert_eq!(store.delete("a.b.c").unwrap(), 1);
        assert_eq!(store.delete("a.b").unwrap(), 1);
    }

    #[test]
    fn test_delete_prefix() {
        let (_dir, store) = open_store();
        store.set("a.b.x", &Value::UInt(1)).unwrap();
        store.set("a.b.y", &Value::UInt(2)).unwrap();
        store.set("a.b", &Value::UInt(3)).unwrap();
        store.set("a.c", &Value::UInt(4)).unwrap();

        assert_eq!(store.delete_prefix("a.b").unwrap(), 2);

        assert_eq!(store.get("a.b").unwrap(), Some(Value::UInt(3)));
        assert_eq!(store.get("a.b.x").unwrap(), None);
        assert_eq!(store.get("a.b.y").unwrap(), None);
        assert_eq!(store.get("a.c").unwrap(), Some(Value::UInt(4)));
    }

    #[test]
    fn test_like_metacharacters_in_keys() {
        let (_dir, store) = open_store();
        store.set("a%b", &Value::UInt(1)).unwrap();
        store.set("axb.c", &Value::UInt(2)).unwrap();

        // "axb.c" is not a child of "a%b"; the wildcard must not fire.
        assert_eq!(store.delete("a%b").unwrap(), 1);
        assert_eq!(store.get("axb.c").unwrap(), Some(Value::UInt(2)));

        store.set("a_b", &Value::UInt(3)).unwrap();
        store.set("a_b.kid", &Value::UInt(4)).unwrap();
        assert!(matches!(
            store.delete("a_b"),
            Err(StoreError::HasChildren(_))
        ));
        assert_eq!(store.delete_prefix("a_b").unwrap(), 1);
        assert_eq!(store.delete("a_b").unwrap(), 1);
    }

    #[test]
    fn test_timestamps_present() {
        let (_dir, store) = open_store();
        store.set("k", &Value::UInt(1)).unwrap();

        let (created, updated) = store.timestamps("k").unwrap().unwrap();
        assert!(created > 0);
        assert!(updated >= created);
        assert_eq!(store.timestamps("missing").unwrap(), None);
    }

    #[test]
    fn test_missing_value_row_is_inconsistent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.db");
        {
            let store = PropertyStore::open(&path).unwrap();
            store.set("k", &Value::UInt(5)).unwrap();
        }

        let conn = Connection::open(&path).unwrap();
        conn.execute("DELETE FROM property_values_integer", []).unwrap();
        drop(conn);

        let store = PropertyStore::open(&path).unwrap();
        assert!(matches!(
            store.get("k"),
            Err(StoreError::Inconsistent(_))
        ));
    }
}
