//! Partitioned document store over SQLite
//!
//! A partition is a named, isolated collection of JSON documents inside the
//! `documents` table. Saga partitions and topic partitions live in separate
//! namespaces (`PartitionKind`). Names are always sanitized with
//! `correct_name`; the `partitions` catalog remembers which unsanitized name
//! first wrote to each partition.
//!
//! Field paths are dot-separated and resolved inside the document body with
//! `json_extract`. Equality uses SQL `IS`, so a `Null` value matches both a
//! JSON `null` and a missing field.

use crate::errors::{from_rusqlite, serialization_error, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension};
use sagastore_core::errors::{require_non_empty, SagaStoreError};
use sagastore_core::{correct_name, CorrelationValue, ExError, ExErrorKind};
use serde::Serialize;

/// Namespace a partition belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionKind {
    Saga,
    Topic,
}

impl PartitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionKind::Saga => "saga",
            PartitionKind::Topic => "topic",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s {
            "saga" => Ok(PartitionKind::Saga),
            "topic" => Ok(PartitionKind::Topic),
            other => Err(catalog_corruption(format!("unknown partition kind '{}'", other))),
        }
    }
}

/// A stored document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub body: serde_json::Value,
}

/// Handle onto one partition, borrowed from an open connection
pub struct Partition<'c> {
    conn: &'c Connection,
    kind: PartitionKind,
    name: String,
}

impl<'c> Partition<'c> {
    /// Open the partition for `source_name` (sanitized)
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `source_name` is empty or sanitizes to nothing.
    pub fn open(conn: &'c Connection, kind: PartitionKind, source_name: &str) -> Result<Self> {
        require_non_empty("partition name", source_name)?;
        let name = correct_name(source_name);
        if name.is_empty() {
            return Err(SagaStoreError::UnusablePartitionName {
                source_name: source_name.to_string(),
            }
            .into());
        }
        Ok(Self { conn, kind, name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record `source_name` as the owner of this partition.
    ///
    /// The first writer claims the partition. With `reject_collisions`, a
    /// later writer under a different source name is refused.
    ///
    /// # Errors
    ///
    /// `PartitionCollision` when another source already owns the partition.
    pub fn register(&self, source_name: &str, reject_collisions: bool) -> Result<()> {
        match self.owner()? {
            Some(existing_source) => {
                self.refuse_foreign(existing_source, source_name, reject_collisions)
            }
            None => {
                self.conn
                    .execute(
                        "INSERT INTO partitions (kind, name, source_name, created_at)
                         VALUES (?1, ?2, ?3, ?4)",
                        rusqlite::params![
                            self.kind.as_str(),
                            self.name,
                            source_name,
                            chrono::Utc::now().timestamp()
                        ],
                    )
                    .map_err(from_rusqlite)?;
                tracing::debug!(
                    kind = self.kind.as_str(),
                    partition = %self.name,
                    source_name,
                    "registered partition"
                );
                Ok(())
            }
        }
    }

    /// Fail when another source owns this partition, without claiming it.
    ///
    /// An unclaimed partition passes; nothing has been written under any
    /// name yet.
    ///
    /// # Errors
    ///
    /// `PartitionCollision` as for [`Partition::register`].
    pub fn check_owner(&self, source_name: &str, reject_collisions: bool) -> Result<()> {
        match self.owner()? {
            Some(existing_source) => {
                self.refuse_foreign(existing_source, source_name, reject_collisions)
            }
            None => Ok(()),
        }
    }

    fn owner(&self) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT source_name FROM partitions WHERE kind = ?1 AND name = ?2",
                rusqlite::params![self.kind.as_str(), self.name],
                |row| row.get(0),
            )
            .optional()
            .map_err(from_rusqlite)
    }

    fn refuse_foreign(
        &self,
        existing_source: String,
        source_name: &str,
        reject_collisions: bool,
    ) -> Result<()> {
        if reject_collisions && existing_source != source_name {
            return Err(SagaStoreError::PartitionNameCollision {
                partition: self.name.clone(),
                existing_source,
                source_name: source_name.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Insert a new document
    pub fn insert(&self, doc: &Document) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO documents (kind, partition, doc_id, body) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![self.kind.as_str(), self.name, doc.id, doc.body.to_string()],
            )
            .map_err(from_rusqlite)?;
        tracing::debug!(partition = %self.name, doc_id = %doc.id, "inserted document");
        Ok(())
    }

    /// Replace the body of an existing document, returning rows changed
    pub fn update(&self, doc: &Document) -> Result<usize> {
        let changed = self
            .conn
            .execute(
                "UPDATE documents SET body = ?4 WHERE kind = ?1 AND partition = ?2 AND doc_id = ?3",
                rusqlite::params![self.kind.as_str(), self.name, doc.id, doc.body.to_string()],
            )
            .map_err(from_rusqlite)?;
        tracing::debug!(partition = %self.name, doc_id = %doc.id, changed, "updated document");
        Ok(changed)
    }

    pub fn find_by_id(&self, id: &str) -> Result<Option<Document>> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT doc_id, body FROM documents WHERE kind = ?1 AND partition = ?2 AND doc_id = ?3",
                rusqlite::params![self.kind.as_str(), self.name, id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(from_rusqlite)?;

        row.map(|(doc_id, body)| decode(doc_id, &body)).transpose()
    }

    pub fn delete_by_id(&self, id: &str) -> Result<usize> {
        let removed = self
            .conn
            .execute(
                "DELETE FROM documents WHERE kind = ?1 AND partition = ?2 AND doc_id = ?3",
                rusqlite::params![self.kind.as_str(), self.name, id],
            )
            .map_err(from_rusqlite)?;
        tracing::debug!(partition = %self.name, doc_id = id, removed, "deleted document by id");
        Ok(removed)
    }

    /// Delete every document whose field at `field_path` equals `value`
    pub fn delete_where(&self, field_path: &str, value: &CorrelationValue) -> Result<usize> {
        let json_path = json_path(field_path)?;
        let removed = self
            .conn
            .execute(
                "DELETE FROM documents
                 WHERE kind = ?1 AND partition = ?2 AND json_extract(body, ?3) IS ?4",
                rusqlite::params![self.kind.as_str(), self.name, json_path, to_sql(value)],
            )
            .map_err(from_rusqlite)?;
        tracing::debug!(partition = %self.name, field_path, removed, "deleted documents by field");
        Ok(removed)
    }

    /// Documents whose field at `field_path` equals `value`, in insertion order
    pub fn find_by_equality(
        &self,
        field_path: &str,
        value: &CorrelationValue,
    ) -> Result<Vec<Document>> {
        let json_path = json_path(field_path)?;
        self.query(
            "SELECT doc_id, body FROM documents
             WHERE kind = ?1 AND partition = ?2 AND json_extract(body, ?3) IS ?4
             ORDER BY seq",
            rusqlite::params![self.kind.as_str(), self.name, json_path, to_sql(value)],
        )
    }

    /// Every document in insertion order
    pub fn find_all(&self) -> Result<Vec<Document>> {
        self.query(
            "SELECT doc_id, body FROM documents WHERE kind = ?1 AND partition = ?2 ORDER BY seq",
            rusqlite::params![self.kind.as_str(), self.name],
        )
    }

    fn query(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Document>> {
        let mut stmt = self.conn.prepare(sql).map_err(from_rusqlite)?;
        let rows: Vec<(String, String)> = stmt
            .query_map(params, |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;

        rows.into_iter()
            .map(|(doc_id, body)| decode(doc_id, &body))
            .collect()
    }
}

/// Catalog entry for one partition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionInfo {
    pub kind: PartitionKind,
    pub name: String,
    pub source_name: String,
    pub created_at: i64,
    pub documents: u64,
}

/// List the partition catalog with live document counts
pub fn list_partitions(conn: &Connection) -> Result<Vec<PartitionInfo>> {
    let mut stmt = conn
        .prepare(
            "SELECT p.kind, p.name, p.source_name, p.created_at,
                    (SELECT COUNT(*) FROM documents d WHERE d.kind = p.kind AND d.partition = p.name)
             FROM partitions p
             ORDER BY p.kind, p.name",
        )
        .map_err(from_rusqlite)?;

    let rows: Vec<(String, String, String, i64, i64)> = stmt
        .query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        })
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;

    rows.into_iter()
        .map(|(kind, name, source_name, created_at, count)| {
            let documents = u64::try_from(count).map_err(|_| {
                catalog_corruption(format!("negative document count {}", count))
                    .with_partition(name.clone())
            })?;
            Ok(PartitionInfo {
                kind: PartitionKind::parse(&kind)?,
                name,
                source_name,
                created_at,
                documents,
            })
        })
        .collect()
}

fn catalog_corruption(detail: String) -> ExError {
    ExError::new(ExErrorKind::DataIntegrity)
        .with_op("list_partitions")
        .with_message(format!("Partition catalog is corrupt: {}", detail))
}

fn decode(doc_id: String, body: &str) -> Result<Document> {
    let body = serde_json::from_str(body).map_err(|e| serialization_error(&doc_id, e))?;
    Ok(Document { id: doc_id, body })
}

/// Translate `a.b.c` into the JSON path `$."a"."b"."c"`
fn json_path(field_path: &str) -> Result<String> {
    require_non_empty("field path", field_path)?;
    let mut path = String::from("$");
    for segment in field_path.split('.') {
        if segment.is_empty() || segment.contains('"') {
            return Err(ExError::new(ExErrorKind::InvalidInput).with_message(format!(
                "Field path '{}' has an empty or quoted segment",
                field_path
            )));
        }
        path.push_str(".\"");
        path.push_str(segment);
        path.push('"');
    }
    Ok(path)
}

/// Bind a correlation value the way `json_extract` reports JSON scalars
fn to_sql(value: &CorrelationValue) -> SqlValue {
    match value {
        CorrelationValue::Null => SqlValue::Null,
        CorrelationValue::Bool(b) => SqlValue::Integer(i64::from(*b)),
        CorrelationValue::Integer(i) => SqlValue::Integer(*i),
        CorrelationValue::Real(r) => SqlValue::Real(*r),
        CorrelationValue::Text(s) => SqlValue::Text(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::apply_migrations;
    use serde_json::json;

    fn setup() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        conn
    }

    fn doc(id: &str, body: serde_json::Value) -> Document {
        Document {
            id: id.to_string(),
            body,
        }
    }

    #[test]
    fn test_json_path() {
        assert_eq!(json_path("signature").unwrap(), "$.\"signature\"");
        assert_eq!(json_path("data.customer.id").unwrap(), "$.\"data\".\"customer\".\"id\"");
        assert!(json_path("").is_err());
        assert!(json_path("a..b").is_err());
        assert!(json_path("a\"b").is_err());
    }

    #[test]
    fn test_open_sanitizes_and_rejects_empty() {
        let conn = setup();
        let p = Partition::open(&conn, PartitionKind::Topic, "orders.placed").unwrap();
        assert_eq!(p.name(), "ordersplaced");

        assert!(Partition::open(&conn, PartitionKind::Topic, "").is_err());
        assert!(Partition::open(&conn, PartitionKind::Topic, "-._").is_err());
    }

    #[test]
    fn test_equality_on_typed_scalars() {
        let conn = setup();
        let p = Partition::open(&conn, PartitionKind::Saga, "Typed").unwrap();
        p.insert(&doc("1", json!({"n": 42, "flag": true, "s": "42", "nested": {"x": 1.5}})))
            .unwrap();
        p.insert(&doc("2", json!({"n": 43, "flag": false, "s": "x"}))).unwrap();

        let by_int = p.find_by_equality("n", &CorrelationValue::Integer(42)).unwrap();
        assert_eq!(by_int.len(), 1);
        assert_eq!(by_int[0].id, "1");

        // Text "42" must not match the number 42
        let by_text = p.find_by_equality("s", &CorrelationValue::Integer(42)).unwrap();
        assert!(by_text.is_empty());

        let by_bool = p.find_by_equality("flag", &CorrelationValue::Bool(false)).unwrap();
        assert_eq!(by_bool[0].id, "2");

        let nested = p.find_by_equality("nested.x", &CorrelationValue::Real(1.5)).unwrap();
        assert_eq!(nested[0].id, "1");

        // Missing field compares equal to Null
        let missing = p.find_by_equality("nested.x", &CorrelationValue::Null).unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].id, "2");
    }

    #[test]
    fn test_partitions_are_isolated_by_name_and_kind() {
        let conn = setup();
        let a = Partition::open(&conn, PartitionKind::Saga, "A").unwrap();
        let b = Partition::open(&conn, PartitionKind::Saga, "B").unwrap();
        let topic_a = Partition::open(&conn, PartitionKind::Topic, "A").unwrap();

        a.insert(&doc("1", json!({"v": 1}))).unwrap();

        assert_eq!(a.find_all().unwrap().len(), 1);
        assert!(b.find_all().unwrap().is_empty());
        assert!(topic_a.find_all().unwrap().is_empty());
        assert!(b.find_by_id("1").unwrap().is_none());
    }

    #[test]
    fn test_update_delete_and_delete_where() {
        let conn = setup();
        let p = Partition::open(&conn, PartitionKind::Topic, "t").unwrap();
        p.insert(&doc("1", json!({"address": "a"}))).unwrap();
        p.insert(&doc("2", json!({"address": "a"}))).unwrap();
        p.insert(&doc("3", json!({"address": "b"}))).unwrap();

        assert_eq!(p.update(&doc("3", json!({"address": "c"}))).unwrap(), 1);
        assert_eq!(p.update(&doc("9", json!({}))).unwrap(), 0);
        assert_eq!(p.find_by_id("3").unwrap().unwrap().body["address"], "c");

        let removed = p
            .delete_where("address", &CorrelationValue::Text("a".to_string()))
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(p.delete_by_id("3").unwrap(), 1);
        assert_eq!(p.delete_by_id("3").unwrap(), 0);
        assert!(p.find_all().unwrap().is_empty());
    }

    #[test]
    fn test_register_detects_collisions() {
        let conn = setup();
        let first = Partition::open(&conn, PartitionKind::Topic, "a.b").unwrap();
        let second = Partition::open(&conn, PartitionKind::Topic, "ab").unwrap();

        first.register("a.b", true).unwrap();
        first.register("a.b", true).unwrap();

        let err = second.register("ab", true).unwrap_err();
        assert_eq!(err.kind(), sagastore_core::ExErrorKind::PartitionCollision);

        assert!(second.register("ab", false).is_ok());

        let catalog = list_partitions(&conn).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].source_name, "a.b");
    }

    #[test]
    fn test_check_owner_never_claims() {
        let conn = setup();
        let owner = Partition::open(&conn, PartitionKind::Saga, "a.b").unwrap();
        let other = Partition::open(&conn, PartitionKind::Saga, "ab").unwrap();

        other.check_owner("ab", true).unwrap();
        assert!(list_partitions(&conn).unwrap().is_empty());

        owner.register("a.b", true).unwrap();
        owner.check_owner("a.b", true).unwrap();
        let err = other.check_owner("ab", true).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::PartitionCollision);
        assert!(other.check_owner("ab", false).is_ok());
    }

    #[test]
    fn test_unknown_catalog_kind_is_data_integrity_error() {
        let conn = setup();
        Partition::open(&conn, PartitionKind::Topic, "t")
            .unwrap()
            .register("t", true)
            .unwrap();
        conn.execute(
            "INSERT INTO partitions (kind, name, source_name, created_at) VALUES ('bogus', 'x', 'x', 0)",
            [],
        )
        .unwrap();

        let err = list_partitions(&conn).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::DataIntegrity);
        assert!(err.message().contains("bogus"));
    }
}
