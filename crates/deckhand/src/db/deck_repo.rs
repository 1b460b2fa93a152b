//! Deck repository: CRUD operations for the `decks` table.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// A raw deck row from the database.
#[derive(Debug, Clone)]
pub struct DeckRow {
    pub id: String,
    pub investor_id: Option<String>,
    pub filename: String,
    pub staging_path: String,
    pub object_path: Option<String>,
    pub content_hash: Option<String>,
    pub source: String,
    pub source_metadata: Option<String>,
    pub created_at: String,
}

impl DeckRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            investor_id: row.get("investor_id")?,
            filename: row.get("filename")?,
            staging_path: row.get("staging_path")?,
            object_path: row.get("object_path")?,
            content_hash: row.get("content_hash")?,
            source: row.get("source")?,
            source_metadata: row.get("source_metadata")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Inserts a new deck row.
pub fn insert(db: &Database, deck: &DeckRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO decks (id, investor_id, filename, staging_path, object_path,
             content_hash, source, source_metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                deck.id,
                deck.investor_id,
                deck.filename,
                deck.staging_path,
                deck.object_path,
                deck.content_hash,
                deck.source,
                deck.source_metadata,
                deck.created_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds a deck by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<DeckRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM decks WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], DeckRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Lists decks for an investor, newest first.
pub fn list_by_investor(db: &Database, investor_id: &str) -> Result<Vec<DeckRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM decks WHERE investor_id = ?1 ORDER BY created_at DESC",
        )?;
        let rows: Vec<DeckRow> = stmt
            .query_map(params![investor_id], DeckRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Lists the most recent decks, newest first.
pub fn list_recent(db: &Database, limit: u32) -> Result<Vec<DeckRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM decks ORDER BY created_at DESC LIMIT ?1")?;
        let rows: Vec<DeckRow> = stmt
            .query_map(params![limit], DeckRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
