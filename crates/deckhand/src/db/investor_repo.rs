//! Investor repository: accessor plumbing for the `investors` table.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};

/// An investor row. The focus-area and deal-breaker lists are stored as
/// JSON arrays in TEXT columns.
#[derive(Debug, Clone)]
pub struct InvestorRow {
    pub id: String,
    pub email: String,
    pub name: String,
    pub thesis: Option<String>,
    pub focus_areas: Vec<String>,
    pub deal_breakers: Vec<String>,
    pub created_at: String,
}

impl InvestorRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            email: row.get("email")?,
            name: row.get("name")?,
            thesis: row.get("thesis")?,
            focus_areas: decode_list(row, "focus_areas")?,
            deal_breakers: decode_list(row, "deal_breakers")?,
            created_at: row.get("created_at")?,
        })
    }
}

fn decode_list(row: &Row<'_>, column: &str) -> Result<Vec<String>, rusqlite::Error> {
    let raw: String = row.get(column)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Inserts a new investor row. The email column is unique; inserting a
/// duplicate surfaces the constraint violation as a `Sqlite` error.
pub fn insert(db: &Database, investor: &InvestorRow) -> Result<(), DatabaseError> {
    let focus_areas = serde_json::to_string(&investor.focus_areas)?;
    let deal_breakers = serde_json::to_string(&investor.deal_breakers)?;
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO investors (id, email, name, thesis, focus_areas, deal_breakers, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                investor.id,
                investor.email,
                investor.name,
                investor.thesis,
                focus_areas,
                deal_breakers,
                investor.created_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds an investor by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<InvestorRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM investors WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], InvestorRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Lists all investors ordered by name.
pub fn list(db: &Database) -> Result<Vec<InvestorRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM investors ORDER BY name ASC")?;
        let rows: Vec<InvestorRow> = stmt
            .query_map([], InvestorRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
