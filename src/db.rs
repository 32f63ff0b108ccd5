use crate::entities::salesperson::normalize_email;
use crate::entities::sale::{digest_bytes, source_line_hash};
use crate::entities::{CommissionTier, Sale, Salesperson};
use crate::report::parse_date_bound;
use crate::validation;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;

// Dates are stored as RFC 3339 UTC text with second precision, so comparing
// the text compares the instants.
fn date_to_sql(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn date_from_sql(idx: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Open (or create) the database file and make sure the schema exists
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database: {:?}", path))?;
    setup_database(&conn)?;
    tracing::debug!(path = ?path, "database ready");
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS salespeople (
            id TEXT PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT UNIQUE NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS sales (
            id TEXT PRIMARY KEY,
            source_hash TEXT UNIQUE,
            salesperson_id TEXT NOT NULL REFERENCES salespeople(id),
            amount REAL NOT NULL,
            date TEXT NOT NULL,
            description TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS commission_tiers (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            min_amount REAL NOT NULL,
            max_amount REAL NOT NULL,
            rate REAL NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute("CREATE INDEX IF NOT EXISTS idx_sales_date ON sales(date)", [])?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sales_salesperson ON sales(salesperson_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tiers_min_amount ON commission_tiers(min_amount)",
        [],
    )?;

    Ok(())
}

/// Remove every row, children first
pub fn clear_all(conn: &Connection) -> Result<()> {
    conn.execute("DELETE FROM sales", [])?;
    conn.execute("DELETE FROM salespeople", [])?;
    conn.execute("DELETE FROM commission_tiers", [])?;
    Ok(())
}

// ============================================================================
// SALESPEOPLE
// ============================================================================

fn salesperson_from_row(row: &Row) -> rusqlite::Result<Salesperson> {
    Ok(Salesperson {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        active: row.get(4)?,
    })
}

pub fn insert_salesperson(conn: &Connection, person: &Salesperson) -> Result<()> {
    conn.execute(
        "INSERT INTO salespeople (id, first_name, last_name, email, active)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            person.id,
            person.first_name,
            person.last_name,
            normalize_email(&person.email),
            person.active,
        ],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            anyhow!("Salesperson email already registered: {}", person.email)
        }
        other => other.into(),
    })?;

    Ok(())
}

/// Active salespeople, ordered by last then first name
pub fn get_active_salespeople(conn: &Connection) -> Result<Vec<Salesperson>> {
    let mut stmt = conn.prepare(
        "SELECT id, first_name, last_name, email, active
         FROM salespeople
         WHERE active = 1
         ORDER BY last_name, first_name",
    )?;

    let people = stmt
        .query_map([], salesperson_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(people)
}

pub fn get_salesperson(conn: &Connection, id: &str) -> Result<Option<Salesperson>> {
    let person = conn
        .query_row(
            "SELECT id, first_name, last_name, email, active FROM salespeople WHERE id = ?1",
            [id],
            salesperson_from_row,
        )
        .optional()?;

    Ok(person)
}

pub fn find_salesperson_by_email(conn: &Connection, email: &str) -> Result<Option<Salesperson>> {
    let person = conn
        .query_row(
            "SELECT id, first_name, last_name, email, active FROM salespeople WHERE email = ?1",
            [normalize_email(email)],
            salesperson_from_row,
        )
        .optional()?;

    Ok(person)
}

// ============================================================================
// COMMISSION TIERS
// ============================================================================

pub fn insert_tier(conn: &Connection, tier: &CommissionTier) -> Result<()> {
    validation::validate_tier(tier)
        .map_err(|errors| anyhow!("Invalid tier {}: {}", tier.name, validation::describe(&errors)))?;

    conn.execute(
        "INSERT INTO commission_tiers (id, name, min_amount, max_amount, rate, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            tier.id,
            tier.name,
            tier.min_amount,
            tier.max_amount,
            tier.rate,
            tier.active,
        ],
    )?;

    Ok(())
}

/// Active tiers in resolution order (min_amount ascending)
pub fn get_active_tiers(conn: &Connection) -> Result<Vec<CommissionTier>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, min_amount, max_amount, rate, active
         FROM commission_tiers
         WHERE active = 1
         ORDER BY min_amount ASC",
    )?;

    let tiers = stmt
        .query_map([], |row| {
            Ok(CommissionTier {
                id: row.get(0)?,
                name: row.get(1)?,
                min_amount: row.get(2)?,
                max_amount: row.get(3)?,
                rate: row.get(4)?,
                active: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(tiers)
}

// ============================================================================
// SALES
// ============================================================================

/// Salesperson fields shown next to a sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalespersonSummary {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// A sale joined with the salesperson who closed it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaleRecord {
    #[serde(flatten)]
    pub sale: Sale,
    pub salesperson: SalespersonSummary,
}

/// Inclusive date range plus an optional salesperson
#[derive(Debug, Clone, PartialEq)]
pub struct SaleFilter {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub salesperson_id: Option<String>,
}

fn insert_sale_row(conn: &Connection, sale: &Sale, source_hash: Option<&str>) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO sales (id, source_hash, salesperson_id, amount, date, description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            sale.id,
            source_hash,
            sale.salesperson_id,
            sale.amount,
            date_to_sql(&sale.date),
            sale.description,
        ],
    )
}

/// Store a sale. Every call records a new sale, even if an identical one
/// already exists.
pub fn insert_sale(conn: &Connection, sale: &Sale) -> Result<()> {
    insert_sale_row(conn, sale, None)?;
    Ok(())
}

/// Store a sale read from an external source. Returns `false` when a sale
/// with the same `source_hash` was already stored.
pub fn insert_sale_from_source(conn: &Connection, sale: &Sale, source_hash: &str) -> Result<bool> {
    match insert_sale_row(conn, sale, Some(source_hash)) {
        Ok(_) => Ok(true),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation
                && err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn insert_sales(conn: &Connection, sales: &[Sale]) -> Result<usize> {
    for sale in sales {
        insert_sale(conn, sale)?;
    }

    tracing::info!(inserted = sales.len(), "stored sales");

    Ok(sales.len())
}

/// Sales inside the filter, newest first
pub fn get_sales(conn: &Connection, filter: &SaleFilter) -> Result<Vec<SaleRecord>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.salesperson_id, s.amount, s.date, s.description,
                p.first_name, p.last_name, p.email
         FROM sales s
         JOIN salespeople p ON p.id = s.salesperson_id
         WHERE s.date >= ?1 AND s.date <= ?2
           AND (?3 IS NULL OR s.salesperson_id = ?3)
         ORDER BY s.date DESC",
    )?;

    let records = stmt
        .query_map(
            params![
                date_to_sql(&filter.start),
                date_to_sql(&filter.end),
                filter.salesperson_id,
            ],
            |row| {
                let salesperson_id: String = row.get(1)?;
                let date_text: String = row.get(3)?;

                Ok(SaleRecord {
                    sale: Sale {
                        id: row.get(0)?,
                        salesperson_id: salesperson_id.clone(),
                        amount: row.get(2)?,
                        date: date_from_sql(3, &date_text)?,
                        description: row.get(4)?,
                    },
                    salesperson: SalespersonSummary {
                        id: salesperson_id,
                        first_name: row.get(5)?,
                        last_name: row.get(6)?,
                        email: row.get(7)?,
                    },
                })
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

/// Sum of every stored sale for one salesperson
pub fn total_sales_for(conn: &Connection, salesperson_id: &str) -> Result<f64> {
    let total: f64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0.0) FROM sales WHERE salesperson_id = ?1",
        [salesperson_id],
        |row| row.get(0),
    )?;

    Ok(total)
}

pub fn count_sales(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM sales", [], |row| row.get(0))?;

    Ok(count)
}

// ============================================================================
// CSV IMPORT
// ============================================================================

/// One line of a sales CSV export
#[derive(Debug, Clone, Deserialize)]
pub struct SaleCsvRow {
    pub salesperson_email: String,
    pub amount: f64,
    pub date: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Parsed CSV plus the digest of its raw bytes
#[derive(Debug, Clone)]
pub struct SalesCsv {
    pub digest: String,
    pub rows: Vec<SaleCsvRow>,
}

pub fn load_sales_csv(csv_path: &Path) -> Result<SalesCsv> {
    let bytes = std::fs::read(csv_path)
        .with_context(|| format!("Failed to open CSV file: {:?}", csv_path))?;

    let mut rdr = csv::Reader::from_reader(bytes.as_slice());

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: SaleCsvRow = result.context("Failed to deserialize sale")?;
        rows.push(row);
    }

    Ok(SalesCsv {
        digest: digest_bytes(&bytes),
        rows,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    pub read: usize,
    pub inserted: usize,
    pub duplicates: usize,
}

/// Validate CSV rows into sales and store them. Any invalid row aborts the
/// import before anything is written. Rows are deduplicated by file digest
/// plus line number, so importing the same file twice is a no-op while equal
/// rows inside one file are all kept.
pub fn import_sales_csv(conn: &Connection, csv_path: &Path) -> Result<ImportSummary> {
    let csv = load_sales_csv(csv_path)?;
    let mut sales = Vec::with_capacity(csv.rows.len());

    for (index, row) in csv.rows.iter().enumerate() {
        let line = index + 2; // header is line 1
        let person = find_salesperson_by_email(conn, &row.salesperson_email)?
            .ok_or_else(|| anyhow!("line {}: unknown salesperson {}", line, row.salesperson_email))?;
        let date = parse_date_bound(&row.date, false)
            .ok_or_else(|| anyhow!("line {}: invalid date {:?}", line, row.date))?;

        let sale = Sale::new(
            &person.id,
            row.amount,
            date,
            validation::clean_description(row.description.as_deref()),
        );
        validation::validate_sale(&sale)
            .map_err(|errors| anyhow!("line {}: {}", line, validation::describe(&errors)))?;
        sales.push((source_line_hash(&csv.digest, line), sale));
    }

    let mut summary = ImportSummary {
        read: csv.rows.len(),
        ..Default::default()
    };
    for (source_hash, sale) in &sales {
        if insert_sale_from_source(conn, sale, source_hash)? {
            summary.inserted += 1;
        } else {
            summary.duplicates += 1;
        }
    }

    tracing::info!(
        read = summary.read,
        inserted = summary.inserted,
        duplicates = summary.duplicates,
        "imported sales csv"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_active_tiers_sorted_by_min_amount() {
        let conn = setup();

        insert_tier(&conn, &CommissionTier::new("Alta", 801.0, 1000.0, 10.0)).unwrap();
        insert_tier(&conn, &CommissionTier::new("Básica", 0.0, 600.0, 6.0)).unwrap();
        let mut retired = CommissionTier::new("Retired", 0.0, 50.0, 1.0);
        retired.active = false;
        insert_tier(&conn, &retired).unwrap();
        insert_tier(&conn, &CommissionTier::new("Media", 601.0, 800.0, 8.0)).unwrap();

        let tiers = get_active_tiers(&conn).unwrap();
        let names: Vec<&str> = tiers.iter().map(|t| t.name.as_str()).collect();

        assert_eq!(names, vec!["Básica", "Media", "Alta"]);
    }

    #[test]
    fn test_salesperson_email_is_unique() {
        let conn = setup();

        insert_salesperson(&conn, &Salesperson::new("Juan", "Pérez", "juan@minicore.com")).unwrap();
        let err = insert_salesperson(&conn, &Salesperson::new("Otro", "Juan", "JUAN@minicore.com"))
            .unwrap_err();

        assert!(err.to_string().contains("already registered"));
    }

    #[test]
    fn test_active_salespeople_only() {
        let conn = setup();

        insert_salesperson(&conn, &Salesperson::new("Ana", "Martínez", "ana@minicore.com")).unwrap();
        let mut inactive = Salesperson::new("Carlos", "Rodríguez", "carlos@minicore.com");
        inactive.active = false;
        insert_salesperson(&conn, &inactive).unwrap();

        let people = get_active_salespeople(&conn).unwrap();
        assert_eq!(people.len(), 1);
        assert_eq!(people[0].first_name, "Ana");

        let found = find_salesperson_by_email(&conn, " Carlos@MiniCore.com ").unwrap();
        assert_eq!(found.map(|p| p.id), Some(inactive.id));
    }

    #[test]
    fn test_sales_filtered_and_ordered_newest_first() {
        let conn = setup();
        let juan = Salesperson::new("Juan", "Pérez", "juan@minicore.com");
        let maria = Salesperson::new("María", "González", "maria@minicore.com");
        insert_salesperson(&conn, &juan).unwrap();
        insert_salesperson(&conn, &maria).unwrap();

        let sales = vec![
            Sale::new(&juan.id, 500.0, at(1, 9), None),
            Sale::new(&maria.id, 750.0, at(5, 9), None),
            Sale::new(&juan.id, 900.0, at(10, 9), Some("Venta de equipos".to_string())),
            Sale::new(&juan.id, 100.0, at(20, 9), None),
        ];
        assert_eq!(insert_sales(&conn, &sales).unwrap(), 4);

        let all = get_sales(
            &conn,
            &SaleFilter { start: at(1, 0), end: at(10, 23), salesperson_id: None },
        )
        .unwrap();
        let amounts: Vec<f64> = all.iter().map(|r| r.sale.amount).collect();
        assert_eq!(amounts, vec![900.0, 750.0, 500.0]);
        assert_eq!(all[0].sale.description.as_deref(), Some("Venta de equipos"));
        assert_eq!(all[1].salesperson.email, "maria@minicore.com");

        let juan_only = get_sales(
            &conn,
            &SaleFilter {
                start: at(1, 0),
                end: at(31, 0),
                salesperson_id: Some(juan.id.clone()),
            },
        )
        .unwrap();
        assert_eq!(juan_only.len(), 3);
        assert!(juan_only.iter().all(|r| r.salesperson.id == juan.id));
    }

    #[test]
    fn test_identical_sales_are_all_stored() {
        let conn = setup();
        let juan = Salesperson::new("Juan", "Pérez", "juan@minicore.com");
        insert_salesperson(&conn, &juan).unwrap();

        insert_sale(&conn, &Sale::new(&juan.id, 500.0, at(1, 9), None)).unwrap();
        insert_sale(&conn, &Sale::new(&juan.id, 500.0, at(1, 9), None)).unwrap();

        assert_eq!(count_sales(&conn).unwrap(), 2);
    }

    #[test]
    fn test_source_hash_skips_repeat() {
        let conn = setup();
        let juan = Salesperson::new("Juan", "Pérez", "juan@minicore.com");
        insert_salesperson(&conn, &juan).unwrap();

        let first = Sale::new(&juan.id, 500.0, at(1, 9), None);
        let again = Sale::new(&juan.id, 500.0, at(1, 9), None);

        assert!(insert_sale_from_source(&conn, &first, "file-a:2").unwrap());
        assert!(!insert_sale_from_source(&conn, &again, "file-a:2").unwrap());
        assert!(insert_sale_from_source(&conn, &again, "file-a:3").unwrap());
        assert_eq!(count_sales(&conn).unwrap(), 2);
    }

    #[test]
    fn test_insert_tier_rejects_invalid() {
        let conn = setup();

        let err = insert_tier(&conn, &CommissionTier::new("Invertida", 800.0, 600.0, 8.0)).unwrap_err();
        assert!(err.to_string().contains("max_amount"));

        let err = insert_tier(&conn, &CommissionTier::new("Excesiva", 0.0, 600.0, 150.0)).unwrap_err();
        assert!(err.to_string().contains("rate"));

        assert!(get_active_tiers(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_sale_for_unknown_salesperson_fails() {
        let conn = setup();
        let orphan = Sale::new("missing", 500.0, at(1, 9), None);
        assert!(insert_sale(&conn, &orphan).is_err());
    }

    #[test]
    fn test_import_sales_csv_twice() {
        let conn = setup();
        insert_salesperson(&conn, &Salesperson::new("Juan", "Pérez", "juan@minicore.com")).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "salesperson_email,amount,date,description").unwrap();
        writeln!(file, "juan@minicore.com,500,2024-03-01,Venta de software").unwrap();
        writeln!(file, "JUAN@minicore.com,1200.5,2024-03-02T15:30:00Z,").unwrap();
        file.flush().unwrap();

        let first = import_sales_csv(&conn, file.path()).unwrap();
        assert_eq!(first, ImportSummary { read: 2, inserted: 2, duplicates: 0 });

        let second = import_sales_csv(&conn, file.path()).unwrap();
        assert_eq!(second, ImportSummary { read: 2, inserted: 0, duplicates: 2 });
        assert_eq!(count_sales(&conn).unwrap(), 2);
    }

    #[test]
    fn test_import_keeps_identical_rows() {
        let conn = setup();
        let juan = Salesperson::new("Juan", "Pérez", "juan@minicore.com");
        insert_salesperson(&conn, &juan).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "salesperson_email,amount,date,description").unwrap();
        writeln!(file, "juan@minicore.com,500,2024-03-01,Venta de licencias").unwrap();
        writeln!(file, "juan@minicore.com,500,2024-03-01,Venta de licencias").unwrap();
        file.flush().unwrap();

        let summary = import_sales_csv(&conn, file.path()).unwrap();
        assert_eq!(summary, ImportSummary { read: 2, inserted: 2, duplicates: 0 });

        let stored = get_sales(
            &conn,
            &SaleFilter { start: at(1, 0), end: at(1, 23), salesperson_id: None },
        )
        .unwrap();
        let total: f64 = stored.iter().map(|r| r.sale.amount).sum();
        assert_eq!(total, 1000.0);
    }

    #[test]
    fn test_import_rejects_unknown_salesperson() {
        let conn = setup();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "salesperson_email,amount,date,description").unwrap();
        writeln!(file, "nobody@minicore.com,500,2024-03-01,").unwrap();
        file.flush().unwrap();

        let err = import_sales_csv(&conn, file.path()).unwrap_err();
        assert!(err.to_string().contains("unknown salesperson"));
        assert_eq!(count_sales(&conn).unwrap(), 0);
    }
}
