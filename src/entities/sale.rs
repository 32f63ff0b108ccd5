// 🧾 Sale - an immutable record of a closed sale

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    /// Stable identity (UUID)
    pub id: String,

    /// Identity of the salesperson who closed the sale
    pub salesperson_id: String,

    pub amount: f64,

    pub date: DateTime<Utc>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Sale {
    pub fn new(
        salesperson_id: &str,
        amount: f64,
        date: DateTime<Utc>,
        description: Option<String>,
    ) -> Self {
        Sale {
            id: uuid::Uuid::new_v4().to_string(),
            salesperson_id: salesperson_id.to_string(),
            amount,
            date,
            description,
        }
    }
}

/// SHA-256 of raw source bytes (e.g. an imported CSV file)
pub fn digest_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Dedup key for a sale read from line `line` of a source with digest
/// `file_digest`. Re-importing the same file yields the same keys; two equal
/// rows on different lines do not collide.
/// NOTE: this is for DEDUPLICATION, identity is `Sale::id`.
pub fn source_line_hash(file_digest: &str, line: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}|{}", file_digest, line));
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_source_line_hash_is_per_line() {
        let digest = digest_bytes(b"salesperson_email,amount,date,description\n");

        assert_eq!(source_line_hash(&digest, 2), source_line_hash(&digest, 2));
        assert_ne!(source_line_hash(&digest, 2), source_line_hash(&digest, 3));
        assert_eq!(source_line_hash(&digest, 2).len(), 64);
    }

    #[test]
    fn test_source_line_hash_depends_on_file() {
        let a = digest_bytes(b"juan@minicore.com,500,2024-03-01,\n");
        let b = digest_bytes(b"juan@minicore.com,501,2024-03-01,\n");

        assert_ne!(source_line_hash(&a, 2), source_line_hash(&b, 2));
    }

    #[test]
    fn test_sales_with_equal_values_keep_distinct_ids() {
        let date = Utc.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap();
        let a = Sale::new("seller-1", 750.0, date, Some("Venta de software".to_string()));
        let b = Sale::new("seller-1", 750.0, date, Some("Venta de software".to_string()));

        assert_ne!(a.id, b.id);
    }
}
