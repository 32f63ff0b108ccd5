// 🧑‍💼 Salesperson - the person commissions are paid to

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Salesperson {
    /// Stable identity (UUID)
    pub id: String,
    pub first_name: String,
    pub last_name: String,

    /// Unique, stored trimmed and lowercased
    pub email: String,

    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Salesperson {
    pub fn new(first_name: &str, last_name: &str, email: &str) -> Self {
        Salesperson {
            id: uuid::Uuid::new_v4().to_string(),
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            email: normalize_email(email),
            active: true,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes_fields() {
        let person = Salesperson::new("  Juan ", "Pérez", " Juan.Perez@MiniCore.com ");

        assert!(!person.id.is_empty());
        assert_eq!(person.first_name, "Juan");
        assert_eq!(person.email, "juan.perez@minicore.com");
        assert!(person.active);
    }

    #[test]
    fn test_full_name() {
        let person = Salesperson::new("María", "González", "maria@minicore.com");
        assert_eq!(person.full_name(), "María González");
    }
}
