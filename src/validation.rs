// 📐 Validation boundary
// Entities are checked here before they reach the database. The commission
// resolver trusts its input and never validates.

use crate::entities::{CommissionTier, Sale, Salesperson};

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub context: String,
}

impl ValidationError {
    fn new(context: &str, field: &str, message: impl Into<String>) -> Self {
        ValidationError {
            field: field.to_string(),
            message: message.into(),
            context: context.to_string(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.context, self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Render a list of errors as one line, e.g. for an API response
pub fn describe(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

fn finish(errors: Vec<ValidationError>) -> ValidationResult {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn validate_tier(tier: &CommissionTier) -> ValidationResult {
    let mut errors = Vec::new();
    let ctx = "CommissionTier";

    if tier.name.trim().is_empty() {
        errors.push(ValidationError::new(ctx, "name", "Required field is empty"));
    }

    if !tier.min_amount.is_finite() || tier.min_amount < 0.0 {
        errors.push(ValidationError::new(
            ctx,
            "min_amount",
            format!("Must be a non-negative number, got {}", tier.min_amount),
        ));
    }

    if !tier.max_amount.is_finite() || tier.max_amount < tier.min_amount {
        errors.push(ValidationError::new(
            ctx,
            "max_amount",
            format!(
                "Must be >= min_amount ({}), got {}",
                tier.min_amount, tier.max_amount
            ),
        ));
    }

    if !(0.0..=100.0).contains(&tier.rate) {
        errors.push(ValidationError::new(
            ctx,
            "rate",
            format!("Must be between 0 and 100, got {}", tier.rate),
        ));
    }

    finish(errors)
}

pub fn validate_sale(sale: &Sale) -> ValidationResult {
    let mut errors = Vec::new();
    let ctx = "Sale";

    if !sale.amount.is_finite() || sale.amount < 0.0 {
        errors.push(ValidationError::new(
            ctx,
            "amount",
            format!("Must be a non-negative number, got {}", sale.amount),
        ));
    }

    if sale.salesperson_id.trim().is_empty() {
        errors.push(ValidationError::new(ctx, "salesperson_id", "Required field is empty"));
    }

    finish(errors)
}

pub fn validate_salesperson(person: &Salesperson) -> ValidationResult {
    let mut errors = Vec::new();
    let ctx = "Salesperson";

    if person.first_name.trim().is_empty() {
        errors.push(ValidationError::new(ctx, "first_name", "Required field is empty"));
    }

    if person.last_name.trim().is_empty() {
        errors.push(ValidationError::new(ctx, "last_name", "Required field is empty"));
    }

    let email = person.email.trim();
    if email.is_empty() {
        errors.push(ValidationError::new(ctx, "email", "Required field is empty"));
    } else if !email.contains('@') {
        errors.push(ValidationError::new(
            ctx,
            "email",
            format!("Not a valid email address: {}", email),
        ));
    }

    finish(errors)
}

/// Trim a free-text description; blank text becomes `None`
pub fn clean_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_valid_tier_passes() {
        let tier = CommissionTier::new("Comisión Básica", 0.0, 600.0, 6.0);
        assert!(validate_tier(&tier).is_ok());
    }

    #[test]
    fn test_tier_with_inverted_range_and_bad_rate() {
        let tier = CommissionTier::new("", 500.0, 100.0, 120.0);

        let errors = validate_tier(&tier).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();

        assert_eq!(fields, vec!["name", "max_amount", "rate"]);
    }

    #[test]
    fn test_tier_negative_min_rejected() {
        let tier = CommissionTier::new("Neg", -1.0, 10.0, 5.0);
        let errors = validate_tier(&tier).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "min_amount");
    }

    #[test]
    fn test_negative_sale_rejected() {
        let sale = Sale::new("seller", -10.0, Utc::now(), None);
        let errors = validate_sale(&sale).unwrap_err();
        assert_eq!(errors[0].field, "amount");
        assert_eq!(errors[0].to_string(), "[Sale] amount: Must be a non-negative number, got -10");
    }

    #[test]
    fn test_sale_without_salesperson_rejected() {
        let sale = Sale::new("  ", 10.0, Utc::now(), None);
        let errors = validate_sale(&sale).unwrap_err();
        assert_eq!(errors[0].field, "salesperson_id");
    }

    #[test]
    fn test_salesperson_email_checked() {
        let person = Salesperson::new("Ana", "Martínez", "not-an-email");
        let errors = validate_salesperson(&person).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "email");

        let person = Salesperson::new("", "", "");
        let errors = validate_salesperson(&person).unwrap_err();
        assert_eq!(describe(&errors), "first_name: Required field is empty; last_name: Required field is empty; email: Required field is empty");
    }

    #[test]
    fn test_clean_description() {
        assert_eq!(clean_description(Some("  Venta de software ")), Some("Venta de software".to_string()));
        assert_eq!(clean_description(Some("   ")), None);
        assert_eq!(clean_description(None), None);
    }
}
