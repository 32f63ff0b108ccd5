// MiniCore Commissions - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod commission;
pub mod config;
pub mod db;
pub mod entities;
pub mod logging;
pub mod report;
pub mod seed;
pub mod validation;

// Re-export commonly used types
pub use commission::{
    aggregate_commissions, resolve_tier_for_amount,
    CommissionAggregate, CommissionError, CommissionResult, TierMatch,
};
pub use config::{AppConfig, LogFormat};
pub use db::{
    SaleFilter, SaleRecord, SalespersonSummary, SalesCsv, ImportSummary,
    open_database, setup_database, insert_salesperson, get_active_salespeople, get_salesperson,
    find_salesperson_by_email, insert_tier, get_active_tiers,
    insert_sale, insert_sale_from_source, insert_sales, get_sales, total_sales_for, count_sales,
    load_sales_csv, import_sales_csv,
};
pub use entities::{CommissionTier, Sale, Salesperson};
pub use report::{calculate_commissions, CommissionQuery, CommissionReport, ReportError};
pub use seed::{seed_database, SeedSummary};
pub use validation::{ValidationError, ValidationResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
