// 🌱 Seed data - default tiers, salespeople and random sales

use crate::db::{clear_all, insert_sales, insert_salesperson, insert_tier, total_sales_for};
use crate::entities::{CommissionTier, Sale, Salesperson};
use anyhow::Result;
use chrono::{DateTime, Duration, Months, Utc};
use rand::Rng;
use rusqlite::Connection;
use serde::Serialize;

pub const DEFAULT_SALE_COUNT: usize = 50;

const DESCRIPTIONS: [&str; 6] = [
    "Venta de productos electrónicos",
    "Venta de software",
    "Venta de servicios de consultoría",
    "Venta de licencias",
    "Venta de equipos",
    "Venta de accesorios",
];

/// The four standard tiers, in resolution order
pub fn default_tiers() -> Vec<CommissionTier> {
    vec![
        CommissionTier::new("Comisión Básica", 0.0, 600.0, 6.0),
        CommissionTier::new("Comisión Media", 601.0, 800.0, 8.0),
        CommissionTier::new("Comisión Alta", 801.0, 1000.0, 10.0),
        CommissionTier::new("Comisión Premium", 1001.0, 999999.0, 15.0),
    ]
}

pub fn default_salespeople() -> Vec<Salesperson> {
    vec![
        Salesperson::new("Juan", "Pérez", "juan.perez@minicore.com"),
        Salesperson::new("María", "González", "maria.gonzalez@minicore.com"),
        Salesperson::new("Carlos", "Rodríguez", "carlos.rodriguez@minicore.com"),
        Salesperson::new("Ana", "Martínez", "ana.martinez@minicore.com"),
    ]
}

/// `count` sales spread over the three months before `now`, with whole
/// amounts in [100, 2100).
pub fn generate_sales<R: Rng>(
    rng: &mut R,
    salesperson_ids: &[String],
    now: DateTime<Utc>,
    count: usize,
) -> Vec<Sale> {
    if salesperson_ids.is_empty() {
        return Vec::new();
    }

    let window_start = now.checked_sub_months(Months::new(3)).unwrap_or(now);
    let window_secs = (now - window_start).num_seconds().max(1);

    (0..count)
        .map(|_| {
            let seller = &salesperson_ids[rng.random_range(0..salesperson_ids.len())];
            let amount = rng.random_range(100..2100_u32) as f64;
            let date = window_start + Duration::seconds(rng.random_range(0..window_secs));
            let description = DESCRIPTIONS[rng.random_range(0..DESCRIPTIONS.len())];

            Sale::new(seller, amount, date, Some(description.to_string()))
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct SellerTotal {
    pub name: String,
    pub email: String,
    pub total_sales: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeedSummary {
    pub tiers: Vec<CommissionTier>,
    pub sales_inserted: usize,
    pub totals: Vec<SellerTotal>,
}

/// Wipe the database and load the demo data set
pub fn seed_database<R: Rng>(conn: &Connection, rng: &mut R) -> Result<SeedSummary> {
    clear_all(conn)?;
    tracing::info!("cleared existing data");

    let tiers = default_tiers();
    for tier in &tiers {
        insert_tier(conn, tier)?;
    }

    let salespeople = default_salespeople();
    for person in &salespeople {
        insert_salesperson(conn, person)?;
    }

    let ids: Vec<String> = salespeople.iter().map(|p| p.id.clone()).collect();
    let sales = generate_sales(rng, &ids, Utc::now(), DEFAULT_SALE_COUNT);
    let sales_inserted = insert_sales(conn, &sales)?;

    let totals = salespeople
        .iter()
        .map(|person| {
            Ok(SellerTotal {
                name: person.full_name(),
                email: person.email.clone(),
                total_sales: total_sales_for(conn, &person.id)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::info!(
        tiers = tiers.len(),
        salespeople = salespeople.len(),
        sales = sales_inserted,
        "seed complete"
    );

    Ok(SeedSummary {
        tiers,
        sales_inserted,
        totals,
    })
}
