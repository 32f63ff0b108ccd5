// Entity Models
//
// Every entity carries a stable UUID identity. Values are plain data:
// the resolver reads them, the data layer creates them.

pub mod salesperson;
pub mod sale;
pub mod tier;

pub use salesperson::Salesperson;
pub use sale::Sale;
pub use tier::CommissionTier;
