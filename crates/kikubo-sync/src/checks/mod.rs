//! Built-in checks, in the order the engine runs them.

pub mod amounts;
pub mod details;
pub mod items;
pub mod number;
pub mod salesperson;
pub mod stock;

pub use amounts::AmountsCheck;
pub use details::DetailsCheck;
pub use items::ItemsCheck;
pub use number::InvoiceNumberCheck;
pub use salesperson::SalespersonCheck;
pub use stock::StockCheck;

pub(crate) const REQUIRED: &str = "This field is required.";
