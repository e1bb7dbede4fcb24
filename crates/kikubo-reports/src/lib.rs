//! Sales analytics for Kikubo stores.
//!
//! The report functions are pure over slices of invoices and products, so
//! they can be tested without a database. [`ReportService`] loads the data
//! for one store and only passes on `SYNCED` invoices.

pub mod dashboard;
pub mod error;
pub mod products;
pub mod range;
pub mod sales;
pub mod service;

#[cfg(test)]
mod testutil;

pub use dashboard::{dashboard, DashboardStats};
pub use error::{ReportError, ReportResult};
pub use products::{low_stock, product_sales, ProductSales, DEFAULT_PRODUCT_LIMIT};
pub use range::{DateRange, DEFAULT_SPAN_DAYS};
pub use sales::{sales_by_salesperson, SalespersonSales};
pub use service::{parse_limit, ReportService};
