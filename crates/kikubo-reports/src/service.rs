use std::sync::Arc;

use chrono::NaiveDate;
use kikubo_store::PosStore;
use kikubo_types::{Invoice, Product, Store, SyncStatus};

use crate::dashboard::{dashboard, DashboardStats};
use crate::error::{ReportError, ReportResult};
use crate::products::{low_stock, product_sales, ProductSales, DEFAULT_PRODUCT_LIMIT};
use crate::range::DateRange;
use crate::sales::{sales_by_salesperson, SalespersonSales};

/// Runs reports for one store against the backing [`PosStore`].
///
/// Only `SYNCED` invoices are counted.
#[derive(Clone)]
pub struct ReportService {
    db: Arc<dyn PosStore>,
}

impl ReportService {
    pub fn new(db: Arc<dyn PosStore>) -> Self {
        Self { db }
    }

    fn synced_invoices(&self, store: &Store) -> ReportResult<Vec<Invoice>> {
        let mut invoices = self.db.list_invoices(store.id)?;
        invoices.retain(|i| i.sync_status == SyncStatus::Synced);
        Ok(invoices)
    }

    pub fn dashboard(&self, store: &Store, today: NaiveDate) -> ReportResult<DashboardStats> {
        let invoices = self.synced_invoices(store)?;
        let products = self.db.list_products(store.id)?;
        let stats = dashboard(&invoices, &products, today);
        tracing::debug!(store = %store.code, invoices = stats.invoice_count, "dashboard computed");
        Ok(stats)
    }

    pub fn sales(&self, store: &Store, range: DateRange) -> ReportResult<Vec<SalespersonSales>> {
        let invoices = self.synced_invoices(store)?;
        let users = self.db.list_users(store.id)?;
        Ok(sales_by_salesperson(&invoices, &users, range))
    }

    pub fn products(
        &self,
        store: &Store,
        range: DateRange,
        limit: usize,
    ) -> ReportResult<Vec<ProductSales>> {
        let invoices = self.synced_invoices(store)?;
        let catalog = self.db.list_products(store.id)?;
        Ok(product_sales(&invoices, &catalog, range, limit))
    }

    pub fn low_stock(&self, store: &Store) -> ReportResult<Vec<Product>> {
        Ok(low_stock(&self.db.list_products(store.id)?))
    }
}

/// `limit` query value; defaults to [`DEFAULT_PRODUCT_LIMIT`].
pub fn parse_limit(raw: Option<&str>) -> ReportResult<usize> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(DEFAULT_PRODUCT_LIMIT),
        Some(s) => s
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ReportError::invalid("limit", "A valid positive integer is required.")),
    }
}
