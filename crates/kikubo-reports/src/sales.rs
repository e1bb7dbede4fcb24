use std::collections::HashMap;

use kikubo_types::{Invoice, Money, User, UserId};
use serde::{Deserialize, Serialize};

use crate::range::DateRange;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalespersonSales {
    pub salesperson_id: UserId,
    pub salesperson_name: String,
    pub total_sales: Money,
    pub invoice_count: usize,
    pub average_sale: Money,
}

/// Sales per salesperson inside `range`, best seller first.
pub fn sales_by_salesperson(invoices: &[Invoice], users: &[User], range: DateRange) -> Vec<SalespersonSales> {
    let mut totals: HashMap<UserId, (Money, usize)> = HashMap::new();
    for invoice in invoices.iter().filter(|i| range.contains(i.created_at)) {
        let entry = totals.entry(invoice.salesperson).or_insert((Money::ZERO, 0));
        entry.0 += invoice.total;
        entry.1 += 1;
    }

    let mut rows: Vec<SalespersonSales> = totals
        .into_iter()
        .map(|(id, (total, count))| SalespersonSales {
            salesperson_id: id,
            salesperson_name: users
                .iter()
                .find(|u| u.id == id)
                .map_or_else(String::new, |u| u.name.clone()),
            total_sales: total,
            invoice_count: count,
            average_sale: i64::try_from(count)
                .ok()
                .and_then(|n| total.div_round(n))
                .unwrap_or(Money::ZERO),
        })
        .collect();
    rows.sort_by(|a, b| {
        b.total_sales
            .cmp(&a.total_sales)
            .then_with(|| a.salesperson_name.cmp(&b.salesperson_name))
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{invoice, sold_at};
    use chrono::NaiveDate;
    use kikubo_types::StoreId;

    #[test]
    fn groups_and_orders_by_total() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let store = StoreId::new();
        let ann = User::new("ann", "Ann", "ann@example.com", Some(store), None);
        let bob = User::new("bob", "Bob", "bob@example.com", Some(store), None);
        let invoices = vec![
            invoice(store, ann.id, sold_at(today, 1), &[("Soap", 1, 100)]),
            invoice(store, ann.id, sold_at(today, 2), &[("Soap", 1, 200)]),
            invoice(store, bob.id, sold_at(today, 1), &[("Soap", 1, 1000)]),
            invoice(store, bob.id, sold_at(today, 90), &[("Soap", 1, 99900)]),
        ];
        let rows = sales_by_salesperson(&invoices, &[ann.clone(), bob.clone()], DateRange::trailing(today, 30));

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].salesperson_name, "Bob");
        assert_eq!(rows[0].total_sales, Money::from_cents(1000));
        assert_eq!(rows[1].salesperson_id, ann.id);
        assert_eq!(rows[1].invoice_count, 2);
        assert_eq!(rows[1].average_sale, Money::from_cents(150));
    }
}
