//! Online invoices and the offline bulk-sync entry point.

use axum::extract::rejection::JsonRejection;
use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use kikubo_auth::account::is_valid_email;
use kikubo_auth::Action;
use kikubo_store::PosStore;
use kikubo_sync::checks::details::parse_client_time;
use kikubo_sync::SyncReport;
use kikubo_types::{
    FieldErrors, Invoice, InvoiceId, InvoiceTotals, Money, NewInvoice, NewInvoiceItem, ProductId,
    Store, SyncStatus, UserId, MAX_QUANTITY,
};
use serde_json::Value;

use super::{apply_ordering, param, path_id, text, user_names, Params, REQUIRED};
use crate::auth::Auth;
use crate::error::{ServerError, ServerResult};
use crate::pagination::{paginate, Page};
use crate::payload::{InvoiceInput, InvoiceSummary, InvoiceView};
use crate::state::SharedState;

const NUMBER_MAX: usize = 100;
const CUSTOMER_NAME_MAX: usize = 200;
const CUSTOMER_PHONE_MAX: usize = 20;
const CUSTOMER_EMAIL_MAX: usize = 254;

/// Lower bound of a `start_date` filter. Dates start at midnight UTC.
fn lower_bound(raw: &str) -> Option<DateTime<Utc>> {
    parse_client_time(raw).or_else(|| {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    })
}

/// Upper bound of an `end_date` filter. A bare date covers the whole day.
fn upper_bound(raw: &str) -> Option<DateTime<Utc>> {
    parse_client_time(raw).or_else(|| {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_milli_opt(23, 59, 59, 999))
            .map(|dt| dt.and_utc())
    })
}

fn parse_sync_status(raw: &str) -> Option<SyncStatus> {
    [SyncStatus::Pending, SyncStatus::Synced, SyncStatus::Failed]
        .into_iter()
        .find(|s| s.as_str().eq_ignore_ascii_case(raw))
}

/// Invoices visible to the caller: the whole store for owners and
/// managers, only their own for salespeople.
pub async fn list_invoices(
    State(state): State<SharedState>,
    auth: Auth,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<Params>,
) -> ServerResult<Json<Page<InvoiceSummary>>> {
    auth.require(&state, Action::CreateInvoice).await?;
    let store = auth.store()?;
    let me = auth.0.id();
    let sees_all = auth.0.sees_all_sales();
    let status = param(&params, "sync_status").and_then(parse_sync_status);
    let from = param(&params, "start_date").and_then(lower_bound);
    let until = param(&params, "end_date").and_then(upper_bound);

    let mut invoices: Vec<Invoice> = state
        .db
        .list_invoices(store.id)?
        .into_iter()
        .filter(|i| sees_all || i.salesperson == me)
        .filter(|i| status.map_or(true, |s| i.sync_status == s))
        .filter(|i| from.map_or(true, |at| i.created_at >= at))
        .filter(|i| until.map_or(true, |at| i.created_at <= at))
        .collect();
    apply_ordering(
        &mut invoices,
        param(&params, "ordering"),
        &["created_at", "total"],
        "-created_at",
        |field, a, b| match field {
            "total" => a.total.cmp(&b.total),
            _ => a.created_at.cmp(&b.created_at),
        },
    );

    let names = user_names(state.db.as_ref(), store.id)?;
    let rows = invoices
        .iter()
        .map(|i| InvoiceSummary::new(i, names.get(&i.salesperson).cloned().unwrap_or_default()))
        .collect();
    Ok(Json(paginate(rows, param(&params, "page"), state.config.page_size, &uri)?))
}

/// Turn an online invoice request into a committable record. Totals are
/// always computed here from the catalog and the store tax rate.
fn build_invoice(
    db: &dyn PosStore,
    store: &Store,
    salesperson: UserId,
    input: InvoiceInput,
    now: DateTime<Utc>,
) -> ServerResult<NewInvoice> {
    let mut errors = FieldErrors::new();
    let number = text(&mut errors, "invoice_number", input.invoice_number, NUMBER_MAX)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("INV-{}", now.timestamp()));
    let customer_name = text(&mut errors, "customer_name", input.customer_name, CUSTOMER_NAME_MAX);
    let customer_phone = text(&mut errors, "customer_phone", input.customer_phone, CUSTOMER_PHONE_MAX);
    let customer_email = text(&mut errors, "customer_email", input.customer_email, CUSTOMER_EMAIL_MAX);
    if let Some(email) = customer_email.as_deref().filter(|e| !e.is_empty()) {
        if !is_valid_email(email) {
            errors.add("customer_email", "Enter a valid email address.");
        }
    }
    let discount = input.discount.unwrap_or(Money::ZERO);
    if discount.is_negative() {
        errors.add("discount", "Ensure this value is greater than or equal to 0.");
    }

    if input.items.is_empty() {
        errors.add("items", "At least one item is required.");
    }
    let mut items = Vec::with_capacity(input.items.len());
    for (n, item) in input.items.into_iter().enumerate() {
        let label = format!("Item {}", n + 1);
        let Some(raw) = item.product.as_deref().map(str::trim).filter(|p| !p.is_empty()) else {
            errors.add("items", format!("{label}: product: {REQUIRED}"));
            continue;
        };
        let product = match raw.parse::<ProductId>() {
            Ok(id) => db.get_product(id)?.filter(|p| p.is_sellable_in(store.id)),
            Err(_) => None,
        };
        let Some(product) = product else {
            errors.add("items", format!("{label}: Invalid pk \"{raw}\" - object does not exist."));
            continue;
        };
        let quantity = match item.quantity {
            Some(q) if q > MAX_QUANTITY => {
                errors.add("items", format!("{label}: quantity must be at most {MAX_QUANTITY}."));
                continue;
            }
            Some(q) if q >= 1 => q,
            Some(_) => {
                errors.add("items", format!("{label}: quantity must be at least 1."));
                continue;
            }
            None => {
                errors.add("items", format!("{label}: quantity: {REQUIRED}"));
                continue;
            }
        };
        let price = item.price.unwrap_or(product.price);
        if !price.is_positive() {
            errors.add("items", format!("{label}: price must be at least 0.01."));
            continue;
        }
        if !price.fits_digits(Money::PRICE_DIGITS) {
            errors.add(
                "items",
                format!("{label}: price has more than {} digits.", Money::PRICE_DIGITS),
            );
            continue;
        }
        let total = match price.times(quantity) {
            Ok(total) if total.fits_digits(Money::AMOUNT_DIGITS) => total,
            _ => {
                errors.add("items", format!("{label}: line total is out of range."));
                continue;
            }
        };
        items.push(NewInvoiceItem {
            product: product.id,
            product_name: product.name,
            product_code: product.code,
            quantity,
            price,
            total,
        });
    }

    let totals = InvoiceTotals::compute(items.iter().map(|i| i.total), discount, store.tax_rate);
    if !discount.fits_digits(Money::AMOUNT_DIGITS) {
        errors.add(
            "discount",
            format!("Ensure that there are no more than {} digits in total.", Money::AMOUNT_DIGITS),
        );
    }
    if errors.is_empty() && totals.total.is_negative() {
        errors.add("discount", "Discount cannot exceed the invoice total.");
    }
    if errors.is_empty()
        && [totals.subtotal, totals.tax, totals.total]
            .iter()
            .any(|m| !m.fits_digits(Money::AMOUNT_DIGITS))
    {
        errors.add("items", "Invoice total is out of range.");
    }
    if !errors.is_empty() {
        return Err(errors.into());
    }

    let sync_status = input.sync_status.unwrap_or(SyncStatus::Synced);
    Ok(NewInvoice {
        store: store.id,
        invoice_number: number,
        salesperson,
        items,
        totals,
        customer_name: customer_name.unwrap_or_default(),
        customer_phone: customer_phone.unwrap_or_default(),
        customer_email: customer_email.unwrap_or_default(),
        notes: input.notes.unwrap_or_default(),
        sync_status,
        synced_at: (sync_status == SyncStatus::Synced).then_some(now),
        local_id: None,
        created_at: now,
    })
}

fn invoice_view(state: &SharedState, invoice: &Invoice, store: &Store) -> ServerResult<InvoiceView> {
    let salesperson = state
        .db
        .get_user(invoice.salesperson)?
        .map(|u| u.name)
        .unwrap_or_default();
    Ok(InvoiceView::new(invoice, salesperson, store.name.clone()))
}

/// Record a sale made while online. Stock is decremented in the same
/// transaction.
pub async fn create_invoice(
    State(state): State<SharedState>,
    auth: Auth,
    body: Result<Json<InvoiceInput>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<InvoiceView>)> {
    auth.require(&state, Action::CreateInvoice).await?;
    let store = auth.store()?;
    let Json(input) = body?;
    let draft = build_invoice(state.db.as_ref(), store, auth.0.id(), input, Utc::now())?;
    let invoice = state.db.commit_invoice(draft)?;
    tracing::info!(
        invoice = %invoice.id,
        number = %invoice.invoice_number,
        total = %invoice.total,
        "invoice created"
    );
    Ok((StatusCode::CREATED, Json(invoice_view(&state, &invoice, store)?)))
}

pub async fn get_invoice(
    State(state): State<SharedState>,
    auth: Auth,
    Path(id): Path<String>,
) -> ServerResult<Json<InvoiceView>> {
    let store = auth.store()?;
    let id: InvoiceId = path_id(&id)?;
    let invoice = state
        .db
        .get_invoice(id)?
        .filter(|i| i.store == store.id)
        .ok_or_else(ServerError::not_found)?;
    auth.require(
        &state,
        Action::ViewInvoice {
            store: invoice.store,
            salesperson: invoice.salesperson,
        },
    )
    .await?;
    Ok(Json(invoice_view(&state, &invoice, store)?))
}

/// Reconcile a batch of invoices recorded offline.
///
/// The batch runs on the blocking pool: every record hits the store
/// synchronously.
pub async fn bulk_sync(
    State(state): State<SharedState>,
    auth: Auth,
    body: Result<Json<Value>, JsonRejection>,
) -> ServerResult<Json<SyncReport>> {
    auth.require(&state, Action::CreateInvoice).await?;
    let Json(body) = body?;
    let Auth(principal) = auth;
    let report = tokio::task::spawn_blocking(move || state.sync.reconcile(&principal, &body))
        .await
        .map_err(|e| ServerError::Internal(format!("bulk sync task failed: {e}")))??;
    Ok(Json(report))
}
