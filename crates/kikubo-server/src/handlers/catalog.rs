//! Categories and products of the caller's store.

use std::collections::HashMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use kikubo_auth::Action;
use kikubo_store::PosStore;
use kikubo_types::{Category, CategoryId, FieldErrors, Money, Product, ProductId, StoreId};

use super::{apply_ordering, matches_search, param, path_id, required_text, text, Params, REQUIRED};
use crate::auth::Auth;
use crate::error::{ServerError, ServerResult};
use crate::pagination::{paginate, Page};
use crate::payload::{CategoryInput, CategoryView, ProductInput, ProductSummary, ProductView};
use crate::state::SharedState;

const CATEGORY_NAME_MAX: usize = 100;
const PRODUCT_NAME_MAX: usize = 200;
const PRODUCT_CODE_MAX: usize = 50;
const BARCODE_MAX: usize = 100;
const IMAGE_URL_MAX: usize = 500;

/// Active products per category.
fn product_counts(products: &[Product]) -> HashMap<CategoryId, usize> {
    let mut counts = HashMap::new();
    for category in products.iter().filter(|p| p.is_active).filter_map(|p| p.category) {
        *counts.entry(category).or_insert(0) += 1;
    }
    counts
}

/// Resolve a category reference from a request body. It must exist in `store`.
fn category_ref(
    db: &dyn PosStore,
    store: StoreId,
    raw: &str,
    message: &str,
) -> ServerResult<Result<CategoryId, String>> {
    let Ok(id) = raw.parse::<CategoryId>() else {
        return Ok(Err(format!("\"{raw}\" is not a valid UUID.")));
    };
    Ok(match db.get_category(id)? {
        Some(c) if c.store == store => Ok(id),
        Some(_) => Err(message.to_string()),
        None => Err(format!("Invalid pk \"{raw}\" - object does not exist.")),
    })
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

fn load_category(state: &SharedState, store: StoreId, raw: &str) -> ServerResult<Category> {
    let id: CategoryId = path_id(raw)?;
    state
        .db
        .get_category(id)?
        .filter(|c| c.store == store)
        .ok_or_else(ServerError::not_found)
}

fn apply_category_input(
    db: &dyn PosStore,
    category: &mut Category,
    input: CategoryInput,
    partial: bool,
) -> ServerResult<()> {
    let mut errors = FieldErrors::new();
    let name = required_text(&mut errors, "name", input.name, CATEGORY_NAME_MAX, partial);
    let mut parent = category.parent;
    match input.parent {
        Some(Some(raw)) => {
            match category_ref(db, category.store, raw.trim(), "Parent must belong to your store")? {
                Ok(id) if id == category.id => errors.add("parent", "A category cannot be its own parent."),
                Ok(id) => parent = Some(id),
                Err(message) => errors.add("parent", message),
            }
        }
        Some(None) => parent = None,
        None => {}
    }
    if !errors.is_empty() {
        return Err(errors.into());
    }

    if let Some(name) = name {
        category.name = name;
    }
    if let Some(description) = input.description {
        category.description = description.trim().to_string();
    }
    if let Some(active) = input.is_active {
        category.is_active = active;
    }
    category.parent = parent;
    category.updated_at = Utc::now();
    Ok(())
}

/// Active categories, searchable and ordered.
pub async fn list_categories(
    State(state): State<SharedState>,
    auth: Auth,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<Params>,
) -> ServerResult<Json<Page<CategoryView>>> {
    let store = auth.store()?;
    let counts = product_counts(&state.db.list_products(store.id)?);
    let search = param(&params, "search");
    let mut categories: Vec<Category> = state
        .db
        .list_categories(store.id)?
        .into_iter()
        .filter(|c| c.is_active)
        .filter(|c| matches_search(search, &[c.name.as_str(), c.description.as_str()]))
        .collect();
    apply_ordering(
        &mut categories,
        param(&params, "ordering"),
        &["name", "created_at"],
        "name",
        |field, a, b| match field {
            "created_at" => a.created_at.cmp(&b.created_at),
            _ => a.name.cmp(&b.name),
        },
    );
    let views = categories
        .iter()
        .map(|c| CategoryView::new(c, counts.get(&c.id).copied().unwrap_or(0)))
        .collect();
    Ok(Json(paginate(views, param(&params, "page"), state.config.page_size, &uri)?))
}

fn category_view(state: &SharedState, category: &Category) -> ServerResult<CategoryView> {
    let counts = product_counts(&state.db.list_products(category.store)?);
    Ok(CategoryView::new(category, counts.get(&category.id).copied().unwrap_or(0)))
}

pub async fn create_category(
    State(state): State<SharedState>,
    auth: Auth,
    body: Result<Json<CategoryInput>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<CategoryView>)> {
    auth.require(&state, Action::ManageProducts).await?;
    let store = auth.store()?;
    let Json(input) = body?;
    let mut category = Category::new(store.id, "");
    apply_category_input(state.db.as_ref(), &mut category, input, false)?;
    state.db.create_category(&category)?;
    tracing::info!(category = %category.id, name = %category.name, "category created");
    Ok((StatusCode::CREATED, Json(category_view(&state, &category)?)))
}

pub async fn get_category(
    State(state): State<SharedState>,
    auth: Auth,
    Path(id): Path<String>,
) -> ServerResult<Json<CategoryView>> {
    let category = load_category(&state, auth.store()?.id, &id)?;
    Ok(Json(category_view(&state, &category)?))
}

async fn update_category(
    state: SharedState,
    auth: Auth,
    id: String,
    body: Result<Json<CategoryInput>, JsonRejection>,
    partial: bool,
) -> ServerResult<Json<CategoryView>> {
    auth.require(&state, Action::ManageProducts).await?;
    let mut category = load_category(&state, auth.store()?.id, &id)?;
    let Json(input) = body?;
    apply_category_input(state.db.as_ref(), &mut category, input, partial)?;
    state.db.update_category(&category)?;
    Ok(Json(category_view(&state, &category)?))
}

pub async fn put_category(
    State(state): State<SharedState>,
    auth: Auth,
    Path(id): Path<String>,
    body: Result<Json<CategoryInput>, JsonRejection>,
) -> ServerResult<Json<CategoryView>> {
    update_category(state, auth, id, body, false).await
}

pub async fn patch_category(
    State(state): State<SharedState>,
    auth: Auth,
    Path(id): Path<String>,
    body: Result<Json<CategoryInput>, JsonRejection>,
) -> ServerResult<Json<CategoryView>> {
    update_category(state, auth, id, body, true).await
}

/// Soft delete: the category is deactivated, never removed.
pub async fn delete_category(
    State(state): State<SharedState>,
    auth: Auth,
    Path(id): Path<String>,
) -> ServerResult<StatusCode> {
    auth.require(&state, Action::ManageProducts).await?;
    let mut category = load_category(&state, auth.store()?.id, &id)?;
    category.is_active = false;
    category.updated_at = Utc::now();
    state.db.update_category(&category)?;
    tracing::info!(category = %category.id, "category deactivated");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

fn load_product(state: &SharedState, store: StoreId, raw: &str) -> ServerResult<Product> {
    let id: ProductId = path_id(raw)?;
    state
        .db
        .get_product(id)?
        .filter(|p| p.store == store)
        .ok_or_else(ServerError::not_found)
}

fn non_negative(errors: &mut FieldErrors, field: &str, value: i64) {
    if value < 0 {
        errors.add(field, "Ensure this value is greater than or equal to 0.");
    }
}

fn apply_product_input(
    db: &dyn PosStore,
    product: &mut Product,
    input: ProductInput,
    partial: bool,
) -> ServerResult<()> {
    let mut errors = FieldErrors::new();
    let name = required_text(&mut errors, "name", input.name, PRODUCT_NAME_MAX, partial);
    let code = required_text(&mut errors, "code", input.code, PRODUCT_CODE_MAX, partial);
    let barcode = input
        .barcode
        .map(|b| text(&mut errors, "barcode", b, BARCODE_MAX).filter(|b| !b.is_empty()));
    let image_url = input
        .image_url
        .map(|u| text(&mut errors, "image_url", u, IMAGE_URL_MAX).filter(|u| !u.is_empty()));

    match input.price {
        Some(price) if !price.is_positive() => errors.add("price", "Price must be greater than 0"),
        None if !partial => errors.add("price", REQUIRED),
        _ => {}
    }
    if input.cost.is_some_and(|c| c.is_negative()) {
        errors.add("cost", "Ensure this value is greater than or equal to 0.");
    }
    if let Some(stock) = input.stock {
        non_negative(&mut errors, "stock", stock);
    }
    if let Some(threshold) = input.low_stock_threshold {
        non_negative(&mut errors, "low_stock_threshold", threshold);
    }

    let mut category = product.category;
    match input.category {
        Some(Some(raw)) => {
            match category_ref(db, product.store, raw.trim(), "Category must belong to your store")? {
                Ok(id) => category = Some(id),
                Err(message) => errors.add("category", message),
            }
        }
        Some(None) => category = None,
        None => {}
    }
    if !errors.is_empty() {
        return Err(errors.into());
    }

    if let Some(name) = name {
        product.name = name;
    }
    if let Some(code) = code {
        product.code = code;
    }
    if let Some(description) = input.description {
        product.description = description.trim().to_string();
    }
    if let Some(price) = input.price {
        product.price = price;
    }
    if let Some(cost) = input.cost {
        product.cost = cost;
    }
    if let Some(stock) = input.stock {
        product.stock = stock;
    }
    if let Some(threshold) = input.low_stock_threshold {
        product.low_stock_threshold = threshold;
    }
    if let Some(barcode) = barcode {
        product.barcode = barcode;
    }
    if let Some(image_url) = image_url {
        product.image_url = image_url;
    }
    if let Some(active) = input.is_active {
        product.is_active = active;
    }
    product.category = category;
    product.updated_at = Utc::now();
    Ok(())
}

fn product_view(state: &SharedState, product: &Product) -> ServerResult<ProductView> {
    let category_name = match product.category {
        Some(id) => state.db.get_category(id)?.map(|c| c.name),
        None => None,
    };
    Ok(ProductView::new(product, category_name))
}

fn flag(params: &Params, key: &str) -> Option<bool> {
    match param(params, key)?.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Products of the store with `category`, `is_active` and `low_stock`
/// filters, `search` and `ordering`.
pub async fn list_products(
    State(state): State<SharedState>,
    auth: Auth,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<Params>,
) -> ServerResult<Json<Page<ProductSummary>>> {
    let store = auth.store()?;
    let search = param(&params, "search");
    let category = param(&params, "category");
    let active = flag(&params, "is_active");
    let low_stock = flag(&params, "low_stock") == Some(true);

    let mut products: Vec<Product> = state
        .db
        .list_products(store.id)?
        .into_iter()
        .filter(|p| category.map_or(true, |c| p.category.is_some_and(|id| id.to_string() == c)))
        .filter(|p| active.map_or(true, |a| p.is_active == a))
        .filter(|p| !low_stock || p.is_low_stock())
        .filter(|p| {
            matches_search(
                search,
                &[
                    p.name.as_str(),
                    p.code.as_str(),
                    p.barcode.as_deref().unwrap_or_default(),
                    p.description.as_str(),
                ],
            )
        })
        .collect();
    apply_ordering(
        &mut products,
        param(&params, "ordering"),
        &["name", "price", "stock", "created_at"],
        "name",
        |field, a, b| match field {
            "price" => a.price.cmp(&b.price),
            "stock" => a.stock.cmp(&b.stock),
            "created_at" => a.created_at.cmp(&b.created_at),
            _ => a.name.cmp(&b.name),
        },
    );
    let rows = products.iter().map(ProductSummary::from).collect();
    Ok(Json(paginate(rows, param(&params, "page"), state.config.page_size, &uri)?))
}

/// Active products at or below their threshold, lowest stock first.
pub async fn low_stock(
    State(state): State<SharedState>,
    auth: Auth,
) -> ServerResult<Json<Vec<ProductSummary>>> {
    let products = state.reports.low_stock(auth.store()?)?;
    Ok(Json(products.iter().map(ProductSummary::from).collect()))
}

pub async fn create_product(
    State(state): State<SharedState>,
    auth: Auth,
    body: Result<Json<ProductInput>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<ProductView>)> {
    auth.require(&state, Action::ManageProducts).await?;
    let store = auth.store()?;
    let Json(input) = body?;
    let mut product = Product::new(store.id, "", "", Money::ZERO);
    product.created_by = Some(auth.0.id());
    apply_product_input(state.db.as_ref(), &mut product, input, false)?;
    state.db.create_product(&product)?;
    tracing::info!(product = %product.id, code = %product.code, "product created");
    Ok((StatusCode::CREATED, Json(product_view(&state, &product)?)))
}

pub async fn get_product(
    State(state): State<SharedState>,
    auth: Auth,
    Path(id): Path<String>,
) -> ServerResult<Json<ProductView>> {
    let product = load_product(&state, auth.store()?.id, &id)?;
    Ok(Json(product_view(&state, &product)?))
}

async fn update_product(
    state: SharedState,
    auth: Auth,
    id: String,
    body: Result<Json<ProductInput>, JsonRejection>,
    partial: bool,
) -> ServerResult<Json<ProductView>> {
    auth.require(&state, Action::ManageProducts).await?;
    let mut product = load_product(&state, auth.store()?.id, &id)?;
    let Json(input) = body?;
    apply_product_input(state.db.as_ref(), &mut product, input, partial)?;
    state.db.update_product(&product)?;
    Ok(Json(product_view(&state, &product)?))
}

pub async fn put_product(
    State(state): State<SharedState>,
    auth: Auth,
    Path(id): Path<String>,
    body: Result<Json<ProductInput>, JsonRejection>,
) -> ServerResult<Json<ProductView>> {
    update_product(state, auth, id, body, false).await
}

pub async fn patch_product(
    State(state): State<SharedState>,
    auth: Auth,
    Path(id): Path<String>,
    body: Result<Json<ProductInput>, JsonRejection>,
) -> ServerResult<Json<ProductView>> {
    update_product(state, auth, id, body, true).await
}

/// Soft delete: the product is deactivated so past invoices keep their
/// reference.
pub async fn delete_product(
    State(state): State<SharedState>,
    auth: Auth,
    Path(id): Path<String>,
) -> ServerResult<StatusCode> {
    auth.require(&state, Action::ManageProducts).await?;
    let mut product = load_product(&state, auth.store()?.id, &id)?;
    product.is_active = false;
    product.updated_at = Utc::now();
    state.db.update_product(&product)?;
    tracing::info!(product = %product.id, "product deactivated");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kikubo_store::InMemoryPosStore;
    use kikubo_types::Store;

    fn setup() -> (InMemoryPosStore, Store) {
        let db = InMemoryPosStore::new();
        let store = Store::new("Corner Shop", "CS01");
        db.create_store(&store).unwrap();
        (db, store)
    }

    #[test]
    fn full_product_input_requires_core_fields() {
        let (db, store) = setup();
        let mut product = Product::new(store.id, "", "", Money::ZERO);
        let err = apply_product_input(&db, &mut product, ProductInput::default(), false).unwrap_err();
        let ServerError::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        for field in ["name", "code", "price"] {
            assert!(errors.contains(field), "missing error for {field}");
        }
    }

    #[test]
    fn product_rejects_zero_price_and_negative_stock() {
        let (db, store) = setup();
        let mut product = Product::new(store.id, "Soap", "SOAP-1", Money::from_cents(250));
        let input = ProductInput {
            price: Some(Money::ZERO),
            stock: Some(-1),
            ..ProductInput::default()
        };
        let err = apply_product_input(&db, &mut product, input, true).unwrap_err();
        let ServerError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.get("price").unwrap()[0], "Price must be greater than 0");
        assert!(errors.contains("stock"));
        assert_eq!(product.price, Money::from_cents(250));
    }

    #[test]
    fn product_category_must_belong_to_store() {
        let (db, store) = setup();
        let other = Store::new("Elsewhere", "EL01");
        db.create_store(&other).unwrap();
        let foreign = Category::new(other.id, "Drinks");
        db.create_category(&foreign).unwrap();

        let mut product = Product::new(store.id, "Soap", "SOAP-1", Money::from_cents(250));
        let input = ProductInput {
            category: Some(Some(foreign.id.to_string())),
            ..ProductInput::default()
        };
        let err = apply_product_input(&db, &mut product, input, true).unwrap_err();
        let ServerError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.get("category").unwrap()[0], "Category must belong to your store");
    }

    #[test]
    fn null_clears_optional_product_fields() {
        let (db, store) = setup();
        let category = Category::new(store.id, "Household");
        db.create_category(&category).unwrap();
        let mut product = Product::new(store.id, "Soap", "SOAP-1", Money::from_cents(250));
        product.category = Some(category.id);
        product.barcode = Some("123".into());

        let input: ProductInput =
            serde_json::from_str(r#"{"category": null, "barcode": null, "stock": 4}"#).unwrap();
        apply_product_input(&db, &mut product, input, true).unwrap();
        assert_eq!(product.category, None);
        assert_eq!(product.barcode, None);
        assert_eq!(product.stock, 4);
    }

    #[test]
    fn category_cannot_parent_itself() {
        let (db, store) = setup();
        let mut category = Category::new(store.id, "Household");
        db.create_category(&category).unwrap();
        let input = CategoryInput {
            parent: Some(Some(category.id.to_string())),
            ..CategoryInput::default()
        };
        assert!(apply_category_input(&db, &mut category, input, true).is_err());
    }

    #[test]
    fn counts_only_active_products() {
        let store = StoreId::new();
        let category = CategoryId::new();
        let mut a = Product::new(store, "A", "A", Money::from_cents(100));
        a.category = Some(category);
        let mut b = a.clone();
        b.is_active = false;
        let counts = product_counts(&[a, b]);
        assert_eq!(counts.get(&category), Some(&1));
    }
}
