use std::time::Duration;

use axum::routing::{get, post, MethodRouter};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ServerError;
use crate::handlers::{accounts, catalog, health, invoices, reports, stores, sync};
use crate::state::SharedState;

/// Register `path` both with and without its trailing slash.
fn both(router: Router<SharedState>, path: &str, method: MethodRouter<SharedState>) -> Router<SharedState> {
    router
        .route(path, method.clone())
        .route(path.trim_end_matches('/'), method)
}

/// Build the axum router with every POS endpoint.
pub fn build_router(state: SharedState) -> Router {
    let routes: Vec<(&str, MethodRouter<SharedState>)> = vec![
        ("/health/", get(health::health)),
        // Authentication
        ("/auth/register/", post(accounts::register)),
        ("/auth/login/", post(accounts::login)),
        ("/auth/token/refresh/", post(accounts::refresh)),
        ("/auth/logout/", post(accounts::logout)),
        ("/pos/health/", get(health::pos_health)),
        // Tenancy
        ("/pos/stores/", get(stores::list_stores)),
        (
            "/pos/stores/me/",
            get(stores::my_store)
                .put(stores::put_my_store)
                .patch(stores::patch_my_store),
        ),
        ("/pos/users/", get(stores::list_users)),
        ("/pos/roles/", get(stores::list_roles)),
        // Catalog
        (
            "/pos/categories/",
            get(catalog::list_categories).post(catalog::create_category),
        ),
        (
            "/pos/categories/:id/",
            get(catalog::get_category)
                .put(catalog::put_category)
                .patch(catalog::patch_category)
                .delete(catalog::delete_category),
        ),
        ("/pos/products/low-stock/", get(catalog::low_stock)),
        (
            "/pos/products/",
            get(catalog::list_products).post(catalog::create_product),
        ),
        (
            "/pos/products/:id/",
            get(catalog::get_product)
                .put(catalog::put_product)
                .patch(catalog::patch_product)
                .delete(catalog::delete_product),
        ),
        // Sales
        (
            "/pos/invoices/",
            get(invoices::list_invoices).post(invoices::create_invoice),
        ),
        ("/pos/invoices/bulk-sync/", post(invoices::bulk_sync)),
        ("/pos/invoices/:id/", get(invoices::get_invoice)),
        // Reports
        ("/pos/dashboard/stats/", get(reports::dashboard)),
        ("/pos/reports/sales/", get(reports::sales)),
        ("/pos/reports/products/", get(reports::products)),
        // Sync
        ("/pos/sync/status/", get(sync::status)),
        ("/pos/sync/history/", get(sync::history)),
        (
            "/pos/profile/",
            get(accounts::profile)
                .put(accounts::put_profile)
                .patch(accounts::patch_profile),
        ),
    ];

    let mut router = Router::new();
    for (path, method) in routes {
        router = both(router, path, method);
    }

    let cors_allow_any = state.config.cors_allow_any;
    let mut router = router
        .fallback(|| async { ServerError::not_found() })
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
                .on_request(())
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, _span: &tracing::Span| {
                        let status = response.status();
                        if status.is_server_error() {
                            tracing::error!(status = %status, latency_ms = latency.as_millis(), "request failed");
                        } else if !status.is_success() {
                            tracing::debug!(status = %status, latency_ms = latency.as_millis(), "request rejected");
                        }
                    },
                ),
        );
    if cors_allow_any {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }
    router.with_state(state)
}
