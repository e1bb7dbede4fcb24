//! End-to-end checks through the router.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use kikubo_auth::NewAccount;
use kikubo_store::{InMemoryPosStore, PosStore};
use kikubo_types::{Category, Money, Product, Rate, Role, RoleName, Store};
use serde_json::{json, Value};
use tower::util::ServiceExt;

use crate::config::ServerConfig;
use crate::router::build_router;
use crate::state::{AppState, SharedState};

const PASSWORD: &str = "secret123";

struct TestApp {
    app: Router,
    state: SharedState,
    store: Store,
    soap: Product,
}

impl TestApp {
    fn new() -> Self {
        let db: Arc<dyn PosStore> = Arc::new(InMemoryPosStore::new());
        for name in RoleName::ALL {
            db.ensure_role(&Role::builtin(name)).unwrap();
        }
        let mut store = Store::demo();
        store.tax_rate = Rate::ZERO;
        db.create_store(&store).unwrap();
        let mut soap = Product::new(store.id, "Bar soap", "SOAP-1", Money::from_cents(250));
        soap.stock = 10;
        db.create_product(&soap).unwrap();

        let state = Arc::new(AppState::new(db, ServerConfig::default()));
        let app = build_router(state.clone());
        let test = Self { app, state, store, soap };
        for (email, role) in [
            ("owner@shop.test", RoleName::Owner),
            ("manager@shop.test", RoleName::Manager),
            ("seller@shop.test", RoleName::Salesperson),
            ("other@shop.test", RoleName::Salesperson),
        ] {
            test.account(email, role);
        }
        test
    }

    fn account(&self, email: &str, role: RoleName) {
        let role = self.state.db.get_role_by_name(role).unwrap().unwrap();
        self.state
            .accounts
            .create_account(NewAccount {
                name: email.split('@').next().unwrap_or("user").to_string(),
                email: email.to_string(),
                password: PASSWORD.to_string(),
                phone: None,
                store: Some(self.store.id),
                role: Some(role.id),
                superuser: false,
            })
            .unwrap();
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header("authorization", format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = self.app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    /// Log in and return `(access, refresh)`.
    async fn login(&self, email: &str) -> (String, String) {
        let (status, body) = self
            .send(
                Method::POST,
                "/auth/login/",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        (
            body["tokens"]["access"].as_str().unwrap().to_string(),
            body["tokens"]["refresh"].as_str().unwrap().to_string(),
        )
    }

    async fn token(&self, email: &str) -> String {
        self.login(email).await.0
    }
}

#[tokio::test]
async fn health_endpoints() {
    let t = TestApp::new();
    let (status, body) = t.send(Method::GET, "/health/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, _) = t.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let token = t.token("seller@shop.test").await;
    let (status, body) = t.get("/pos/health/", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["store"], "Demo Store");
    assert_eq!(body["user"]["role"], "salesperson");
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let t = TestApp::new();
    let (status, body) = t.send(Method::GET, "/nope/", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Not found." }));
}

#[tokio::test]
async fn protected_endpoints_need_a_token() {
    let t = TestApp::new();
    let (status, body) = t.send(Method::GET, "/pos/profile/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = t.get("/pos/profile/", "bogus").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_then_login() {
    let t = TestApp::new();
    let role = t.state.db.get_role_by_name(RoleName::Salesperson).unwrap().unwrap();
    let (status, body) = t
        .send(
            Method::POST,
            "/auth/register/",
            None,
            Some(json!({
                "email": "New.Person@Shop.test",
                "name": "New Person",
                "password": PASSWORD,
                "store_id": t.store.id.to_string(),
                "role_id": role.id.to_string(),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["email"], "new.person@shop.test");
    assert_eq!(body["store_name"], "Demo Store");
    assert_eq!(body["role_name"], "salesperson");

    let (status, body) = t
        .send(
            Method::POST,
            "/auth/login/",
            None,
            Some(json!({ "email": "new.person@shop.test", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "salesperson");
    assert!(body["tokens"]["access"].is_string());
}

#[tokio::test]
async fn register_reports_field_errors() {
    let t = TestApp::new();
    let (status, body) = t
        .send(Method::POST, "/auth/register/", None, Some(json!({ "email": "bad" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["email"].is_array());
    assert!(body["password"].is_array());
}

#[tokio::test]
async fn refresh_rotates_and_logout_revokes() {
    let t = TestApp::new();
    let (access, refresh) = t.login("seller@shop.test").await;

    let (status, body) = t
        .send(Method::POST, "/auth/token/refresh/", None, Some(json!({ "refresh": refresh })))
        .await;
    assert_eq!(status, StatusCode::OK);
    let rotated = body["refresh"].as_str().unwrap().to_string();
    assert_ne!(rotated, refresh);

    let (status, _) = t
        .send(Method::POST, "/auth/token/refresh/", None, Some(json!({ "refresh": refresh })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let access = body["access"].as_str().map(str::to_string).unwrap_or(access);
    let (status, body) = t.post("/auth/logout/", &access, json!({ "refresh": rotated })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully logged out");

    let (status, _) = t
        .send(Method::POST, "/auth/token/refresh/", None, Some(json!({ "refresh": rotated })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_update_keeps_identity_fields() {
    let t = TestApp::new();
    let token = t.token("seller@shop.test").await;
    let (status, body) = t
        .send(
            Method::PATCH,
            "/pos/profile/",
            Some(&token),
            Some(json!({ "bio": "Evening shift", "email": "hijack@shop.test" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bio"], "Evening shift");
    assert_eq!(body["email"], "seller@shop.test");

    let (status, body) = t
        .send(Method::PUT, "/pos/profile/", Some(&token), Some(json!({ "bio": "x" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["name"].is_array());
}

#[tokio::test]
async fn public_store_and_role_listings() {
    let t = TestApp::new();
    let (status, body) = t.send(Method::GET, "/pos/stores/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["code"], "DEMO001");
    assert!(body[0].get("tax_rate").is_none());

    let (status, body) = t.send(Method::GET, "/pos/roles", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn store_details_are_owner_editable() {
    let t = TestApp::new();
    let seller = t.token("seller@shop.test").await;
    let (status, body) = t.get("/pos/stores/me/", &seller).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_count"], 4);
    assert_eq!(body["product_count"], 1);

    let patch = json!({ "phone": "+256700000000" });
    let (status, _) = t
        .send(Method::PATCH, "/pos/stores/me/", Some(&seller), Some(patch.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let owner = t.token("owner@shop.test").await;
    let (status, body) = t
        .send(Method::PATCH, "/pos/stores/me/", Some(&owner), Some(patch))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phone"], "+256700000000");
    assert_eq!(body["code"], "DEMO001");
}

#[tokio::test]
async fn staff_listing_is_owner_only() {
    let t = TestApp::new();
    let manager = t.token("manager@shop.test").await;
    let (status, _) = t.get("/pos/users/", &manager).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let owner = t.token("owner@shop.test").await;
    let (status, body) = t.get("/pos/users/", &owner).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 4);
    assert!(body[0].get("password_hash").is_none());
}

#[tokio::test]
async fn catalog_writes_need_manage_products() {
    let t = TestApp::new();
    let product = json!({ "name": "Rice 1kg", "code": "RICE-1", "price": "4.20", "stock": 3 });

    let seller = t.token("seller@shop.test").await;
    let (status, _) = t.post("/pos/products/", &seller, product.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let manager = t.token("manager@shop.test").await;
    let (status, body) = t.post("/pos/products/", &manager, product.clone()).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["price"], "4.20");
    assert_eq!(body["is_low_stock"], true);

    let (status, body) = t.post("/pos/products/", &manager, product).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["code"].is_array());
}

#[tokio::test]
async fn product_listing_filters_and_orders() {
    let t = TestApp::new();
    let mut rice = Product::new(t.store.id, "Rice 1kg", "RICE-1", Money::from_cents(420));
    rice.stock = 50;
    t.state.db.create_product(&rice).unwrap();
    let token = t.token("seller@shop.test").await;

    let (status, body) = t.get("/pos/products/?ordering=-price", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["results"][0]["code"], "RICE-1");

    let (_, body) = t.get("/pos/products/?search=soap", &token).await;
    assert_eq!(body["count"], 1);

    let (_, body) = t.get("/pos/products/?low_stock=true", &token).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["code"], "SOAP-1");

    let (status, body) = t.get("/pos/products/low-stock/", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn products_of_other_stores_are_invisible() {
    let t = TestApp::new();
    let other = Store::new("Elsewhere", "EL01");
    t.state.db.create_store(&other).unwrap();
    let foreign = Product::new(other.id, "Tea", "TEA-1", Money::from_cents(100));
    t.state.db.create_product(&foreign).unwrap();

    let token = t.token("manager@shop.test").await;
    let (status, _) = t.get(&format!("/pos/products/{}/", foreign.id), &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = t.get("/pos/products/not-a-uuid/", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_a_product_deactivates_it() {
    let t = TestApp::new();
    let token = t.token("manager@shop.test").await;
    let uri = format!("/pos/products/{}/", t.soap.id);
    let (status, _) = t.send(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = t.get(&uri, &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_active"], false);
}

#[tokio::test]
async fn categories_paginate() {
    let t = TestApp::new();
    for n in 0..12 {
        let category = Category::new(t.store.id, format!("Category {n:02}"));
        t.state.db.create_category(&category).unwrap();
    }
    let token = t.token("seller@shop.test").await;

    let (status, body) = t.get("/pos/categories/?search=category", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 12);
    assert_eq!(body["results"].as_array().unwrap().len(), 10);
    assert_eq!(body["results"][0]["name"], "Category 00");
    assert_eq!(body["next"], "/pos/categories/?search=category&page=2");
    assert!(body["previous"].is_null());

    let (_, body) = t.get("/pos/categories/?page=2", &token).await;
    assert_eq!(body["results"].as_array().unwrap().len(), 2);

    let (status, _) = t.get("/pos/categories/?page=9", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn online_invoice_decrements_stock() {
    let t = TestApp::new();
    let token = t.token("seller@shop.test").await;
    let (status, body) = t
        .post(
            "/pos/invoices/",
            &token,
            json!({
                "invoice_number": "WEB-1",
                "items": [{ "product": t.soap.id.to_string(), "quantity": 4 }],
                "customer_name": "Walk-in",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["total"], "10.00");
    assert_eq!(body["sync_status"], "SYNCED");
    assert_eq!(body["salesperson_name"], "seller");
    assert_eq!(body["items"][0]["product_code"], "SOAP-1");

    let soap = t.state.db.get_product(t.soap.id).unwrap().unwrap();
    assert_eq!(soap.stock, 6);

    let (status, body) = t
        .post(
            "/pos/invoices/",
            &token,
            json!({ "items": [{ "product": t.soap.id.to_string(), "quantity": 7 }] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["items"][0], "Insufficient stock for SOAP-1. Available: 6, Requested: 7");
}

#[tokio::test]
async fn invoices_are_scoped_by_role() {
    let t = TestApp::new();
    let seller = t.token("seller@shop.test").await;
    let (_, created) = t
        .post(
            "/pos/invoices/",
            &seller,
            json!({ "items": [{ "product": t.soap.id.to_string(), "quantity": 1 }] }),
        )
        .await;
    let uri = format!("/pos/invoices/{}/", created["id"].as_str().unwrap());

    let other = t.token("other@shop.test").await;
    let (_, body) = t.get("/pos/invoices/", &other).await;
    assert_eq!(body["count"], 0);
    let (status, _) = t.get(&uri, &other).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let manager = t.token("manager@shop.test").await;
    let (_, body) = t.get("/pos/invoices/?sync_status=SYNCED", &manager).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["item_count"], 1);
    let (status, body) = t.get(&uri, &manager).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store_name"], "Demo Store");
}

#[tokio::test]
async fn bulk_sync_reports_each_record() {
    let t = TestApp::new();
    let seller = t.token("seller@shop.test").await;
    let seller_id = t
        .state
        .db
        .get_user_by_email("seller@shop.test")
        .unwrap()
        .unwrap()
        .id
        .to_string();
    let record = |number: &str, quantity: i64| {
        let line = Money::from_cents(250 * quantity).to_string();
        json!({
            "id": format!("local-{number}"),
            "invoice_number": number,
            "salesperson": seller_id,
            "createdAt": "2024-03-01T09:30:00Z",
            "subtotal": line,
            "tax": "0.00",
            "total": line,
            "items": [{ "product": t.soap.id.to_string(), "quantity": quantity, "price": "2.50" }],
        })
    };

    let batch = json!({ "invoices": [record("OFF-1", 2), record("OFF-2", 50)] });
    let (status, body) = t.post("/pos/invoices/bulk-sync/", &seller, batch).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["synced"], 1);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["synced_invoices"][0]["local_id"], "local-OFF-1");
    assert_eq!(body["failed_invoices"][0]["invoice_number"], "OFF-2");
    assert!(body["failed_invoices"][0]["errors"]["items"].is_array());

    let (status, body) = t.get("/pos/sync/history/", &seller).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["status"], "partial");
    assert_eq!(body[0]["items_synced"], 1);
    assert_eq!(body[0]["user_name"], "seller");

    let (status, body) = t.get("/pos/sync/status/", &seller).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sync_status"], "online");
}

#[tokio::test]
async fn bulk_sync_rejects_overflowing_quantities() {
    let t = TestApp::new();
    let seller = t.token("seller@shop.test").await;
    let seller_id = t.state.db.get_user_by_email("seller@shop.test").unwrap().unwrap().id;
    let line = json!({ "product": t.soap.id.to_string(), "quantity": i64::MAX, "price": "0.01" });
    let batch = json!({ "invoices": [{
        "invoice_number": "OFF-MAX",
        "salesperson": seller_id.to_string(),
        "subtotal": "0.02",
        "tax": "0.00",
        "total": "0.02",
        "items": [line.clone(), line],
    }]});

    let (status, body) = t.post("/pos/invoices/bulk-sync/", &seller, batch).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["synced"], 0);
    assert_eq!(body["failed"], 1);
    assert!(body["failed_invoices"][0]["errors"]["items"].is_array());
    assert_eq!(t.state.db.get_product(t.soap.id).unwrap().unwrap().stock, 10);
}

#[tokio::test]
async fn bulk_sync_rejects_malformed_body() {
    let t = TestApp::new();
    let seller = t.token("seller@shop.test").await;
    let (status, body) = t
        .post("/pos/invoices/bulk-sync/", &seller, json!({ "invoices": "nope" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["invoices"].is_array());

    let (status, body) = t
        .send(Method::POST, "/pos/invoices/bulk-sync/", Some(&seller), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn reports_need_analytics_permission() {
    let t = TestApp::new();
    let seller = t.token("seller@shop.test").await;
    let (status, _) = t.get("/pos/dashboard/stats/", &seller).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    t.post(
        "/pos/invoices/",
        &seller,
        json!({ "items": [{ "product": t.soap.id.to_string(), "quantity": 3 }] }),
    )
    .await;

    let owner = t.token("owner@shop.test").await;
    let (status, body) = t.get("/pos/dashboard/stats/", &owner).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["invoice_count"], 1);
    assert_eq!(body["top_product"], "Bar soap");

    let (status, body) = t.get("/pos/reports/sales/", &owner).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["salesperson_name"], "seller");
    assert_eq!(body[0]["invoice_count"], 1);

    let (status, body) = t.get("/pos/reports/products/?limit=5", &owner).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["quantity_sold"], 3);

    let (status, body) = t.get("/pos/reports/sales/?start_date=2024-13-01", &owner).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["start_date"].is_array());

    let (status, _) = t.get("/pos/reports/products/?limit=0", &owner).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
