//! HTTP-level tests driving the router with `tower::ServiceExt::oneshot`.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

use otherproteins_api::auth::JwtManager;
use otherproteins_api::{app, AppState};
use otherproteins_core::invoice::StoreDetails;
use otherproteins_core::{NewUser, Role, StorePolicy};
use otherproteins_db::credentials::hash_password;
use otherproteins_db::{Database, DbConfig};

const ADMIN_EMAIL: &str = "admin@otherproteins.eus";
const ADMIN_PASSWORD: &str = "admin-pasahitza";

struct TestApp {
    router: Router,
}

impl TestApp {
    async fn new() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.users()
            .ensure_admin(
                &NewUser {
                    email: ADMIN_EMAIL.to_string(),
                    password_hash: hash_password(ADMIN_PASSWORD).unwrap(),
                    first_name: "Admin".to_string(),
                    last_names: "OtherProteins".to_string(),
                    phone: None,
                    role: Role::Admin,
                },
                Utc::now(),
            )
            .await
            .unwrap();

        let state = AppState::new(
            db,
            JwtManager::new("test-secret".to_string(), 3600),
            StorePolicy::default(),
            StoreDetails::default(),
        );
        TestApp { router: app(state) }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>, Option<String>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec(), content_type)
    }

    async fn json(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let (status, bytes, _) = self.send(method, uri, token, body).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    async fn customer_token(&self, email: &str) -> String {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "email": email,
                    "password": "proteina123",
                    "first_name": "Ane",
                    "last_names": "Garmendia Urkiola",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        self.login(email, "proteina123").await
    }

    async fn create_product(&self, admin: &str, name: &str, price_cents: i64, stock: i64) -> i64 {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/admin/products",
                Some(admin),
                Some(json!({ "name": name, "price_cents": price_cents, "stock": stock })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    async fn add_to_cart(&self, token: &str, product_id: i64, quantity: i64) -> (StatusCode, Value) {
        self.json(
            Method::POST,
            "/api/cart/items",
            Some(token),
            Some(json!({ "product_id": product_id, "quantity": quantity })),
        )
        .await
    }

    async fn stock_of(&self, product_id: i64) -> i64 {
        let (_, body) = self
            .json(Method::GET, &format!("/api/products/{product_id}"), None, None)
            .await;
        body["stock"].as_i64().unwrap()
    }
}

fn home_address() -> Value {
    json!({
        "street": "Kale Nagusia",
        "number": "12",
        "city": "Donostia",
        "province": "Gipuzkoa",
        "postal_code": "20003"
    })
}

#[tokio::test]
async fn health_endpoints() {
    let app = TestApp::new().await;

    let (status, body, _) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");

    let (status, _, _) = app.send(Method::GET, "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn register_login_and_profile() {
    let app = TestApp::new().await;
    let token = app.customer_token("ane@example.eus").await;

    let (status, me) = app.json(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "ane@example.eus");
    assert_eq!(me["role"], "customer");
    assert!(me.get("password_hash").is_none());

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ane@example.eus", "password": "okerra123" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": "ANE@example.eus",
                "password": "proteina123",
                "first_name": "Ane",
                "last_names": "Bis",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DUPLICATE");
}

#[tokio::test]
async fn short_password_is_rejected() {
    let app = TestApp::new().await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": "jon@example.eus",
                "password": "short",
                "first_name": "Jon",
                "last_names": "Arana",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn cart_requires_a_token() {
    let app = TestApp::new().await;

    let (status, body) = app.json(Method::GET, "/api/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = app.json(Method::GET, "/api/cart", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn customers_cannot_use_admin_endpoints() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let customer = app.customer_token("ane@example.eus").await;
    let whey = app.create_product(&admin, "Whey Protein Isolate", 5500, 15).await;

    let (status, body) = app
        .json(
            Method::POST,
            &format!("/api/admin/products/{whey}/stock"),
            Some(&customer),
            Some(json!({ "delta": 100 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, _) = app.json(Method::GET, "/api/admin/orders", Some(&customer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert_eq!(app.stock_of(whey).await, 15);
}

#[tokio::test]
async fn checkout_cancel_and_invoice() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let customer = app.customer_token("ane@example.eus").await;
    let whey = app.create_product(&admin, "Whey Protein Isolate", 5500, 5).await;

    let (status, cart) = app.add_to_cart(&customer, whey, 3).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["subtotal_cents"], 16_500);

    let (status, order) = app
        .json(
            Method::POST,
            "/api/orders",
            Some(&customer),
            Some(json!({ "delivery": "etxera", "address": home_address() })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["status"], "prozesatzen");
    assert_eq!(order["items_total_cents"], 16_500);
    assert_eq!(order["shipping_cents"], 0);
    assert_eq!(app.stock_of(whey).await, 2);

    let id = order["id"].as_i64().unwrap();

    let (status, cart) = app.json(Method::GET, "/api/cart", Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["lines"].as_array().unwrap().len(), 0);

    let (status, pdf, content_type) = app
        .send(Method::GET, &format!("/api/orders/{id}/invoice.pdf"), Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/pdf"));
    assert!(pdf.starts_with(b"%PDF-1.4"));

    let (status, cancelled) = app
        .json(Method::POST, &format!("/api/orders/{id}/cancel"), Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "bertan_behera");
    assert_eq!(app.stock_of(whey).await, 5);

    let (status, body) = app
        .json(Method::POST, &format!("/api/orders/{id}/cancel"), Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_TRANSITION");
}

#[tokio::test]
async fn checkout_rejections() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let customer = app.customer_token("ane@example.eus").await;
    let casein = app.create_product(&admin, "Caseina Nocturna", 4550, 3).await;

    let (status, body) = app
        .json(Method::POST, "/api/orders", Some(&customer), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "EMPTY_CART");

    let (status, body) = app.add_to_cart(&customer, casein, 4).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "OUT_OF_STOCK");

    app.add_to_cart(&customer, casein, 3).await;
    let (status, _) = app
        .json(
            Method::POST,
            &format!("/api/admin/products/{casein}/stock"),
            Some(&admin),
            Some(json!({ "delta": -1 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .json(Method::POST, "/api/orders", Some(&customer), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "OUT_OF_STOCK");
    assert_eq!(app.stock_of(casein).await, 2);

    let (status, body) = app
        .json(
            Method::POST,
            "/api/orders",
            Some(&customer),
            Some(json!({ "walk_in": true })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn orders_are_private() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let ane = app.customer_token("ane@example.eus").await;
    let jon = app.customer_token("jon@example.eus").await;
    let bar = app.create_product(&admin, "Barritas Energéticas", 2500, 30).await;

    app.add_to_cart(&ane, bar, 1).await;
    let (_, order) = app
        .json(Method::POST, "/api/orders", Some(&ane), Some(json!({})))
        .await;
    let id = order["id"].as_i64().unwrap();

    let (status, body) = app
        .json(Method::GET, &format!("/api/orders/{id}"), Some(&jon), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _, _) = app
        .send(Method::GET, &format!("/api/orders/{id}/invoice.pdf"), Some(&jon), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, list) = app.json(Method::GET, "/api/orders", Some(&jon), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(list.as_array().unwrap().is_empty());

    let (status, _) = app
        .json(Method::GET, &format!("/api/orders/{id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admin_workflow() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let (status, category) = app
        .json(
            Method::POST,
            "/api/admin/categories",
            Some(&admin),
            Some(json!({ "name": "Kreatina" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let category_id = category["id"].as_i64().unwrap();

    let creatine = app.create_product(&admin, "Creatina", 2299, 25).await;
    let (status, patched) = app
        .json(
            Method::PATCH,
            &format!("/api/admin/products/{creatine}"),
            Some(&admin),
            Some(json!({ "name": "Creatina Monohidratada", "price_cents": 2499 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["name"], "Creatina Monohidratada");
    assert_eq!(patched["price_cents"], 2499);

    let (status, products) = app
        .json(Method::GET, "/api/products?q=monohidratada&in_stock=true", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(products.as_array().unwrap().len(), 1);

    let (status, categories) = app.json(Method::GET, "/api/categories", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(categories[0]["id"].as_i64(), Some(category_id));

    // Walk-in sale at the counter
    app.add_to_cart(&admin, creatine, 2).await;
    let (status, order) = app
        .json(
            Method::POST,
            "/api/orders",
            Some(&admin),
            Some(json!({ "walk_in": true, "walk_in_customer": "Mikel Etxeberria" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["status"], "pagado");
    let id = order["id"].as_i64().unwrap();

    let (status, body) = app
        .json(
            Method::POST,
            &format!("/api/admin/orders/{id}/status"),
            Some(&admin),
            Some(json!({ "status": "bukatuta" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_TRANSITION");

    let (status, shipped) = app
        .json(
            Method::POST,
            &format!("/api/admin/orders/{id}/status"),
            Some(&admin),
            Some(json!({ "status": "bidalita" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shipped["status"], "bidalita");

    let (status, listed) = app
        .json(Method::GET, "/api/admin/orders?status=bidalita", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, body) = app
        .json(Method::GET, "/api/admin/orders?status=bidaltzen", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn rejected_product_patch_changes_nothing() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let whey = app.create_product(&admin, "Whey Protein Isolate", 5500, 15).await;

    let (status, body) = app
        .json(
            Method::PATCH,
            &format!("/api/admin/products/{whey}"),
            Some(&admin),
            Some(json!({ "name": "Whey Gold", "price_cents": -1 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = app
        .json(
            Method::PATCH,
            &format!("/api/admin/products/{whey}"),
            Some(&admin),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (_, product) = app
        .json(Method::GET, &format!("/api/products/{whey}"), None, None)
        .await;
    assert_eq!(product["name"], "Whey Protein Isolate");
    assert_eq!(product["price_cents"], 5500);
}

#[tokio::test]
async fn out_of_range_numbers_are_client_errors() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let customer = app.customer_token("ane@example.eus").await;
    let whey = app.create_product(&admin, "Whey Protein Isolate", 5500, 15).await;

    app.add_to_cart(&customer, whey, 1).await;
    let (status, body) = app.add_to_cart(&customer, whey, i64::MAX).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "QUANTITY_TOO_LARGE");

    let (status, body) = app
        .json(
            Method::POST,
            "/api/admin/products",
            Some(&admin),
            Some(json!({ "name": "Proteina Urrea", "price_cents": i64::MAX / 2, "stock": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = app
        .json(
            Method::POST,
            &format!("/api/admin/products/{whey}/stock"),
            Some(&admin),
            Some(json!({ "delta": i64::MIN })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(app.stock_of(whey).await, 15);

    let (status, cart) = app.json(Method::GET, "/api/cart", Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["total_quantity"], 1);
}
