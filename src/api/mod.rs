//! JSON HTTP API under `/api`
pub mod error;
pub mod extract;
pub mod handlers;
pub mod rate_limit;

pub use error::{ApiError, ApiResult};
pub use rate_limit::{RateLimiter, RouteClass};

use crate::services::Services;
use axum::{
    Router, middleware,
    routing::{get, patch, post},
};
use handlers::{account, admin, auth, bookings, cafe, content, payments, workspaces};
use std::sync::Arc;

/// Shared by every handler
#[derive(Clone)]
pub struct ApiState {
    pub services: Services,
    pub limiter: Arc<RateLimiter>,
}

impl ApiState {
    pub fn new(services: Services, limiter: Arc<RateLimiter>) -> Self {
        Self { services, limiter }
    }
}

/// Build the full API router. Each route group carries its own limit class;
/// the payment webhook is not limited.
pub fn router(state: ApiState) -> Router {
    let limited = |class: RouteClass| {
        middleware::from_fn_with_state((state.limiter.clone(), class), rate_limit::limit)
    };

    let auth_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route_layer(limited(RouteClass::Auth));

    let form_routes = Router::new()
        .route("/contact", post(content::contact))
        .route("/newsletter/subscribe", post(content::subscribe))
        .route("/newsletter/unsubscribe", post(content::unsubscribe))
        .route_layer(limited(RouteClass::PublicForms));

    let admin_routes = Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/bookings", get(admin::bookings))
        .route("/bookings/:id", patch(admin::update_booking))
        .route("/orders", get(admin::orders))
        .route("/orders/:id", patch(admin::update_order))
        .route("/credits", post(admin::grant_credits))
        .route("/users", get(admin::users))
        .route("/contacts", get(admin::contacts))
        .route("/contacts/:id", patch(admin::update_contact))
        .route("/audit", get(admin::audit_log))
        .route("/workspaces", get(admin::workspaces).post(admin::create_workspace))
        .route("/workspaces/:id", patch(admin::update_workspace))
        .route("/menu", get(admin::menu).post(admin::create_menu_item))
        .route("/menu/:id", patch(admin::update_menu_item))
        .route("/blog", get(admin::posts).post(admin::create_post))
        .route("/blog/:id", patch(admin::update_post))
        .route("/newsletter", get(admin::subscribers));

    let general_routes = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/workspaces", get(workspaces::list))
        .route("/workspaces/:id", get(workspaces::get))
        .route("/workspaces/:id/availability", get(workspaces::availability))
        .route("/bookings/quote", post(bookings::quote))
        .route("/bookings", get(bookings::list).post(bookings::create))
        .route("/bookings/:id", get(bookings::get))
        .route("/bookings/:id/cancel", post(bookings::cancel))
        .route("/menu", get(cafe::menu))
        .route("/orders/quote", post(cafe::quote))
        .route("/orders", get(cafe::list).post(cafe::place))
        .route("/credits", get(account::credits))
        .route("/credits/transactions", get(account::transactions))
        .route("/nft/challenge", get(account::nft_challenge))
        .route("/nft/verify", post(account::nft_verify))
        .route("/blog", get(content::posts))
        .route("/blog/:slug", get(content::post))
        .nest("/admin", admin_routes)
        .route_layer(limited(RouteClass::General));

    let webhook_routes = Router::new().route("/payments/webhook", post(payments::webhook));

    let api = Router::new()
        .merge(auth_routes)
        .merge(form_routes)
        .merge(general_routes)
        .merge(webhook_routes);

    Router::new().nest("/api", api).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemorySessionStore;
    use crate::config::{Config, RateLimitConfig};
    use crate::core::memory::MemoryStore;
    use crate::core::types::{Role, WorkspaceKind};
    use crate::services::testing::quiet_integrations;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        response::Response,
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app_with(store: &Arc<MemoryStore>, rate_limit: RateLimitConfig) -> Router {
        let config = Config::default();
        let services = Services::new(
            store.repositories(),
            Arc::new(MemorySessionStore::default()),
            quiet_integrations(),
            &config,
        );
        router(ApiState::new(services, Arc::new(RateLimiter::new(rate_limit))))
    }

    fn app(store: &Arc<MemoryStore>) -> Router {
        app_with(store, RateLimitConfig { enabled: false, ..Default::default() })
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn register(app: &Router, email: &str) -> String {
        let body = json!({ "email": email, "password": "correct horse", "name": "Ada" });
        let response = app.clone().oneshot(json_request("POST", "/api/auth/register", None, body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_register_then_me_and_logout() {
        let store = Arc::new(MemoryStore::default());
        let app = app(&store);
        let token = register(&app, "ada@example.com").await;

        let response = app.clone().oneshot(get_request("/api/auth/me", Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let me = body_json(response).await;
        assert_eq!(me["email"], "ada@example.com");
        assert!(me.get("password_hash").is_none());

        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/auth/logout", Some(&token), Value::Null))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app.oneshot(get_request("/api/auth/me", Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_token_is_json_401() {
        let store = Arc::new(MemoryStore::default());
        let response = app(&store).oneshot(get_request("/api/bookings", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "unauthorized");
    }

    #[tokio::test]
    async fn test_admin_routes_require_admin_role() {
        let store = Arc::new(MemoryStore::default());
        let app = app(&store);
        let token = register(&app, "member@example.com").await;

        let response = app.clone().oneshot(get_request("/api/admin/dashboard", Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        store.users.lock()[0].role = Role::Admin;
        let response = app.oneshot(get_request("/api/admin/dashboard", Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["total_users"], 1);
    }

    #[tokio::test]
    async fn test_workspace_lookup_errors() {
        let store = Arc::new(MemoryStore::default());
        let desk = store.insert_workspace(WorkspaceKind::HotDesk, 10, 800);
        let app = app(&store);

        let response = app.clone().oneshot(get_request("/api/workspaces", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);

        let uri = format!("/api/workspaces/{}", desk.id);
        assert_eq!(app.clone().oneshot(get_request(&uri, None)).await.unwrap().status(), StatusCode::OK);

        let uri = format!("/api/workspaces/{}", uuid::Uuid::new_v4());
        assert_eq!(app.clone().oneshot(get_request(&uri, None)).await.unwrap().status(), StatusCode::NOT_FOUND);

        let response = app.oneshot(get_request("/api/workspaces/not-a-uuid", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "bad_request");
    }

    #[tokio::test]
    async fn test_auth_routes_are_rate_limited() {
        let store = Arc::new(MemoryStore::default());
        let limits = RateLimitConfig { enabled: true, window_secs: 60, general_limit: 100, auth_limit: 2, forms_limit: 5 };
        let app = app_with(&store, limits);
        let body = json!({ "email": "nobody@example.com", "password": "wrong password" });

        for remaining in ["1", "0"] {
            let response = app
                .clone()
                .oneshot(json_request("POST", "/api/auth/login", None, body.clone()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(response.headers()["x-ratelimit-remaining"], remaining);
        }

        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/auth/login", None, body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));

        // Other classes keep their own budget
        let response = app.oneshot(get_request("/api/menu", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_contact_form_accepts_visitors() {
        let store = Arc::new(MemoryStore::default());
        let body = json!({ "name": "Grace", "email": "grace@example.com", "subject": "Tour", "message": "Hi" });
        let request = Request::builder()
            .method("POST")
            .uri("/api/contact")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "198.51.100.4")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app(&store).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(store.contacts.lock().len(), 1);
        assert_eq!(store.audit.lock()[0].ip_address.as_deref(), Some("198.51.100.4"));
    }

    #[tokio::test]
    async fn test_webhook_without_secret_is_bad_gateway() {
        let store = Arc::new(MemoryStore::default());
        let request = Request::builder()
            .method("POST")
            .uri("/api/payments/webhook")
            .header("stripe-signature", "t=1,v1=00")
            .body(Body::from("{}"))
            .unwrap();
        let response = app(&store).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
