//! Curfew Server - HTTP API server.
//!
//! Exposes the storefront events handled by [`curfew_core::HookSet`] as JSON
//! endpoints, so a storefront written in any language can ask the same
//! questions.
//!
//! ## Endpoints
//!
//! - `GET /api/status` - Enabled flag, window and whether sales are blocked now
//! - `GET /api/categories` - All catalog categories
//! - `POST /api/purchasable` - Is this product purchasable?
//! - `POST /api/cart/add` - May this product be added to the cart?
//! - `POST /api/cart/check` - Strip restricted lines from a cart
//! - `GET /api/products/{id}/warning` - Warning for a product page
//! - `GET /api/categories/{slug}/warning` - Warning for a category archive
//!
//! ## Example
//!
//! ```no_run
//! use curfew_server::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = Server::new(ServerConfig::default()).await.unwrap();
//!     server.run().await.unwrap();
//! }
//! ```

pub mod error;
mod handlers;
pub mod models;
pub mod state;

use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use curfew_storage::Database;

pub use error::{ApiError, Result};
pub use state::AppState;

/// Default server port.
pub const DEFAULT_PORT: u16 = 48780;

/// Default server host (localhost only).
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to (default: 127.0.0.1).
    pub host: String,
    /// Port to bind to (default: 48780).
    pub port: u16,
    /// Database path (None = in-memory).
    pub db_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            db_path: None,
        }
    }
}

impl ServerConfig {
    /// Creates a config with a specific database path.
    pub fn with_db_path(path: impl Into<String>) -> Self {
        Self {
            db_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Sets the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Server error types.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("failed to bind to {0}: {1}")]
    BindError(SocketAddr, std::io::Error),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] curfew_storage::StorageError),

    /// Server runtime error.
    #[error("server error: {0}")]
    Runtime(String),
}

/// Builds the API router over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(handlers::get_status))
        .route("/api/categories", get(handlers::get_categories))
        .route("/api/purchasable", post(handlers::check_purchasable))
        .route("/api/cart/add", post(handlers::validate_add_to_cart))
        .route("/api/cart/check", post(handlers::check_cart))
        .route(
            "/api/products/{id}/warning",
            get(handlers::get_product_warning),
        )
        .route(
            "/api/categories/{slug}/warning",
            get(handlers::get_category_warning),
        )
        .with_state(state)
}

/// The HTTP API server.
pub struct Server {
    router: Router,
    addr: SocketAddr,
}

impl Server {
    /// Creates a new server with the given configuration.
    pub async fn new(config: ServerConfig) -> std::result::Result<Self, ServerError> {
        let db = if let Some(ref path) = config.db_path {
            Database::with_path(path)?
        } else {
            Database::in_memory()?
        };

        Self::with_database(config, db)
    }

    /// Creates a server with an existing database.
    pub fn with_database(
        config: ServerConfig,
        db: Database,
    ) -> std::result::Result<Self, ServerError> {
        let state = AppState::new(db)?;
        Self::with_state(config, state)
    }

    /// Creates a server with custom application state.
    pub fn with_state(
        config: ServerConfig,
        state: AppState,
    ) -> std::result::Result<Self, ServerError> {
        // Storefront pages call the API from the browser
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let router = router(state).layer(cors);

        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| ServerError::Runtime(format!("invalid address: {}", e)))?;

        Ok(Self { router, addr })
    }

    /// Returns the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Runs the server until shutdown.
    pub async fn run(self) -> std::result::Result<(), ServerError> {
        info!("Starting Curfew API server on {}", self.addr);

        let domain = if self.addr.is_ipv6() {
            Domain::IPV6
        } else {
            Domain::IPV4
        };
        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        // Allow rebinding while old sockets sit in TIME_WAIT
        socket
            .set_reuse_address(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        socket
            .bind(&self.addr.into())
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .listen(128)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        // Set non-blocking for tokio
        socket
            .set_nonblocking(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        let std_listener: std::net::TcpListener = socket.into();
        let listener = tokio::net::TcpListener::from_std(std_listener)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        axum::serve(listener, self.router)
            .await
            .map_err(|e| ServerError::Runtime(e.to_string()))?;

        Ok(())
    }

    /// Returns the router for testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use curfew_core::config::keys;
    use curfew_core::{
        Catalog, Category, FixedClock, HookSet, LookupError, PassThrough, ProductId,
        RestrictionEvaluator,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn seeded_db() -> Database {
        let db = Database::in_memory().unwrap();
        db.upsert_category(&Category::new("wine", "Wine")).unwrap();
        db.upsert_category(&Category::new("bread", "Bread")).unwrap();
        db.assign_product(1, &["wine".to_string()]).unwrap();
        db.assign_product(2, &["bread".to_string()]).unwrap();

        db.set_setting(keys::ENABLED, &json!("yes")).unwrap();
        db.set_setting(keys::CATEGORY, &json!(["wine"])).unwrap();
        db.set_setting(keys::WARNING, &json!("No %1$s from %2$s to %3$s"))
            .unwrap();
        db
    }

    fn create_test_app(db: Database, now: &str) -> Router {
        let clock = Arc::new(FixedClock(now.parse().unwrap()));
        let state = AppState::with_components(db, clock, Arc::new(PassThrough)).unwrap();
        router(state)
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_status_inside_window() {
        let app = create_test_app(seeded_db(), "23:00");

        let (status, json) = send(app, "GET", "/api/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["enabled"], true);
        assert_eq!(json["restricted_now"], true);
        assert_eq!(json["current_time"], "23:00");
        assert_eq!(json["window"], json!({"start": "22:00", "end": "09:00"}));
        assert_eq!(json["restricted_categories"], json!(["wine"]));
        assert_eq!(
            json["behaviors"],
            json!(["enforcement", "product_warning", "category_warning"])
        );
    }

    #[tokio::test]
    async fn test_status_defaults_disabled() {
        let app = create_test_app(Database::in_memory().unwrap(), "23:00");

        let (status, json) = send(app, "GET", "/api/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["enabled"], false);
        assert_eq!(json["restricted_now"], false);
        assert!(json["window"].is_null());
        assert_eq!(json["behaviors"], json!([]));
    }

    #[tokio::test]
    async fn test_get_categories() {
        let app = create_test_app(seeded_db(), "12:00");

        let (status, json) = send(app, "GET", "/api/categories", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json["categories"],
            json!([
                {"slug": "wine", "name": "Wine"},
                {"slug": "bread", "name": "Bread"}
            ])
        );
    }

    #[tokio::test]
    async fn test_purchasable() {
        let app = create_test_app(seeded_db(), "23:00");
        let (_, json) = send(
            app.clone(),
            "POST",
            "/api/purchasable",
            Some(json!({"product_id": 1})),
        )
        .await;
        assert_eq!(json["purchasable"], false);

        let (_, json) = send(
            app.clone(),
            "POST",
            "/api/purchasable",
            Some(json!({"product_id": 2})),
        )
        .await;
        assert_eq!(json["purchasable"], true);

        let (_, json) = send(
            app,
            "POST",
            "/api/purchasable",
            Some(json!({"product_id": 2, "is_purchasable": false})),
        )
        .await;
        assert_eq!(json["purchasable"], false);
    }

    #[tokio::test]
    async fn test_purchasable_outside_window() {
        let app = create_test_app(seeded_db(), "10:00");
        let (_, json) = send(
            app,
            "POST",
            "/api/purchasable",
            Some(json!({"product_id": 1})),
        )
        .await;
        assert_eq!(json["purchasable"], true);
    }

    #[tokio::test]
    async fn test_add_to_cart_returns_notice() {
        let app = create_test_app(seeded_db(), "23:00");

        let (status, json) = send(
            app,
            "POST",
            "/api/cart/add",
            Some(json!({"product_id": 1, "quantity": 2})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["passed"], false);
        assert_eq!(
            json["notices"],
            json!([{"message": "No Wine from 22:00 to 09:00", "severity": "error"}])
        );
    }

    #[tokio::test]
    async fn test_add_to_cart_rejects_zero_quantity() {
        let app = create_test_app(seeded_db(), "23:00");

        let (status, json) = send(
            app,
            "POST",
            "/api/cart/add",
            Some(json!({"product_id": 1, "quantity": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "bad_request");
    }

    #[tokio::test]
    async fn test_cart_check_without_stripping_keeps_lines() {
        let app = create_test_app(seeded_db(), "23:00");

        let (_, json) = send(
            app,
            "POST",
            "/api/cart/check",
            Some(json!({"lines": [{"line_key": "a", "product_id": 1}]})),
        )
        .await;
        assert_eq!(json["removed"], json!([]));
        assert_eq!(json["lines"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cart_check_strips_restricted_lines() {
        let db = seeded_db();
        db.set_setting(keys::STRIP_CART, &json!("yes")).unwrap();
        let app = create_test_app(db, "01:30");

        let (status, json) = send(
            app,
            "POST",
            "/api/cart/check",
            Some(json!({"lines": [
                {"line_key": "a", "product_id": 1, "quantity": 3},
                {"line_key": "b", "product_id": 2}
            ]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["removed"], json!(["a"]));
        assert_eq!(
            json["lines"],
            json!([{"line_key": "b", "product_id": 2, "quantity": 1}])
        );
        assert_eq!(json["notices"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_product_warning() {
        let app = create_test_app(seeded_db(), "23:00");

        let (status, json) = send(app.clone(), "GET", "/api/products/1/warning", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "No Wine from 22:00 to 09:00");
        assert_eq!(
            json["html"],
            "<p class=\"stock out-of-stock\">No Wine from 22:00 to 09:00</p>"
        );

        let (_, json) = send(app, "GET", "/api/products/2/warning", None).await;
        assert_eq!(json, json!({}));
    }

    #[tokio::test]
    async fn test_category_warning() {
        let app = create_test_app(seeded_db(), "05:00");

        let (_, json) = send(app.clone(), "GET", "/api/categories/wine/warning", None).await;
        assert_eq!(
            json["html"],
            "<div class=\"term-description\">No Wine from 22:00 to 09:00</div>"
        );

        let (_, json) = send(app.clone(), "GET", "/api/categories/bread/warning", None).await;
        assert_eq!(json, json!({}));

        let (status, json) = send(app, "GET", "/api/categories/nope/warning", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["code"], "not_found");
    }

    struct UnreachableCatalog;

    impl Catalog for UnreachableCatalog {
        fn categories_for_product(
            &self,
            _: ProductId,
        ) -> std::result::Result<Vec<Category>, LookupError> {
            Err(LookupError::Unavailable("connection refused".into()))
        }

        fn category_by_slug(&self, _: &str) -> std::result::Result<Option<Category>, LookupError> {
            Err(LookupError::Unavailable("connection refused".into()))
        }

        fn all_categories(&self) -> std::result::Result<Vec<Category>, LookupError> {
            Err(LookupError::Unavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_category_warning_lookup_failure_shows_nothing() {
        let db = seeded_db();
        let config = db.load_restriction_config().unwrap();
        let evaluator = RestrictionEvaluator::new(config, Arc::new(UnreachableCatalog))
            .with_clock(Arc::new(FixedClock("05:00".parse().unwrap())));
        let hooks = HookSet::from_evaluator(Arc::new(evaluator));
        let app = router(AppState::from_parts(Arc::new(db), Arc::new(hooks)));

        let (status, json) = send(app, "GET", "/api/categories/wine/warning", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({}));
    }

    #[tokio::test]
    async fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.db_path.is_none());
    }

    #[tokio::test]
    async fn test_server_config_builders() {
        let config = ServerConfig::with_db_path("/tmp/curfew.db")
            .with_host("0.0.0.0")
            .with_port(9000);
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.db_path.as_deref(), Some("/tmp/curfew.db"));
    }

    #[tokio::test]
    async fn test_server_addr() {
        let server = Server::with_database(
            ServerConfig::default().with_port(9001),
            Database::in_memory().unwrap(),
        )
        .unwrap();
        assert_eq!(server.addr().port(), 9001);
    }
}
