//! `schmock` provides in-process HTTP mocks to stand in for real services in automated tests.
//!
//! Routes are declared by key (`"GET /users/:id"`), plugins hook into every stage of the
//! request lifecycle, and requests are plain async function calls: no socket is ever opened.
//!
//! # Table of Contents
//! 1. [Getting started](#getting-started)
//! 2. [Routes](#routes)
//! 3. [Plugins](#plugins)
//! 4. [Errors](#errors)
//! 5. [Events and spying](#events-and-spying)
//! 6. [Runtime compatibility](#runtime-compatibility)
//!
//! ## Getting started
//! ```rust
//! use schmock::{RouteDefinition, Schmock};
//! use serde_json::json;
//!
//! #[async_std::main]
//! async fn main() {
//!     // Arrange: declare routes and build the mock.
//!     let mock = Schmock::builder()
//!         .route(
//!             "GET /users/:id",
//!             RouteDefinition::handler(|ctx| async move {
//!                 Ok(json!({"userId": ctx.param("id")}))
//!             }),
//!         )
//!         .build()
//!         .unwrap();
//!
//!     // Act
//!     let response = mock.get("/users/123").await;
//!
//!     // Assert
//!     assert_eq!(response.status, 200);
//!     assert_eq!(response.body, json!({"userId": "123"}));
//!     assert!(response.headers.is_empty());
//!
//!     // If the request doesn't match any route a 404 is returned.
//!     let response = mock.get("/anything").await;
//!     assert_eq!(response.status, 404);
//!     assert_eq!(
//!         response.body,
//!         json!({"error": "Route not found: GET /anything", "code": "ROUTE_NOT_FOUND"})
//!     );
//! }
//! ```
//!
//! ## Routes
//!
//! A route key is an uppercase method, a space and a path. Path segments starting with `:`
//! capture exactly one non-empty segment of the request path. Routes are tried in
//! registration order and the first match wins.
//!
//! A route responds with a static value, or with a handler computing the payload from a
//! [`ResponseContext`]. A payload that is an array starting with a number is a
//! `[status, body, headers?]` tuple; anything else is the body of a `200`.
//!
//! ## Plugins
//!
//! A [`Plugin`] implements any subset of `before_request`, `before_generate`, `generate`,
//! `after_generate`, `before_response` and `on_error`. Plugins run in [`Enforce`] groups
//! (pre, normal, post), in registration order within a group, at every stage.
//!
//! ## Errors
//!
//! Malformed route keys, invalid route definitions and failing plugin factories make
//! [`SchmockBuilder::build`] fail. Errors raised while handling a request never escape
//! [`Schmock::handle`]: `on_error` hooks get a chance to recover, otherwise the response is a
//! `500` with `{"error": .., "code": ..}` as body. See [`SchmockError`] for the codes.
//!
//! ## Events and spying
//!
//! Subscribe to [`Event`]s with [`Schmock::on`]. Every handled call is recorded and can be
//! inspected with [`Schmock::history`], unless recording was disabled.
//!
//! ## Runtime compatibility
//!
//! `schmock` does not depend on an async runtime: hooks and handlers are awaited on whatever
//! executor drives [`Schmock::handle`]. It is tested with both [`async_std`] and [`tokio`].
//!
//! [`async_std`]: https://docs.rs/async-std/
//! [`tokio`]: https://docs.rs/tokio/
mod dispatch;
mod error;
mod events;
mod history;
pub mod http;
mod mock;
pub mod plugin;
mod request;
mod response;
pub mod route_key;
mod route_table;

pub use error::{BoxError, SchmockError};
pub use events::{Event, EventBus, EventKind, ListenerId};
pub use history::RecordedCall;
pub use mock::{Schmock, SchmockBuilder};
pub use plugin::{Enforce, ErrorOutcome, HookFuture, Plugin, PluginRegistry};
pub use request::{BodyPrintLimit, RequestContext, RequestOptions, ResponseContext, State, Store};
pub use response::Response;
pub use route_key::ParsedRoute;
pub use route_table::{CompiledRoute, RouteConfig, RouteDefinition, RouteMatch, RouteTable};
