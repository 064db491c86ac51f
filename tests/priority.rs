use schmock::http::Method;
use schmock::{RequestOptions, RouteDefinition, Schmock};
use serde_json::json;

#[async_std::test]
async fn first_registered_route_wins() {
    // Arrange
    let mock = Schmock::builder()
        .route("GET /users/:id", json!("by id"))
        .route("GET /users/me", json!("me"))
        .build()
        .unwrap();

    // Act
    let response = mock.get("/users/me").await;

    // Assert
    assert_eq!(response.body, json!("by id"));
}

#[async_std::test]
async fn literal_routes_registered_first_shadow_params() {
    // Arrange
    let mock = Schmock::builder()
        .route("GET /users/me", json!("me"))
        .route(
            "GET /users/:id",
            RouteDefinition::handler(|ctx| async move { Ok(json!(ctx.param("id"))) }),
        )
        .build()
        .unwrap();

    // Act
    let me = mock.get("/users/me").await;
    let other = mock.get("/users/42").await;

    // Assert
    assert_eq!(me.body, json!("me"));
    assert_eq!(other.body, json!("42"));
}

#[async_std::test]
async fn routes_with_a_different_method_are_skipped() {
    // Arrange
    let mock = Schmock::builder()
        .route("POST /users/:id", json!("post"))
        .route("GET /users/:id", json!("get"))
        .build()
        .unwrap();

    // Act
    let response = mock
        .handle(Method::GET, "/users/1", RequestOptions::new())
        .await;

    // Assert
    assert_eq!(response.body, json!("get"));
}

#[async_std::test]
async fn params_never_span_segments() {
    // Arrange
    let mock = Schmock::builder()
        .route("GET /files/:name", json!("file"))
        .route("GET /files/:dir/:name", json!("nested"))
        .build()
        .unwrap();

    // Act
    let file = mock.get("/files/a.txt").await;
    let nested = mock.get("/files/docs/a.txt").await;
    let trailing = mock.get("/files/a.txt/").await;

    // Assert
    assert_eq!(file.body, json!("file"));
    assert_eq!(nested.body, json!("nested"));
    assert_eq!(trailing.status, 404);
}
