use schmock::{RouteDefinition, Schmock};
use serde_json::json;
use std::time::{Duration, Instant};

async fn test_body() {
    // Arrange
    let mock = Schmock::builder()
        .delay(Duration::from_millis(200))
        .route("GET /slow", json!("slow"))
        .route(
            "GET /fast",
            RouteDefinition::value("fast").delay(Duration::from_millis(10)),
        )
        .build()
        .unwrap();

    // Act
    let started = Instant::now();
    let slow = mock.get("/slow").await;
    let slow_elapsed = started.elapsed();

    let started = Instant::now();
    let fast = mock.get("/fast").await;
    let fast_elapsed = started.elapsed();

    // Assert
    assert_eq!(slow.body, json!("slow"));
    assert!(slow_elapsed >= Duration::from_millis(200));
    assert_eq!(fast.body, json!("fast"));
    assert!(fast_elapsed >= Duration::from_millis(10));
    assert!(fast_elapsed < Duration::from_millis(200));
}

#[async_std::test]
async fn responses_are_delayed_with_async_std() {
    test_body().await
}

#[tokio::test]
async fn responses_are_delayed_with_tokio() {
    test_body().await
}

#[async_std::test]
async fn unmatched_requests_get_the_global_delay() {
    // Arrange
    let mock = Schmock::builder()
        .delay(Duration::from_millis(50))
        .build()
        .unwrap();

    // Act
    let started = Instant::now();
    let response = mock.get("/missing").await;

    // Assert
    assert_eq!(response.status, 404);
    assert!(started.elapsed() >= Duration::from_millis(50));
}
