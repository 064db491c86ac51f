use criterion::{criterion_group, criterion_main, Criterion};
use futures::executor::block_on;
use schmock::{Plugin, RouteDefinition, Schmock};
use serde_json::json;

fn mock_with_routes(routes: usize) -> Schmock {
    (0..routes)
        .fold(Schmock::builder(), |builder, i| {
            builder.route(format!("GET /resources/{}/:id", i), json!({"index": i}))
        })
        .disable_request_recording()
        .build()
        .unwrap()
}

pub fn static_route(c: &mut Criterion) {
    let mock = mock_with_routes(1);
    c.bench_function("Schmock::get, static route", |b| {
        b.iter(|| block_on(mock.get("/resources/0/1")))
    });
}

// Worst case for the linear scan: the matching route is the last one registered.
pub fn last_of_many_routes(c: &mut Criterion) {
    let mock = mock_with_routes(100);
    c.bench_function("Schmock::get, last of 100 routes", |b| {
        b.iter(|| block_on(mock.get("/resources/99/1")))
    });
}

pub fn handler_and_plugins(c: &mut Criterion) {
    let mock = Schmock::builder()
        .route(
            "GET /users/:id",
            RouteDefinition::handler(|ctx| async move { Ok(json!({"id": ctx.param("id")})) }),
        )
        .plugin(Plugin::new("wrap").after_generate(|payload, _ctx| async move {
            Ok(json!({"data": payload}))
        }))
        .plugin(Plugin::new("tag").before_response(|response, _ctx| async move {
            Ok(response.with_header("x-bench", "1"))
        }))
        .disable_request_recording()
        .build()
        .unwrap();
    c.bench_function("Schmock::get, handler and two plugins", |b| {
        b.iter(|| block_on(mock.get("/users/42")))
    });
}

criterion_group!(benches, static_route, last_of_many_routes, handler_and_plugins);
criterion_main!(benches);
