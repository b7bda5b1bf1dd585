use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt; // for `oneshot`

use podium::{
    build_router,
    prediction::{repository::PredictionRepository, Prediction},
    race::PositionMap,
    user::TokenConfig,
    AppState, EventBus, EventDispatcher, ScoreAggregationHandler, Stores,
};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub fn podium(p1: &str, p2: &str, p3: &str) -> PositionMap {
    [("p1", p1), ("p2", p2), ("p3", p3)].into_iter().collect()
}

pub async fn predict(stores: &Stores, uid: &str, race_id: &str, positions: PositionMap) {
    stores
        .predictions
        .upsert_prediction(&Prediction::new(uid, race_id, positions))
        .await
        .expect("prediction should be stored");
}

/// Router plus in-memory stores, with the aggregation handler listening on the bus
pub struct TestApp {
    pub stores: Stores,
    pub router: Router,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let stores = Stores::in_memory();
        let event_bus = EventBus::with_default_capacity();

        let mut dispatcher = EventDispatcher::new(event_bus.clone())
            .with_handler_timeout(Duration::from_secs(1))
            .with_max_retries(0);
        dispatcher.add_handler(Arc::new(ScoreAggregationHandler::new(Arc::new(
            stores.aggregation_job(),
        ))));
        dispatcher.start_listening().await;

        let state = AppState::new(
            stores.clone(),
            TokenConfig::new("integration-secret", 1),
            event_bus,
        );

        Self {
            stores,
            router: build_router(state),
        }
    }

    /// Sends a request and returns the status with the parsed JSON body, if any
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request should build");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, json)
    }

    /// Registers a user and returns `(uid, token)`
    pub async fn register(&self, username: &str) -> (String, String) {
        let (status, body) = self
            .send(
                "POST",
                "/users",
                None,
                Some(serde_json::json!({ "username": username })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        (
            body["uid"].as_str().unwrap().to_string(),
            body["token"].as_str().unwrap().to_string(),
        )
    }
}
