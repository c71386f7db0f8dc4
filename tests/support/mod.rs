//! Fake backend and fixtures shared by the integration specs.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::Router;
use serde_json::{json, Value};

use ideaflow::client::ApiClient;
use ideaflow::models::User;
use ideaflow::session::{MemoryTokenStore, SessionContext};

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server failed");
    });
    format!("http://{}", addr)
}

/// A base URL nothing is listening on.
pub async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local address");
    drop(listener);
    format!("http://{}", addr)
}

pub fn session() -> Arc<SessionContext> {
    Arc::new(SessionContext::in_memory())
}

pub fn session_with_token(token: &str) -> Arc<SessionContext> {
    Arc::new(SessionContext::new(Arc::new(MemoryTokenStore::with_token(token))))
}

pub fn client(base_url: &str, session: Arc<SessionContext>) -> ApiClient {
    ApiClient::new(base_url, session)
}

pub fn user() -> User {
    serde_json::from_value(user_json()).expect("valid user fixture")
}

pub fn user_json() -> Value {
    json!({
        "id": "u-1",
        "email": "ada@example.com",
        "username": "ada",
        "auth_provider": "local",
        "is_email_verified": true
    })
}

/// Counts calls to a fake endpoint.
#[derive(Clone, Default)]
pub struct Hits(Arc<AtomicUsize>);

impl Hits {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
