//! Shared harness: an in-memory server on an ephemeral port.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use thrive_auth::{AuthError, OtpSender};
use thrive_core::model::UserRole;
use thrive_server::{AppConfig, AppState, build_router, create_storage};
use thrive_storage::prelude::*;
use tokio::task::JoinHandle;

/// Keeps the last code sent to each address.
#[derive(Default)]
pub struct CapturingSender {
    codes: Mutex<HashMap<String, String>>,
}

impl CapturingSender {
    pub fn code_for(&self, email: &str) -> Option<String> {
        self.codes.lock().unwrap().get(email).cloned()
    }
}

#[async_trait]
impl OtpSender for CapturingSender {
    async fn send(&self, email: &str, code: &str) -> Result<(), AuthError> {
        self.codes
            .lock()
            .unwrap()
            .insert(email.to_string(), code.to_string());
        Ok(())
    }
}

pub struct TestServer {
    pub base: String,
    pub client: reqwest::Client,
    pub storage: DynStorage,
    pub otp: Arc<CapturingSender>,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(AppConfig::default()).await
    }

    pub async fn start_with(mut config: AppConfig) -> Self {
        config.metrics.enabled = false;
        let storage = create_storage(&config).await.expect("storage");
        let otp = Arc::new(CapturingSender::default());
        let state = AppState::new(config, storage.clone())
            .expect("state")
            .with_otp_sender(otp.clone());
        let app = build_router(state);

        let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("bind");
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = rx.await;
                })
                .await;
        });

        Self {
            base: format!("http://{addr}"),
            client: reqwest::Client::new(),
            storage,
            otp,
            shutdown: Some(tx),
            handle: Some(handle),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// Registers an account and returns `(token, user id)`.
    pub async fn register(&self, email: &str, name: &str) -> (String, String) {
        let resp = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({"email": email, "password": "correct-horse-9", "displayName": name}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201, "register {email}");
        let body: Value = resp.json().await.unwrap();
        (
            body["data"]["token"].as_str().unwrap().to_string(),
            body["data"]["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    /// Registers an account, promotes it and logs in again so the token
    /// carries the admin role.
    pub async fn register_admin(&self, email: &str) -> String {
        let (_, id) = self.register(email, "Admin").await;
        let mut user = self
            .storage
            .get_user(id.parse().unwrap())
            .await
            .unwrap()
            .unwrap();
        user.role = UserRole::Admin;
        self.storage.update_user(&user).await.unwrap();

        let body = self
            .post(None, "/api/auth/login", json!({"email": email, "password": "correct-horse-9"}))
            .await
            .1;
        body["data"]["token"].as_str().unwrap().to_string()
    }

    pub async fn get(&self, token: Option<&str>, path: &str) -> (u16, Value) {
        let mut req = self.client.get(self.url(path));
        if let Some(t) = token {
            req = req.bearer_auth(t);
        }
        let resp = req.send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    pub async fn post(&self, token: Option<&str>, path: &str, body: Value) -> (u16, Value) {
        let mut req = self.client.post(self.url(path)).json(&body);
        if let Some(t) = token {
            req = req.bearer_auth(t);
        }
        let resp = req.send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    pub async fn patch(&self, token: &str, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .patch(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    pub async fn delete(&self, token: &str, path: &str) -> (u16, Value) {
        let resp = self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}
