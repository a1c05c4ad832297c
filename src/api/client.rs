use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, Response};
use serde_json::Value;

use super::store::{Entity, RecordStore, Select, StoreError, StoreResult};
use super::types::*;
use crate::config::Config;

/// Supabase (PostgREST) implementation of the record store
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseClient {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config.anon_key.clone()
            .context("Supabase API key not configured")?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            api_key,
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::ACCEPT, "application/json")
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, endpoint: &str) -> StoreResult<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!(%url, "GET");

        let response = self.authorized(self.client.get(&url))
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn post<B: serde::Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> StoreResult<Response> {
        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!(%url, "POST");

        let response = self.authorized(self.client.post(&url))
            .header(header::CONTENT_TYPE, "application/json")
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;

        check_status(response).await
    }

    async fn patch<B: serde::Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> StoreResult<()> {
        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!(%url, "PATCH");

        let response = self.authorized(self.client.patch(&url))
            .header(header::CONTENT_TYPE, "application/json")
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }

    /// Call a stored procedure and decode its JSON result
    async fn rpc<T: serde::de::DeserializeOwned, B: serde::Serialize + ?Sized>(
        &self,
        function: &str,
        args: &B,
    ) -> StoreResult<T> {
        let url = format!("{}/rpc/{}", self.base_url, function);
        tracing::debug!(%url, "RPC");

        let response = self.authorized(self.client.post(&url))
            .header(header::CONTENT_TYPE, "application/json")
            .json(args)
            .send()
            .await?;

        let response = check_status(response).await?;
        let body = response.text().await?;
        // A procedure returning no rows may answer with an empty body
        if body.trim().is_empty() {
            return Ok(serde_json::from_str("[]")?);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl RecordStore for SupabaseClient {
    async fn select(&self, query: &Select) -> StoreResult<Vec<Value>> {
        self.get(&select_endpoint(query)).await
    }

    async fn insert(&self, entity: Entity, record: Value) -> StoreResult<()> {
        self.post(&format!("/{}", entity.table()), &record).await?;
        Ok(())
    }

    async fn update(&self, entity: Entity, id: &str, fields: Value) -> StoreResult<()> {
        self.patch(&row_endpoint(entity, id), &fields).await
    }

    async fn delete(&self, entity: Entity, id: &str) -> StoreResult<()> {
        let url = format!("{}{}", self.base_url, row_endpoint(entity, id));
        tracing::debug!(%url, "DELETE");

        let response = self.authorized(self.client.delete(&url))
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }

    async fn check_conflict(&self, candidate: &ConflictCandidate) -> StoreResult<Vec<ConflictDescriptor>> {
        self.rpc("verificar_conflito", candidate).await
    }

    async fn class_conflicts(&self, class_id: &str) -> StoreResult<Vec<LessonConflict>> {
        let args = serde_json::json!({ "p_turma_id": class_id });
        self.rpc("buscar_conflitos_turma", &args).await
    }
}

/// Turn a non-2xx response into `StoreError::Api`, preferring PostgREST's `message` field
async fn check_status(response: Response) -> StoreResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Api {
        status,
        message: error_message(&body),
    })
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| body.trim().to_string())
}

fn select_endpoint(query: &Select) -> String {
    let entity = query.entity;
    let mut endpoint = format!(
        "/{}?select={}",
        entity.table(),
        urlencoding::encode(entity.columns())
    );
    if let Some(order) = entity.sort_key() {
        endpoint.push_str(&format!("&order={}.asc", order));
    }
    if let Some((column, value)) = &query.filter {
        endpoint.push_str(&format!("&{}=eq.{}", column, urlencoding::encode(value)));
    }
    endpoint
}

fn row_endpoint(entity: Entity, id: &str) -> String {
    format!("/{}?id=eq.{}", entity.table(), urlencoding::encode(id))
}
