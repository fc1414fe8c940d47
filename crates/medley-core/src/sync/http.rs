//! PostgREST-backed [`RemoteStore`] for a hosted Supabase project.
//!
//! Each entity maps to one table whose row is the engine columns plus the
//! payload's business columns, flattened. Conditional updates ride on
//! PostgREST filter semantics: a `PATCH` with `version=eq.N` that matches
//! zero rows returns an empty representation, which is the version-mismatch
//! signal, not an error.

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{EntityKind, OwnerId, Payload, RemoteId, RemoteRecord};
use crate::util::compact_text;

use super::remote::{
    NewRemoteRecord, RemoteError, RemoteResult, RemoteStore, RemoteUpdate, UpdateOutcome,
};

pub struct SupabaseRestStore {
    rest_url: String,
    anon_key: String,
    access_token: String,
    client: Client,
}

impl SupabaseRestStore {
    /// `access_token` is the signed-in user's JWT; row-level security keys
    /// off it, and every query carries an explicit `user_id` filter on top.
    pub fn new(
        url: impl AsRef<str>,
        anon_key: impl Into<String>,
        access_token: impl Into<String>,
    ) -> RemoteResult<Self> {
        let rest_url = normalize_rest_url(url.as_ref())?;
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(RemoteError::InvalidConfiguration(
                "Supabase anon key must not be empty",
            ));
        }
        let access_token = access_token.into().trim().to_string();
        if access_token.is_empty() {
            return Err(RemoteError::InvalidConfiguration(
                "Access token must not be empty",
            ));
        }

        Ok(Self {
            rest_url,
            anon_key,
            access_token,
            client: Client::builder().build()?,
        })
    }

    fn table_url(&self, entity: EntityKind) -> String {
        format!("{}/{}", self.rest_url, entity.table())
    }

    fn authed_request(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.access_token)
    }

    async fn send_rows(&self, request: RequestBuilder) -> RemoteResult<Vec<RemoteRow>> {
        let response = self.authed_request(request).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Api(parse_api_error(status, &body)));
        }
        Ok(response.json::<Vec<RemoteRow>>().await?)
    }
}

impl RemoteStore for SupabaseRestStore {
    async fn select_all(
        &self,
        entity: EntityKind,
        owner: &OwnerId,
    ) -> RemoteResult<Vec<RemoteRecord>> {
        let request = self.client.get(self.table_url(entity)).query(&[
            ("user_id", eq_filter(owner)),
            ("order", "id.asc".to_string()),
        ]);
        let rows = self.send_rows(request).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn select_one(
        &self,
        entity: EntityKind,
        owner: &OwnerId,
        id: RemoteId,
    ) -> RemoteResult<Option<RemoteRecord>> {
        let request = self.client.get(self.table_url(entity)).query(&[
            ("user_id", eq_filter(owner)),
            ("id", eq_filter(&id.get())),
            ("limit", "1".to_string()),
        ]);
        let mut rows = self.send_rows(request).await?;
        Ok(rows.pop().map(Into::into))
    }

    async fn insert(
        &self,
        entity: EntityKind,
        owner: &OwnerId,
        record: NewRemoteRecord,
    ) -> RemoteResult<RemoteRecord> {
        let body = InsertRow {
            user_id: owner.as_uuid(),
            version: 1,
            is_deleted: false,
            created_at: record.created_at,
            updated_at: record.updated_at,
            payload: &record.payload,
        };
        let request = self
            .client
            .post(self.table_url(entity))
            .header("Prefer", "return=representation")
            .json(&body);
        let mut rows = self.send_rows(request).await?;
        rows.pop().map(Into::into).ok_or_else(|| {
            RemoteError::InvalidPayload(format!(
                "insert into {entity} returned no representation"
            ))
        })
    }

    async fn update_if_version(
        &self,
        entity: EntityKind,
        owner: &OwnerId,
        id: RemoteId,
        expected_version: i64,
        update: RemoteUpdate,
    ) -> RemoteResult<UpdateOutcome> {
        let body = UpdateRow {
            version: update.version,
            is_deleted: update.is_deleted,
            updated_at: update.updated_at,
            payload: &update.payload,
        };
        let request = self
            .client
            .patch(self.table_url(entity))
            .query(&[
                ("user_id", eq_filter(owner)),
                ("id", eq_filter(&id.get())),
                ("version", eq_filter(&expected_version)),
            ])
            .header("Prefer", "return=representation")
            .json(&body);
        let rows = self.send_rows(request).await?;
        if rows.is_empty() {
            Ok(UpdateOutcome::VersionMismatch)
        } else {
            Ok(UpdateOutcome::Applied)
        }
    }
}

fn eq_filter(value: &impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

/// One table row on the wire. Engine columns are explicit; everything else
/// lands in `payload` via the flatten.
#[derive(Debug, Deserialize)]
struct RemoteRow {
    id: i64,
    #[allow(dead_code)]
    user_id: Uuid,
    version: i64,
    is_deleted: bool,
    created_at: i64,
    updated_at: i64,
    #[serde(flatten)]
    payload: Payload,
}

impl From<RemoteRow> for RemoteRecord {
    fn from(row: RemoteRow) -> Self {
        Self {
            id: RemoteId::new(row.id),
            version: row.version,
            is_deleted: row.is_deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
            payload: row.payload,
        }
    }
}

#[derive(Debug, Serialize)]
struct InsertRow<'a> {
    user_id: Uuid,
    version: i64,
    is_deleted: bool,
    created_at: i64,
    updated_at: i64,
    #[serde(flatten)]
    payload: &'a Payload,
}

#[derive(Debug, Serialize)]
struct UpdateRow<'a> {
    version: i64,
    is_deleted: bool,
    updated_at: i64,
    #[serde(flatten)]
    payload: &'a Payload,
}

pub fn normalize_rest_url(url: &str) -> RemoteResult<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(RemoteError::InvalidConfiguration(
            "Supabase URL must not be empty",
        ));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(RemoteError::InvalidConfiguration(
            "Supabase URL must include http:// or https://",
        ));
    }
    if trimmed.ends_with("/rest/v1") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/rest/v1"))
    }
}

#[derive(Debug, Deserialize)]
struct PostgrestErrorResponse {
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<PostgrestErrorResponse>(body) {
        if let Some(message) = payload.message.or(payload.details).or(payload.hint) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let body = compact_text(body);
    if body.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", body, status.as_u16())
    }
}
