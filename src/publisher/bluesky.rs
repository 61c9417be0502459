//! Bluesky (AT Protocol) XRPC client.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{Credentials, PublisherConfig};
use crate::models::{LinkCard, Post, PostRef, Session};
use crate::publisher::PostingService;
use crate::sources::SourceError;
use crate::utils::{error_for_status, HttpClient};

const POST_COLLECTION: &str = "app.bsky.feed.post";
const EXTERNAL_EMBED: &str = "app.bsky.embed.external";

/// Posting service backed by a Bluesky PDS
#[derive(Debug, Clone)]
pub struct BlueskyClient {
    client: Arc<HttpClient>,
    service_url: String,
}

impl BlueskyClient {
    pub fn new(config: &PublisherConfig, client: Arc<HttpClient>) -> Self {
        Self {
            client,
            service_url: config.service_url.clone(),
        }
    }

    fn xrpc_url(&self, method: &str) -> String {
        format!("{}/xrpc/{}", self.service_url.trim_end_matches('/'), method)
    }
}

#[async_trait]
impl PostingService for BlueskyClient {
    fn id(&self) -> &str {
        "bluesky"
    }

    async fn login(&self, credentials: &Credentials) -> Result<Session, SourceError> {
        let request = CreateSessionRequest {
            identifier: &credentials.handle,
            password: &credentials.app_password,
        };

        let response = self
            .client
            .client()
            .post(self.xrpc_url("com.atproto.server.createSession"))
            .json(&request)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to reach Bluesky: {}", e)))?;

        let response = error_for_status("Bluesky createSession", response).await?;
        let session: CreateSessionResponse = response.json().await?;

        tracing::debug!(handle = %session.handle, "Logged in");

        Ok(Session {
            did: session.did,
            handle: session.handle,
            access_jwt: session.access_jwt,
        })
    }

    async fn create_post(&self, session: &Session, post: &Post) -> Result<PostRef, SourceError> {
        let request = CreateRecordRequest {
            repo: &session.did,
            collection: POST_COLLECTION,
            record: PostRecord {
                record_type: POST_COLLECTION,
                text: &post.text,
                created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                embed: ExternalEmbed {
                    embed_type: EXTERNAL_EMBED,
                    external: &post.card,
                },
            },
        };

        let response = self
            .client
            .client()
            .post(self.xrpc_url("com.atproto.repo.createRecord"))
            .bearer_auth(&session.access_jwt)
            .json(&request)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to reach Bluesky: {}", e)))?;

        let response = error_for_status("Bluesky createRecord", response).await?;
        Ok(response.json::<PostRef>().await?)
    }
}

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionResponse {
    access_jwt: String,
    did: String,
    handle: String,
}

#[derive(Serialize)]
struct CreateRecordRequest<'a> {
    repo: &'a str,
    collection: &'a str,
    record: PostRecord<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PostRecord<'a> {
    #[serde(rename = "$type")]
    record_type: &'a str,
    text: &'a str,
    created_at: String,
    embed: ExternalEmbed<'a>,
}

#[derive(Serialize)]
struct ExternalEmbed<'a> {
    #[serde(rename = "$type")]
    embed_type: &'a str,
    external: &'a LinkCard,
}
