use std::fmt;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::provider::{DnsProvider, DnsRecord, RecordType, Zone, ZoneRecord};
use crate::config::ClientConfig;

const API_VERSION: &str = "v2";
const RECORDS_PER_PAGE: &str = "100";

pub struct DnsimpleProvider {
    client: Client,
    api_base: String,
    token: String,
    account_id: String,
}

impl fmt::Debug for DnsimpleProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DnsimpleProvider")
            .field("api_base", &self.api_base)
            .field("token", &"<REDACTED>")
            .field("account_id", &self.account_id)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct Whoami {
    account: Option<Identity>,
    user: Option<Identity>,
}

#[derive(Debug, Deserialize)]
struct Identity {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiZone {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiRecord {
    id: u64,
    zone_id: String,
    name: String,
    content: String,
    ttl: u32,
    #[serde(rename = "type")]
    record_type: String,
}

impl ApiRecord {
    fn matches(&self, name: &str, record_type: RecordType) -> bool {
        self.name.eq_ignore_ascii_case(name)
            && self.record_type.eq_ignore_ascii_case(record_type.as_str())
    }

    fn into_zone_record(self) -> Result<ZoneRecord> {
        let record_type = self
            .record_type
            .parse::<RecordType>()
            .with_context(|| format!("Unexpected record type in DNSimple response: {}", self.record_type))?;

        Ok(ZoneRecord {
            id: self.id,
            zone: self.zone_id,
            name: self.name,
            record_type,
            content: self.content,
            ttl: self.ttl,
        })
    }
}

#[derive(Debug, Serialize)]
struct CreatePayload<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    record_type: RecordType,
    content: &'a str,
    ttl: u32,
}

#[derive(Debug, Serialize)]
struct UpdatePayload<'a> {
    name: &'a str,
    content: &'a str,
    ttl: u32,
}

/// DNSimple spells the zone apex as an empty name.
fn api_name(name: &str) -> &str {
    if name == "@" {
        ""
    } else {
        name
    }
}

async fn api_error(response: Response) -> anyhow::Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiMessage>(&body)
        .map(|m| m.message)
        .unwrap_or(body);
    anyhow!("DNSimple API error ({}): {}", status, message)
}

impl DnsimpleProvider {
    /// Build the client and resolve the account the token belongs to.
    pub async fn connect(token: &str, config: &ClientConfig) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(anyhow!("DNSimple API token is empty"));
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .context("Failed to create HTTP client")?;

        let mut provider = Self {
            client,
            api_base: format!("{}/{}", config.api_base(), API_VERSION),
            token: token.trim().to_string(),
            account_id: String::new(),
        };

        provider.account_id = provider.whoami().await?;
        info!(account_id = %provider.account_id, api = %provider.api_base, "Initialized DNSimple client");

        Ok(provider)
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(&self.token)
    }

    fn records_url(&self, domain: &str) -> String {
        format!("{}/{}/zones/{}/records", self.api_base, self.account_id, domain)
    }

    async fn whoami(&self) -> Result<String> {
        let url = format!("{}/whoami", self.api_base);

        let response = self
            .request(self.client.get(&url))
            .send()
            .await
            .context("Failed to send whoami request to DNSimple API")?;

        if !response.status().is_success() {
            return Err(api_error(response).await)
                .context("Unable to authenticate and retrieve DNSimple account info");
        }

        let whoami: Envelope<Whoami> = response
            .json()
            .await
            .context("Failed to parse DNSimple whoami response")?;

        match (whoami.data.account, whoami.data.user) {
            (Some(account), _) => {
                debug!(account_id = account.id, "Using account id from whoami");
                Ok(account.id.to_string())
            }
            (None, Some(user)) => {
                debug!(user_id = user.id, "Using user id from whoami");
                Ok(user.id.to_string())
            }
            (None, None) => Err(anyhow!("DNSimple whoami returned neither an account nor a user")),
        }
    }
}

#[async_trait]
impl DnsProvider for DnsimpleProvider {
    async fn find_zone(&self, name: &str) -> Result<Option<Zone>> {
        let url = format!("{}/{}/zones/{}", self.api_base, self.account_id, name);

        let response = self
            .request(self.client.get(&url))
            .send()
            .await
            .context("Failed to send zone request to DNSimple API")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let zone: Envelope<ApiZone> = response
            .json()
            .await
            .context("Failed to parse DNSimple zone response")?;

        Ok(Some(Zone {
            id: zone.data.id,
            name: zone.data.name,
        }))
    }

    async fn find_record(
        &self,
        name: &str,
        domain: &str,
        record_type: RecordType,
    ) -> Result<Option<ZoneRecord>> {
        let name = api_name(name).to_ascii_lowercase();

        // Only the first page is read. Name and type filters leave at most a
        // handful of records, well under one page.
        let response = self
            .request(self.client.get(self.records_url(domain)))
            .query(&[
                ("name", name.as_str()),
                ("type", record_type.as_str()),
                ("per_page", RECORDS_PER_PAGE),
            ])
            .send()
            .await
            .context("Failed to send record list request to DNSimple API")?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let records: Envelope<Vec<ApiRecord>> = response
            .json()
            .await
            .context("Failed to parse DNSimple record list response")?;

        records
            .data
            .into_iter()
            .find(|r| r.matches(&name, record_type))
            .map(ApiRecord::into_zone_record)
            .transpose()
    }

    async fn create_record(&self, domain: &str, record: &DnsRecord) -> Result<ZoneRecord> {
        let payload = CreatePayload {
            name: api_name(&record.name),
            record_type: record.record_type,
            content: &record.content,
            ttl: record.ttl,
        };

        let response = self
            .request(self.client.post(self.records_url(domain)))
            .json(&payload)
            .send()
            .await
            .context("Failed to send create request to DNSimple API")?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let created: Envelope<ApiRecord> = response
            .json()
            .await
            .context("Failed to parse DNSimple create response")?;

        created.data.into_zone_record()
    }

    async fn update_record(
        &self,
        domain: &str,
        id: u64,
        record: &DnsRecord,
    ) -> Result<ZoneRecord> {
        let url = format!("{}/{}", self.records_url(domain), id);
        let payload = UpdatePayload {
            name: api_name(&record.name),
            content: &record.content,
            ttl: record.ttl,
        };

        let response = self
            .request(self.client.patch(&url))
            .json(&payload)
            .send()
            .await
            .context("Failed to send update request to DNSimple API")?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let updated: Envelope<ApiRecord> = response
            .json()
            .await
            .context("Failed to parse DNSimple update response")?;

        updated.data.into_zone_record()
    }

    async fn delete_record(&self, domain: &str, id: u64) -> Result<()> {
        let url = format!("{}/{}", self.records_url(domain), id);

        let response = self
            .request(self.client.delete(&url))
            .send()
            .await
            .context("Failed to send delete request to DNSimple API")?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "dnsimple"
    }
}
