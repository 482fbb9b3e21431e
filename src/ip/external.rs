use std::net::IpAddr;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::IpResolver;
use crate::config::{ClientConfig, IpConfig};

/// Resolves the public address by asking HTTP "what is my IP" services in order.
pub struct HttpIpResolver {
    client: Client,
    ipv4_services: Vec<String>,
    ipv6_services: Vec<String>,
}

/// ident.me style `.json` responses.
#[derive(Debug, Deserialize)]
struct AddressResponse {
    address: String,
}

impl HttpIpResolver {
    pub fn new(ip: &IpConfig, client: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(client.timeout())
            .user_agent(client.user_agent.as_str())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            ipv4_services: ip.ipv4_services.clone(),
            ipv6_services: ip.ipv6_services.clone(),
        })
    }

    fn services(&self, prefer_ipv6: bool) -> &[String] {
        if prefer_ipv6 {
            &self.ipv6_services
        } else {
            &self.ipv4_services
        }
    }
}

#[async_trait]
impl IpResolver for HttpIpResolver {
    async fn current_address(&self, prefer_ipv6: bool) -> Result<IpAddr> {
        let mut last_error = None;

        for service in self.services(prefer_ipv6) {
            match fetch_ip(&self.client, service, prefer_ipv6).await {
                Ok(ip) => {
                    tracing::debug!(service = %service, ip = %ip, "Dynamic IP determined");
                    return Ok(ip);
                }
                Err(e) => {
                    tracing::debug!("Failed to get IP from {}: {:#}", service, e);
                    last_error = Some(e);
                }
            }
        }

        let family = if prefer_ipv6 { "IPv6" } else { "IPv4" };
        Err(last_error.unwrap_or_else(|| anyhow!("No {} lookup services configured", family)))
    }
}

async fn fetch_ip(client: &Client, url: &str, want_ipv6: bool) -> Result<IpAddr> {
    let body = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let ip = parse_address(&body)?;

    if ip.is_ipv6() != want_ipv6 {
        return Err(anyhow!("{} returned an address of the wrong family: {}", url, ip));
    }

    Ok(ip)
}

/// Accepts either `{"address": "..."}` or a bare address.
fn parse_address(body: &str) -> Result<IpAddr> {
    let body = body.trim();
    let raw = match serde_json::from_str::<AddressResponse>(body) {
        Ok(response) => response.address,
        Err(_) => body.to_string(),
    };

    raw.trim()
        .parse()
        .with_context(|| format!("Invalid IP address in response: {:?}", raw))
}
