mod external;

pub use external::HttpIpResolver;

use std::net::IpAddr;

use anyhow::Result;
use async_trait::async_trait;

/// Source of the caller's current public address.
#[async_trait]
pub trait IpResolver: Send + Sync {
    async fn current_address(&self, prefer_ipv6: bool) -> Result<IpAddr>;
}
