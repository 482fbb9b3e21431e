use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    Aaaa,
    Alias,
    Caa,
    Cname,
    Mx,
    Ns,
    Srv,
    Txt,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Alias => "ALIAS",
            RecordType::Caa => "CAA",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
            RecordType::Ns => "NS",
            RecordType::Srv => "SRV",
            RecordType::Txt => "TXT",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported record type: {0}")]
pub struct ParseRecordTypeError(String);

impl FromStr for RecordType {
    type Err = ParseRecordTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            "ALIAS" => Ok(RecordType::Alias),
            "CAA" => Ok(RecordType::Caa),
            "CNAME" => Ok(RecordType::Cname),
            "MX" => Ok(RecordType::Mx),
            "NS" => Ok(RecordType::Ns),
            "SRV" => Ok(RecordType::Srv),
            "TXT" => Ok(RecordType::Txt),
            _ => Err(ParseRecordTypeError(s.to_string())),
        }
    }
}

/// A zone managed by the provider account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    pub id: u64,
    pub name: String,
}

/// A record as currently stored at the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneRecord {
    pub id: u64,
    pub zone: String,
    pub name: String,
    pub record_type: RecordType,
    pub content: String,
    pub ttl: u32,
}

/// Record contents to write on create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    pub name: String,
    pub record_type: RecordType,
    pub content: String,
    pub ttl: u32,
}

impl DnsRecord {
    pub fn new(name: &str, record_type: RecordType, content: &str, ttl: u32) -> Self {
        Self {
            name: name.to_string(),
            record_type,
            content: content.to_string(),
            ttl,
        }
    }
}

/// Zone and record primitives against one authenticated account.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Look up a zone by name. `Ok(None)` when the account has no such zone.
    async fn find_zone(&self, name: &str) -> Result<Option<Zone>>;

    /// Look up the record matching name and type exactly within `domain`.
    async fn find_record(
        &self,
        name: &str,
        domain: &str,
        record_type: RecordType,
    ) -> Result<Option<ZoneRecord>>;

    async fn create_record(&self, domain: &str, record: &DnsRecord) -> Result<ZoneRecord>;

    async fn update_record(&self, domain: &str, id: u64, record: &DnsRecord)
        -> Result<ZoneRecord>;

    async fn delete_record(&self, domain: &str, id: u64) -> Result<()>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;
}
