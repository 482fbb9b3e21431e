use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use super::error::{EngineError, RecordContext, Stage};
use crate::dns::{DnsProvider, DnsRecord, RecordType, Zone, ZoneRecord};
use crate::ip::IpResolver;

pub const DEFAULT_TTL: u32 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRecord {
    #[error("record name must not be empty")]
    EmptyName,
    #[error("domain must not be empty")]
    EmptyDomain,
}

/// The record the caller wants to exist. `value: None` means "use the current public IP".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredRecord {
    name: String,
    domain: String,
    record_type: RecordType,
    value: Option<String>,
    prefer_ipv6: bool,
}

impl DesiredRecord {
    /// Name and domain are lowercased; DNS names compare case-insensitively.
    pub fn new(name: &str, domain: &str, record_type: RecordType) -> Result<Self, InvalidRecord> {
        let name = name.trim().to_ascii_lowercase();
        let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();

        if name.is_empty() {
            return Err(InvalidRecord::EmptyName);
        }
        if domain.is_empty() {
            return Err(InvalidRecord::EmptyDomain);
        }

        Ok(Self {
            name,
            domain,
            record_type,
            value: None,
            prefer_ipv6: false,
        })
    }

    /// Literal record data. Blank data is treated as absent.
    pub fn with_value(mut self, value: Option<String>) -> Self {
        self.value = value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        self
    }

    /// Ask the resolver for an IPv6 address when no value is given.
    pub fn prefer_ipv6(mut self, prefer_ipv6: bool) -> Self {
        self.prefer_ipv6 = prefer_ipv6;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn record_type(&self) -> RecordType {
        self.record_type
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    fn context(&self, value: Option<&str>) -> RecordContext {
        RecordContext {
            domain: self.domain.clone(),
            name: self.name.clone(),
            record_type: self.record_type,
            value: value.map(str::to_string),
        }
    }
}

/// Everything known about one record for the duration of one operation.
#[derive(Debug, Clone)]
pub struct ReconciliationContext {
    pub desired: DesiredRecord,
    /// Literal value, or the resolved public address.
    pub value: String,
    pub zone: Zone,
    pub remote: Option<ZoneRecord>,
}

impl ReconciliationContext {
    pub fn record_exists(&self) -> bool {
        self.remote.is_some()
    }

    pub fn record_context(&self) -> RecordContext {
        RecordContext {
            domain: self.zone.name.clone(),
            ..self.desired.context(Some(&self.value))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update { id: u64 },
    Delete { id: u64 },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Create => write!(f, "create"),
            Action::Update { .. } => write!(f, "update"),
            Action::Delete { .. } => write!(f, "delete"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created(ZoneRecord),
    Updated(ZoneRecord),
    Deleted { id: u64 },
}

impl Outcome {
    /// The record as it now exists at the provider, `None` after a delete.
    pub fn record(&self) -> Option<&ZoneRecord> {
        match self {
            Outcome::Created(record) | Outcome::Updated(record) => Some(record),
            Outcome::Deleted { .. } => None,
        }
    }
}

/// Picks the action that converges the remote record to the desired one.
///
/// An existing `AAAA` record is deleted rather than updated. This retracts
/// stale IPv6 host records and differs on purpose from `A` handling, where
/// the existing record is updated in place with the new value.
pub fn decide(ctx: &ReconciliationContext) -> Action {
    match &ctx.remote {
        None => Action::Create,
        Some(existing) if ctx.desired.record_type == RecordType::Aaaa => {
            Action::Delete { id: existing.id }
        }
        Some(existing) => Action::Update { id: existing.id },
    }
}

/// Holds the provider and resolver handles one invocation works against.
#[derive(Clone)]
pub struct Reconciler {
    provider: Arc<dyn DnsProvider>,
    resolver: Arc<dyn IpResolver>,
    ttl: u32,
}

impl Reconciler {
    pub fn new(provider: Arc<dyn DnsProvider>, resolver: Arc<dyn IpResolver>) -> Self {
        Self {
            provider,
            resolver,
            ttl: DEFAULT_TTL,
        }
    }

    /// TTL applied to created and updated records.
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Reads the current remote state for `desired`. Never writes.
    pub async fn resolve(
        &self,
        desired: DesiredRecord,
    ) -> Result<ReconciliationContext, EngineError> {
        let value = match desired.value() {
            Some(value) => value.to_string(),
            None => {
                debug!(prefer_ipv6 = desired.prefer_ipv6, "No record data provided, looking up current IP");
                let ip = self
                    .resolver
                    .current_address(desired.prefer_ipv6)
                    .await
                    .map_err(|e| EngineError::IpResolutionFailed {
                        context: desired.context(None),
                        source: e.into(),
                    })?;
                debug!(ip = %ip, "Current dynamic IP");
                ip.to_string()
            }
        };

        let zone = self
            .provider
            .find_zone(desired.domain())
            .await
            .map_err(|e| EngineError::LookupFailed {
                stage: Stage::DomainLookup,
                context: desired.context(Some(&value)),
                source: e.into(),
            })?
            .ok_or_else(|| EngineError::DomainNotFound {
                context: desired.context(Some(&value)),
            })?;

        let remote = self
            .provider
            .find_record(desired.name(), &zone.name, desired.record_type())
            .await
            .map_err(|e| EngineError::LookupFailed {
                stage: Stage::RecordLookup,
                context: desired.context(Some(&value)),
                source: e.into(),
            })?;

        debug!(
            zone = %zone.name,
            name = desired.name(),
            record_type = %desired.record_type(),
            record_exists = remote.is_some(),
            "Resolved remote state"
        );

        Ok(ReconciliationContext {
            desired,
            value,
            zone,
            remote,
        })
    }

    /// Applies `action` at the provider. No retries.
    pub async fn execute(
        &self,
        ctx: &ReconciliationContext,
        action: Action,
    ) -> Result<Outcome, EngineError> {
        debug!(action = %action, provider = self.provider.provider_name(), "Executing action");

        match action {
            Action::Create => self.create_remote(ctx).await.map(Outcome::Created),
            Action::Update { id } => self.update_remote(ctx, id).await.map(Outcome::Updated),
            Action::Delete { id } => self
                .delete_remote(ctx, id)
                .await
                .map(|id| Outcome::Deleted { id }),
        }
    }

    pub(super) async fn create_remote(
        &self,
        ctx: &ReconciliationContext,
    ) -> Result<ZoneRecord, EngineError> {
        self.provider
            .create_record(&ctx.zone.name, &self.payload(ctx))
            .await
            .map_err(|e| write_failed(ctx, Action::Create, e))
    }

    pub(super) async fn update_remote(
        &self,
        ctx: &ReconciliationContext,
        id: u64,
    ) -> Result<ZoneRecord, EngineError> {
        self.provider
            .update_record(&ctx.zone.name, id, &self.payload(ctx))
            .await
            .map_err(|e| write_failed(ctx, Action::Update { id }, e))
    }

    pub(super) async fn delete_remote(
        &self,
        ctx: &ReconciliationContext,
        id: u64,
    ) -> Result<u64, EngineError> {
        self.provider
            .delete_record(&ctx.zone.name, id)
            .await
            .map(|()| id)
            .map_err(|e| write_failed(ctx, Action::Delete { id }, e))
    }

    fn payload(&self, ctx: &ReconciliationContext) -> DnsRecord {
        DnsRecord::new(
            ctx.desired.name(),
            ctx.desired.record_type(),
            &ctx.value,
            self.ttl,
        )
    }
}

fn write_failed(ctx: &ReconciliationContext, action: Action, e: anyhow::Error) -> EngineError {
    EngineError::ProviderRequestFailed {
        action,
        context: ctx.record_context(),
        source: e.into(),
    }
}
