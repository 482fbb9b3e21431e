//! Test doubles for the reconciliation engine.

#![allow(dead_code)]

use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use dnsimple_ddns::dns::{DnsProvider, DnsRecord, RecordType, Zone, ZoneRecord};
use dnsimple_ddns::engine::Reconciler;
use dnsimple_ddns::ip::IpResolver;

/// Provider keeping zones and records in memory, counting every write.
#[derive(Default)]
pub struct InMemoryProvider {
    zones: Vec<String>,
    records: Mutex<Vec<ZoneRecord>>,
    next_id: AtomicU64,
    writes: AtomicUsize,
    fail_lookups: AtomicBool,
    fail_zone_lookups: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemoryProvider {
    pub fn with_zone(zone: &str) -> Self {
        Self {
            zones: vec![zone.to_string()],
            next_id: AtomicU64::new(100),
            ..Self::default()
        }
    }

    /// Seed an existing record and return its id.
    pub fn seed(&self, zone: &str, name: &str, record_type: RecordType, content: &str) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.records.lock().unwrap().push(ZoneRecord {
            id,
            zone: zone.to_string(),
            name: name.to_string(),
            record_type,
            content: content.to_string(),
            ttl: 300,
        });
        id
    }

    pub fn records(&self) -> Vec<ZoneRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_lookups(&self) {
        self.fail_lookups.store(true, Ordering::SeqCst);
    }

    pub fn fail_zone_lookups(&self) {
        self.fail_zone_lookups.store(true, Ordering::SeqCst);
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    fn begin_write(&self) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("DNSimple API error (500 Internal Server Error): boom"));
        }
        Ok(())
    }
}

#[async_trait]
impl DnsProvider for InMemoryProvider {
    async fn find_zone(&self, name: &str) -> Result<Option<Zone>> {
        if self.fail_zone_lookups.load(Ordering::SeqCst) {
            return Err(anyhow!("DNSimple API error (503 Service Unavailable): "));
        }

        Ok(self
            .zones
            .iter()
            .position(|z| z == name)
            .map(|i| Zone {
                id: i as u64 + 1,
                name: self.zones[i].clone(),
            }))
    }

    async fn find_record(
        &self,
        name: &str,
        domain: &str,
        record_type: RecordType,
    ) -> Result<Option<ZoneRecord>> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(anyhow!("connection reset by peer"));
        }

        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.zone == domain && r.name == name && r.record_type == record_type)
            .cloned())
    }

    async fn create_record(&self, domain: &str, record: &DnsRecord) -> Result<ZoneRecord> {
        self.begin_write()?;
        let created = ZoneRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            zone: domain.to_string(),
            name: record.name.clone(),
            record_type: record.record_type,
            content: record.content.clone(),
            ttl: record.ttl,
        };
        self.records.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_record(
        &self,
        domain: &str,
        id: u64,
        record: &DnsRecord,
    ) -> Result<ZoneRecord> {
        self.begin_write()?;
        let mut records = self.records.lock().unwrap();
        let existing = records
            .iter_mut()
            .find(|r| r.id == id && r.zone == domain)
            .ok_or_else(|| anyhow!("record {} not found", id))?;
        existing.name = record.name.clone();
        existing.content = record.content.clone();
        existing.ttl = record.ttl;
        Ok(existing.clone())
    }

    async fn delete_record(&self, domain: &str, id: u64) -> Result<()> {
        self.begin_write()?;
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| !(r.id == id && r.zone == domain));
        if records.len() == before {
            return Err(anyhow!("record {} not found", id));
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}

/// Resolver returning fixed addresses per family.
pub struct StaticResolver {
    ipv4: Option<IpAddr>,
    ipv6: Option<IpAddr>,
    calls: AtomicUsize,
}

impl StaticResolver {
    pub fn new(ipv4: &str, ipv6: &str) -> Self {
        Self {
            ipv4: ipv4.parse().ok(),
            ipv6: ipv6.parse().ok(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            ipv4: None,
            ipv6: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IpResolver for StaticResolver {
    async fn current_address(&self, prefer_ipv6: bool) -> Result<IpAddr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let ip = if prefer_ipv6 { self.ipv6 } else { self.ipv4 };
        ip.ok_or_else(|| anyhow!("no address available"))
    }
}

pub fn reconciler(
    provider: &Arc<InMemoryProvider>,
    resolver: &Arc<StaticResolver>,
) -> Reconciler {
    Reconciler::new(provider.clone(), resolver.clone())
}
