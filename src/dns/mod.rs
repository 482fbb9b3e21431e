mod dnsimple;
mod provider;

pub use dnsimple::DnsimpleProvider;
pub use provider::{DnsProvider, DnsRecord, ParseRecordTypeError, RecordType, Zone, ZoneRecord};
