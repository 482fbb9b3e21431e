use std::fmt;

use thiserror::Error;

use super::reconcile::Action;
use crate::dns::RecordType;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Pipeline step an [`EngineError`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    IpResolution,
    DomainLookup,
    RecordLookup,
    ProviderWrite,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::IpResolution => write!(f, "ip-resolution"),
            Stage::DomainLookup => write!(f, "domain-lookup"),
            Stage::RecordLookup => write!(f, "record-lookup"),
            Stage::ProviderWrite => write!(f, "provider-write"),
        }
    }
}

/// The record an operation was working on when it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordContext {
    pub domain: String,
    pub name: String,
    pub record_type: RecordType,
    pub value: Option<String>,
}

impl fmt::Display for RecordContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} in {}", self.name, self.record_type, self.domain)?;
        if let Some(value) = &self.value {
            write!(f, " with data {}", value)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unable to determine current IP for {context}")]
    IpResolutionFailed {
        context: RecordContext,
        #[source]
        source: BoxError,
    },

    #[error("domain {} not found for current account", context.domain)]
    DomainNotFound { context: RecordContext },

    #[error("{stage} failed for {context}")]
    LookupFailed {
        stage: Stage,
        context: RecordContext,
        #[source]
        source: BoxError,
    },

    #[error("cannot {action} record {context}")]
    ProviderRequestFailed {
        action: Action,
        context: RecordContext,
        #[source]
        source: BoxError,
    },
}

impl EngineError {
    pub fn stage(&self) -> Stage {
        match self {
            EngineError::IpResolutionFailed { .. } => Stage::IpResolution,
            EngineError::DomainNotFound { .. } => Stage::DomainLookup,
            EngineError::LookupFailed { stage, .. } => *stage,
            EngineError::ProviderRequestFailed { .. } => Stage::ProviderWrite,
        }
    }

    pub fn context(&self) -> &RecordContext {
        match self {
            EngineError::IpResolutionFailed { context, .. }
            | EngineError::DomainNotFound { context }
            | EngineError::LookupFailed { context, .. }
            | EngineError::ProviderRequestFailed { context, .. } => context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> RecordContext {
        RecordContext {
            domain: "example.com".to_string(),
            name: "home".to_string(),
            record_type: RecordType::A,
            value: Some("1.2.3.4".to_string()),
        }
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::IpResolution.to_string(), "ip-resolution");
        assert_eq!(Stage::DomainLookup.to_string(), "domain-lookup");
        assert_eq!(Stage::RecordLookup.to_string(), "record-lookup");
        assert_eq!(Stage::ProviderWrite.to_string(), "provider-write");
    }

    #[test]
    fn test_error_message_carries_context() {
        let err = EngineError::ProviderRequestFailed {
            action: Action::Update { id: 7 },
            context: context(),
            source: "DNSimple API error (500): boom".into(),
        };

        assert_eq!(err.stage(), Stage::ProviderWrite);
        assert_eq!(
            err.to_string(),
            "cannot update record home A in example.com with data 1.2.3.4"
        );
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("boom"));
    }

    #[test]
    fn test_domain_not_found_message() {
        let err = EngineError::DomainNotFound { context: context() };
        assert_eq!(err.stage(), Stage::DomainLookup);
        assert_eq!(err.context().domain, "example.com");
        assert_eq!(err.to_string(), "domain example.com not found for current account");
    }
}
