use tracing::debug;

use super::error::EngineError;
use super::reconcile::{decide, DesiredRecord, Outcome, Reconciler};
use crate::dns::ZoneRecord;

/// Caller-facing operations. Each one resolves remote state first, so a
/// missing domain or failed lookup aborts before anything is written.
impl Reconciler {
    /// Always creates a new record, whether or not a matching one exists.
    pub async fn create(&self, desired: DesiredRecord) -> Result<ZoneRecord, EngineError> {
        let ctx = self.resolve(desired).await?;
        debug!(record_exists = ctx.record_exists(), "Forcing create");
        self.create_remote(&ctx).await
    }

    /// Removes the matching record. Returns its id, or `None` if there was nothing to remove.
    pub async fn delete(&self, desired: DesiredRecord) -> Result<Option<u64>, EngineError> {
        let ctx = self.resolve(desired).await?;

        let Some(existing) = ctx.remote.as_ref() else {
            debug!(name = ctx.desired.name(), zone = %ctx.zone.name, "Record absent, nothing to delete");
            return Ok(None);
        };

        self.delete_remote(&ctx, existing.id).await.map(Some)
    }

    /// Creates the record if absent and updates it otherwise. An existing
    /// `AAAA` record is deleted instead (see [`decide`]).
    pub async fn upsert(&self, desired: DesiredRecord) -> Result<Outcome, EngineError> {
        let ctx = self.resolve(desired).await?;
        let action = decide(&ctx);
        self.execute(&ctx, action).await
    }
}
