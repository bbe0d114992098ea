//! The injected persistence contract.

use vp_proto::GroupState;

use crate::error::StoreError;

/// Capability handed to the membership coordinator. Keyed by group id.
///
/// `put` must be atomic with respect to readers in the same process; a
/// failed `put` leaves the previously stored state authoritative.
/// Cross-process locking is the store owner's concern, not the
/// protocol's.
#[allow(async_fn_in_trait)]
pub trait GroupStore {
    async fn get(&self, group_id: &str) -> Result<Option<GroupState>, StoreError>;

    async fn put(&self, state: &GroupState) -> Result<(), StoreError>;

    async fn delete(&self, group_id: &str) -> Result<(), StoreError>;

    async fn list(&self) -> Result<Vec<String>, StoreError>;
}
