use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, warn};

use crate::domain::{AddressFields, CreateOrUpdateParams, EnrollmentParams, EnrollmentView};
use crate::lookup::{LookupError, PostalLookup, PostalLookupResult};
use crate::repository::{AddressRepository, EnrollmentRepository};

/// Error kinds surfaced by the orchestrator. Lookup and persistence failures
/// on the write path are normalized to `InvalidData` here; the underlying
/// cause is logged before normalization and never reclassified further up.
/// Read-path store outages are reported as `Unavailable` instead, so callers
/// can distinguish bad input from broken infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum EnrollmentServiceError {
    #[error("no enrollment found for user")]
    NotFound,
    #[error("invalid enrollment data")]
    InvalidData,
    #[error("enrollment store unavailable")]
    Unavailable,
}

/// One lock per user id so concurrent submissions for the same user cannot
/// interleave their enrollment and address writes. Entries are evicted once
/// no submission holds or waits on them; different users proceed in parallel.
#[derive(Default)]
struct UserLocks {
    locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl UserLocks {
    async fn acquire(&self, user_id: i64) -> Arc<Mutex<()>> {
        let mut registry = self.locks.lock().await;
        registry
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the registry entry when the registry holds the only remaining
    /// reference. A waiter still holding a clone keeps the entry alive, so
    /// late acquirers always observe the same mutex.
    async fn release(&self, user_id: i64) {
        let mut registry = self.locks.lock().await;
        let uncontended = registry
            .get(&user_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if uncontended {
            registry.remove(&user_id);
        }
    }
}

/// Orchestrator composing the postal lookup with the enrollment and address
/// stores. Presents a single success/failure outcome per call.
pub struct EnrollmentService<E, A, L> {
    enrollments: Arc<E>,
    addresses: Arc<A>,
    lookup: Arc<L>,
    user_locks: UserLocks,
}

impl<E, A, L> EnrollmentService<E, A, L>
where
    E: EnrollmentRepository + 'static,
    A: AddressRepository + 'static,
    L: PostalLookup + 'static,
{
    pub fn new(enrollments: Arc<E>, addresses: Arc<A>, lookup: Arc<L>) -> Self {
        Self {
            enrollments,
            addresses,
            lookup,
            user_locks: UserLocks::default(),
        }
    }

    /// Fetch the enrollment for a user, joined with its address when one
    /// exists. Read-path `NotFound` is left un-normalized so handlers can map
    /// it to an empty-result response distinct from a hard error.
    pub async fn get_one_with_address(
        &self,
        user_id: i64,
    ) -> Result<EnrollmentView, EnrollmentServiceError> {
        let found = self
            .enrollments
            .find_with_address_by_user_id(user_id)
            .await
            .map_err(|err| {
                error!(user_id, %err, "enrollment read failed");
                EnrollmentServiceError::Unavailable
            })?;

        let (enrollment, address) = found.ok_or(EnrollmentServiceError::NotFound)?;
        Ok(EnrollmentView::project(enrollment, address))
    }

    /// Validate the submitted postal code, then upsert enrollment and address
    /// as one logical unit. Nothing is persisted when the lookup rejects the
    /// code; a partial commit is surfaced as failure without compensation.
    pub async fn create_or_update(
        &self,
        params: CreateOrUpdateParams,
    ) -> Result<(), EnrollmentServiceError> {
        let CreateOrUpdateParams {
            user_id,
            enrollment: enrollment_params,
            address: address_params,
        } = params;

        let resolved = match self.lookup.resolve(&address_params.postal_code).await {
            Ok(resolved) => resolved,
            Err(err @ (LookupError::Request { .. } | LookupError::NotFound)) => {
                warn!(user_id, %err, "submitted postal code rejected");
                return Err(EnrollmentServiceError::InvalidData);
            }
            Err(err) => {
                error!(user_id, %err, "postal lookup failed");
                return Err(EnrollmentServiceError::InvalidData);
            }
        };

        let fields = AddressFields::reconcile(address_params, &resolved);

        let lock = self.user_locks.acquire(user_id).await;
        let outcome = {
            let _serialized = lock.lock().await;
            self.persist_pair(user_id, enrollment_params, fields).await
        };
        drop(lock);
        self.user_locks.release(user_id).await;
        outcome
    }

    async fn persist_pair(
        &self,
        user_id: i64,
        enrollment_params: EnrollmentParams,
        fields: AddressFields,
    ) -> Result<(), EnrollmentServiceError> {
        let enrollment = self
            .enrollments
            .upsert(user_id, enrollment_params)
            .await
            .map_err(|err| {
                error!(user_id, %err, "enrollment upsert failed");
                EnrollmentServiceError::InvalidData
            })?;

        if let Err(err) = self.addresses.upsert(enrollment.id, fields).await {
            // The enrollment row is already committed at this point; the
            // inconsistency is surfaced to the caller, not rolled back.
            error!(
                user_id,
                enrollment_id = enrollment.id,
                %err,
                "address upsert failed after enrollment commit"
            );
            return Err(EnrollmentServiceError::InvalidData);
        }

        Ok(())
    }

    /// Resolve a postal code without touching the stores.
    pub async fn resolve_postal_code(
        &self,
        postal_code: &str,
    ) -> Result<PostalLookupResult, LookupError> {
        self.lookup.resolve(postal_code).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn user_lock_entry_is_evicted_once_uncontended() {
        let locks = UserLocks::default();

        let lock = locks.acquire(7).await;
        {
            let _guard = lock.lock().await;
        }
        drop(lock);
        locks.release(7).await;

        assert_eq!(locks.locks.lock().await.len(), 0);
    }

    #[tokio::test]
    async fn user_lock_entry_survives_while_another_holder_waits() {
        let locks = UserLocks::default();

        let first = locks.acquire(7).await;
        let second = locks.acquire(7).await;

        drop(first);
        locks.release(7).await;
        assert_eq!(locks.locks.lock().await.len(), 1);

        // The late holder still sees the original mutex.
        let third = locks.acquire(7).await;
        assert!(Arc::ptr_eq(&second, &third));

        drop(second);
        drop(third);
        locks.release(7).await;
        assert_eq!(locks.locks.lock().await.len(), 0);
    }
}
