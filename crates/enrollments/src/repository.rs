use async_trait::async_trait;

use crate::domain::{Address, AddressFields, Enrollment, EnrollmentParams};

/// Storage abstraction for enrollments so the orchestrator can be exercised
/// in isolation. `upsert` creates the enrollment for the user when absent and
/// overwrites its scalar fields otherwise.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    async fn find_with_address_by_user_id(
        &self,
        user_id: i64,
    ) -> Result<Option<(Enrollment, Option<Address>)>, RepositoryError>;

    async fn upsert(
        &self,
        user_id: i64,
        params: EnrollmentParams,
    ) -> Result<Enrollment, RepositoryError>;
}

/// Storage abstraction for addresses, keyed by owning enrollment.
#[async_trait]
pub trait AddressRepository: Send + Sync {
    async fn upsert(
        &self,
        enrollment_id: i64,
        fields: AddressFields,
    ) -> Result<Address, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
