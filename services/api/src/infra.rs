use async_trait::async_trait;
use chrono::Utc;
use enrollments::domain::{Address, AddressFields, Enrollment, EnrollmentParams};
use enrollments::repository::{AddressRepository, EnrollmentRepository, RepositoryError};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local store backing both repository seams. Enrollments are keyed
/// by user id, addresses by enrollment id, with one shared id sequence.
#[derive(Default)]
pub(crate) struct InMemoryStore {
    enrollments: Mutex<HashMap<i64, Enrollment>>,
    addresses: Mutex<HashMap<i64, Address>>,
    sequence: AtomicI64,
}

impl InMemoryStore {
    fn next_id(&self) -> i64 {
        self.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryStore {
    async fn find_with_address_by_user_id(
        &self,
        user_id: i64,
    ) -> Result<Option<(Enrollment, Option<Address>)>, RepositoryError> {
        let enrollments = self.enrollments.lock().expect("enrollment mutex poisoned");
        let Some(enrollment) = enrollments.get(&user_id).cloned() else {
            return Ok(None);
        };
        let address = self
            .addresses
            .lock()
            .expect("address mutex poisoned")
            .get(&enrollment.id)
            .cloned();
        Ok(Some((enrollment, address)))
    }

    async fn upsert(
        &self,
        user_id: i64,
        params: EnrollmentParams,
    ) -> Result<Enrollment, RepositoryError> {
        let mut enrollments = self.enrollments.lock().expect("enrollment mutex poisoned");
        let now = Utc::now();
        let enrollment = match enrollments.get(&user_id) {
            Some(existing) => Enrollment {
                name: params.name,
                document_id: params.document_id,
                birth_date: params.birth_date,
                phone: params.phone,
                updated_at: now,
                ..existing.clone()
            },
            None => Enrollment {
                id: self.next_id(),
                user_id,
                name: params.name,
                document_id: params.document_id,
                birth_date: params.birth_date,
                phone: params.phone,
                created_at: now,
                updated_at: now,
            },
        };
        enrollments.insert(user_id, enrollment.clone());
        Ok(enrollment)
    }
}

#[async_trait]
impl AddressRepository for InMemoryStore {
    async fn upsert(
        &self,
        enrollment_id: i64,
        fields: AddressFields,
    ) -> Result<Address, RepositoryError> {
        let mut addresses = self.addresses.lock().expect("address mutex poisoned");
        let now = Utc::now();
        let address = match addresses.get(&enrollment_id) {
            Some(existing) => Address {
                postal_code: fields.postal_code,
                street: fields.street,
                complement: fields.complement,
                neighborhood: fields.neighborhood,
                city: fields.city,
                state: fields.state,
                address_detail: fields.address_detail,
                updated_at: now,
                ..existing.clone()
            },
            None => Address {
                id: self.next_id(),
                enrollment_id,
                postal_code: fields.postal_code,
                street: fields.street,
                complement: fields.complement,
                neighborhood: fields.neighborhood,
                city: fields.city,
                state: fields.state,
                address_detail: fields.address_detail,
                created_at: now,
                updated_at: now,
            },
        };
        addresses.insert(enrollment_id, address.clone());
        Ok(address)
    }
}
