use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use crate::domain::{
    Address, AddressFields, AddressParams, CreateOrUpdateParams, Enrollment, EnrollmentParams,
};
use crate::lookup::{LookupError, PostalLookup, PostalLookupResult};
use crate::repository::{
    AddressRepository, EnrollmentRepository, RepositoryError,
};

/// In-memory stand-in for both stores, with call counters so tests can assert
/// that rejected submissions never reach persistence.
#[derive(Default)]
pub(super) struct MemoryStore {
    enrollments: Mutex<HashMap<i64, Enrollment>>,
    addresses: Mutex<HashMap<i64, Address>>,
    sequence: AtomicI64,
    pub(super) enrollment_upserts: AtomicUsize,
    pub(super) address_upserts: AtomicUsize,
    pub(super) fail_address_upsert: AtomicBool,
    pub(super) fail_find: AtomicBool,
}

impl MemoryStore {
    fn next_id(&self) -> i64 {
        self.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(super) fn enrollment_count(&self) -> usize {
        self.enrollments.lock().expect("store mutex poisoned").len()
    }

    pub(super) fn address_count(&self) -> usize {
        self.addresses.lock().expect("store mutex poisoned").len()
    }

    pub(super) fn seed_enrollment(&self, user_id: i64, params: EnrollmentParams) -> Enrollment {
        let now = Utc::now();
        let enrollment = Enrollment {
            id: self.next_id(),
            user_id,
            name: params.name,
            document_id: params.document_id,
            birth_date: params.birth_date,
            phone: params.phone,
            created_at: now,
            updated_at: now,
        };
        self.enrollments
            .lock()
            .expect("store mutex poisoned")
            .insert(user_id, enrollment.clone());
        enrollment
    }
}

#[async_trait]
impl EnrollmentRepository for MemoryStore {
    async fn find_with_address_by_user_id(
        &self,
        user_id: i64,
    ) -> Result<Option<(Enrollment, Option<Address>)>, RepositoryError> {
        if self.fail_find.load(Ordering::Relaxed) {
            return Err(RepositoryError::Unavailable(
                "enrollment store offline".to_string(),
            ));
        }
        let enrollments = self.enrollments.lock().expect("store mutex poisoned");
        let Some(enrollment) = enrollments.get(&user_id).cloned() else {
            return Ok(None);
        };
        let address = self
            .addresses
            .lock()
            .expect("store mutex poisoned")
            .get(&enrollment.id)
            .cloned();
        Ok(Some((enrollment, address)))
    }

    async fn upsert(
        &self,
        user_id: i64,
        params: EnrollmentParams,
    ) -> Result<Enrollment, RepositoryError> {
        self.enrollment_upserts.fetch_add(1, Ordering::Relaxed);
        let mut enrollments = self.enrollments.lock().expect("store mutex poisoned");
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
impl AddressRepository for MemoryStore {
    async fn upsert(
        &self,
        enrollment_id: i64,
        fields: AddressFields,
    ) -> Result<Address, RepositoryError> {
        self.address_upserts.fetch_add(1, Ordering::Relaxed);
        if self.fail_address_upsert.load(Ordering::Relaxed) {
            return Err(RepositoryError::Unavailable(
                "address store offline".to_string(),
            ));
        }
        let mut addresses = self.addresses.lock().expect("store mutex poisoned");
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

/// Scripted lookup outcomes so the orchestrator can be driven without network.
pub(super) enum ScriptedOutcome {
    Resolved(PostalLookupResult),
    Malformed,
    Unknown,
    Offline,
}

pub(super) struct ScriptedLookup {
    outcome: ScriptedOutcome,
    pub(super) calls: AtomicUsize,
}

impl ScriptedLookup {
    pub(super) fn new(outcome: ScriptedOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl PostalLookup for ScriptedLookup {
    async fn resolve(&self, _postal_code: &str) -> Result<PostalLookupResult, LookupError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        match &self.outcome {
            ScriptedOutcome::Resolved(result) => Ok(result.clone()),
            ScriptedOutcome::Malformed => Err(LookupError::Request {
                status: 400,
                status_text: "Bad Request".to_string(),
            }),
            ScriptedOutcome::Unknown => Err(LookupError::NotFound),
            ScriptedOutcome::Offline => Err(LookupError::Decode(
                serde_json::from_str::<serde_json::Value>("").expect_err("empty body"),
            )),
        }
    }
}

pub(super) fn resolved_se() -> PostalLookupResult {
    PostalLookupResult {
        street: "Praça da Sé".to_string(),
        complement: "lado ímpar".to_string(),
        neighborhood: "Sé".to_string(),
        city: "São Paulo".to_string(),
        state: "SP".to_string(),
    }
}

pub(super) fn enrollment_params() -> EnrollmentParams {
    EnrollmentParams {
        name: "Ana Souza".to_string(),
        document_id: "123.456.789-00".to_string(),
        birth_date: NaiveDate::from_ymd_opt(1990, 4, 12).expect("valid date"),
        phone: "(11) 98765-4321".to_string(),
    }
}

pub(super) fn submission(user_id: i64, postal_code: &str) -> CreateOrUpdateParams {
    CreateOrUpdateParams {
        user_id,
        enrollment: enrollment_params(),
        address: AddressParams {
            postal_code: postal_code.to_string(),
            ..AddressParams::default()
        },
    }
}
