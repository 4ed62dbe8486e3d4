use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::lookup::PostalLookupResult;

/// Persisted enrollment record. Exactly one per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub document_id: String,
    pub birth_date: NaiveDate,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persisted postal address. At most one per enrollment, and its postal code
/// has been checked against the lookup service at the last successful upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: i64,
    pub enrollment_id: i64,
    pub postal_code: String,
    pub street: String,
    pub complement: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub address_detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Scalar enrollment fields accepted on submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentParams {
    pub name: String,
    pub document_id: String,
    pub birth_date: NaiveDate,
    pub phone: String,
}

/// Submitted address payload. Only the postal code is mandatory; the other
/// fields, when present, override whatever the lookup resolves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressParams {
    pub postal_code: String,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub complement: Option<String>,
    #[serde(default)]
    pub neighborhood: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub address_detail: Option<String>,
}

/// Full create-or-update submission: enrollment scalars plus the nested
/// address payload, keyed by the owning user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOrUpdateParams {
    pub user_id: i64,
    pub enrollment: EnrollmentParams,
    pub address: AddressParams,
}

/// Reconciled, persistable address fields: the submission wins wherever it is
/// explicit, the lookup fills the gaps, and a blank detail field is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressFields {
    pub postal_code: String,
    pub street: String,
    pub complement: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub address_detail: Option<String>,
}

impl AddressFields {
    pub fn reconcile(submitted: AddressParams, resolved: &PostalLookupResult) -> Self {
        Self {
            postal_code: submitted.postal_code,
            street: submitted.street.unwrap_or_else(|| resolved.street.clone()),
            complement: submitted
                .complement
                .unwrap_or_else(|| resolved.complement.clone()),
            neighborhood: submitted
                .neighborhood
                .unwrap_or_else(|| resolved.neighborhood.clone()),
            city: submitted.city.unwrap_or_else(|| resolved.city.clone()),
            state: submitted.state.unwrap_or_else(|| resolved.state.clone()),
            address_detail: submitted
                .address_detail
                .filter(|detail| !detail.trim().is_empty()),
        }
    }
}

/// Address projection exposed to callers. Omits the enrollment back-reference
/// and the bookkeeping timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressView {
    pub id: i64,
    pub postal_code: String,
    pub street: String,
    pub complement: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_detail: Option<String>,
}

impl From<Address> for AddressView {
    fn from(address: Address) -> Self {
        Self {
            id: address.id,
            postal_code: address.postal_code,
            street: address.street,
            complement: address.complement,
            neighborhood: address.neighborhood,
            city: address.city,
            state: address.state,
            address_detail: address.address_detail,
        }
    }
}

/// Enrollment projection exposed to callers. Omits the owning user id and the
/// bookkeeping timestamps; the address key is absent (not null) when the
/// enrollment has no address yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentView {
    pub id: i64,
    pub name: String,
    pub document_id: String,
    pub birth_date: NaiveDate,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<AddressView>,
}

impl EnrollmentView {
    pub fn project(enrollment: Enrollment, address: Option<Address>) -> Self {
        Self {
            id: enrollment.id,
            name: enrollment.name,
            document_id: enrollment.document_id,
            birth_date: enrollment.birth_date,
            phone: enrollment.phone,
            address: address.map(AddressView::from),
        }
    }
}
