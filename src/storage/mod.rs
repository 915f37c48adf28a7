pub mod catalog;
pub mod memory;
pub mod notifications;

pub use catalog::*;
pub use memory::*;
pub use notifications::*;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::business::{BookingStatus, InquiryStatus, OfferDraft, OfferStatus};
use crate::domain::{Booking, DateRange, Inquiry, Money, Offer};
use crate::error::{BrokerError, EntityKind, StateConflictError, ValidationError, ValidationRule};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: Uuid },

    /// Compare-and-set failed: the record moved on since the caller read it
    #[error("{entity} {id} is {actual}")]
    StaleStatus {
        entity: EntityKind,
        id: Uuid,
        actual: String,
    },

    /// Compare-and-set failed: the record was rewritten since the caller read it
    #[error("{entity} {id} is at version {actual}")]
    StaleVersion { entity: EntityKind, id: Uuid, actual: u64 },

    /// A pending inquiry already holds the claimed space for overlapping dates
    #[error("space {space_id} is held by inquiry {holder}")]
    SpaceHeld { space_id: Uuid, holder: Uuid },

    #[error("Storage backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    /// Map into the domain taxonomy, naming the action that lost the race
    pub fn during(self, action: &str) -> BrokerError {
        match self {
            StoreError::NotFound { entity, id } => BrokerError::not_found(entity, id),
            StoreError::StaleStatus { entity, id, actual } => StateConflictError {
                entity,
                id,
                status: actual,
                action: action.to_string(),
            }
            .into(),
            StoreError::StaleVersion { entity, id, actual } => StateConflictError {
                entity,
                id,
                status: format!("at version {}", actual),
                action: action.to_string(),
            }
            .into(),
            StoreError::SpaceHeld { holder, .. } => {
                ValidationError::new("date_range", ValidationRule::OverlapsPendingInquiry(holder)).into()
            }
            StoreError::Backend(e) => BrokerError::Storage(e),
        }
    }
}

impl From<StoreError> for BrokerError {
    fn from(err: StoreError) -> Self {
        err.during("update")
    }
}

/// Status the writer observed and the status it wants to move to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange<S> {
    pub expected: S,
    pub next: S,
}

impl<S> StatusChange<S> {
    pub fn new(expected: S, next: S) -> Self {
        Self { expected, next }
    }
}

/// Single space an inquiry wants for its dates. The store refuses the write
/// while another pending inquiry holds the same space for overlapping dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpaceClaim {
    pub space_id: Uuid,
    pub date_range: DateRange,
}

#[derive(Debug, Clone)]
pub struct InquiryWrite {
    pub inquiry_id: Uuid,
    pub status: StatusChange<InquiryStatus>,
    /// Replaces the stored estimate when set
    pub estimated_cost: Option<Money>,
    pub claim: Option<SpaceClaim>,
    /// Expire the inquiry's draft or sent offer in the same write
    pub withdraw_offer: bool,
    pub now: DateTime<Utc>,
}

impl InquiryWrite {
    pub fn new(inquiry_id: Uuid, status: StatusChange<InquiryStatus>, now: DateTime<Utc>) -> Self {
        Self {
            inquiry_id,
            status,
            estimated_cost: None,
            claim: None,
            withdraw_offer: false,
            now,
        }
    }
}

/// New content for an inquiry. `inquiry.status` and `inquiry.version` are
/// the values the writer read; the store rejects the write if either moved.
#[derive(Debug, Clone)]
pub struct InquiryRevision {
    pub inquiry: Inquiry,
    pub claim: Option<SpaceClaim>,
    pub now: DateTime<Utc>,
}

/// New content for a draft offer, based on the version the writer read
#[derive(Debug, Clone)]
pub struct DraftReplace {
    pub offer_id: Uuid,
    pub expected_version: u64,
    pub draft: OfferDraft,
    pub now: DateTime<Utc>,
}

/// Save an inquiry's draft offer. The store upserts the active draft, or
/// supersedes a sent offer, in the same critical section as the inquiry move.
#[derive(Debug, Clone)]
pub struct DraftWrite {
    pub inquiry_id: Uuid,
    pub author_id: Uuid,
    pub draft: OfferDraft,
    pub inquiry: StatusChange<InquiryStatus>,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SavedDraft {
    pub offer: Offer,
    pub inquiry: Inquiry,
    /// Sent offer that this draft replaced
    pub superseded: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct OfferWrite {
    pub offer_id: Uuid,
    pub offer: StatusChange<OfferStatus>,
    pub inquiry: Option<StatusChange<InquiryStatus>>,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct BookingWrite {
    pub booking: Booking,
    pub inquiry: StatusChange<InquiryStatus>,
}

#[derive(Debug, Clone)]
pub struct BookingOutcome {
    pub booking: Booking,
    /// False when a booking for the offer already existed
    pub created: bool,
}

#[derive(Debug, Clone)]
pub struct BookingStatusWrite {
    pub booking_id: Uuid,
    pub booking: StatusChange<BookingStatus>,
    pub inquiry: Option<StatusChange<InquiryStatus>>,
    pub now: DateTime<Utc>,
}

/// Persistence collaborator. Every write re-checks the statuses the caller
/// observed under the store's own lock and fails with
/// [`StoreError::StaleStatus`] when they no longer hold.
#[async_trait]
pub trait BrokerageStore: Send + Sync {
    async fn insert_inquiry(&self, inquiry: Inquiry) -> Result<(), StoreError>;

    async fn get_inquiry(&self, id: Uuid) -> Result<Option<Inquiry>, StoreError>;

    /// Inquiries on the single-space path that target `space_id`
    async fn inquiries_for_space(&self, space_id: Uuid) -> Result<Vec<Inquiry>, StoreError>;

    async fn update_inquiry(&self, write: InquiryWrite) -> Result<Inquiry, StoreError>;

    async fn revise_inquiry(&self, write: InquiryRevision) -> Result<Inquiry, StoreError>;

    async fn get_offer(&self, id: Uuid) -> Result<Option<Offer>, StoreError>;

    /// The inquiry's draft or sent offer, if any
    async fn active_offer(&self, inquiry_id: Uuid) -> Result<Option<Offer>, StoreError>;

    async fn save_draft(&self, write: DraftWrite) -> Result<SavedDraft, StoreError>;

    /// Replace the content of a draft offer without changing any status
    async fn replace_draft(&self, write: DraftReplace) -> Result<Offer, StoreError>;

    async fn transition_offer(&self, write: OfferWrite) -> Result<(Offer, Option<Inquiry>), StoreError>;

    /// Idempotent per offer: a second call returns the existing booking
    async fn create_booking(&self, write: BookingWrite) -> Result<BookingOutcome, StoreError>;

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;

    async fn booking_for_offer(&self, offer_id: Uuid) -> Result<Option<Booking>, StoreError>;

    async fn update_booking_status(
        &self,
        write: BookingStatusWrite,
    ) -> Result<(Booking, Option<Inquiry>), StoreError>;
}
