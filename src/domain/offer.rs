use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::business::{OfferDraft, OfferStatus, OfferTotals, WorkflowEngine};

/// An operator's priced, time-limited response to an inquiry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub id: Uuid,
    pub inquiry_id: Uuid,
    pub author_id: Uuid,
    pub status: OfferStatus,
    pub draft: OfferDraft,
    /// Bumped by the store on every write
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Offer {
    pub fn new(inquiry_id: Uuid, author_id: Uuid, draft: OfferDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            inquiry_id,
            author_id,
            status: OfferStatus::Draft,
            draft,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Status as seen at `today`, with lazy expiry applied
    pub fn effective_status(&self, today: NaiveDate) -> OfferStatus {
        WorkflowEngine::effective_offer_status(self.status, self.draft.valid_until, today)
    }

    pub fn totals(&self) -> OfferTotals {
        self.draft.totals()
    }
}
