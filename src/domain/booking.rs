use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::business::{BookingStatus, OfferTotals, ServiceAllocation, SpaceAllocation};
use crate::domain::{DateRange, Inquiry, Offer};

/// Binding record created once an offer is accepted. Allocations and totals
/// are copied so later changes to the offer cannot alter it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub offer_id: Uuid,
    pub inquiry_id: Uuid,
    pub requester_id: Uuid,
    pub date_range: DateRange,
    pub space_allocations: Vec<SpaceAllocation>,
    pub service_allocations: Vec<ServiceAllocation>,
    pub totals: OfferTotals,
    pub status: BookingStatus,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn from_accepted_offer(offer: &Offer, inquiry: &Inquiry, created_by: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            offer_id: offer.id,
            inquiry_id: inquiry.id,
            requester_id: inquiry.requester_id,
            date_range: inquiry.date_range,
            space_allocations: offer.draft.space_allocations().to_vec(),
            service_allocations: offer.draft.service_allocations().to_vec(),
            totals: offer.totals(),
            status: BookingStatus::Active,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }
}
