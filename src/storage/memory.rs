use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{
    BookingOutcome, BookingStatusWrite, BookingWrite, BrokerageStore, DraftReplace, DraftWrite,
    InquiryRevision, InquiryWrite, OfferWrite, SavedDraft, SpaceClaim, StoreError,
};
use crate::business::{InquiryStatus, OfferStatus};
use crate::domain::{Booking, Inquiry, Offer};
use crate::error::EntityKind;

#[derive(Default)]
struct State {
    inquiries: HashMap<Uuid, Inquiry>,
    offers: HashMap<Uuid, Offer>,
    bookings: HashMap<Uuid, Booking>,
    booking_by_offer: HashMap<Uuid, Uuid>,
}

impl State {
    fn inquiry(&self, id: Uuid) -> Result<&Inquiry, StoreError> {
        self.inquiries.get(&id).ok_or(StoreError::NotFound {
            entity: EntityKind::Inquiry,
            id,
        })
    }

    fn inquiry_mut(&mut self, id: Uuid) -> Result<&mut Inquiry, StoreError> {
        self.inquiries.get_mut(&id).ok_or(StoreError::NotFound {
            entity: EntityKind::Inquiry,
            id,
        })
    }

    fn offer(&self, id: Uuid) -> Result<&Offer, StoreError> {
        self.offers.get(&id).ok_or(StoreError::NotFound {
            entity: EntityKind::Offer,
            id,
        })
    }

    fn offer_mut(&mut self, id: Uuid) -> Result<&mut Offer, StoreError> {
        self.offers.get_mut(&id).ok_or(StoreError::NotFound {
            entity: EntityKind::Offer,
            id,
        })
    }

    fn expect_inquiry(&self, id: Uuid, expected: InquiryStatus) -> Result<(), StoreError> {
        let inquiry = self.inquiry(id)?;
        if inquiry.status != expected {
            return Err(StoreError::StaleStatus {
                entity: EntityKind::Inquiry,
                id,
                actual: inquiry.status.as_str().to_string(),
            });
        }
        Ok(())
    }

    fn expect_offer(&self, id: Uuid, expected: OfferStatus) -> Result<(), StoreError> {
        let offer = self.offer(id)?;
        if offer.status != expected {
            return Err(StoreError::StaleStatus {
                entity: EntityKind::Offer,
                id,
                actual: offer.status.as_str().to_string(),
            });
        }
        Ok(())
    }

    fn set_inquiry_status(
        &mut self,
        id: Uuid,
        status: InquiryStatus,
        now: DateTime<Utc>,
    ) -> Result<Inquiry, StoreError> {
        let inquiry = self.inquiry_mut(id)?;
        inquiry.status = status;
        inquiry.version += 1;
        inquiry.updated_at = now;
        Ok(inquiry.clone())
    }

    fn set_offer_status(&mut self, id: Uuid, status: OfferStatus, now: DateTime<Utc>) -> Result<Offer, StoreError> {
        let offer = self.offer_mut(id)?;
        offer.status = status;
        offer.version += 1;
        offer.updated_at = now;
        Ok(offer.clone())
    }

    fn active_offer_of(&self, inquiry_id: Uuid) -> Option<&Offer> {
        self.offers
            .values()
            .find(|o| o.inquiry_id == inquiry_id && o.status.is_active())
    }

    /// Refuse the claim while another pending inquiry holds the space
    fn check_claim(&self, inquiry_id: Uuid, claim: Option<SpaceClaim>) -> Result<(), StoreError> {
        let Some(claim) = claim else {
            return Ok(());
        };
        let holder = self
            .inquiries
            .values()
            .find(|other| other.id != inquiry_id && other.holds_space(claim.space_id, &claim.date_range));
        match holder {
            Some(holder) => Err(StoreError::SpaceHeld {
                space_id: claim.space_id,
                holder: holder.id,
            }),
            None => Ok(()),
        }
    }
}

/// In-memory reference store. A single lock guards all records, so each
/// compound write is one critical section.
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerageStore for MemoryStore {
    async fn insert_inquiry(&self, inquiry: Inquiry) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        debug!("Storing inquiry {}", inquiry.id);
        state.inquiries.insert(inquiry.id, inquiry);
        Ok(())
    }

    async fn get_inquiry(&self, id: Uuid) -> Result<Option<Inquiry>, StoreError> {
        let state = self.state.read().await;
        Ok(state.inquiries.get(&id).cloned())
    }

    async fn inquiries_for_space(&self, space_id: Uuid) -> Result<Vec<Inquiry>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .inquiries
            .values()
            .filter(|i| i.space_id == Some(space_id))
            .cloned()
            .collect())
    }

    async fn update_inquiry(&self, write: InquiryWrite) -> Result<Inquiry, StoreError> {
        let mut state = self.state.write().await;
        state.expect_inquiry(write.inquiry_id, write.status.expected)?;
        state.check_claim(write.inquiry_id, write.claim)?;

        if write.withdraw_offer {
            if let Some(active) = state.active_offer_of(write.inquiry_id).map(|o| o.id) {
                state.set_offer_status(active, OfferStatus::Expired, write.now)?;
                debug!("Withdrew offer {} of inquiry {}", active, write.inquiry_id);
            }
        }

        if let Some(cost) = write.estimated_cost {
            state.inquiry_mut(write.inquiry_id)?.estimated_cost = cost;
        }
        state.set_inquiry_status(write.inquiry_id, write.status.next, write.now)
    }

    async fn revise_inquiry(&self, write: InquiryRevision) -> Result<Inquiry, StoreError> {
        let mut state = self.state.write().await;
        let revised = write.inquiry;
        let stored = state.inquiry(revised.id)?;
        if stored.status != revised.status {
            return Err(StoreError::StaleStatus {
                entity: EntityKind::Inquiry,
                id: revised.id,
                actual: stored.status.as_str().to_string(),
            });
        }
        if stored.version != revised.version {
            return Err(StoreError::StaleVersion {
                entity: EntityKind::Inquiry,
                id: revised.id,
                actual: stored.version,
            });
        }
        state.check_claim(revised.id, write.claim)?;

        let inquiry = state.inquiry_mut(revised.id)?;
        let (requester_id, created_at) = (inquiry.requester_id, inquiry.created_at);
        *inquiry = Inquiry {
            requester_id,
            created_at,
            version: revised.version + 1,
            updated_at: write.now,
            ..revised
        };
        Ok(inquiry.clone())
    }

    async fn get_offer(&self, id: Uuid) -> Result<Option<Offer>, StoreError> {
        let state = self.state.read().await;
        Ok(state.offers.get(&id).cloned())
    }

    async fn active_offer(&self, inquiry_id: Uuid) -> Result<Option<Offer>, StoreError> {
        let state = self.state.read().await;
        Ok(state.active_offer_of(inquiry_id).cloned())
    }

    async fn save_draft(&self, write: DraftWrite) -> Result<SavedDraft, StoreError> {
        let mut state = self.state.write().await;
        state.expect_inquiry(write.inquiry_id, write.inquiry.expected)?;

        let active = state.active_offer_of(write.inquiry_id).map(|o| (o.id, o.status));

        let mut superseded = None;
        let offer = match active {
            Some((id, OfferStatus::Draft)) => {
                let offer = state.offer_mut(id)?;
                offer.draft = write.draft;
                offer.author_id = write.author_id;
                offer.version += 1;
                offer.updated_at = write.now;
                offer.clone()
            }
            other => {
                if let Some((sent_id, _)) = other {
                    state.set_offer_status(sent_id, OfferStatus::Expired, write.now)?;
                    superseded = Some(sent_id);
                }
                let offer = Offer::new(write.inquiry_id, write.author_id, write.draft, write.now);
                state.offers.insert(offer.id, offer.clone());
                offer
            }
        };

        let inquiry = state.set_inquiry_status(write.inquiry_id, write.inquiry.next, write.now)?;
        debug!("Saved draft offer {} for inquiry {}", offer.id, inquiry.id);

        Ok(SavedDraft {
            offer,
            inquiry,
            superseded,
        })
    }

    async fn replace_draft(&self, write: DraftReplace) -> Result<Offer, StoreError> {
        let mut state = self.state.write().await;
        state.expect_offer(write.offer_id, OfferStatus::Draft)?;

        let offer = state.offer_mut(write.offer_id)?;
        if offer.version != write.expected_version {
            return Err(StoreError::StaleVersion {
                entity: EntityKind::Offer,
                id: write.offer_id,
                actual: offer.version,
            });
        }
        offer.draft = write.draft;
        offer.version += 1;
        offer.updated_at = write.now;
        Ok(offer.clone())
    }

    async fn transition_offer(&self, write: OfferWrite) -> Result<(Offer, Option<Inquiry>), StoreError> {
        let mut state = self.state.write().await;
        state.expect_offer(write.offer_id, write.offer.expected)?;
        let inquiry_id = state.offer(write.offer_id)?.inquiry_id;
        if let Some(change) = write.inquiry {
            state.expect_inquiry(inquiry_id, change.expected)?;
        }

        let offer = state.set_offer_status(write.offer_id, write.offer.next, write.now)?;

        let inquiry = match write.inquiry {
            Some(change) => Some(state.set_inquiry_status(inquiry_id, change.next, write.now)?),
            None => None,
        };

        Ok((offer, inquiry))
    }

    async fn create_booking(&self, write: BookingWrite) -> Result<BookingOutcome, StoreError> {
        let mut state = self.state.write().await;
        let offer_id = write.booking.offer_id;

        if let Some(existing) = state
            .booking_by_offer
            .get(&offer_id)
            .and_then(|id| state.bookings.get(id))
        {
            debug!("Booking {} already exists for offer {}", existing.id, offer_id);
            return Ok(BookingOutcome {
                booking: existing.clone(),
                created: false,
            });
        }

        state.expect_offer(offer_id, OfferStatus::Accepted)?;
        state.expect_inquiry(write.booking.inquiry_id, write.inquiry.expected)?;

        let booking = write.booking;
        state.booking_by_offer.insert(offer_id, booking.id);
        state.bookings.insert(booking.id, booking.clone());
        state.set_inquiry_status(booking.inquiry_id, write.inquiry.next, booking.created_at)?;

        Ok(BookingOutcome {
            booking,
            created: true,
        })
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let state = self.state.read().await;
        Ok(state.bookings.get(&id).cloned())
    }

    async fn booking_for_offer(&self, offer_id: Uuid) -> Result<Option<Booking>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .booking_by_offer
            .get(&offer_id)
            .and_then(|id| state.bookings.get(id))
            .cloned())
    }

    async fn update_booking_status(
        &self,
        write: BookingStatusWrite,
    ) -> Result<(Booking, Option<Inquiry>), StoreError> {
        let mut state = self.state.write().await;
        let not_found = StoreError::NotFound {
            entity: EntityKind::Booking,
            id: write.booking_id,
        };
        let booking = state.bookings.get(&write.booking_id).ok_or(not_found)?;
        if booking.status != write.booking.expected {
            return Err(StoreError::StaleStatus {
                entity: EntityKind::Booking,
                id: write.booking_id,
                actual: booking.status.as_str().to_string(),
            });
        }
        let inquiry_id = booking.inquiry_id;
        if let Some(change) = write.inquiry {
            state.expect_inquiry(inquiry_id, change.expected)?;
        }

        let booking = match state.bookings.get_mut(&write.booking_id) {
            Some(booking) => {
                booking.status = write.booking.next;
                booking.updated_at = write.now;
                booking.clone()
            }
            None => {
                return Err(StoreError::NotFound {
                    entity: EntityKind::Booking,
                    id: write.booking_id,
                })
            }
        };

        let inquiry = match write.inquiry {
            Some(change) => Some(state.set_inquiry_status(inquiry_id, change.next, write.now)?),
            None => None,
        };

        Ok((booking, inquiry))
    }
}
