use chrono::Duration;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::business::{
    Actor, ActorRole, BookingStatus, InquiryCompatibilityChecker, InquiryEvent, InquiryStatus,
    LineItemCalculator, OfferAction, OfferAggregator, OfferDraft, OfferEdit, OfferStatus,
    ServicePricing, WorkflowEngine,
};
use crate::clock::Clock;
use crate::domain::{Booking, Inquiry, Money, NewInquiry, Offer};
use crate::error::{
    BrokerError, EntityKind, PermissionError, PermissionReason, StateConflictError, ValidationError,
    ValidationRule,
};
use crate::storage::{
    BookingStatusWrite, BookingWrite, BrokerageStore, DraftReplace, DraftWrite, InquiryRevision,
    InquiryWrite, Notification, NotificationSink, OfferWrite, Recipient, SpaceClaim, StatusChange,
    WarehouseCatalog, WarehouseSpace,
};

/// Values applied when a draft offer leaves them out
#[derive(Debug, Clone, Copy)]
pub struct OfferDefaults {
    pub fee_percentage: Decimal,
    pub validity_days: i64,
}

impl Default for OfferDefaults {
    fn default() -> Self {
        Self {
            fee_percentage: Decimal::from(10),
            validity_days: 14,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpaceAllocationInput {
    pub warehouse_space_id: Uuid,
    pub allocated_size_m2: Decimal,
    /// Catalog price when omitted
    pub list_price_per_m2: Option<Money>,
    /// Manual line total
    pub line_total: Option<Money>,
}

#[derive(Debug, Clone)]
pub struct ServiceAllocationInput {
    pub service_id: Uuid,
    /// Catalog list pricing when omitted
    pub pricing: Option<ServicePricing>,
    pub line_total: Option<Money>,
}

/// Full content of a draft offer as submitted by an operator
#[derive(Debug, Clone, Default)]
pub struct DraftOfferInput {
    pub space_allocations: Vec<SpaceAllocationInput>,
    pub service_allocations: Vec<ServiceAllocationInput>,
    pub fee_percentage: Option<Decimal>,
    /// Applied after the lines, so the percentage is derived from it
    pub fee_amount: Option<Money>,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferResponse {
    Accept,
    Reject,
}

/// Orchestrates the inquiry, offer and booking workflow over the collaborators
pub struct OfferWorkflowCoordinator {
    store: Arc<dyn BrokerageStore>,
    catalog: Arc<dyn WarehouseCatalog>,
    notifier: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    checker: InquiryCompatibilityChecker,
    defaults: OfferDefaults,
}

impl OfferWorkflowCoordinator {
    pub fn new(
        store: Arc<dyn BrokerageStore>,
        catalog: Arc<dyn WarehouseCatalog>,
        notifier: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            catalog,
            notifier,
            clock,
            checker: InquiryCompatibilityChecker::new(),
            defaults: OfferDefaults::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: OfferDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_checker(mut self, checker: InquiryCompatibilityChecker) -> Self {
        self.checker = checker;
        self
    }

    // Inquiries

    /// Create a draft inquiry owned by the requesting actor
    pub async fn create_inquiry(&self, actor: &Actor, request: NewInquiry) -> Result<Inquiry, BrokerError> {
        if actor.role != ActorRole::Requester {
            return Err(PermissionError {
                action: "create inquiry".to_string(),
                reason: PermissionReason::RoleNotAllowed(actor.role),
            }
            .into());
        }

        let mut inquiry = Inquiry::new(actor.id, request, self.clock.now());
        debug!("Validating inquiry {}", inquiry.id);
        self.checker.validate_draft(&inquiry)?;
        if let Some(space_id) = inquiry.space_id {
            self.load_space(space_id).await?;
        }

        inquiry.estimated_cost = self.estimate_cost(&inquiry).await?;
        self.store
            .insert_inquiry(inquiry.clone())
            .await
            .map_err(|e| e.during("create inquiry"))?;

        info!(
            "Created inquiry {} for requester {} (estimate {})",
            inquiry.id, actor.id, inquiry.estimated_cost
        );
        Ok(inquiry)
    }

    /// Run the full compatibility check, freeze the estimate and submit
    pub async fn submit_inquiry(&self, actor: &Actor, inquiry_id: Uuid) -> Result<Inquiry, BrokerError> {
        let inquiry = self.load_inquiry(inquiry_id).await?;
        let next = self.resolve(actor, &inquiry, InquiryEvent::Submit)?;

        debug!("Checking inquiry {} for submission", inquiry_id);
        self.checker.validate_for_submission(&inquiry)?;
        let claim = self.claim_space(&inquiry).await?;
        let estimated_cost = self.estimate_cost(&inquiry).await?;

        let updated = self
            .store
            .update_inquiry(InquiryWrite {
                estimated_cost: Some(estimated_cost),
                claim,
                ..InquiryWrite::new(inquiry_id, StatusChange::new(inquiry.status, next), self.clock.now())
            })
            .await
            .map_err(|e| e.during(InquiryEvent::Submit.as_str()))?;

        self.announce(actor, &updated, inquiry.status, None, None).await;
        Ok(updated)
    }

    /// Replace the content of an editable inquiry. A draft gets a fresh
    /// estimate. Once submitted the estimate stays frozen and the new content
    /// must still pass the submission checks.
    pub async fn update_inquiry(
        &self,
        actor: &Actor,
        inquiry_id: Uuid,
        request: NewInquiry,
    ) -> Result<Inquiry, BrokerError> {
        let inquiry = self.load_inquiry(inquiry_id).await?;
        self.resolve(actor, &inquiry, InquiryEvent::Edit)?;

        let mut revised = inquiry.clone();
        revised.revise(request);
        self.checker.validate_draft(&revised)?;

        let claim = if revised.status == InquiryStatus::Draft {
            if let Some(space_id) = revised.space_id {
                self.load_space(space_id).await?;
            }
            revised.estimated_cost = self.estimate_cost(&revised).await?;
            None
        } else {
            self.checker.validate_for_submission(&revised)?;
            self.claim_space(&revised).await?
        };

        let updated = self
            .store
            .revise_inquiry(InquiryRevision {
                inquiry: revised,
                claim,
                now: self.clock.now(),
            })
            .await
            .map_err(|e| e.during(InquiryEvent::Edit.as_str()))?;

        info!(
            "Updated inquiry {} (version {}, estimate {})",
            inquiry_id, updated.version, updated.estimated_cost
        );
        Ok(updated)
    }

    pub async fn start_review(&self, actor: &Actor, inquiry_id: Uuid) -> Result<Inquiry, BrokerError> {
        self.move_inquiry(actor, inquiry_id, InquiryEvent::StartReview).await
    }

    pub async fn cancel_inquiry(&self, actor: &Actor, inquiry_id: Uuid) -> Result<Inquiry, BrokerError> {
        self.move_inquiry(actor, inquiry_id, InquiryEvent::Cancel).await
    }

    pub async fn archive_inquiry(&self, actor: &Actor, inquiry_id: Uuid) -> Result<Inquiry, BrokerError> {
        self.move_inquiry(actor, inquiry_id, InquiryEvent::Archive).await
    }

    pub async fn get_inquiry(&self, actor: &Actor, inquiry_id: Uuid) -> Result<Inquiry, BrokerError> {
        let inquiry = self.load_inquiry(inquiry_id).await?;
        ensure_owner(actor, &inquiry, "view inquiry")?;
        Ok(inquiry)
    }

    // Offers

    /// Create or replace the inquiry's draft offer. A sent offer is
    /// superseded and the inquiry returns to offer_pending.
    pub async fn save_draft_offer(
        &self,
        actor: &Actor,
        inquiry_id: Uuid,
        input: DraftOfferInput,
    ) -> Result<Offer, BrokerError> {
        let inquiry = self.load_inquiry(inquiry_id).await?;
        let next = self.resolve(actor, &inquiry, InquiryEvent::DraftOffer)?;
        let draft = self.build_draft(input).await?;

        let saved = self
            .store
            .save_draft(DraftWrite {
                inquiry_id,
                author_id: actor.id,
                draft,
                inquiry: StatusChange::new(inquiry.status, next),
                now: self.clock.now(),
            })
            .await
            .map_err(|e| e.during(InquiryEvent::DraftOffer.as_str()))?;

        if let Some(old) = saved.superseded {
            info!("Offer {} superseded by draft {}", old, saved.offer.id);
        }
        info!(
            "Saved draft offer {} for inquiry {} (grand total {})",
            saved.offer.id,
            inquiry_id,
            saved.offer.draft.grand_total()
        );
        if saved.inquiry.status != inquiry.status {
            self.announce(actor, &saved.inquiry, inquiry.status, Some(saved.offer.id), None)
                .await;
        }
        Ok(saved.offer)
    }

    /// Apply edits to a draft offer and return the result without saving it
    pub async fn preview_offer_edits(
        &self,
        actor: &Actor,
        offer_id: Uuid,
        edits: Vec<OfferEdit>,
    ) -> Result<OfferDraft, BrokerError> {
        let offer = self.editable_offer(actor, offer_id).await?;
        debug!("Previewing {} edits on offer {}", edits.len(), offer_id);
        Ok(OfferAggregator::apply_edits(&offer.draft, edits)?)
    }

    /// Apply edits to a draft offer and save it. `expected_version` is the
    /// version the caller last read; the edits are refused if the draft has
    /// been rewritten since.
    pub async fn apply_offer_edits(
        &self,
        actor: &Actor,
        offer_id: Uuid,
        expected_version: Option<u64>,
        edits: Vec<OfferEdit>,
    ) -> Result<Offer, BrokerError> {
        let offer = self.editable_offer(actor, offer_id).await?;
        if let Some(expected) = expected_version {
            if expected != offer.version {
                warn!(
                    "Draft offer {} is at version {}, caller read {}",
                    offer_id, offer.version, expected
                );
                return Err(StateConflictError {
                    entity: EntityKind::Offer,
                    id: offer_id,
                    status: format!("at version {}", offer.version),
                    action: OfferAction::Edit.as_str().to_string(),
                }
                .into());
            }
        }

        let draft = OfferAggregator::apply_edits(&offer.draft, edits)?;
        let updated = self
            .store
            .replace_draft(DraftReplace {
                offer_id,
                expected_version: offer.version,
                draft,
                now: self.clock.now(),
            })
            .await
            .map_err(|e| e.during(OfferAction::Edit.as_str()))?;
        info!(
            "Updated draft offer {} (grand total {})",
            offer_id,
            updated.draft.grand_total()
        );
        Ok(updated)
    }

    pub async fn send_offer(&self, actor: &Actor, offer_id: Uuid) -> Result<Offer, BrokerError> {
        let offer = self.load_offer(offer_id).await?;
        let inquiry = self.load_inquiry(offer.inquiry_id).await?;
        let inquiry_next = self.resolve(actor, &inquiry, InquiryEvent::SendOffer)?;
        let offer_next = WorkflowEngine::offer_transition(offer.id, offer.status, OfferAction::Send)?;
        WorkflowEngine::check_sendable(&offer.draft, self.clock.today())?;

        let (sent, updated) = self
            .store
            .transition_offer(OfferWrite {
                offer_id,
                offer: StatusChange::new(offer.status, offer_next),
                inquiry: Some(StatusChange::new(inquiry.status, inquiry_next)),
                now: self.clock.now(),
            })
            .await
            .map_err(|e| e.during(OfferAction::Send.as_str()))?;

        info!("Sent offer {} for inquiry {}", offer_id, inquiry.id);
        if let Some(updated) = updated {
            self.announce(actor, &updated, inquiry.status, Some(offer_id), None).await;
        }
        Ok(sent)
    }

    pub async fn respond_to_offer(
        &self,
        actor: &Actor,
        offer_id: Uuid,
        response: OfferResponse,
    ) -> Result<Offer, BrokerError> {
        let (event, action) = match response {
            OfferResponse::Accept => (InquiryEvent::AcceptOffer, OfferAction::Accept),
            OfferResponse::Reject => (InquiryEvent::RejectOffer, OfferAction::Reject),
        };
        self.answer_offer(actor, offer_id, event, action, None).await
    }

    /// Reject the sent offer and ask the operator for a revised one
    pub async fn request_offer_changes(
        &self,
        actor: &Actor,
        offer_id: Uuid,
        message: Option<String>,
    ) -> Result<Offer, BrokerError> {
        self.answer_offer(
            actor,
            offer_id,
            InquiryEvent::RequestChanges,
            OfferAction::Reject,
            message,
        )
        .await
    }

    /// Offer as seen today. Requesters cannot see drafts.
    pub async fn get_offer(&self, actor: &Actor, offer_id: Uuid) -> Result<Offer, BrokerError> {
        let mut offer = self.load_offer(offer_id).await?;
        let inquiry = self.load_inquiry(offer.inquiry_id).await?;
        ensure_owner(actor, &inquiry, "view offer")?;
        if actor.role == ActorRole::Requester && offer.status == OfferStatus::Draft {
            return Err(BrokerError::not_found(EntityKind::Offer, offer_id));
        }
        offer.status = offer.effective_status(self.clock.today());
        Ok(offer)
    }

    // Bookings

    /// Create the booking for an accepted offer. Repeated calls return the
    /// same booking.
    pub async fn create_booking(&self, actor: &Actor, offer_id: Uuid) -> Result<Booking, BrokerError> {
        if !WorkflowEngine::permits(InquiryEvent::ConfirmBooking, actor.role) {
            return Err(PermissionError {
                action: "create booking".to_string(),
                reason: PermissionReason::RoleNotAllowed(actor.role),
            }
            .into());
        }

        let offer = self.load_offer(offer_id).await?;
        if let Some(existing) = self.store.booking_for_offer(offer_id).await? {
            debug!("Offer {} already booked as {}", offer_id, existing.id);
            return Ok(existing);
        }
        WorkflowEngine::offer_transition(offer.id, offer.status, OfferAction::Book)?;

        let inquiry = self.load_inquiry(offer.inquiry_id).await?;
        let next = self.resolve(actor, &inquiry, InquiryEvent::ConfirmBooking)?;
        let booking = Booking::from_accepted_offer(&offer, &inquiry, actor.id, self.clock.now());

        let outcome = self
            .store
            .create_booking(BookingWrite {
                booking,
                inquiry: StatusChange::new(inquiry.status, next),
            })
            .await
            .map_err(|e| e.during(OfferAction::Book.as_str()))?;

        if outcome.created {
            info!("Created booking {} from offer {}", outcome.booking.id, offer_id);
            if let Some(updated) = self.store.get_inquiry(inquiry.id).await? {
                self.announce(actor, &updated, inquiry.status, Some(offer_id), None).await;
            }
        }
        Ok(outcome.booking)
    }

    pub async fn complete_booking(&self, actor: &Actor, booking_id: Uuid) -> Result<Booking, BrokerError> {
        self.close_booking(actor, booking_id, InquiryEvent::Complete, BookingStatus::Completed)
            .await
    }

    pub async fn cancel_booking(&self, actor: &Actor, booking_id: Uuid) -> Result<Booking, BrokerError> {
        self.close_booking(actor, booking_id, InquiryEvent::CancelBooking, BookingStatus::Cancelled)
            .await
    }

    pub async fn get_booking(&self, actor: &Actor, booking_id: Uuid) -> Result<Booking, BrokerError> {
        let booking = self.load_booking(booking_id).await?;
        if actor.role == ActorRole::Requester && booking.requester_id != actor.id {
            return Err(PermissionError {
                action: "view booking".to_string(),
                reason: PermissionReason::NotOwner,
            }
            .into());
        }
        Ok(booking)
    }

    // Internals

    /// Ownership, then role, then the status table
    fn resolve(
        &self,
        actor: &Actor,
        inquiry: &Inquiry,
        event: InquiryEvent,
    ) -> Result<InquiryStatus, BrokerError> {
        ensure_owner(actor, inquiry, &format!("{} inquiry", event.as_str()))?;
        WorkflowEngine::transition(inquiry.status, event, actor.role).map_err(|rejected| {
            warn!("Rejected transition on inquiry {}: {}", inquiry.id, rejected);
            rejected.into_broker_error(inquiry.id)
        })
    }

    async fn move_inquiry(
        &self,
        actor: &Actor,
        inquiry_id: Uuid,
        event: InquiryEvent,
    ) -> Result<Inquiry, BrokerError> {
        let inquiry = self.load_inquiry(inquiry_id).await?;
        let next = self.resolve(actor, &inquiry, event)?;

        let updated = self
            .store
            .update_inquiry(InquiryWrite {
                // a closed inquiry keeps no live offer
                withdraw_offer: matches!(event, InquiryEvent::Cancel | InquiryEvent::Archive),
                ..InquiryWrite::new(inquiry_id, StatusChange::new(inquiry.status, next), self.clock.now())
            })
            .await
            .map_err(|e| e.during(event.as_str()))?;

        self.announce(actor, &updated, inquiry.status, None, None).await;
        Ok(updated)
    }

    /// Accept, reject or request changes on a sent offer
    async fn answer_offer(
        &self,
        actor: &Actor,
        offer_id: Uuid,
        event: InquiryEvent,
        action: OfferAction,
        message: Option<String>,
    ) -> Result<Offer, BrokerError> {
        let offer = self.load_offer(offer_id).await?;
        let inquiry = self.load_inquiry(offer.inquiry_id).await?;
        let inquiry_next = self.resolve(actor, &inquiry, event)?;

        let effective = offer.effective_status(self.clock.today());
        if effective != offer.status {
            self.record_expiry(actor, &offer, &inquiry).await;
        }
        let offer_next = WorkflowEngine::offer_transition(offer.id, effective, action).map_err(|conflict| {
            warn!("Rejected {} on offer {}: it is {}", action.as_str(), offer_id, effective);
            conflict
        })?;

        let (answered, updated) = self
            .store
            .transition_offer(OfferWrite {
                offer_id,
                offer: StatusChange::new(offer.status, offer_next),
                inquiry: Some(StatusChange::new(inquiry.status, inquiry_next)),
                now: self.clock.now(),
            })
            .await
            .map_err(|e| e.during(action.as_str()))?;

        info!("Offer {} is now {}", offer_id, answered.status);
        if let Some(updated) = updated {
            self.announce(actor, &updated, inquiry.status, Some(offer_id), message)
                .await;
        }
        Ok(answered)
    }

    /// Persist a lazily detected expiry. Failures are logged, the caller
    /// reports the conflict either way.
    async fn record_expiry(&self, actor: &Actor, offer: &Offer, inquiry: &Inquiry) {
        let inquiry_change = WorkflowEngine::transition(inquiry.status, InquiryEvent::Expire, actor.role)
            .ok()
            .map(|next| StatusChange::new(inquiry.status, next));

        let write = OfferWrite {
            offer_id: offer.id,
            offer: StatusChange::new(offer.status, OfferStatus::Expired),
            inquiry: inquiry_change,
            now: self.clock.now(),
        };
        match self.store.transition_offer(write).await {
            Ok((_, updated)) => {
                info!("Offer {} expired on {}", offer.id, offer.draft.valid_until);
                if let Some(updated) = updated {
                    self.announce(actor, &updated, inquiry.status, Some(offer.id), None)
                        .await;
                }
            }
            Err(e) => warn!("Could not record expiry of offer {}: {}", offer.id, e),
        }
    }

    /// Staff-only access to a draft offer whose inquiry still accepts edits
    async fn editable_offer(&self, actor: &Actor, offer_id: Uuid) -> Result<Offer, BrokerError> {
        if !actor.role.is_staff() {
            return Err(PermissionError {
                action: "edit offer".to_string(),
                reason: PermissionReason::RoleNotAllowed(actor.role),
            }
            .into());
        }

        let offer = self.load_offer(offer_id).await?;
        WorkflowEngine::offer_transition(offer.id, offer.status, OfferAction::Edit)?;

        let inquiry = self.load_inquiry(offer.inquiry_id).await?;
        if !WorkflowEngine::can_edit(inquiry.status) {
            return Err(StateConflictError {
                entity: EntityKind::Inquiry,
                id: inquiry.id,
                status: inquiry.status.as_str().to_string(),
                action: "edit an offer for".to_string(),
            }
            .into());
        }
        Ok(offer)
    }

    async fn close_booking(
        &self,
        actor: &Actor,
        booking_id: Uuid,
        event: InquiryEvent,
        next: BookingStatus,
    ) -> Result<Booking, BrokerError> {
        let booking = self.load_booking(booking_id).await?;
        if !booking.status.can_transition_to(next) {
            return Err(StateConflictError {
                entity: EntityKind::Booking,
                id: booking_id,
                status: booking.status.as_str().to_string(),
                action: event.as_str().to_string(),
            }
            .into());
        }

        let inquiry = self.load_inquiry(booking.inquiry_id).await?;
        let inquiry_next = self.resolve(actor, &inquiry, event)?;

        let (updated_booking, updated_inquiry) = self
            .store
            .update_booking_status(BookingStatusWrite {
                booking_id,
                booking: StatusChange::new(booking.status, next),
                inquiry: Some(StatusChange::new(inquiry.status, inquiry_next)),
                now: self.clock.now(),
            })
            .await
            .map_err(|e| e.during(event.as_str()))?;

        info!("Booking {} is now {}", booking_id, updated_booking.status);
        if let Some(updated) = updated_inquiry {
            self.announce(actor, &updated, inquiry.status, Some(booking.offer_id), None)
                .await;
        }
        Ok(updated_booking)
    }

    async fn build_draft(&self, input: DraftOfferInput) -> Result<OfferDraft, BrokerError> {
        let today = self.clock.today();
        let fee_percentage = input.fee_percentage.unwrap_or(self.defaults.fee_percentage);
        let valid_until = match input.valid_until {
            Some(date) => date,
            None => today
                .checked_add_signed(Duration::days(self.defaults.validity_days))
                .ok_or_else(|| ValidationError::new("valid_until", ValidationRule::Overflow))?,
        };

        let mut edits = Vec::new();
        for (index, space) in input.space_allocations.into_iter().enumerate() {
            let list_price_per_m2 = match space.list_price_per_m2 {
                Some(price) => price,
                None => self.load_space(space.warehouse_space_id).await?.price_per_m2_per_day,
            };
            edits.push(OfferEdit::AddSpace {
                warehouse_space_id: space.warehouse_space_id,
                allocated_size_m2: space.allocated_size_m2,
                list_price_per_m2,
            });
            if let Some(line_total) = space.line_total {
                edits.push(OfferEdit::OverrideSpaceTotal { index, line_total });
            }
        }

        for (index, service) in input.service_allocations.into_iter().enumerate() {
            let pricing = match service.pricing {
                Some(pricing) => pricing,
                None => self
                    .catalog
                    .service(service.service_id)
                    .await
                    .map_err(catalog_failure)?
                    .ok_or_else(|| BrokerError::not_found(EntityKind::Service, service.service_id))?
                    .pricing,
            };
            edits.push(OfferEdit::AddService {
                service_id: service.service_id,
                pricing,
            });
            if let Some(line_total) = service.line_total {
                edits.push(OfferEdit::OverrideServiceTotal { index, line_total });
            }
        }

        if let Some(amount) = input.fee_amount {
            edits.push(OfferEdit::SetFeeAmount { amount });
        }
        if input.notes.is_some() {
            edits.push(OfferEdit::SetNotes { notes: input.notes });
        }

        debug!("Building draft offer from {} edits", edits.len());
        let base = OfferDraft::new(fee_percentage, valid_until)?;
        Ok(OfferAggregator::apply_edits(&base, edits)?)
    }

    /// Advisory estimate from list prices. Each space request is priced at
    /// the cheapest matching space; fixed-price services are added, other
    /// pricing modes have no list total.
    async fn estimate_cost(&self, inquiry: &Inquiry) -> Result<Money, BrokerError> {
        let days = inquiry.date_range.days();
        let single_space = match inquiry.space_id {
            Some(space_id) => Some(self.load_space(space_id).await?),
            None => None,
        };

        let mut lines = Vec::new();
        for request in &inquiry.space_requests {
            let price = match single_space {
                Some(ref space) => Some(space.price_per_m2_per_day),
                None => self
                    .catalog
                    .spaces_of_type(&inquiry.warehouse_ids, &request.space_type)
                    .await
                    .map_err(catalog_failure)?
                    .iter()
                    .map(|s| s.price_per_m2_per_day)
                    .min(),
            };
            if let Some(price) = price {
                lines.push(LineItemCalculator::estimate_space(request.size_m2, price, days));
            }
        }

        for service_id in &inquiry.service_ids {
            let service = self.catalog.service(*service_id).await.map_err(catalog_failure)?;
            if let Some(ServicePricing::Fixed { fixed_price }) = service.map(|s| s.pricing) {
                lines.push(Some(fixed_price));
            }
        }

        lines
            .into_iter()
            .try_fold(Money::ZERO, |total, line| line.and_then(|l| total.checked_add(l)))
            .ok_or_else(|| ValidationError::new("estimated_cost", ValidationRule::Overflow).into())
    }

    /// Capacity and overlap checks for a single-space inquiry. The returned
    /// claim goes with the write so the store repeats the overlap check.
    async fn claim_space(&self, inquiry: &Inquiry) -> Result<Option<SpaceClaim>, BrokerError> {
        let Some(space_id) = inquiry.space_id else {
            return Ok(None);
        };
        let space = self.load_space(space_id).await?;
        let others = self.store.inquiries_for_space(space_id).await?;
        self.checker.validate_space_availability(inquiry, &space, &others)?;
        Ok(Some(SpaceClaim {
            space_id,
            date_range: inquiry.date_range,
        }))
    }

    async fn load_inquiry(&self, id: Uuid) -> Result<Inquiry, BrokerError> {
        self.store
            .get_inquiry(id)
            .await?
            .ok_or_else(|| BrokerError::not_found(EntityKind::Inquiry, id))
    }

    async fn load_offer(&self, id: Uuid) -> Result<Offer, BrokerError> {
        self.store
            .get_offer(id)
            .await?
            .ok_or_else(|| BrokerError::not_found(EntityKind::Offer, id))
    }

    async fn load_booking(&self, id: Uuid) -> Result<Booking, BrokerError> {
        self.store
            .get_booking(id)
            .await?
            .ok_or_else(|| BrokerError::not_found(EntityKind::Booking, id))
    }

    async fn load_space(&self, id: Uuid) -> Result<WarehouseSpace, BrokerError> {
        self.catalog
            .space(id)
            .await
            .map_err(catalog_failure)?
            .ok_or_else(|| BrokerError::not_found(EntityKind::Space, id))
    }

    /// Log the status change and notify the other party
    async fn announce(
        &self,
        actor: &Actor,
        inquiry: &Inquiry,
        from: InquiryStatus,
        offer_id: Option<Uuid>,
        message: Option<String>,
    ) {
        info!("Inquiry {} moved {} -> {}", inquiry.id, from, inquiry.status);
        let recipient = if actor.role.is_staff() {
            Recipient::Requester(inquiry.requester_id)
        } else {
            Recipient::Operators
        };
        let notification = Notification {
            recipient,
            inquiry_id: inquiry.id,
            offer_id,
            from,
            to: inquiry.status,
            message,
        };
        if let Err(e) = self.notifier.notify(notification).await {
            error!("Failed to deliver notification for inquiry {}: {:?}", inquiry.id, e);
        }
    }
}

/// Requesters may only act on their own inquiries
fn ensure_owner(actor: &Actor, inquiry: &Inquiry, action: &str) -> Result<(), PermissionError> {
    if actor.role == ActorRole::Requester && !inquiry.is_owned_by(actor.id) {
        return Err(PermissionError {
            action: action.to_string(),
            reason: PermissionReason::NotOwner,
        });
    }
    Ok(())
}

fn catalog_failure(err: anyhow::Error) -> BrokerError {
    error!("Catalog lookup failed: {:?}", err);
    BrokerError::Storage(err)
}
