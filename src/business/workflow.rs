use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::business::aggregator::OfferDraft;
use crate::error::{
    BrokerError, EntityKind, PermissionError, PermissionReason, StateConflictError, ValidationError,
    ValidationRule,
};

/// Role of the authenticated actor, as reported by the auth collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Requester,
    Operator,
    Admin,
}

impl ActorRole {
    /// Operators and admins act for the platform
    pub fn is_staff(&self) -> bool {
        matches!(self, ActorRole::Operator | ActorRole::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Requester => "requester",
            ActorRole::Operator => "operator",
            ActorRole::Admin => "admin",
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "requester" => Ok(ActorRole::Requester),
            "operator" => Ok(ActorRole::Operator),
            "admin" => Ok(ActorRole::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Authenticated identity performing an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(id: Uuid, role: ActorRole) -> Self {
        Self { id, role }
    }
}

/// Inquiry status. Variant order matches `STATUS_TABLE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InquiryStatus {
    Draft,
    Submitted,
    UnderReview,
    OfferPending,
    OfferSent,
    Accepted,
    Rejected,
    ChangesRequested,
    Expired,
    Cancelled,
    Confirmed,
    Completed,
    Archived,
}

struct StatusInfo {
    code: &'static str,
    label: &'static str,
    editable: bool,
    pending: bool,
}

const STATUS_TABLE: [StatusInfo; 13] = [
    StatusInfo { code: "draft", label: "Draft", editable: true, pending: false },
    StatusInfo { code: "submitted", label: "Submitted", editable: true, pending: true },
    StatusInfo { code: "under_review", label: "Under review", editable: false, pending: true },
    StatusInfo { code: "offer_pending", label: "Offer in preparation", editable: true, pending: true },
    StatusInfo { code: "offer_sent", label: "Offer sent", editable: true, pending: true },
    StatusInfo { code: "accepted", label: "Accepted", editable: false, pending: false },
    StatusInfo { code: "rejected", label: "Rejected", editable: false, pending: false },
    StatusInfo { code: "changes_requested", label: "Changes requested", editable: false, pending: true },
    StatusInfo { code: "expired", label: "Expired", editable: false, pending: false },
    StatusInfo { code: "cancelled", label: "Cancelled", editable: false, pending: false },
    StatusInfo { code: "confirmed", label: "Booking confirmed", editable: false, pending: false },
    StatusInfo { code: "completed", label: "Completed", editable: false, pending: false },
    StatusInfo { code: "archived", label: "Archived", editable: false, pending: false },
];

impl InquiryStatus {
    pub const ALL: [InquiryStatus; 13] = [
        InquiryStatus::Draft,
        InquiryStatus::Submitted,
        InquiryStatus::UnderReview,
        InquiryStatus::OfferPending,
        InquiryStatus::OfferSent,
        InquiryStatus::Accepted,
        InquiryStatus::Rejected,
        InquiryStatus::ChangesRequested,
        InquiryStatus::Expired,
        InquiryStatus::Cancelled,
        InquiryStatus::Confirmed,
        InquiryStatus::Completed,
        InquiryStatus::Archived,
    ];

    fn info(&self) -> &'static StatusInfo {
        &STATUS_TABLE[*self as usize]
    }

    pub fn as_str(&self) -> &'static str {
        self.info().code
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        self.info().label
    }

    /// Whether the inquiry is still awaiting an outcome (blocks overlapping requests)
    pub fn is_pending(&self) -> bool {
        self.info().pending
    }
}

impl fmt::Display for InquiryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that happens to an inquiry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InquiryEvent {
    /// Requester rewrites the inquiry content; the status stays put
    Edit,
    Submit,
    StartReview,
    DraftOffer,
    SendOffer,
    AcceptOffer,
    RejectOffer,
    RequestChanges,
    Expire,
    Cancel,
    ConfirmBooking,
    Complete,
    CancelBooking,
    Archive,
}

/// Who may trigger an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Performer {
    Requester,
    Staff,
    Anyone,
}

impl InquiryEvent {
    fn performer(&self) -> Performer {
        match self {
            InquiryEvent::Edit
            | InquiryEvent::Submit
            | InquiryEvent::AcceptOffer
            | InquiryEvent::RejectOffer
            | InquiryEvent::RequestChanges
            | InquiryEvent::Cancel => Performer::Requester,
            InquiryEvent::StartReview
            | InquiryEvent::DraftOffer
            | InquiryEvent::SendOffer
            | InquiryEvent::ConfirmBooking
            | InquiryEvent::Complete
            | InquiryEvent::CancelBooking => Performer::Staff,
            InquiryEvent::Expire | InquiryEvent::Archive => Performer::Anyone,
        }
    }

    /// Whether only the inquiry's own requester may trigger it (staff excluded)
    pub fn requires_requester(&self) -> bool {
        self.performer() == Performer::Requester
    }

    /// Stable identifier, matching the serde form
    pub fn code(&self) -> &'static str {
        match self {
            InquiryEvent::Edit => "edit",
            InquiryEvent::Submit => "submit",
            InquiryEvent::StartReview => "start_review",
            InquiryEvent::DraftOffer => "draft_offer",
            InquiryEvent::SendOffer => "send_offer",
            InquiryEvent::AcceptOffer => "accept_offer",
            InquiryEvent::RejectOffer => "reject_offer",
            InquiryEvent::RequestChanges => "request_changes",
            InquiryEvent::Expire => "expire",
            InquiryEvent::Cancel => "cancel",
            InquiryEvent::ConfirmBooking => "confirm_booking",
            InquiryEvent::Complete => "complete",
            InquiryEvent::CancelBooking => "cancel_booking",
            InquiryEvent::Archive => "archive",
        }
    }

    /// Phrase used in error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            InquiryEvent::Edit => "edit",
            InquiryEvent::Submit => "submit",
            InquiryEvent::StartReview => "start review of",
            InquiryEvent::DraftOffer => "draft an offer for",
            InquiryEvent::SendOffer => "send an offer for",
            InquiryEvent::AcceptOffer => "accept an offer for",
            InquiryEvent::RejectOffer => "reject an offer for",
            InquiryEvent::RequestChanges => "request changes to",
            InquiryEvent::Expire => "expire",
            InquiryEvent::Cancel => "cancel",
            InquiryEvent::ConfirmBooking => "confirm a booking for",
            InquiryEvent::Complete => "complete",
            InquiryEvent::CancelBooking => "cancel the booking of",
            InquiryEvent::Archive => "archive",
        }
    }
}

use InquiryEvent as E;
use InquiryStatus as S;

/// Every legal `(from, event) -> to` move
const TRANSITIONS: &[(InquiryStatus, InquiryEvent, InquiryStatus)] = &[
    (S::Draft, E::Edit, S::Draft),
    (S::Submitted, E::Edit, S::Submitted),
    (S::OfferPending, E::Edit, S::OfferPending),
    (S::OfferSent, E::Edit, S::OfferSent),
    (S::Draft, E::Submit, S::Submitted),
    (S::Submitted, E::StartReview, S::UnderReview),
    (S::Submitted, E::DraftOffer, S::OfferPending),
    (S::UnderReview, E::DraftOffer, S::OfferPending),
    (S::OfferPending, E::DraftOffer, S::OfferPending),
    (S::OfferSent, E::DraftOffer, S::OfferPending),
    (S::ChangesRequested, E::DraftOffer, S::OfferPending),
    (S::OfferPending, E::SendOffer, S::OfferSent),
    (S::OfferSent, E::AcceptOffer, S::Accepted),
    (S::OfferSent, E::RejectOffer, S::Rejected),
    (S::OfferSent, E::RequestChanges, S::ChangesRequested),
    (S::OfferSent, E::Expire, S::Expired),
    (S::Draft, E::Cancel, S::Cancelled),
    (S::Submitted, E::Cancel, S::Cancelled),
    (S::UnderReview, E::Cancel, S::Cancelled),
    (S::OfferPending, E::Cancel, S::Cancelled),
    (S::OfferSent, E::Cancel, S::Cancelled),
    (S::ChangesRequested, E::Cancel, S::Cancelled),
    (S::Accepted, E::ConfirmBooking, S::Confirmed),
    (S::Confirmed, E::Complete, S::Completed),
    (S::Confirmed, E::CancelBooking, S::Cancelled),
    // Accepted and confirmed inquiries carry a binding offer or a live
    // booking, so they leave through ConfirmBooking or CancelBooking instead.
    (S::Draft, E::Archive, S::Archived),
    (S::Submitted, E::Archive, S::Archived),
    (S::UnderReview, E::Archive, S::Archived),
    (S::OfferPending, E::Archive, S::Archived),
    (S::OfferSent, E::Archive, S::Archived),
    (S::ChangesRequested, E::Archive, S::Archived),
];

/// Why the engine refused a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionRejected {
    RoleNotPermitted { event: InquiryEvent, role: ActorRole },
    IllegalFromState { from: InquiryStatus, event: InquiryEvent },
}

impl TransitionRejected {
    pub fn into_broker_error(self, inquiry_id: Uuid) -> BrokerError {
        match self {
            TransitionRejected::RoleNotPermitted { event, role } => PermissionError {
                action: format!("{} inquiry", event.as_str()),
                reason: PermissionReason::RoleNotAllowed(role),
            }
            .into(),
            TransitionRejected::IllegalFromState { from, event } => StateConflictError {
                entity: EntityKind::Inquiry,
                id: inquiry_id,
                status: from.as_str().to_string(),
                action: event.as_str().to_string(),
            }
            .into(),
        }
    }
}

impl fmt::Display for TransitionRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionRejected::RoleNotPermitted { event, role } => {
                write!(f, "role {} may not {} an inquiry", role, event.as_str())
            }
            TransitionRejected::IllegalFromState { from, event } => {
                write!(f, "cannot {} an inquiry that is {}", event.as_str(), from)
            }
        }
    }
}

/// Offer status as persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Draft,
    Sent,
    Accepted,
    Rejected,
    Expired,
}

impl OfferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferStatus::Draft => "draft",
            OfferStatus::Sent => "sent",
            OfferStatus::Accepted => "accepted",
            OfferStatus::Rejected => "rejected",
            OfferStatus::Expired => "expired",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OfferStatus::Draft => "Draft",
            OfferStatus::Sent => "Awaiting response",
            OfferStatus::Accepted => "Accepted",
            OfferStatus::Rejected => "Rejected",
            OfferStatus::Expired => "Expired",
        }
    }

    /// Draft and sent offers are the inquiry's one active offer
    pub fn is_active(&self) -> bool {
        matches!(self, OfferStatus::Draft | OfferStatus::Sent)
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that happens to an offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferAction {
    Edit,
    Send,
    Accept,
    Reject,
    Expire,
    Supersede,
    Book,
}

impl OfferAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferAction::Edit => "edit",
            OfferAction::Send => "send",
            OfferAction::Accept => "accept",
            OfferAction::Reject => "reject",
            OfferAction::Expire => "expire",
            OfferAction::Supersede => "supersede",
            OfferAction::Book => "book",
        }
    }
}

const OFFER_TRANSITIONS: &[(OfferStatus, OfferAction, OfferStatus)] = &[
    (OfferStatus::Draft, OfferAction::Edit, OfferStatus::Draft),
    (OfferStatus::Draft, OfferAction::Send, OfferStatus::Sent),
    (OfferStatus::Sent, OfferAction::Accept, OfferStatus::Accepted),
    (OfferStatus::Sent, OfferAction::Reject, OfferStatus::Rejected),
    (OfferStatus::Sent, OfferAction::Expire, OfferStatus::Expired),
    (OfferStatus::Sent, OfferAction::Supersede, OfferStatus::Expired),
    (OfferStatus::Accepted, OfferAction::Book, OfferStatus::Accepted),
];

/// Booking status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Active,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Active, BookingStatus::Completed)
                | (BookingStatus::Active, BookingStatus::Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Active => "active",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BookingStatus::Active => "Active",
            BookingStatus::Completed => "Completed",
            BookingStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pure state and guard logic for inquiries and offers
pub struct WorkflowEngine;

impl WorkflowEngine {
    /// Only draft, submitted, offer_pending and offer_sent inquiries may be edited
    pub fn can_edit(status: InquiryStatus) -> bool {
        status.info().editable
    }

    /// Role check alone, independent of the current status
    pub fn permits(event: InquiryEvent, role: ActorRole) -> bool {
        match event.performer() {
            Performer::Requester => role == ActorRole::Requester,
            Performer::Staff => role.is_staff(),
            Performer::Anyone => true,
        }
    }

    /// Resolve the status an event leads to, checking the actor's role first
    pub fn transition(
        current: InquiryStatus,
        event: InquiryEvent,
        role: ActorRole,
    ) -> Result<InquiryStatus, TransitionRejected> {
        if !Self::permits(event, role) {
            return Err(TransitionRejected::RoleNotPermitted { event, role });
        }

        TRANSITIONS
            .iter()
            .find(|(from, e, _)| *from == current && *e == event)
            .map(|(_, _, to)| *to)
            .ok_or(TransitionRejected::IllegalFromState { from: current, event })
    }

    /// Events the role may trigger from `current`
    pub fn available_events(current: InquiryStatus, role: ActorRole) -> Vec<InquiryEvent> {
        TRANSITIONS
            .iter()
            .filter(|(from, _, _)| *from == current)
            .map(|(_, event, _)| *event)
            .filter(|event| Self::transition(current, *event, role).is_ok())
            .collect()
    }

    /// Status to use for permission checks: a sent offer past `valid_until`
    /// reads as expired whatever the persisted field says.
    pub fn effective_offer_status(
        persisted: OfferStatus,
        valid_until: NaiveDate,
        today: NaiveDate,
    ) -> OfferStatus {
        if persisted == OfferStatus::Sent && valid_until < today {
            OfferStatus::Expired
        } else {
            persisted
        }
    }

    pub fn offer_transition(
        offer_id: Uuid,
        current: OfferStatus,
        action: OfferAction,
    ) -> Result<OfferStatus, StateConflictError> {
        OFFER_TRANSITIONS
            .iter()
            .find(|(from, a, _)| *from == current && *a == action)
            .map(|(_, _, to)| *to)
            .ok_or_else(|| StateConflictError {
                entity: EntityKind::Offer,
                id: offer_id,
                status: current.as_str().to_string(),
                action: action.as_str().to_string(),
            })
    }

    /// Preconditions for sending a draft offer
    pub fn check_sendable(draft: &OfferDraft, today: NaiveDate) -> Result<(), ValidationError> {
        if draft.space_allocations().is_empty() {
            return Err(ValidationError::new("space_allocations", ValidationRule::Empty));
        }
        if !draft.subtotal().is_positive() {
            return Err(ValidationError::new("subtotal", ValidationRule::NotPositive));
        }
        if draft.valid_until < today {
            return Err(ValidationError::new("valid_until", ValidationRule::DateInPast(today)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::business::aggregator::{OfferAggregator, OfferEdit};
    use crate::domain::Money;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_status_table_matches_variant_order() {
        for status in InquiryStatus::ALL {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, status.as_str());
        }
    }

    #[test]
    fn test_can_edit_only_open_statuses() {
        let editable = [
            InquiryStatus::Draft,
            InquiryStatus::Submitted,
            InquiryStatus::OfferPending,
            InquiryStatus::OfferSent,
        ];
        for status in InquiryStatus::ALL {
            assert_eq!(
                WorkflowEngine::can_edit(status),
                editable.contains(&status),
                "status {}",
                status
            );
        }
    }

    #[test]
    fn test_happy_path() {
        let staff = ActorRole::Operator;
        let requester = ActorRole::Requester;

        let s = WorkflowEngine::transition(S::Draft, E::Submit, requester).unwrap();
        assert_eq!(s, S::Submitted);
        let s = WorkflowEngine::transition(s, E::StartReview, staff).unwrap();
        assert_eq!(s, S::UnderReview);
        let s = WorkflowEngine::transition(s, E::DraftOffer, staff).unwrap();
        assert_eq!(s, S::OfferPending);
        let s = WorkflowEngine::transition(s, E::SendOffer, ActorRole::Admin).unwrap();
        assert_eq!(s, S::OfferSent);
        let s = WorkflowEngine::transition(s, E::AcceptOffer, requester).unwrap();
        assert_eq!(s, S::Accepted);
        let s = WorkflowEngine::transition(s, E::ConfirmBooking, staff).unwrap();
        assert_eq!(s, S::Confirmed);
        let s = WorkflowEngine::transition(s, E::Complete, staff).unwrap();
        assert_eq!(s, S::Completed);
    }

    #[test]
    fn test_changes_requested_loops_back() {
        let s = WorkflowEngine::transition(S::OfferSent, E::RequestChanges, ActorRole::Requester).unwrap();
        assert_eq!(s, S::ChangesRequested);
        let s = WorkflowEngine::transition(s, E::DraftOffer, ActorRole::Operator).unwrap();
        assert_eq!(s, S::OfferPending);
    }

    #[test]
    fn test_role_checked_before_state() {
        let err = WorkflowEngine::transition(S::Completed, E::SendOffer, ActorRole::Requester).unwrap_err();
        assert_eq!(
            err,
            TransitionRejected::RoleNotPermitted {
                event: E::SendOffer,
                role: ActorRole::Requester
            }
        );

        let err = WorkflowEngine::transition(S::OfferSent, E::AcceptOffer, ActorRole::Admin).unwrap_err();
        assert!(matches!(err, TransitionRejected::RoleNotPermitted { .. }));
    }

    #[test]
    fn test_illegal_from_state() {
        let err = WorkflowEngine::transition(S::Submitted, E::Submit, ActorRole::Requester).unwrap_err();
        assert_eq!(
            err,
            TransitionRejected::IllegalFromState {
                from: S::Submitted,
                event: E::Submit
            }
        );
        assert!(matches!(
            err.into_broker_error(Uuid::nil()),
            BrokerError::StateConflict(_)
        ));
    }

    #[test]
    fn test_terminal_statuses_have_no_requester_moves() {
        for status in [S::Rejected, S::Expired, S::Cancelled, S::Completed, S::Archived] {
            assert!(WorkflowEngine::available_events(status, ActorRole::Requester).is_empty());
            assert!(WorkflowEngine::available_events(status, ActorRole::Operator).is_empty());
        }
    }

    #[test]
    fn test_archive_from_pre_terminal_only() {
        assert!(WorkflowEngine::transition(S::UnderReview, E::Archive, ActorRole::Requester).is_ok());
        for status in [S::Accepted, S::Confirmed] {
            for role in [ActorRole::Requester, ActorRole::Operator, ActorRole::Admin] {
                assert_eq!(
                    WorkflowEngine::transition(status, E::Archive, role),
                    Err(TransitionRejected::IllegalFromState { from: status, event: E::Archive })
                );
            }
        }
    }

    #[test]
    fn test_edit_follows_can_edit() {
        for status in InquiryStatus::ALL {
            let result = WorkflowEngine::transition(status, E::Edit, ActorRole::Requester);
            if WorkflowEngine::can_edit(status) {
                assert_eq!(result, Ok(status), "status {}", status);
            } else {
                assert!(result.is_err(), "status {}", status);
            }
        }
        assert!(WorkflowEngine::transition(S::Draft, E::Edit, ActorRole::Operator).is_err());
    }

    #[test]
    fn test_available_events_by_role() {
        let requester = WorkflowEngine::available_events(S::OfferSent, ActorRole::Requester);
        assert!(requester.contains(&E::AcceptOffer));
        assert!(!requester.contains(&E::DraftOffer));

        let operator = WorkflowEngine::available_events(S::OfferSent, ActorRole::Operator);
        assert!(operator.contains(&E::DraftOffer));
        assert!(!operator.contains(&E::AcceptOffer));
    }

    #[test]
    fn test_lazy_expiry() {
        let today = date(2026, 3, 10);
        assert_eq!(
            WorkflowEngine::effective_offer_status(OfferStatus::Sent, date(2026, 3, 9), today),
            OfferStatus::Expired
        );
        assert_eq!(
            WorkflowEngine::effective_offer_status(OfferStatus::Sent, today, today),
            OfferStatus::Sent
        );
        // only sent offers expire lazily
        assert_eq!(
            WorkflowEngine::effective_offer_status(OfferStatus::Draft, date(2026, 1, 1), today),
            OfferStatus::Draft
        );
    }

    #[test]
    fn test_offer_transitions() {
        let id = Uuid::new_v4();
        assert_eq!(
            WorkflowEngine::offer_transition(id, OfferStatus::Draft, OfferAction::Send).unwrap(),
            OfferStatus::Sent
        );
        assert_eq!(
            WorkflowEngine::offer_transition(id, OfferStatus::Sent, OfferAction::Accept).unwrap(),
            OfferStatus::Accepted
        );
        let err = WorkflowEngine::offer_transition(id, OfferStatus::Expired, OfferAction::Accept).unwrap_err();
        assert_eq!(err.status, "expired");
        assert!(WorkflowEngine::offer_transition(id, OfferStatus::Rejected, OfferAction::Accept).is_err());
        assert!(WorkflowEngine::offer_transition(id, OfferStatus::Sent, OfferAction::Edit).is_err());
    }

    #[test]
    fn test_check_sendable() {
        let today = date(2026, 3, 10);
        let empty = OfferDraft::new(dec!(10), today).unwrap();
        assert_eq!(
            WorkflowEngine::check_sendable(&empty, today).unwrap_err().field,
            "space_allocations"
        );

        let free = OfferAggregator::apply_edit(
            &empty,
            OfferEdit::AddSpace {
                warehouse_space_id: Uuid::new_v4(),
                allocated_size_m2: dec!(10),
                list_price_per_m2: Money::ZERO,
            },
        )
        .unwrap();
        assert_eq!(WorkflowEngine::check_sendable(&free, today).unwrap_err().field, "subtotal");

        let priced = OfferAggregator::apply_edit(
            &free,
            OfferEdit::SetSpacePrice {
                index: 0,
                list_price_per_m2: Money::new(1, 0),
            },
        )
        .unwrap();
        assert!(WorkflowEngine::check_sendable(&priced, today).is_ok());

        let stale = OfferAggregator::apply_edit(
            &priced,
            OfferEdit::SetValidUntil {
                valid_until: date(2026, 3, 9),
            },
        )
        .unwrap();
        assert_eq!(
            WorkflowEngine::check_sendable(&stale, today).unwrap_err().rule,
            ValidationRule::DateInPast(today)
        );
    }

    #[test]
    fn test_booking_status_transitions() {
        assert!(BookingStatus::Active.can_transition_to(BookingStatus::Completed));
        assert!(BookingStatus::Active.can_transition_to(BookingStatus::Cancelled));
        assert!(!BookingStatus::Completed.can_transition_to(BookingStatus::Active));
        assert!(!BookingStatus::Cancelled.can_transition_to(BookingStatus::Completed));
        assert!(BookingStatus::Completed.is_terminal());
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Operator".parse::<ActorRole>().unwrap(), ActorRole::Operator);
        assert!("guest".parse::<ActorRole>().is_err());
        assert!(ActorRole::Admin.is_staff());
        assert!(!ActorRole::Requester.is_staff());
    }
}
