use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::business::InquiryStatus;
use crate::domain::Money;

/// Amount of one kind of space a renter asks for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceRequest {
    pub space_type: String,
    pub size_m2: Decimal,
}

/// Inclusive rental period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRange {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self { start_date, end_date }
    }

    pub fn is_ordered(&self) -> bool {
        self.start_date <= self.end_date
    }

    /// Number of rental days, counting both ends. Zero for an inverted range.
    pub fn days(&self) -> i64 {
        if !self.is_ordered() {
            return 0;
        }
        (self.end_date - self.start_date).num_days() + 1
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        other.start_date <= self.end_date && other.end_date >= self.start_date
    }
}

/// Request shape for creating an inquiry
#[derive(Debug, Clone)]
pub struct NewInquiry {
    pub warehouse_ids: Vec<Uuid>,
    pub space_requests: Vec<SpaceRequest>,
    pub feature_ids: Vec<Uuid>,
    pub service_ids: Vec<Uuid>,
    pub date_range: DateRange,
    pub notes: Option<String>,
    /// Set on the single-space inquiry path
    pub space_id: Option<Uuid>,
}

/// A renter's request for space and services over a date range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inquiry {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub space_requests: Vec<SpaceRequest>,
    pub warehouse_ids: BTreeSet<Uuid>,
    pub feature_ids: BTreeSet<Uuid>,
    pub service_ids: BTreeSet<Uuid>,
    pub date_range: DateRange,
    pub notes: Option<String>,
    pub space_id: Option<Uuid>,
    /// Advisory, from catalog list prices. Frozen once submitted.
    pub estimated_cost: Money,
    pub status: InquiryStatus,
    /// Bumped by the store on every write
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Inquiry {
    pub fn new(requester_id: Uuid, request: NewInquiry, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            requester_id,
            space_requests: request.space_requests,
            warehouse_ids: request.warehouse_ids.into_iter().collect(),
            feature_ids: request.feature_ids.into_iter().collect(),
            service_ids: request.service_ids.into_iter().collect(),
            date_range: request.date_range,
            notes: request.notes,
            space_id: request.space_id,
            estimated_cost: Money::ZERO,
            status: InquiryStatus::Draft,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, actor_id: Uuid) -> bool {
        self.requester_id == actor_id
    }

    /// Replace the requested content, keeping identity, owner and status
    pub fn revise(&mut self, request: NewInquiry) {
        self.space_requests = request.space_requests;
        self.warehouse_ids = request.warehouse_ids.into_iter().collect();
        self.feature_ids = request.feature_ids.into_iter().collect();
        self.service_ids = request.service_ids.into_iter().collect();
        self.date_range = request.date_range;
        self.notes = request.notes;
        self.space_id = request.space_id;
    }

    /// Whether this inquiry, while pending, holds `space_id` on dates overlapping `range`
    pub fn holds_space(&self, space_id: Uuid, range: &DateRange) -> bool {
        self.space_id == Some(space_id) && self.status.is_pending() && self.date_range.overlaps(range)
    }

    /// `None` when the sizes overflow
    pub fn total_requested_m2(&self) -> Option<Decimal> {
        self.space_requests
            .iter()
            .try_fold(Decimal::ZERO, |total, r| total.checked_add(r.size_m2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_days_inclusive() {
        let range = DateRange::new(date(2026, 5, 1), date(2026, 5, 10));
        assert_eq!(range.days(), 10);
        assert_eq!(DateRange::new(date(2026, 5, 1), date(2026, 5, 1)).days(), 1);
        assert_eq!(DateRange::new(date(2026, 5, 2), date(2026, 5, 1)).days(), 0);
    }

    #[test]
    fn test_overlap_includes_touching_ends() {
        let a = DateRange::new(date(2026, 5, 1), date(2026, 5, 10));
        assert!(a.overlaps(&DateRange::new(date(2026, 5, 10), date(2026, 5, 20))));
        assert!(a.overlaps(&DateRange::new(date(2026, 4, 1), date(2026, 5, 1))));
        assert!(a.overlaps(&DateRange::new(date(2026, 5, 3), date(2026, 5, 4))));
        assert!(!a.overlaps(&DateRange::new(date(2026, 5, 11), date(2026, 5, 20))));
    }

    #[test]
    fn test_new_inquiry_dedupes_ids() {
        let warehouse = Uuid::new_v4();
        let request = NewInquiry {
            warehouse_ids: vec![warehouse, warehouse],
            space_requests: vec![
                SpaceRequest { space_type: "warehousing".to_string(), size_m2: dec!(40) },
                SpaceRequest { space_type: "cold_storage".to_string(), size_m2: dec!(12.5) },
            ],
            feature_ids: vec![],
            service_ids: vec![],
            date_range: DateRange::new(date(2026, 5, 1), date(2026, 5, 10)),
            notes: None,
            space_id: None,
        };
        let requester = Uuid::new_v4();
        let inquiry = Inquiry::new(requester, request, Utc::now());

        assert_eq!(inquiry.warehouse_ids.len(), 1);
        assert_eq!(inquiry.status, InquiryStatus::Draft);
        assert_eq!(inquiry.total_requested_m2(), Some(dec!(52.5)));
        assert!(inquiry.is_owned_by(requester));
    }

    #[test]
    fn test_revise_keeps_identity() {
        let requester = Uuid::new_v4();
        let mut inquiry = Inquiry::new(
            requester,
            NewInquiry {
                warehouse_ids: vec![Uuid::new_v4()],
                space_requests: vec![],
                feature_ids: vec![],
                service_ids: vec![],
                date_range: DateRange::new(date(2026, 5, 1), date(2026, 5, 10)),
                notes: None,
                space_id: None,
            },
            Utc::now(),
        );
        let id = inquiry.id;
        inquiry.status = InquiryStatus::Submitted;

        inquiry.revise(NewInquiry {
            warehouse_ids: vec![],
            space_requests: vec![SpaceRequest { space_type: "warehousing".to_string(), size_m2: dec!(8) }],
            feature_ids: vec![],
            service_ids: vec![],
            date_range: DateRange::new(date(2026, 6, 1), date(2026, 6, 2)),
            notes: Some("Two days only".to_string()),
            space_id: None,
        });

        assert_eq!(inquiry.id, id);
        assert_eq!(inquiry.status, InquiryStatus::Submitted);
        assert!(inquiry.is_owned_by(requester));
        assert!(inquiry.warehouse_ids.is_empty());
        assert_eq!(inquiry.date_range.days(), 2);
    }

    #[test]
    fn test_total_requested_overflow() {
        let huge = SpaceRequest { space_type: "warehousing".to_string(), size_m2: Decimal::MAX / dec!(1.5) };
        let mut inquiry = Inquiry::new(
            Uuid::new_v4(),
            NewInquiry {
                warehouse_ids: vec![],
                space_requests: vec![huge.clone(), huge],
                feature_ids: vec![],
                service_ids: vec![],
                date_range: DateRange::new(date(2026, 5, 1), date(2026, 5, 1)),
                notes: None,
                space_id: None,
            },
            Utc::now(),
        );
        assert_eq!(inquiry.total_requested_m2(), None);

        inquiry.space_requests.pop();
        assert!(inquiry.total_requested_m2().is_some());
    }
}
