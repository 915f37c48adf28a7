use rust_decimal::Decimal;

use crate::domain::Inquiry;
use crate::error::{ValidationError, ValidationRule};
use crate::storage::WarehouseSpace;

/// Business rules an inquiry must satisfy before it can be submitted
pub struct InquiryCompatibilityChecker {
    max_notes_length: usize,
    max_space_type_length: usize,
}

impl Default for InquiryCompatibilityChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl InquiryCompatibilityChecker {
    /// Create a checker with default rules
    pub fn new() -> Self {
        Self {
            max_notes_length: 2000,
            max_space_type_length: 64,
        }
    }

    pub fn with_rules(max_notes_length: usize, max_space_type_length: usize) -> Self {
        Self {
            max_notes_length,
            max_space_type_length,
        }
    }

    /// Field-level checks that hold for any saved inquiry, even an incomplete draft
    pub fn validate_draft(&self, inquiry: &Inquiry) -> Result<(), ValidationError> {
        for (i, request) in inquiry.space_requests.iter().enumerate() {
            let space_type = request.space_type.trim();
            if space_type.is_empty() {
                return Err(ValidationError::new(
                    format!("space_requests[{}].space_type", i),
                    ValidationRule::Empty,
                ));
            }
            if space_type.len() > self.max_space_type_length {
                return Err(ValidationError::new(
                    format!("space_requests[{}].space_type", i),
                    ValidationRule::TooLong(self.max_space_type_length),
                ));
            }
            if request.size_m2 <= Decimal::ZERO {
                return Err(ValidationError::new(
                    format!("space_requests[{}].size_m2", i),
                    ValidationRule::NotPositive,
                ));
            }
        }

        requested_m2(inquiry)?;

        if !inquiry.date_range.is_ordered() {
            return Err(ValidationError::new("date_range", ValidationRule::InvertedDateRange));
        }

        if let Some(ref notes) = inquiry.notes {
            if notes.chars().count() > self.max_notes_length {
                return Err(ValidationError::new(
                    "notes",
                    ValidationRule::TooLong(self.max_notes_length),
                ));
            }
        }

        Ok(())
    }

    /// Draft checks plus completeness: at least one space request and one warehouse
    pub fn validate_for_submission(&self, inquiry: &Inquiry) -> Result<(), ValidationError> {
        self.validate_draft(inquiry)?;

        if inquiry.space_requests.is_empty() {
            return Err(ValidationError::new("space_requests", ValidationRule::Empty));
        }
        if inquiry.warehouse_ids.is_empty() {
            return Err(ValidationError::new("warehouse_ids", ValidationRule::Empty));
        }

        Ok(())
    }

    /// Single-space path: the space must belong to a selected warehouse, have
    /// room for the request, and not be claimed by another pending inquiry
    /// over overlapping dates.
    pub fn validate_space_availability(
        &self,
        inquiry: &Inquiry,
        space: &WarehouseSpace,
        other_inquiries: &[Inquiry],
    ) -> Result<(), ValidationError> {
        if !inquiry.warehouse_ids.contains(&space.warehouse_id) {
            return Err(ValidationError::new("space_id", ValidationRule::InvalidWarehouse));
        }

        let requested = requested_m2(inquiry)?;
        if requested > space.capacity_m2 {
            return Err(ValidationError::new(
                "space_requests",
                ValidationRule::ExceedsCapacity {
                    requested,
                    available: space.capacity_m2,
                },
            ));
        }

        let conflict = other_inquiries
            .iter()
            .find(|other| other.id != inquiry.id && other.holds_space(space.id, &inquiry.date_range));
        if let Some(other) = conflict {
            return Err(ValidationError::new(
                "date_range",
                ValidationRule::OverlapsPendingInquiry(other.id),
            ));
        }

        Ok(())
    }
}

fn requested_m2(inquiry: &Inquiry) -> Result<Decimal, ValidationError> {
    inquiry
        .total_requested_m2()
        .ok_or_else(|| ValidationError::new("space_requests", ValidationRule::Overflow))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::business::InquiryStatus;
    use crate::domain::{DateRange, Money, NewInquiry, SpaceRequest};
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn space(warehouse_id: Uuid) -> WarehouseSpace {
        WarehouseSpace {
            id: Uuid::new_v4(),
            warehouse_id,
            space_type: "warehousing".to_string(),
            capacity_m2: dec!(100),
            price_per_m2_per_day: Money::new(2, 0),
        }
    }

    fn inquiry(warehouse_id: Uuid, space_id: Option<Uuid>, size: Decimal, range: DateRange) -> Inquiry {
        Inquiry::new(
            Uuid::new_v4(),
            NewInquiry {
                warehouse_ids: vec![warehouse_id],
                space_requests: vec![SpaceRequest {
                    space_type: "warehousing".to_string(),
                    size_m2: size,
                }],
                feature_ids: vec![],
                service_ids: vec![],
                date_range: range,
                notes: None,
                space_id,
            },
            Utc::now(),
        )
    }

    fn may() -> DateRange {
        DateRange::new(date(2026, 5, 1), date(2026, 5, 10))
    }

    #[test]
    fn test_valid_inquiry_passes() {
        let checker = InquiryCompatibilityChecker::new();
        let inquiry = inquiry(Uuid::new_v4(), None, dec!(10), may());
        assert!(checker.validate_for_submission(&inquiry).is_ok());
    }

    #[test]
    fn test_non_positive_size() {
        let checker = InquiryCompatibilityChecker::new();
        let inquiry = inquiry(Uuid::new_v4(), None, dec!(0), may());
        let err = checker.validate_draft(&inquiry).unwrap_err();
        assert_eq!(err.field, "space_requests[0].size_m2");
        assert_eq!(err.rule, ValidationRule::NotPositive);
    }

    #[test]
    fn test_missing_space_type() {
        let checker = InquiryCompatibilityChecker::new();
        let mut inquiry = inquiry(Uuid::new_v4(), None, dec!(5), may());
        inquiry.space_requests[0].space_type = "  ".to_string();
        let err = checker.validate_draft(&inquiry).unwrap_err();
        assert_eq!(err.field, "space_requests[0].space_type");
    }

    #[test]
    fn test_inverted_dates() {
        let checker = InquiryCompatibilityChecker::new();
        let range = DateRange::new(date(2026, 5, 10), date(2026, 5, 1));
        let inquiry = inquiry(Uuid::new_v4(), None, dec!(5), range);
        assert_eq!(
            checker.validate_draft(&inquiry).unwrap_err().rule,
            ValidationRule::InvertedDateRange
        );
    }

    #[test]
    fn test_notes_too_long() {
        let checker = InquiryCompatibilityChecker::with_rules(10, 64);
        let mut inquiry = inquiry(Uuid::new_v4(), None, dec!(5), may());
        inquiry.notes = Some("a".repeat(11));
        assert_eq!(checker.validate_draft(&inquiry).unwrap_err().field, "notes");
    }

    #[test]
    fn test_incomplete_drafts_rejected_on_submission() {
        let checker = InquiryCompatibilityChecker::new();
        let mut no_spaces = inquiry(Uuid::new_v4(), None, dec!(5), may());
        no_spaces.space_requests.clear();
        assert!(checker.validate_draft(&no_spaces).is_ok());
        assert_eq!(
            checker.validate_for_submission(&no_spaces).unwrap_err().field,
            "space_requests"
        );

        let mut no_warehouses = inquiry(Uuid::new_v4(), None, dec!(5), may());
        no_warehouses.warehouse_ids.clear();
        assert_eq!(
            checker.validate_for_submission(&no_warehouses).unwrap_err().field,
            "warehouse_ids"
        );
    }

    #[test]
    fn test_capacity_exceeded() {
        let checker = InquiryCompatibilityChecker::new();
        let warehouse = Uuid::new_v4();
        let space = space(warehouse);
        let inquiry = inquiry(warehouse, Some(space.id), dec!(100.5), may());
        let err = checker.validate_space_availability(&inquiry, &space, &[]).unwrap_err();
        assert_eq!(
            err.rule,
            ValidationRule::ExceedsCapacity {
                requested: dec!(100.5),
                available: dec!(100)
            }
        );
    }

    #[test]
    fn test_space_outside_selected_warehouses() {
        let checker = InquiryCompatibilityChecker::new();
        let space = space(Uuid::new_v4());
        let inquiry = inquiry(Uuid::new_v4(), Some(space.id), dec!(10), may());
        assert_eq!(
            checker.validate_space_availability(&inquiry, &space, &[]).unwrap_err().rule,
            ValidationRule::InvalidWarehouse
        );
    }

    #[test]
    fn test_overlapping_pending_inquiry() {
        let checker = InquiryCompatibilityChecker::new();
        let warehouse = Uuid::new_v4();
        let space = space(warehouse);

        let mut existing = inquiry(
            warehouse,
            Some(space.id),
            dec!(10),
            DateRange::new(date(2026, 5, 10), date(2026, 5, 20)),
        );
        existing.status = InquiryStatus::Submitted;
        let candidate = inquiry(warehouse, Some(space.id), dec!(10), may());

        let err = checker
            .validate_space_availability(&candidate, &space, &[existing.clone()])
            .unwrap_err();
        assert_eq!(err.rule, ValidationRule::OverlapsPendingInquiry(existing.id));

        // settled inquiries do not block
        existing.status = InquiryStatus::Rejected;
        assert!(checker
            .validate_space_availability(&candidate, &space, &[existing.clone()])
            .is_ok());

        // disjoint dates do not block
        existing.status = InquiryStatus::OfferSent;
        existing.date_range = DateRange::new(date(2026, 5, 11), date(2026, 5, 20));
        assert!(checker
            .validate_space_availability(&candidate, &space, &[existing])
            .is_ok());
    }

    #[test]
    fn test_inquiry_does_not_conflict_with_itself() {
        let checker = InquiryCompatibilityChecker::new();
        let warehouse = Uuid::new_v4();
        let space = space(warehouse);
        let mut candidate = inquiry(warehouse, Some(space.id), dec!(10), may());
        candidate.status = InquiryStatus::Submitted;
        assert!(checker
            .validate_space_availability(&candidate, &space, &[candidate.clone()])
            .is_ok());
    }

    #[test]
    fn test_requested_size_overflow_is_a_validation_error() {
        let checker = InquiryCompatibilityChecker::new();
        let warehouse = Uuid::new_v4();
        let space = space(warehouse);
        let huge = Decimal::MAX / dec!(1.5);
        let mut candidate = inquiry(warehouse, Some(space.id), huge, may());
        candidate.space_requests.push(candidate.space_requests[0].clone());

        let err = checker.validate_for_submission(&candidate).unwrap_err();
        assert_eq!(err.field, "space_requests");
        assert_eq!(err.rule, ValidationRule::Overflow);

        let err = checker
            .validate_space_availability(&candidate, &space, &[])
            .unwrap_err();
        assert_eq!(err.rule, ValidationRule::Overflow);
    }
}
