use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::business::line_items::{ServiceAllocation, ServicePricing, SpaceAllocation};
use crate::domain::Money;
use crate::error::{ValidationError, ValidationRule};

const FEE_PERCENTAGE_FIELD: &str = "platform_fee_percentage";
const FEE_AMOUNT_FIELD: &str = "platform_fee_amount";

/// Which representation of the fee the last edit supplied
#[derive(Debug, Clone, Copy)]
enum FeeInput {
    Percentage(Decimal),
    Amount(Money),
    /// Subtotal moved; re-derive the amount from the current percentage
    Rebase,
}

/// Platform fee with two editable, mutually consistent representations.
/// The percentage is sticky across subtotal changes, the amount is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformFee {
    percentage: Decimal,
    amount: Money,
}

impl PlatformFee {
    pub fn from_percentage(percentage: Decimal, subtotal: Money) -> Result<Self, ValidationError> {
        let mut fee = Self {
            percentage: Decimal::ZERO,
            amount: Money::ZERO,
        };
        fee.set_percentage(percentage, subtotal)?;
        Ok(fee)
    }

    pub fn percentage(&self) -> Decimal {
        self.percentage
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn set_percentage(&mut self, percentage: Decimal, subtotal: Money) -> Result<(), ValidationError> {
        self.recompute(FeeInput::Percentage(percentage), subtotal)
    }

    /// Set the absolute fee. With a zero subtotal the percentage is left as is.
    pub fn set_amount(&mut self, amount: Money, subtotal: Money) -> Result<(), ValidationError> {
        self.recompute(FeeInput::Amount(amount), subtotal)
    }

    pub fn rebase(&mut self, subtotal: Money) -> Result<(), ValidationError> {
        self.recompute(FeeInput::Rebase, subtotal)
    }

    fn recompute(&mut self, input: FeeInput, subtotal: Money) -> Result<(), ValidationError> {
        let (percentage, amount) = match input {
            FeeInput::Percentage(p) => {
                check_percentage(p, FEE_PERCENTAGE_FIELD)?;
                (p, fee_amount(subtotal, p)?)
            }
            FeeInput::Amount(a) => {
                if a.is_negative() {
                    return Err(ValidationError::new(FEE_AMOUNT_FIELD, ValidationRule::Negative));
                }
                match a.ratio_percent(subtotal) {
                    Some(p) => {
                        check_percentage(p, FEE_AMOUNT_FIELD)?;
                        (p, a)
                    }
                    None => (self.percentage, a),
                }
            }
            FeeInput::Rebase => (self.percentage, fee_amount(subtotal, self.percentage)?),
        };

        self.percentage = percentage;
        self.amount = amount;
        Ok(())
    }
}

fn check_percentage(p: Decimal, field: &str) -> Result<(), ValidationError> {
    if p < Decimal::ZERO || p > Decimal::ONE_HUNDRED {
        return Err(ValidationError::new(
            field,
            ValidationRule::OutOfRange {
                min: Decimal::ZERO,
                max: Decimal::ONE_HUNDRED,
            },
        ));
    }
    Ok(())
}

fn fee_amount(subtotal: Money, percentage: Decimal) -> Result<Money, ValidationError> {
    subtotal
        .percentage_of(percentage)
        .ok_or_else(|| ValidationError::new(FEE_AMOUNT_FIELD, ValidationRule::Overflow))
}

/// Computed totals of an offer draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferTotals {
    pub subtotal: Money,
    pub platform_fee_percentage: Decimal,
    pub platform_fee_amount: Money,
    pub grand_total: Money,
    pub quote_required: bool,
}

/// Editable content of an offer. Subtotal and fee are only ever changed by
/// [`OfferAggregator::apply_edit`], so the totals always match the lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferDraft {
    space_allocations: Vec<SpaceAllocation>,
    service_allocations: Vec<ServiceAllocation>,
    subtotal: Money,
    fee: PlatformFee,
    grand_total: Money,
    pub valid_until: NaiveDate,
    pub notes: Option<String>,
}

impl OfferDraft {
    pub fn new(fee_percentage: Decimal, valid_until: NaiveDate) -> Result<Self, ValidationError> {
        let mut draft = Self {
            space_allocations: Vec::new(),
            service_allocations: Vec::new(),
            subtotal: Money::ZERO,
            fee: PlatformFee::from_percentage(fee_percentage, Money::ZERO)?,
            grand_total: Money::ZERO,
            valid_until,
            notes: None,
        };
        draft.settle()?;
        Ok(draft)
    }

    pub fn space_allocations(&self) -> &[SpaceAllocation] {
        &self.space_allocations
    }

    pub fn service_allocations(&self) -> &[ServiceAllocation] {
        &self.service_allocations
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    pub fn fee(&self) -> PlatformFee {
        self.fee
    }

    pub fn grand_total(&self) -> Money {
        self.grand_total
    }

    pub fn quote_required(&self) -> bool {
        self.service_allocations.iter().any(|s| s.quote_required())
    }

    pub fn totals(&self) -> OfferTotals {
        OfferTotals {
            subtotal: self.subtotal,
            platform_fee_percentage: self.fee.percentage(),
            platform_fee_amount: self.fee.amount(),
            grand_total: self.grand_total(),
            quote_required: self.quote_required(),
        }
    }

    fn space_mut(&mut self, index: usize) -> Result<(&mut SpaceAllocation, String), ValidationError> {
        let field = format!("space_allocations[{}]", index);
        self.space_allocations
            .get_mut(index)
            .map(|line| (line, field))
            .ok_or_else(|| ValidationError::new("space_allocations", ValidationRule::NoSuchLine(index)))
    }

    fn service_mut(&mut self, index: usize) -> Result<(&mut ServiceAllocation, String), ValidationError> {
        let field = format!("service_allocations[{}]", index);
        self.service_allocations
            .get_mut(index)
            .map(|line| (line, field))
            .ok_or_else(|| ValidationError::new("service_allocations", ValidationRule::NoSuchLine(index)))
    }

    /// Recompute the subtotal from the lines and re-derive the fee amount
    fn reconcile(&mut self) -> Result<(), ValidationError> {
        let mut subtotal = Money::ZERO;
        let lines = self
            .space_allocations
            .iter()
            .map(SpaceAllocation::line_total)
            .chain(
                self.service_allocations
                    .iter()
                    .filter(|s| s.counts_toward_subtotal())
                    .map(ServiceAllocation::line_total),
            );
        for total in lines {
            subtotal = subtotal
                .checked_add(total)
                .ok_or_else(|| ValidationError::new("subtotal", ValidationRule::Overflow))?;
        }
        self.subtotal = subtotal;
        self.fee.rebase(subtotal)
    }

    /// Derive the grand total from the current subtotal and fee
    fn settle(&mut self) -> Result<(), ValidationError> {
        self.grand_total = self
            .subtotal
            .checked_add(self.fee.amount())
            .ok_or_else(|| ValidationError::new("grand_total", ValidationRule::Overflow))?;
        Ok(())
    }
}

/// A single change to an offer draft
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OfferEdit {
    AddSpace {
        warehouse_space_id: Uuid,
        allocated_size_m2: Decimal,
        list_price_per_m2: Money,
    },
    SetSpaceSize { index: usize, allocated_size_m2: Decimal },
    SetSpacePrice { index: usize, list_price_per_m2: Money },
    OverrideSpaceTotal { index: usize, line_total: Money },
    RemoveSpace { index: usize },
    AddService { service_id: Uuid, pricing: ServicePricing },
    SetServicePricing { index: usize, pricing: ServicePricing },
    SetServiceQuantity { index: usize, quantity: Decimal },
    OverrideServiceTotal { index: usize, line_total: Money },
    RemoveService { index: usize },
    SetFeePercentage { percentage: Decimal },
    SetFeeAmount { amount: Money },
    SetValidUntil { valid_until: NaiveDate },
    SetNotes { notes: Option<String> },
}

impl OfferEdit {
    fn touches_lines(&self) -> bool {
        !matches!(
            self,
            OfferEdit::SetFeePercentage { .. }
                | OfferEdit::SetFeeAmount { .. }
                | OfferEdit::SetValidUntil { .. }
                | OfferEdit::SetNotes { .. }
        )
    }
}

/// Pure update function for offer drafts
pub struct OfferAggregator;

impl OfferAggregator {
    /// Apply one edit and recompute every derived value. Nothing is applied on error.
    pub fn apply_edit(draft: &OfferDraft, edit: OfferEdit) -> Result<OfferDraft, ValidationError> {
        let mut next = draft.clone();
        let touches_lines = edit.touches_lines();

        match edit {
            OfferEdit::AddSpace {
                warehouse_space_id,
                allocated_size_m2,
                list_price_per_m2,
            } => {
                let field = format!("space_allocations[{}]", next.space_allocations.len());
                let line =
                    SpaceAllocation::new(warehouse_space_id, allocated_size_m2, list_price_per_m2, &field)?;
                next.space_allocations.push(line);
            }
            OfferEdit::SetSpaceSize {
                index,
                allocated_size_m2,
            } => {
                let (line, field) = next.space_mut(index)?;
                line.set_allocated_size(allocated_size_m2, &field)?;
            }
            OfferEdit::SetSpacePrice {
                index,
                list_price_per_m2,
            } => {
                let (line, field) = next.space_mut(index)?;
                line.set_list_price(list_price_per_m2, &field)?;
            }
            OfferEdit::OverrideSpaceTotal { index, line_total } => {
                let (line, field) = next.space_mut(index)?;
                line.override_line_total(line_total, &field)?;
            }
            OfferEdit::RemoveSpace { index } => {
                next.space_mut(index)?;
                next.space_allocations.remove(index);
            }
            OfferEdit::AddService { service_id, pricing } => {
                let field = format!("service_allocations[{}]", next.service_allocations.len());
                let line = ServiceAllocation::new(service_id, pricing, &field)?;
                next.service_allocations.push(line);
            }
            OfferEdit::SetServicePricing { index, pricing } => {
                let (line, field) = next.service_mut(index)?;
                line.set_pricing(pricing, &field)?;
            }
            OfferEdit::SetServiceQuantity { index, quantity } => {
                let (line, field) = next.service_mut(index)?;
                line.set_quantity(quantity, &field)?;
            }
            OfferEdit::OverrideServiceTotal { index, line_total } => {
                let (line, field) = next.service_mut(index)?;
                line.override_line_total(line_total, &field)?;
            }
            OfferEdit::RemoveService { index } => {
                next.service_mut(index)?;
                next.service_allocations.remove(index);
            }
            OfferEdit::SetFeePercentage { percentage } => {
                let subtotal = next.subtotal;
                next.fee.set_percentage(percentage, subtotal)?;
            }
            OfferEdit::SetFeeAmount { amount } => {
                let subtotal = next.subtotal;
                next.fee.set_amount(amount, subtotal)?;
            }
            OfferEdit::SetValidUntil { valid_until } => next.valid_until = valid_until,
            OfferEdit::SetNotes { notes } => next.notes = notes,
        }

        if touches_lines {
            next.reconcile()?;
        }
        next.settle()?;
        Ok(next)
    }

    pub fn apply_edits<I>(draft: &OfferDraft, edits: I) -> Result<OfferDraft, ValidationError>
    where
        I: IntoIterator<Item = OfferEdit>,
    {
        edits
            .into_iter()
            .try_fold(draft.clone(), |current, edit| Self::apply_edit(&current, edit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn valid_until() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 1, 31).unwrap()
    }

    fn draft_with_subtotal(subtotal: Money, fee_percentage: Decimal) -> OfferDraft {
        let draft = OfferDraft::new(fee_percentage, valid_until()).unwrap();
        OfferAggregator::apply_edit(
            &draft,
            OfferEdit::AddService {
                service_id: Uuid::new_v4(),
                pricing: ServicePricing::Fixed { fixed_price: subtotal },
            },
        )
        .unwrap()
    }

    fn assert_reconciled(draft: &OfferDraft) {
        assert_eq!(
            Some(draft.grand_total()),
            draft.subtotal().checked_add(draft.fee().amount())
        );
        let expected = Money::checked_sum(
            draft
                .space_allocations()
                .iter()
                .map(|s| s.line_total())
                .chain(
                    draft
                        .service_allocations()
                        .iter()
                        .filter(|s| s.counts_toward_subtotal())
                        .map(|s| s.line_total()),
                ),
        );
        assert_eq!(Some(draft.subtotal()), expected);
    }

    #[test]
    fn test_fee_percentage_then_amount() {
        let draft = draft_with_subtotal(Money::new(1000, 0), dec!(20));
        assert_eq!(draft.fee().amount(), Money::new(200, 0));
        assert_eq!(draft.grand_total(), Money::new(1200, 0));

        let draft = OfferAggregator::apply_edit(
            &draft,
            OfferEdit::SetFeeAmount {
                amount: Money::new(150, 0),
            },
        )
        .unwrap();
        assert_eq!(draft.fee().percentage(), dec!(15));
        assert_eq!(draft.grand_total(), Money::new(1150, 0));
    }

    #[test]
    fn test_percentage_is_sticky_across_subtotal_changes() {
        let draft = draft_with_subtotal(Money::new(1000, 0), dec!(10));
        let draft = OfferAggregator::apply_edit(
            &draft,
            OfferEdit::AddSpace {
                warehouse_space_id: Uuid::new_v4(),
                allocated_size_m2: dec!(100),
                list_price_per_m2: Money::new(10, 0),
            },
        )
        .unwrap();
        assert_eq!(draft.subtotal(), Money::new(2000, 0));
        assert_eq!(draft.fee().percentage(), dec!(10));
        assert_eq!(draft.fee().amount(), Money::new(200, 0));
        assert_reconciled(&draft);
    }

    #[test]
    fn test_set_amount_with_zero_subtotal_keeps_percentage() {
        let draft = OfferDraft::new(dec!(12), valid_until()).unwrap();
        let draft = OfferAggregator::apply_edit(
            &draft,
            OfferEdit::SetFeeAmount {
                amount: Money::new(5, 0),
            },
        )
        .unwrap();
        assert_eq!(draft.fee().percentage(), dec!(12));
        assert_eq!(draft.fee().amount(), Money::new(5, 0));
        assert_eq!(draft.grand_total(), Money::new(5, 0));
    }

    #[test]
    fn test_fee_round_trip_within_one_minor_unit() {
        let subtotals = [1, 7, 333, 1_000, 99_999, 123_457, 10_000_000];
        let percentages = [dec!(0), dec!(0.5), dec!(3.33), dec!(7), dec!(12.5), dec!(33.3333), dec!(100)];

        for subtotal in subtotals {
            for p in percentages {
                let subtotal = Money::from_minor(subtotal);
                let mut fee = PlatformFee::from_percentage(p, subtotal).unwrap();
                let amount = fee.amount();
                fee.set_amount(amount, subtotal).unwrap();
                let reapplied = PlatformFee::from_percentage(fee.percentage(), subtotal).unwrap();
                assert!(
                    (reapplied.amount().minor() - amount.minor()).abs() <= 1,
                    "subtotal {} p {}",
                    subtotal,
                    p
                );
                let expected = subtotal.percentage_of(p).unwrap();
                assert!((expected.minor() - amount.minor()).abs() <= 1);
            }
        }
    }

    #[test]
    fn test_fee_out_of_range_rejected() {
        let draft = draft_with_subtotal(Money::new(100, 0), dec!(10));
        let err = OfferAggregator::apply_edit(&draft, OfferEdit::SetFeePercentage { percentage: dec!(120) })
            .unwrap_err();
        assert_eq!(err.field, "platform_fee_percentage");

        let err = OfferAggregator::apply_edit(
            &draft,
            OfferEdit::SetFeeAmount {
                amount: Money::new(101, 0),
            },
        )
        .unwrap_err();
        assert_eq!(err.field, "platform_fee_amount");

        let err = OfferAggregator::apply_edit(
            &draft,
            OfferEdit::SetFeeAmount {
                amount: Money::from_minor(-1),
            },
        )
        .unwrap_err();
        assert_eq!(err.rule, ValidationRule::Negative);
    }

    #[test]
    fn test_ask_quote_excluded_from_subtotal() {
        let draft = draft_with_subtotal(Money::new(50, 0), dec!(0));
        let draft = OfferAggregator::apply_edit(
            &draft,
            OfferEdit::AddService {
                service_id: Uuid::new_v4(),
                pricing: ServicePricing::AskQuote,
            },
        )
        .unwrap();
        assert_eq!(draft.subtotal(), Money::new(50, 0));
        assert!(draft.totals().quote_required);
    }

    #[test]
    fn test_override_then_size_edit_resets() {
        let draft = OfferDraft::new(dec!(10), valid_until()).unwrap();
        let draft = OfferAggregator::apply_edits(
            &draft,
            vec![
                OfferEdit::AddSpace {
                    warehouse_space_id: Uuid::new_v4(),
                    allocated_size_m2: dec!(100),
                    list_price_per_m2: Money::new(2, 0),
                },
                OfferEdit::OverrideSpaceTotal {
                    index: 0,
                    line_total: Money::new(150, 0),
                },
            ],
        )
        .unwrap();
        assert_eq!(draft.subtotal(), Money::new(150, 0));
        assert_eq!(draft.fee().amount(), Money::new(15, 0));

        let draft = OfferAggregator::apply_edit(
            &draft,
            OfferEdit::SetSpaceSize {
                index: 0,
                allocated_size_m2: dec!(120),
            },
        )
        .unwrap();
        assert!(!draft.space_allocations()[0].is_overridden());
        assert_eq!(draft.subtotal(), Money::new(240, 0));
        assert_eq!(draft.fee().amount(), Money::new(24, 0));
    }

    #[test]
    fn test_failed_edit_leaves_draft_untouched() {
        let draft = draft_with_subtotal(Money::new(100, 0), dec!(10));
        let before = draft.clone();
        let result = OfferAggregator::apply_edit(&draft, OfferEdit::RemoveSpace { index: 4 });
        assert_eq!(
            result.unwrap_err().rule,
            ValidationRule::NoSuchLine(4)
        );
        assert_eq!(draft, before);
    }

    #[test]
    fn test_grand_total_reconciles_after_edit_sequence() {
        let space_id = Uuid::new_v4();
        let edits = vec![
            OfferEdit::AddSpace {
                warehouse_space_id: space_id,
                allocated_size_m2: dec!(33.3),
                list_price_per_m2: Money::from_minor(417),
            },
            OfferEdit::SetFeePercentage { percentage: dec!(7.5) },
            OfferEdit::AddService {
                service_id: Uuid::new_v4(),
                pricing: ServicePricing::HourlyRate {
                    price_per_hour: Money::new(35, 0),
                    hours: dec!(3),
                },
            },
            OfferEdit::SetServiceQuantity {
                index: 0,
                quantity: dec!(4.5),
            },
            OfferEdit::SetFeeAmount {
                amount: Money::new(20, 0),
            },
            OfferEdit::OverrideServiceTotal {
                index: 0,
                line_total: Money::new(100, 0),
            },
            OfferEdit::SetSpacePrice {
                index: 0,
                list_price_per_m2: Money::from_minor(500),
            },
            OfferEdit::RemoveService { index: 0 },
        ];

        let mut draft = OfferDraft::new(dec!(10), valid_until()).unwrap();
        for edit in edits {
            draft = OfferAggregator::apply_edit(&draft, edit).unwrap();
            assert_reconciled(&draft);
        }
        assert_eq!(draft.subtotal(), Money::from_minor(16_650));
    }

    #[test]
    fn test_grand_total_overflow_rejected() {
        let draft = OfferDraft::new(dec!(10), valid_until()).unwrap();
        let err = OfferAggregator::apply_edit(
            &draft,
            OfferEdit::AddService {
                service_id: Uuid::new_v4(),
                pricing: ServicePricing::Fixed {
                    fixed_price: Money::from_minor(i64::MAX - 10),
                },
            },
        )
        .unwrap_err();
        assert_eq!(err.field, "grand_total");
        assert_eq!(err.rule, ValidationRule::Overflow);
        assert_eq!(draft.grand_total(), Money::ZERO);
    }

    #[test]
    fn test_fee_edit_that_overflows_grand_total_rejected() {
        let half = Money::from_minor(i64::MAX / 2 + 1);
        let draft = draft_with_subtotal(half, dec!(0));
        assert_eq!(draft.grand_total(), half);

        let err = OfferAggregator::apply_edit(&draft, OfferEdit::SetFeePercentage { percentage: dec!(100) })
            .unwrap_err();
        assert_eq!(err.rule, ValidationRule::Overflow);

        let err = OfferAggregator::apply_edit(&draft, OfferEdit::SetFeeAmount { amount: half }).unwrap_err();
        assert_eq!(err.rule, ValidationRule::Overflow);
    }

    #[test]
    fn test_reconciled_or_overflow_at_large_magnitudes() {
        let subtotals = [
            i64::MAX / 4,
            i64::MAX / 2 - 1,
            i64::MAX / 2 + 1,
            i64::MAX - 1_000,
        ];
        let percentages = [dec!(0), dec!(1), dec!(50), dec!(99.9), dec!(100)];

        for subtotal in subtotals {
            for p in percentages {
                let draft = OfferDraft::new(p, valid_until()).unwrap();
                let result = OfferAggregator::apply_edit(
                    &draft,
                    OfferEdit::AddService {
                        service_id: Uuid::new_v4(),
                        pricing: ServicePricing::Fixed {
                            fixed_price: Money::from_minor(subtotal),
                        },
                    },
                );
                match result {
                    Ok(draft) => {
                        assert_reconciled(&draft);
                        let _ = draft.totals();
                    }
                    Err(e) => assert_eq!(e.rule, ValidationRule::Overflow, "subtotal {} p {}", subtotal, p),
                }
            }
        }
    }
}
