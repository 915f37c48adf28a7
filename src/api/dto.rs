use chrono::{DateTime, NaiveDate, Utc};
use poem_openapi::{Enum, Object};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::business::{
    ActorRole, OfferDraft, OfferTotals, ServiceAllocation, ServicePricing, SpaceAllocation,
    WorkflowEngine,
};
use crate::business::{DraftOfferInput, ServiceAllocationInput, SpaceAllocationInput};
use crate::domain::{Booking, DateRange, Inquiry, Money, NewInquiry, Offer, SpaceRequest};
use crate::error::{ValidationError, ValidationRule};

// Amounts are integers in minor units (cents).

#[derive(Debug, Clone, Object)]
pub struct SpaceRequestDto {
    pub space_type: String,
    pub size_m2: Decimal,
}

#[derive(Debug, Clone, Object)]
pub struct CreateInquiryRequest {
    #[oai(default)]
    pub warehouse_ids: Vec<Uuid>,
    #[oai(default)]
    pub space_requests: Vec<SpaceRequestDto>,
    #[oai(default)]
    pub feature_ids: Vec<Uuid>,
    #[oai(default)]
    pub service_ids: Vec<Uuid>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub notes: Option<String>,
    /// Single-space inquiry
    pub space_id: Option<Uuid>,
}

impl From<CreateInquiryRequest> for NewInquiry {
    fn from(req: CreateInquiryRequest) -> Self {
        NewInquiry {
            warehouse_ids: req.warehouse_ids,
            space_requests: req
                .space_requests
                .into_iter()
                .map(|r| SpaceRequest {
                    space_type: r.space_type,
                    size_m2: r.size_m2,
                })
                .collect(),
            feature_ids: req.feature_ids,
            service_ids: req.service_ids,
            date_range: DateRange::new(req.start_date, req.end_date),
            notes: req.notes,
            space_id: req.space_id,
        }
    }
}

#[derive(Debug, Clone, Object)]
pub struct InquiryDto {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub status: String,
    pub status_label: String,
    pub editable: bool,
    /// Events the calling actor may trigger now
    pub available_events: Vec<String>,
    pub space_requests: Vec<SpaceRequestDto>,
    pub warehouse_ids: Vec<Uuid>,
    pub feature_ids: Vec<Uuid>,
    pub service_ids: Vec<Uuid>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub notes: Option<String>,
    pub space_id: Option<Uuid>,
    pub estimated_cost: i64,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InquiryDto {
    pub fn new(inquiry: Inquiry, role: ActorRole) -> Self {
        let available_events = WorkflowEngine::available_events(inquiry.status, role)
            .into_iter()
            .map(|e| e.code().to_string())
            .collect();
        Self {
            id: inquiry.id,
            requester_id: inquiry.requester_id,
            status: inquiry.status.as_str().to_string(),
            status_label: inquiry.status.label().to_string(),
            editable: WorkflowEngine::can_edit(inquiry.status),
            available_events,
            space_requests: inquiry
                .space_requests
                .into_iter()
                .map(|r| SpaceRequestDto {
                    space_type: r.space_type,
                    size_m2: r.size_m2,
                })
                .collect(),
            warehouse_ids: inquiry.warehouse_ids.into_iter().collect(),
            feature_ids: inquiry.feature_ids.into_iter().collect(),
            service_ids: inquiry.service_ids.into_iter().collect(),
            start_date: inquiry.date_range.start_date,
            end_date: inquiry.date_range.end_date,
            notes: inquiry.notes,
            space_id: inquiry.space_id,
            estimated_cost: inquiry.estimated_cost.minor(),
            version: inquiry.version,
            created_at: inquiry.created_at,
            updated_at: inquiry.updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
#[oai(rename_all = "snake_case")]
pub enum PricingModeDto {
    HourlyRate,
    PerUnit,
    Fixed,
    AskQuote,
}

/// Flat wire form of a service price. Only the fields of `pricing_mode`
/// may be set.
#[derive(Debug, Clone, Object)]
pub struct ServicePricingDto {
    pub pricing_mode: PricingModeDto,
    pub price_per_hour: Option<i64>,
    pub hours: Option<Decimal>,
    pub price_per_unit: Option<i64>,
    pub quantity: Option<Decimal>,
    pub unit_label: Option<String>,
    pub fixed_price: Option<i64>,
}

impl ServicePricingDto {
    fn empty(pricing_mode: PricingModeDto) -> Self {
        Self {
            pricing_mode,
            price_per_hour: None,
            hours: None,
            price_per_unit: None,
            quantity: None,
            unit_label: None,
            fixed_price: None,
        }
    }

    pub fn into_pricing(self, field: &str) -> Result<ServicePricing, ValidationError> {
        let mode = match self.pricing_mode {
            PricingModeDto::HourlyRate => "hourly_rate",
            PricingModeDto::PerUnit => "per_unit",
            PricingModeDto::Fixed => "fixed",
            PricingModeDto::AskQuote => "ask_quote",
        };
        let required = |name: &str| ValidationError::new(format!("{}.{}", field, name), ValidationRule::Required(mode));
        let stray = |name: &str| ValidationError::new(format!("{}.{}", field, name), ValidationRule::NotApplicable(mode));

        let hourly = self.price_per_hour.is_some() || self.hours.is_some();
        let per_unit = self.price_per_unit.is_some() || self.quantity.is_some() || self.unit_label.is_some();
        let fixed = self.fixed_price.is_some();

        match self.pricing_mode {
            PricingModeDto::HourlyRate => {
                if per_unit {
                    return Err(stray("price_per_unit"));
                }
                if fixed {
                    return Err(stray("fixed_price"));
                }
                Ok(ServicePricing::HourlyRate {
                    price_per_hour: Money::from_minor(self.price_per_hour.ok_or_else(|| required("price_per_hour"))?),
                    hours: self.hours.ok_or_else(|| required("hours"))?,
                })
            }
            PricingModeDto::PerUnit => {
                if hourly {
                    return Err(stray("price_per_hour"));
                }
                if fixed {
                    return Err(stray("fixed_price"));
                }
                Ok(ServicePricing::PerUnit {
                    price_per_unit: Money::from_minor(self.price_per_unit.ok_or_else(|| required("price_per_unit"))?),
                    quantity: self.quantity.ok_or_else(|| required("quantity"))?,
                    unit_label: self.unit_label.ok_or_else(|| required("unit_label"))?,
                })
            }
            PricingModeDto::Fixed => {
                if hourly {
                    return Err(stray("price_per_hour"));
                }
                if per_unit {
                    return Err(stray("price_per_unit"));
                }
                Ok(ServicePricing::Fixed {
                    fixed_price: Money::from_minor(self.fixed_price.ok_or_else(|| required("fixed_price"))?),
                })
            }
            PricingModeDto::AskQuote => {
                if hourly {
                    return Err(stray("price_per_hour"));
                }
                if per_unit {
                    return Err(stray("price_per_unit"));
                }
                if fixed {
                    return Err(stray("fixed_price"));
                }
                Ok(ServicePricing::AskQuote)
            }
        }
    }
}

impl From<&ServicePricing> for ServicePricingDto {
    fn from(pricing: &ServicePricing) -> Self {
        match pricing {
            ServicePricing::HourlyRate { price_per_hour, hours } => Self {
                price_per_hour: Some(price_per_hour.minor()),
                hours: Some(*hours),
                ..Self::empty(PricingModeDto::HourlyRate)
            },
            ServicePricing::PerUnit {
                price_per_unit,
                quantity,
                unit_label,
            } => Self {
                price_per_unit: Some(price_per_unit.minor()),
                quantity: Some(*quantity),
                unit_label: Some(unit_label.clone()),
                ..Self::empty(PricingModeDto::PerUnit)
            },
            ServicePricing::Fixed { fixed_price } => Self {
                fixed_price: Some(fixed_price.minor()),
                ..Self::empty(PricingModeDto::Fixed)
            },
            ServicePricing::AskQuote => Self::empty(PricingModeDto::AskQuote),
        }
    }
}

#[derive(Debug, Clone, Object)]
pub struct SpaceAllocationRequest {
    pub warehouse_space_id: Uuid,
    pub allocated_size_m2: Decimal,
    /// Catalog price when omitted
    pub list_price_per_m2: Option<i64>,
    /// Manual override of the computed line total
    pub line_total: Option<i64>,
}

#[derive(Debug, Clone, Object)]
pub struct ServiceAllocationRequest {
    pub service_id: Uuid,
    /// Catalog list pricing when omitted
    pub pricing: Option<ServicePricingDto>,
    pub line_total: Option<i64>,
}

#[derive(Debug, Clone, Object)]
pub struct SaveDraftOfferRequest {
    #[oai(default)]
    pub space_allocations: Vec<SpaceAllocationRequest>,
    #[oai(default)]
    pub service_allocations: Vec<ServiceAllocationRequest>,
    pub fee_percentage: Option<Decimal>,
    pub fee_amount: Option<i64>,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl SaveDraftOfferRequest {
    pub fn into_input(self) -> Result<DraftOfferInput, ValidationError> {
        let space_allocations = self
            .space_allocations
            .into_iter()
            .map(|s| SpaceAllocationInput {
                warehouse_space_id: s.warehouse_space_id,
                allocated_size_m2: s.allocated_size_m2,
                list_price_per_m2: s.list_price_per_m2.map(Money::from_minor),
                line_total: s.line_total.map(Money::from_minor),
            })
            .collect();

        let mut service_allocations = Vec::with_capacity(self.service_allocations.len());
        for (i, s) in self.service_allocations.into_iter().enumerate() {
            let field = format!("service_allocations[{}].pricing", i);
            let pricing = s.pricing.map(|p| p.into_pricing(&field)).transpose()?;
            service_allocations.push(ServiceAllocationInput {
                service_id: s.service_id,
                pricing,
                line_total: s.line_total.map(Money::from_minor),
            });
        }

        Ok(DraftOfferInput {
            space_allocations,
            service_allocations,
            fee_percentage: self.fee_percentage,
            fee_amount: self.fee_amount.map(Money::from_minor),
            valid_until: self.valid_until,
            notes: self.notes,
        })
    }
}

#[derive(Debug, Clone, Object)]
pub struct SpaceAllocationDto {
    pub warehouse_space_id: Uuid,
    pub allocated_size_m2: Decimal,
    pub list_price_per_m2: i64,
    pub line_total: i64,
    pub line_total_overridden: bool,
}

impl From<&SpaceAllocation> for SpaceAllocationDto {
    fn from(line: &SpaceAllocation) -> Self {
        Self {
            warehouse_space_id: line.warehouse_space_id,
            allocated_size_m2: line.allocated_size_m2(),
            list_price_per_m2: line.list_price_per_m2().minor(),
            line_total: line.line_total().minor(),
            line_total_overridden: line.is_overridden(),
        }
    }
}

#[derive(Debug, Clone, Object)]
pub struct ServiceAllocationDto {
    pub service_id: Uuid,
    pub pricing: ServicePricingDto,
    pub line_total: i64,
    pub line_total_overridden: bool,
    pub quote_required: bool,
}

impl From<&ServiceAllocation> for ServiceAllocationDto {
    fn from(line: &ServiceAllocation) -> Self {
        Self {
            service_id: line.service_id,
            pricing: line.pricing().into(),
            line_total: line.line_total().minor(),
            line_total_overridden: line.is_overridden(),
            quote_required: line.quote_required(),
        }
    }
}

#[derive(Debug, Clone, Object)]
pub struct OfferTotalsDto {
    pub subtotal: i64,
    pub platform_fee_percentage: Decimal,
    pub platform_fee_amount: i64,
    pub grand_total: i64,
    pub quote_required: bool,
}

impl From<OfferTotals> for OfferTotalsDto {
    fn from(totals: OfferTotals) -> Self {
        Self {
            subtotal: totals.subtotal.minor(),
            platform_fee_percentage: totals.platform_fee_percentage,
            platform_fee_amount: totals.platform_fee_amount.minor(),
            grand_total: totals.grand_total.minor(),
            quote_required: totals.quote_required,
        }
    }
}

#[derive(Debug, Clone, Object)]
pub struct OfferDraftDto {
    pub space_allocations: Vec<SpaceAllocationDto>,
    pub service_allocations: Vec<ServiceAllocationDto>,
    pub totals: OfferTotalsDto,
    pub valid_until: NaiveDate,
    pub notes: Option<String>,
}

impl From<&OfferDraft> for OfferDraftDto {
    fn from(draft: &OfferDraft) -> Self {
        Self {
            space_allocations: draft.space_allocations().iter().map(Into::into).collect(),
            service_allocations: draft.service_allocations().iter().map(Into::into).collect(),
            totals: draft.totals().into(),
            valid_until: draft.valid_until,
            notes: draft.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, Object)]
pub struct OfferDto {
    pub id: Uuid,
    pub inquiry_id: Uuid,
    pub author_id: Uuid,
    pub status: String,
    pub status_label: String,
    pub draft: OfferDraftDto,
    /// Pass back as `?version=` when applying edits
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Offer> for OfferDto {
    fn from(offer: Offer) -> Self {
        Self {
            id: offer.id,
            inquiry_id: offer.inquiry_id,
            author_id: offer.author_id,
            status: offer.status.as_str().to_string(),
            status_label: offer.status.label().to_string(),
            draft: (&offer.draft).into(),
            version: offer.version,
            created_at: offer.created_at,
            updated_at: offer.updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
#[oai(rename_all = "snake_case")]
pub enum OfferResponseDto {
    Accept,
    Reject,
}

#[derive(Debug, Clone, Object)]
pub struct RespondToOfferRequest {
    pub response: OfferResponseDto,
}

#[derive(Debug, Clone, Object)]
pub struct RequestChangesRequest {
    pub message: Option<String>,
}

#[derive(Debug, Clone, Object)]
pub struct BookingDto {
    pub id: Uuid,
    pub offer_id: Uuid,
    pub inquiry_id: Uuid,
    pub requester_id: Uuid,
    pub status: String,
    pub status_label: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub space_allocations: Vec<SpaceAllocationDto>,
    pub service_allocations: Vec<ServiceAllocationDto>,
    pub totals: OfferTotalsDto,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Booking> for BookingDto {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            offer_id: booking.offer_id,
            inquiry_id: booking.inquiry_id,
            requester_id: booking.requester_id,
            status: booking.status.as_str().to_string(),
            status_label: booking.status.label().to_string(),
            start_date: booking.date_range.start_date,
            end_date: booking.date_range.end_date,
            space_allocations: booking.space_allocations.iter().map(Into::into).collect(),
            service_allocations: booking.service_allocations.iter().map(Into::into).collect(),
            totals: booking.totals.into(),
            created_by: booking.created_by,
            created_at: booking.created_at,
            updated_at: booking.updated_at,
        }
    }
}
