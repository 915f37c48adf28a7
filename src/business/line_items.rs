use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Money;
use crate::error::{ValidationError, ValidationRule};

/// Editable derived value: computed from its inputs unless an operator typed
/// a value in. A change to any input discards the typed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "value", rename_all = "snake_case")]
pub enum Derived<T> {
    Computed(T),
    Overridden(T),
}

impl<T: Copy> Derived<T> {
    pub fn value(&self) -> T {
        match self {
            Derived::Computed(v) | Derived::Overridden(v) => *v,
        }
    }

    pub fn is_overridden(&self) -> bool {
        matches!(self, Derived::Overridden(_))
    }

    /// An input changed: drop any override and take the freshly computed value
    pub fn reset(&mut self, computed: T) {
        *self = Derived::Computed(computed);
    }

    pub fn override_with(&mut self, value: T) {
        *self = Derived::Overridden(value);
    }
}

/// Pricing mode discriminant, used for display and mode switching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingMode {
    HourlyRate,
    PerUnit,
    Fixed,
    AskQuote,
}

impl PricingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingMode::HourlyRate => "hourly_rate",
            PricingMode::PerUnit => "per_unit",
            PricingMode::Fixed => "fixed",
            PricingMode::AskQuote => "ask_quote",
        }
    }
}

/// How a service line is priced. Each mode carries only its own fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "pricing_mode", rename_all = "snake_case")]
pub enum ServicePricing {
    HourlyRate { price_per_hour: Money, hours: Decimal },
    PerUnit { price_per_unit: Money, quantity: Decimal, unit_label: String },
    Fixed { fixed_price: Money },
    AskQuote,
}

impl ServicePricing {
    pub fn mode(&self) -> PricingMode {
        match self {
            ServicePricing::HourlyRate { .. } => PricingMode::HourlyRate,
            ServicePricing::PerUnit { .. } => PricingMode::PerUnit,
            ServicePricing::Fixed { .. } => PricingMode::Fixed,
            ServicePricing::AskQuote => PricingMode::AskQuote,
        }
    }

    pub fn quote_required(&self) -> bool {
        matches!(self, ServicePricing::AskQuote)
    }

    /// Validate field values for the mode
    pub fn validate(&self, field: &str) -> Result<(), ValidationError> {
        match self {
            ServicePricing::HourlyRate { price_per_hour, hours } => {
                non_negative(*price_per_hour, &format!("{}.price_per_hour", field))?;
                positive(*hours, &format!("{}.quantity", field))
            }
            ServicePricing::PerUnit {
                price_per_unit,
                quantity,
                unit_label,
            } => {
                non_negative(*price_per_unit, &format!("{}.price_per_unit", field))?;
                positive(*quantity, &format!("{}.quantity", field))?;
                if unit_label.trim().is_empty() {
                    return Err(ValidationError::new(
                        format!("{}.unit_label", field),
                        ValidationRule::Required("per_unit"),
                    ));
                }
                Ok(())
            }
            ServicePricing::Fixed { fixed_price } => {
                non_negative(*fixed_price, &format!("{}.fixed_price", field))
            }
            ServicePricing::AskQuote => Ok(()),
        }
    }

    /// Replace the quantity of a quantity-based mode
    pub fn with_quantity(self, new_quantity: Decimal, field: &str) -> Result<Self, ValidationError> {
        match self {
            ServicePricing::HourlyRate { price_per_hour, .. } => Ok(ServicePricing::HourlyRate {
                price_per_hour,
                hours: new_quantity,
            }),
            ServicePricing::PerUnit {
                price_per_unit,
                unit_label,
                ..
            } => Ok(ServicePricing::PerUnit {
                price_per_unit,
                quantity: new_quantity,
                unit_label,
            }),
            other => Err(ValidationError::new(
                format!("{}.quantity", field),
                ValidationRule::NotApplicable(other.mode().as_str()),
            )),
        }
    }
}

fn positive(value: Decimal, field: &str) -> Result<(), ValidationError> {
    if value > Decimal::ZERO {
        Ok(())
    } else {
        Err(ValidationError::new(field, ValidationRule::NotPositive))
    }
}

fn non_negative(value: Money, field: &str) -> Result<(), ValidationError> {
    if value.is_negative() {
        Err(ValidationError::new(field, ValidationRule::Negative))
    } else {
        Ok(())
    }
}

/// Line total formulas
pub struct LineItemCalculator;

impl LineItemCalculator {
    /// `round(allocated_size_m2 * list_price_per_m2)`
    pub fn space_line_total(allocated_size_m2: Decimal, list_price_per_m2: Money) -> Option<Money> {
        list_price_per_m2.mul_rounded(allocated_size_m2)
    }

    /// Line total of a service; quote-only services are priced at zero
    pub fn service_line_total(pricing: &ServicePricing) -> Option<Money> {
        match pricing {
            ServicePricing::HourlyRate { price_per_hour, hours } => price_per_hour.mul_rounded(*hours),
            ServicePricing::PerUnit {
                price_per_unit,
                quantity,
                ..
            } => price_per_unit.mul_rounded(*quantity),
            ServicePricing::Fixed { fixed_price } => Some(*fixed_price),
            ServicePricing::AskQuote => Some(Money::ZERO),
        }
    }

    /// Advisory cost of renting `size_m2` for `days` at a per-m²-per-day list price
    pub fn estimate_space(size_m2: Decimal, price_per_m2_per_day: Money, days: i64) -> Option<Money> {
        size_m2
            .checked_mul(Decimal::from(days))
            .and_then(|factor| price_per_m2_per_day.mul_rounded(factor))
    }
}

/// Square metres of a warehouse space allocated to an offer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceAllocation {
    pub warehouse_space_id: Uuid,
    allocated_size_m2: Decimal,
    list_price_per_m2: Money,
    line_total: Derived<Money>,
}

impl SpaceAllocation {
    pub fn new(
        warehouse_space_id: Uuid,
        allocated_size_m2: Decimal,
        list_price_per_m2: Money,
        field: &str,
    ) -> Result<Self, ValidationError> {
        positive(allocated_size_m2, &format!("{}.allocated_size_m2", field))?;
        non_negative(list_price_per_m2, &format!("{}.list_price_per_m2", field))?;
        let total = Self::compute(allocated_size_m2, list_price_per_m2, field)?;

        Ok(Self {
            warehouse_space_id,
            allocated_size_m2,
            list_price_per_m2,
            line_total: Derived::Computed(total),
        })
    }

    fn compute(size: Decimal, price: Money, field: &str) -> Result<Money, ValidationError> {
        LineItemCalculator::space_line_total(size, price).ok_or_else(|| {
            ValidationError::new(format!("{}.line_total", field), ValidationRule::Overflow)
        })
    }

    pub fn allocated_size_m2(&self) -> Decimal {
        self.allocated_size_m2
    }

    pub fn list_price_per_m2(&self) -> Money {
        self.list_price_per_m2
    }

    pub fn line_total(&self) -> Money {
        self.line_total.value()
    }

    pub fn is_overridden(&self) -> bool {
        self.line_total.is_overridden()
    }

    pub fn set_allocated_size(&mut self, size_m2: Decimal, field: &str) -> Result<(), ValidationError> {
        positive(size_m2, &format!("{}.allocated_size_m2", field))?;
        let total = Self::compute(size_m2, self.list_price_per_m2, field)?;
        self.allocated_size_m2 = size_m2;
        self.line_total.reset(total);
        Ok(())
    }

    pub fn set_list_price(&mut self, price: Money, field: &str) -> Result<(), ValidationError> {
        non_negative(price, &format!("{}.list_price_per_m2", field))?;
        let total = Self::compute(self.allocated_size_m2, price, field)?;
        self.list_price_per_m2 = price;
        self.line_total.reset(total);
        Ok(())
    }

    pub fn override_line_total(&mut self, total: Money, field: &str) -> Result<(), ValidationError> {
        non_negative(total, &format!("{}.line_total", field))?;
        self.line_total.override_with(total);
        Ok(())
    }
}

/// Ancillary service attached to an offer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAllocation {
    pub service_id: Uuid,
    pricing: ServicePricing,
    line_total: Derived<Money>,
}

impl ServiceAllocation {
    pub fn new(service_id: Uuid, pricing: ServicePricing, field: &str) -> Result<Self, ValidationError> {
        pricing.validate(field)?;
        let total = Self::compute(&pricing, field)?;
        Ok(Self {
            service_id,
            pricing,
            line_total: Derived::Computed(total),
        })
    }

    fn compute(pricing: &ServicePricing, field: &str) -> Result<Money, ValidationError> {
        LineItemCalculator::service_line_total(pricing).ok_or_else(|| {
            ValidationError::new(format!("{}.line_total", field), ValidationRule::Overflow)
        })
    }

    pub fn pricing(&self) -> &ServicePricing {
        &self.pricing
    }

    pub fn line_total(&self) -> Money {
        self.line_total.value()
    }

    pub fn is_overridden(&self) -> bool {
        self.line_total.is_overridden()
    }

    pub fn quote_required(&self) -> bool {
        self.pricing.quote_required()
    }

    /// Whether the line contributes to the offer subtotal
    pub fn counts_toward_subtotal(&self) -> bool {
        !self.quote_required()
    }

    /// Replace the pricing, switching mode if the variant differs.
    /// Fields of the previous mode do not survive the switch.
    pub fn set_pricing(&mut self, pricing: ServicePricing, field: &str) -> Result<(), ValidationError> {
        pricing.validate(field)?;
        let total = Self::compute(&pricing, field)?;
        self.pricing = pricing;
        self.line_total.reset(total);
        Ok(())
    }

    pub fn set_quantity(&mut self, quantity: Decimal, field: &str) -> Result<(), ValidationError> {
        let pricing = self.pricing.clone().with_quantity(quantity, field)?;
        self.set_pricing(pricing, field)
    }

    pub fn override_line_total(&mut self, total: Money, field: &str) -> Result<(), ValidationError> {
        if self.quote_required() {
            return Err(ValidationError::new(
                format!("{}.line_total", field),
                ValidationRule::NotApplicable(PricingMode::AskQuote.as_str()),
            ));
        }
        non_negative(total, &format!("{}.line_total", field))?;
        self.line_total.override_with(total);
        Ok(())
    }
}
