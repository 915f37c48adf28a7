use rust_decimal::Decimal;
use std::path::PathBuf;

use crate::business::OfferDefaults;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

pub struct Config {
    pub port: u16,
    pub default_platform_fee_percentage: Decimal,
    pub offer_validity_days: i64,
    /// JSON catalog to load at startup; empty catalog when unset
    pub catalog_path: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            default_platform_fee_percentage: std::env::var("DEFAULT_PLATFORM_FEE_PERCENTAGE")
                .ok()
                .and_then(|p| p.trim().parse::<Decimal>().ok())
                .filter(|p| *p >= Decimal::ZERO && *p <= Decimal::ONE_HUNDRED)
                .unwrap_or_else(|| Decimal::from(10)),
            offer_validity_days: std::env::var("OFFER_VALIDITY_DAYS")
                .ok()
                .and_then(|d| d.parse().ok())
                .filter(|d: &i64| *d > 0)
                .unwrap_or(14),
            catalog_path: std::env::var("CATALOG_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            log_format: match std::env::var("LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        }
    }

    pub fn offer_defaults(&self) -> OfferDefaults {
        OfferDefaults {
            fee_percentage: self.default_platform_fee_percentage,
            validity_days: self.offer_validity_days,
        }
    }
}
