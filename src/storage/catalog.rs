use anyhow::Context;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use uuid::Uuid;

use crate::business::ServicePricing;
use crate::domain::Money;

/// A rentable space as advertised in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseSpace {
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub space_type: String,
    pub capacity_m2: Decimal,
    pub price_per_m2_per_day: Money,
}

/// A bookable service with its list price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogService {
    pub id: Uuid,
    pub name: String,
    pub pricing: ServicePricing,
}

/// Catalog collaborator: capacities and list prices
#[async_trait]
pub trait WarehouseCatalog: Send + Sync {
    async fn space(&self, space_id: Uuid) -> anyhow::Result<Option<WarehouseSpace>>;

    /// Spaces of `space_type` in any of the given warehouses
    async fn spaces_of_type(
        &self,
        warehouse_ids: &BTreeSet<Uuid>,
        space_type: &str,
    ) -> anyhow::Result<Vec<WarehouseSpace>>;

    async fn service(&self, service_id: Uuid) -> anyhow::Result<Option<CatalogService>>;
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    spaces: Vec<WarehouseSpace>,
    #[serde(default)]
    services: Vec<CatalogService>,
}

/// Fixed catalog held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    spaces: HashMap<Uuid, WarehouseSpace>,
    services: HashMap<Uuid, CatalogService>,
}

impl StaticCatalog {
    pub fn new(spaces: Vec<WarehouseSpace>, services: Vec<CatalogService>) -> Self {
        Self {
            spaces: spaces.into_iter().map(|s| (s.id, s)).collect(),
            services: services.into_iter().map(|s| (s.id, s)).collect(),
        }
    }

    /// Load `{"spaces": [...], "services": [...]}` from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("Invalid catalog file {}", path.display()))
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let file: CatalogFile = serde_json::from_str(raw)?;
        Ok(Self::new(file.spaces, file.services))
    }

    pub fn space_count(&self) -> usize {
        self.spaces.len()
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }
}

#[async_trait]
impl WarehouseCatalog for StaticCatalog {
    async fn space(&self, space_id: Uuid) -> anyhow::Result<Option<WarehouseSpace>> {
        Ok(self.spaces.get(&space_id).cloned())
    }

    async fn spaces_of_type(
        &self,
        warehouse_ids: &BTreeSet<Uuid>,
        space_type: &str,
    ) -> anyhow::Result<Vec<WarehouseSpace>> {
        Ok(self
            .spaces
            .values()
            .filter(|s| warehouse_ids.contains(&s.warehouse_id) && s.space_type == space_type)
            .cloned()
            .collect())
    }

    async fn service(&self, service_id: Uuid) -> anyhow::Result<Option<CatalogService>> {
        Ok(self.services.get(&service_id).cloned())
    }
}
