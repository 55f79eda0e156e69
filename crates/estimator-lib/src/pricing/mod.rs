//! Autopilot pricing engine
//!
//! Turns a normalized workload, its compute class and billing mode into an
//! hourly cost using a region's unit prices. Unit prices are per vCPU,
//! per GiB and per GiB of ephemeral storage, so usage in mCPU and MiB is
//! scaled down by 1000 before multiplying.

mod catalog;

pub use catalog::{
    sku_price_field, Money, PriceField, PricingExpression, PricingInfo, Sku, SkuPage, TierRate,
    SKU_TEMPLATES,
};

use std::collections::HashMap;
use tracing::warn;

use crate::limits::BillableUsage;
use crate::models::ComputeClass;

/// Whether a workload runs on preemptible capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BillingMode {
    OnDemand,
    Spot,
}

impl BillingMode {
    pub fn from_spot(spot: bool) -> Self {
        if spot {
            BillingMode::Spot
        } else {
            BillingMode::OnDemand
        }
    }
}

/// Lookup key of a CPU/memory price pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PriceKey {
    pub class: ComputeClass,
    pub mode: BillingMode,
}

impl PriceKey {
    pub const fn new(class: ComputeClass, mode: BillingMode) -> Self {
        Self { class, mode }
    }

    /// Price pair a workload of `class` is billed at
    ///
    /// Spot Balanced pods bill at the general-purpose spot rate; every
    /// other combination has a dedicated pair.
    pub fn for_workload(class: ComputeClass, spot: bool) -> Self {
        match (class, BillingMode::from_spot(spot)) {
            (ComputeClass::Balanced, BillingMode::Spot) => {
                Self::new(ComputeClass::Regular, BillingMode::Spot)
            }
            (class, mode) => Self::new(class, mode),
        }
    }
}

/// CPU and memory unit prices for one key
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UnitPrices {
    /// Price per vCPU hour
    pub cpu: f64,
    /// Price per GiB hour
    pub memory: f64,
}

impl UnitPrices {
    pub fn new(cpu: f64, memory: f64) -> Self {
        Self { cpu, memory }
    }

    /// Either component is missing from the catalog
    pub fn is_incomplete(&self) -> bool {
        self.cpu == 0.0 || self.memory == 0.0
    }
}

/// Unit prices of one region
///
/// Missing keys read as zero, meaning "unpriced" rather than free.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionPricing {
    region: String,
    storage: f64,
    rates: HashMap<PriceKey, UnitPrices>,
}

impl RegionPricing {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            storage: 0.0,
            rates: HashMap::new(),
        }
    }

    pub fn with_storage(mut self, price: f64) -> Self {
        self.storage = price;
        self
    }

    pub fn with_rates(mut self, class: ComputeClass, mode: BillingMode, rates: UnitPrices) -> Self {
        self.rates.insert(PriceKey::new(class, mode), rates);
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// On-demand ephemeral storage price per GiB hour
    pub fn storage(&self) -> f64 {
        self.storage
    }

    pub fn rates(&self, key: PriceKey) -> UnitPrices {
        self.rates.get(&key).copied().unwrap_or_default()
    }

    /// Store a single catalog price
    pub fn set(&mut self, field: PriceField, price: f64) {
        match field {
            PriceField::Storage => self.storage = price,
            PriceField::Cpu(key) => self.rates.entry(key).or_default().cpu = price,
            PriceField::Memory(key) => self.rates.entry(key).or_default().memory = price,
        }
    }

    /// Number of keys with both CPU and memory priced
    pub fn priced_keys(&self) -> usize {
        self.rates.values().filter(|r| !r.is_incomplete()).count()
    }

    /// Whether a workload of `class` would be billed at a zero rate
    pub fn is_unpriced(&self, class: ComputeClass, spot: bool) -> bool {
        self.rates(PriceKey::for_workload(class, spot)).is_incomplete()
    }
}

/// Hourly cost of a workload
pub fn price(
    usage: &BillableUsage,
    pricing: &RegionPricing,
    class: ComputeClass,
    spot: bool,
) -> f64 {
    let key = PriceKey::for_workload(class, spot);
    let rates = pricing.rates(key);

    if rates.is_incomplete() {
        if class == ComputeClass::ScaleOutArm {
            warn!(
                event = "arm_pricing_unavailable",
                region = %pricing.region(),
                spot = spot,
                "ARM pricing is not available in this region"
            );
        } else {
            warn!(
                event = "pricing_unavailable",
                region = %pricing.region(),
                compute_class = %class,
                spot = spot,
                "No unit price for compute class in this region, cost will be understated"
            );
        }
    }

    // Storage has no spot SKU, the on-demand rate applies in both modes
    rates.cpu * usage.cpu_milli() as f64 / 1000.0
        + rates.memory * usage.memory_mib() as f64 / 1000.0
        + pricing.storage() * usage.storage_mib() as f64 / 1000.0
}
