//! Cloud Billing catalog decoding
//!
//! SKUs of the Autopilot billing service are routed to price fields by
//! exact description match. Descriptions carry the region in parentheses,
//! so the template table is expanded once per region.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::{BillingMode, PriceKey, RegionPricing};
use crate::error::{EstimatorError, Result};
use crate::models::ComputeClass;

const NANOS_PER_UNIT: i64 = 1_000_000_000;

/// Price field a catalog SKU feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceField {
    Storage,
    Cpu(PriceKey),
    Memory(PriceKey),
}

const fn cpu(class: ComputeClass, mode: BillingMode) -> PriceField {
    PriceField::Cpu(PriceKey::new(class, mode))
}

const fn memory(class: ComputeClass, mode: BillingMode) -> PriceField {
    PriceField::Memory(PriceKey::new(class, mode))
}

/// SKU description prefixes, completed with ` (<region>)`
pub const SKU_TEMPLATES: &[(&str, PriceField)] = &[
    ("Autopilot Pod Ephemeral Storage Requests", PriceField::Storage),
    (
        "Autopilot Pod Memory Requests",
        memory(ComputeClass::Regular, BillingMode::OnDemand),
    ),
    ("Autopilot Pod mCPU Requests", cpu(ComputeClass::Regular, BillingMode::OnDemand)),
    (
        "Autopilot Balanced Pod Memory Requests",
        memory(ComputeClass::Balanced, BillingMode::OnDemand),
    ),
    (
        "Autopilot Balanced Pod mCPU Requests",
        cpu(ComputeClass::Balanced, BillingMode::OnDemand),
    ),
    (
        "Autopilot Scale-Out x86 Pod Memory Requests",
        memory(ComputeClass::ScaleOut, BillingMode::OnDemand),
    ),
    (
        "Autopilot Scale-Out x86 Pod mCPU Requests",
        cpu(ComputeClass::ScaleOut, BillingMode::OnDemand),
    ),
    (
        "Autopilot Scale-Out Arm Pod Memory Requests",
        memory(ComputeClass::ScaleOutArm, BillingMode::OnDemand),
    ),
    (
        "Autopilot Scale-Out Arm Pod mCPU Requests",
        cpu(ComputeClass::ScaleOutArm, BillingMode::OnDemand),
    ),
    (
        "Autopilot Spot Pod Memory Requests",
        memory(ComputeClass::Regular, BillingMode::Spot),
    ),
    ("Autopilot Spot Pod mCPU Requests", cpu(ComputeClass::Regular, BillingMode::Spot)),
    (
        "Autopilot Balanced Spot Pod Memory Requests",
        memory(ComputeClass::Balanced, BillingMode::Spot),
    ),
    (
        "Autopilot Balanced Spot Pod mCPU Requests",
        cpu(ComputeClass::Balanced, BillingMode::Spot),
    ),
    (
        "Autopilot Scale-Out x86 Spot Pod Memory Requests",
        memory(ComputeClass::ScaleOut, BillingMode::Spot),
    ),
    (
        "Autopilot Scale-Out x86 Spot Pod mCPU Requests",
        cpu(ComputeClass::ScaleOut, BillingMode::Spot),
    ),
    (
        "Autopilot Scale-Out Arm Spot Pod Memory Requests",
        memory(ComputeClass::ScaleOutArm, BillingMode::Spot),
    ),
    (
        "Autopilot Scale-Out Arm Spot Pod mCPU Requests",
        cpu(ComputeClass::ScaleOutArm, BillingMode::Spot),
    ),
];

/// Resolve the price field of a full SKU description for `region`
pub fn sku_price_field(description: &str, region: &str) -> Option<PriceField> {
    let prefix = description.strip_suffix(&format!(" ({})", region))?;
    SKU_TEMPLATES
        .iter()
        .find(|(template, _)| *template == prefix)
        .map(|(_, field)| *field)
}

/// One page of a `services.skus.list` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkuPage {
    #[serde(default)]
    pub skus: Vec<Sku>,
    #[serde(default)]
    pub next_page_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sku {
    #[serde(default)]
    pub sku_id: String,
    pub description: String,
    #[serde(default)]
    pub service_regions: Vec<String>,
    #[serde(default)]
    pub pricing_info: Vec<PricingInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingInfo {
    pub pricing_expression: PricingExpression,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingExpression {
    #[serde(default)]
    pub usage_unit: String,
    #[serde(default = "default_display_quantity")]
    pub display_quantity: f64,
    #[serde(default)]
    pub tiered_rates: Vec<TierRate>,
}

fn default_display_quantity() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierRate {
    #[serde(default)]
    pub start_usage_amount: f64,
    pub unit_price: Money,
}

/// Google `Money`: whole units plus nano units
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    #[serde(default)]
    pub currency_code: String,
    /// int64 values travel as JSON strings
    #[serde(default, deserialize_with = "int64_from_string_or_number")]
    pub units: i64,
    #[serde(default)]
    pub nanos: i64,
}

fn int64_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Int64 {
        Number(i64),
        Text(String),
    }

    match Int64::deserialize(deserializer)? {
        Int64::Number(n) => Ok(n),
        Int64::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

impl Sku {
    /// Base-tier price per display quantity
    ///
    /// `(units * 1e9 + nanos * displayQuantity) / 1e9`; the display
    /// quantity only scales the nano part.
    pub fn unit_price(&self) -> Result<Option<f64>> {
        let Some(expression) = self.pricing_info.first().map(|p| &p.pricing_expression) else {
            return Ok(None);
        };
        let Some(rate) = expression.tiered_rates.first() else {
            return Ok(None);
        };

        let invalid = |reason: &str| EstimatorError::InvalidPrice {
            sku: self.description.clone(),
            reason: reason.to_string(),
        };

        let money = &rate.unit_price;
        if money.units < 0 || money.nanos < 0 || expression.display_quantity < 0.0 {
            return Err(invalid("negative price component"));
        }

        let whole = money
            .units
            .checked_mul(NANOS_PER_UNIT)
            .ok_or_else(|| invalid("units overflow"))?;
        let fraction = money
            .nanos
            .checked_mul(expression.display_quantity as i64)
            .ok_or_else(|| invalid("nanos overflow"))?;
        let total = whole
            .checked_add(fraction)
            .ok_or_else(|| invalid("price overflow"))?;

        Ok(Some(total as f64 / NANOS_PER_UNIT as f64))
    }
}

impl RegionPricing {
    /// Build a region's price table from catalog SKUs
    ///
    /// SKUs outside the region or with an unknown description are
    /// ignored; fields without a SKU stay at zero.
    pub fn from_skus<'a>(region: &str, skus: impl IntoIterator<Item = &'a Sku>) -> Result<Self> {
        let descriptions: HashMap<String, PriceField> = SKU_TEMPLATES
            .iter()
            .map(|(template, field)| (format!("{} ({})", template, region), *field))
            .collect();

        let mut pricing = RegionPricing::new(region);

        for sku in skus {
            if !sku.service_regions.iter().any(|r| r == region) {
                continue;
            }
            let Some(field) = descriptions.get(&sku.description) else {
                continue;
            };
            match sku.unit_price()? {
                Some(price) => {
                    debug!(sku = %sku.description, price = price, "Mapped catalog SKU");
                    pricing.set(*field, price);
                }
                None => {
                    debug!(sku = %sku.description, "SKU has no tiered rate, skipping");
                }
            }
        }

        Ok(pricing)
    }
}
