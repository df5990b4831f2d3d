//! Pricing, stock and currency collaborators
//!
//! The export engine never computes personalized values itself. It asks these
//! services, passing the client context explicitly. The static implementations
//! here are driven by configuration and are what the CLI wires up; an embedding
//! application substitutes its own.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::catalog::{ClientId, Product};
use crate::config::{ClientConfig, CurrencyConfig};
use crate::error::{ResolutionError, Result};

/// Which regional quantity to look up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockKind {
    Available,
    Preorder,
}

/// Client-specific pricing
#[async_trait]
pub trait PricingService: Send + Sync {
    /// Discount percentage (0-100) the client gets on the item
    async fn discount_percent(&self, item: &Product, client: ClientId) -> Result<Decimal>;

    /// Item price after the client's discount, in base currency
    async fn discounted_price(&self, item: &Product, client: ClientId) -> Result<Decimal>;
}

/// Region-specific stock
#[async_trait]
pub trait StockService: Send + Sync {
    async fn regional_stock(&self, item: &Product, client: ClientId, kind: StockKind) -> Result<i64>;
}

/// Currency conversion with a correction factor
#[async_trait]
pub trait CurrencyService: Send + Sync {
    /// Convert without rounding; callers round once at the end
    async fn convert(&self, amount: Decimal, from: &str, to: &str) -> Result<Decimal>;
}

/// Bundle of collaborators handed to the resolver
#[derive(Clone)]
pub struct Services {
    pub pricing: Arc<dyn PricingService>,
    pub stock: Arc<dyn StockService>,
    pub currency: Arc<dyn CurrencyService>,
    /// Currency all catalog prices are stored in
    pub base_currency: String,
}

impl Services {
    /// Wire up the configuration-driven implementations
    pub fn from_config(currency: &CurrencyConfig, clients: &[ClientConfig]) -> Self {
        Self {
            pricing: Arc::new(StaticPricing::from_clients(clients)),
            stock: Arc::new(StaticStock::from_clients(clients)),
            currency: Arc::new(FixedRateCurrency::from_config(currency)),
            base_currency: currency.base.clone(),
        }
    }
}

/// Flat per-client discount
#[derive(Debug, Clone, Default)]
pub struct StaticPricing {
    discounts: HashMap<ClientId, Decimal>,
}

impl StaticPricing {
    pub fn new(discounts: HashMap<ClientId, Decimal>) -> Self {
        Self { discounts }
    }

    pub fn from_clients(clients: &[ClientConfig]) -> Self {
        Self::new(
            clients
                .iter()
                .map(|c| (ClientId(c.id), c.discount_percent))
                .collect(),
        )
    }
}

#[async_trait]
impl PricingService for StaticPricing {
    async fn discount_percent(&self, _item: &Product, client: ClientId) -> Result<Decimal> {
        Ok(self.discounts.get(&client).copied().unwrap_or(Decimal::ZERO))
    }

    async fn discounted_price(&self, item: &Product, client: ClientId) -> Result<Decimal> {
        let percent = self.discount_percent(item, client).await?;
        if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            return Err(ResolutionError::Pricing(format!(
                "discount {percent}% for client {} is out of range",
                client.0
            ))
            .into());
        }
        Ok(item.base_price * (Decimal::ONE_HUNDRED - percent) / Decimal::ONE_HUNDRED)
    }
}

/// Stock summed over the warehouses in the client's region
#[derive(Debug, Clone, Default)]
pub struct StaticStock {
    regions: HashMap<ClientId, String>,
}

impl StaticStock {
    pub fn new(regions: HashMap<ClientId, String>) -> Self {
        Self { regions }
    }

    pub fn from_clients(clients: &[ClientConfig]) -> Self {
        Self::new(
            clients
                .iter()
                .filter_map(|c| c.region.clone().map(|r| (ClientId(c.id), r)))
                .collect(),
        )
    }
}

#[async_trait]
impl StockService for StaticStock {
    async fn regional_stock(&self, item: &Product, client: ClientId, kind: StockKind) -> Result<i64> {
        let Some(region) = self.regions.get(&client) else {
            return Ok(0);
        };

        let mut total = 0;
        for warehouse in item.warehouses.get("warehouses")? {
            if &warehouse.region != region {
                continue;
            }
            let pivot = warehouse.pivot.get("warehouses.pivot")?;
            let quantity = match kind {
                StockKind::Available => pivot.available,
                StockKind::Preorder => pivot.preorder,
            };
            total = i64::checked_add(total, quantity).ok_or_else(|| {
                ResolutionError::Stock(format!("stock total overflows for item {}", item.id))
            })?;
        }
        Ok(total)
    }
}

/// Fixed exchange rates relative to the base currency
///
/// `rates[code]` is how many units of `code` one base unit buys. Every
/// cross-currency conversion is multiplied by `correction`.
#[derive(Debug, Clone)]
pub struct FixedRateCurrency {
    base: String,
    rates: HashMap<String, Decimal>,
    correction: Decimal,
}

impl FixedRateCurrency {
    pub fn new(base: impl Into<String>, rates: HashMap<String, Decimal>, correction: Decimal) -> Self {
        Self {
            base: base.into(),
            rates,
            correction,
        }
    }

    pub fn from_config(config: &CurrencyConfig) -> Self {
        Self::new(config.base.clone(), config.rates.clone(), config.correction)
    }

    fn rate(&self, code: &str) -> Result<Decimal> {
        if code.eq_ignore_ascii_case(&self.base) {
            return Ok(Decimal::ONE);
        }
        match self.rates.get(&code.to_uppercase()) {
            Some(rate) if *rate > Decimal::ZERO => Ok(*rate),
            Some(_) => Err(ResolutionError::Currency(format!("non-positive rate for {code}")).into()),
            None => Err(ResolutionError::Currency(format!("no exchange rate for {code}")).into()),
        }
    }
}

#[async_trait]
impl CurrencyService for FixedRateCurrency {
    async fn convert(&self, amount: Decimal, from: &str, to: &str) -> Result<Decimal> {
        if from.eq_ignore_ascii_case(to) {
            return Ok(amount);
        }
        let from_rate = self.rate(from)?;
        let to_rate = self.rate(to)?;
        Ok(amount / from_rate * to_rate * self.correction)
    }
}
