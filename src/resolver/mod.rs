//! Row resolution
//!
//! [`RowResolver`] turns one catalog product into a [`ResolvedRow`] for a
//! profile's ordered field selection. Every field is resolved, then its
//! display modifier is applied:
//!
//! - multi-value lists are joined with the profile separator
//! - prices are converted to the selection's currency and rounded once
//! - booleans stay typed; labels are a serializer concern
//!
//! Collaborator failures degrade a single field unless the profile is strict.

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::warn;

use crate::catalog::{ClientId, Product};
use crate::error::{ConfigError, ExportError, Result};
use crate::fields::{FieldDescriptor, FieldRegistry, FieldValue, ModifierType, ResolveContext};
use crate::profile::FieldSelection;
use crate::services::Services;

/// Round a final price to two decimal places, keeping the scale
pub fn round_price(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Check that a selection is non-empty and names only exportable fields
pub fn validate_selection<'r>(
    registry: &'r FieldRegistry,
    selections: &[FieldSelection],
) -> Result<Vec<&'r FieldDescriptor>> {
    if selections.is_empty() {
        return Err(ConfigError::EmptyFieldList.into());
    }
    selections
        .iter()
        .map(|selection| {
            let descriptor = registry.lookup(&selection.key)?;
            if !descriptor.is_exportable() {
                return Err(ConfigError::FieldNotExportable(selection.key.clone()).into());
            }
            Ok(descriptor)
        })
        .collect()
}

/// A field that resolved to a neutral value because a collaborator failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub key: String,
    pub message: String,
}

/// Ordered field values for one product
///
/// `values` is aligned with the selection, so the same key may appear more
/// than once (a price in two currencies). Writers read by position.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRow {
    pub item_id: i64,
    pub values: Vec<(String, FieldValue)>,
    pub errors: Vec<FieldError>,
}

impl ResolvedRow {
    /// First value for `key`
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Value of the column at `index`
    pub fn value(&self, index: usize) -> Option<&FieldValue> {
        self.values.get(index).map(|(_, v)| v)
    }

    pub fn is_degraded(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Debug, Clone)]
struct SelectedField {
    descriptor: FieldDescriptor,
    currency: Option<String>,
}

/// Resolves products for one export run
#[derive(Clone)]
pub struct RowResolver {
    fields: Vec<SelectedField>,
    separator: String,
    strict: bool,
    client: Option<ClientId>,
    services: Services,
}

impl std::fmt::Debug for RowResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowResolver")
            .field("fields", &self.fields)
            .field("separator", &self.separator)
            .field("strict", &self.strict)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl RowResolver {
    /// Validate the selection against the registry
    ///
    /// Every key must exist and be exportable, and at least one is required.
    pub fn new(
        registry: &FieldRegistry,
        selections: &[FieldSelection],
        client: Option<ClientId>,
        services: Services,
    ) -> Result<Self> {
        let fields = validate_selection(registry, selections)?
            .into_iter()
            .zip(selections)
            .map(|(descriptor, selection)| SelectedField {
                descriptor: descriptor.clone(),
                currency: selection.currency.as_ref().map(|c| c.to_uppercase()),
            })
            .collect();

        Ok(Self {
            fields,
            separator: crate::profile::DEFAULT_SEPARATOR.to_string(),
            strict: false,
            client,
            services,
        })
    }

    pub fn with_separator(mut self, separator: &str) -> Self {
        self.separator = separator.to_string();
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Selected descriptors with their target currency, in column order
    pub fn selections(&self) -> impl Iterator<Item = (&FieldDescriptor, Option<&str>)> {
        self.fields
            .iter()
            .map(|f| (&f.descriptor, f.currency.as_deref()))
    }

    pub async fn resolve(&self, item: &Product) -> Result<ResolvedRow> {
        let ctx = ResolveContext {
            client: self.client,
            services: &self.services,
        };

        let mut row = ResolvedRow {
            item_id: item.id,
            values: Vec::with_capacity(self.fields.len()),
            errors: Vec::new(),
        };

        for field in &self.fields {
            let descriptor = &field.descriptor;
            let raw = match descriptor.resolve(item, &ctx).await {
                Ok(value) => value,
                Err(e) => {
                    let neutral = descriptor.neutral_value(item);
                    self.degrade(&mut row, descriptor, e)?;
                    neutral
                }
            };

            let value = match descriptor.modifier {
                ModifierType::Price => match self.convert_price(raw, field).await {
                    Ok(value) => value,
                    Err(e) => {
                        self.degrade(&mut row, descriptor, e)?;
                        FieldValue::Null
                    }
                },
                _ => self.join_lists(raw),
            };
            row.values.push((descriptor.key.clone(), value));
        }

        Ok(row)
    }

    /// Record a collaborator failure, or propagate it
    ///
    /// Configuration errors (a relation outside the plan) are never degraded.
    fn degrade(&self, row: &mut ResolvedRow, field: &FieldDescriptor, err: ExportError) -> Result<()> {
        if self.strict || !matches!(err, ExportError::Resolution(_)) {
            return Err(err);
        }
        warn!(item = row.item_id, field = %field.key, error = %err, "field degraded to neutral value");
        row.errors.push(FieldError {
            key: field.key.clone(),
            message: err.to_string(),
        });
        Ok(())
    }

    fn join_lists(&self, value: FieldValue) -> FieldValue {
        match value {
            FieldValue::List(items) => FieldValue::Text(items.join(&self.separator)),
            other => other,
        }
    }

    async fn convert_price(&self, value: FieldValue, field: &SelectedField) -> Result<FieldValue> {
        let amount = match value {
            FieldValue::Decimal(d) => d,
            FieldValue::Integer(i) => Decimal::from(i),
            other => return Ok(other),
        };

        let base = &self.services.base_currency;
        let converted = match &field.currency {
            Some(target) if !target.eq_ignore_ascii_case(base) => {
                self.services.currency.convert(amount, base, target).await?
            }
            _ => amount,
        };
        Ok(FieldValue::Decimal(round_price(converted)))
    }
}
