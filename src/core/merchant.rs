//! Merchant registration attributes and duplicate-record resolution.

use std::collections::HashMap;
use std::fmt;

use crate::core::lookup::StateCode;

/// Unique merchant identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MerchantId(pub u64);

impl fmt::Display for MerchantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static registration attributes for one merchant.
///
/// One record per merchant id, produced by upstream cleansing and immutable
/// within a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct MerchantAttributes {
    /// Unique merchant id.
    pub id: MerchantId,
    /// Ordinal business size tier (0 = smallest).
    pub size_tier: u8,
    /// Business category code.
    pub category: String,
    /// State code, normalized through [`crate::core::StateLookup`].
    pub state: StateCode,
    /// Registration document type.
    pub document_type: String,
    /// Ticket-size category.
    pub ticket_band: String,
    /// Self-reported estimated monthly volume.
    pub estimated_volume: f64,
    /// Month offset at which the merchant first registered.
    pub registered_month: u32,
}

/// A raw registration record as delivered by the upstream table, before
/// duplicate-id resolution. `recorded_month` orders records of the same
/// merchant by recency.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationRecord {
    pub attrs: MerchantAttributes,
    pub recorded_month: u32,
}

/// Resolve duplicate merchant ids in a registration table.
///
/// The most recent record wins all fields, with two exceptions: the earliest
/// registration month across duplicates is kept, and the state is the most
/// frequent value among duplicates. Modal-state ties break toward the most
/// recent record's state. Later input position breaks recency ties.
///
/// Output is sorted by merchant id.
pub fn resolve_duplicates(records: Vec<RegistrationRecord>) -> Vec<MerchantAttributes> {
    let mut by_id: HashMap<MerchantId, Vec<RegistrationRecord>> = HashMap::new();
    for record in records {
        by_id.entry(record.attrs.id).or_default().push(record);
    }

    let mut resolved: Vec<MerchantAttributes> = by_id
        .into_values()
        .map(|group| {
            // Input order is preserved within a group, so the last record at
            // the maximum recorded_month is the most recent.
            let latest_idx = group
                .iter()
                .enumerate()
                .max_by_key(|(i, r)| (r.recorded_month, *i))
                .map(|(i, _)| i)
                .unwrap_or(0);

            let earliest_registration = group
                .iter()
                .map(|r| r.attrs.registered_month)
                .min()
                .unwrap_or(0);

            let mut state_counts: HashMap<&StateCode, usize> = HashMap::new();
            for record in &group {
                *state_counts.entry(&record.attrs.state).or_insert(0) += 1;
            }
            let latest_state = &group[latest_idx].attrs.state;
            let max_count = state_counts.values().copied().max().unwrap_or(0);
            let modal_state = if state_counts.get(latest_state).copied() == Some(max_count) {
                latest_state.clone()
            } else {
                // Deterministic pick among the modal states: the one whose
                // most recent occurrence is latest in the group.
                group
                    .iter()
                    .rev()
                    .find(|r| state_counts.get(&r.attrs.state).copied() == Some(max_count))
                    .map(|r| r.attrs.state.clone())
                    .unwrap_or_else(|| latest_state.clone())
            };

            let mut attrs = group[latest_idx].attrs.clone();
            attrs.registered_month = earliest_registration;
            attrs.state = modal_state;
            attrs
        })
        .collect();

    resolved.sort_by_key(|a| a.id);
    resolved
}
