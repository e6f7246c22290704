//! One-hot encoding of merchant registration attributes.
//!
//! Each categorical attribute expands to indicator columns with the first
//! (lexicographically smallest) level dropped as the reference, avoiding
//! collinearity in the encoded matrix. Ordinal and scalar attributes pass
//! through as numeric columns.

use std::collections::BTreeSet;

use crate::core::{Frame, MerchantAttributes};
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone)]
struct CategoricalColumn {
    name: &'static str,
    /// Sorted distinct levels; `levels[0]` is the dropped reference.
    levels: Vec<String>,
}

/// Fitted one-hot encoding of the registration attributes. The same fitted
/// encoder is used for segmentation and for the registration dummies of
/// every horizon frame, so column layouts agree everywhere.
#[derive(Debug, Clone)]
pub struct OneHotEncoder {
    categoricals: Vec<CategoricalColumn>,
}

fn categorical_value(attrs: &MerchantAttributes, name: &str) -> String {
    match name {
        "category" => attrs.category.clone(),
        "state" => attrs.state.as_str().to_string(),
        "document_type" => attrs.document_type.clone(),
        "ticket_band" => attrs.ticket_band.clone(),
        _ => String::new(),
    }
}

impl OneHotEncoder {
    /// Learn the level sets from a registration table.
    pub fn fit(attrs: &[MerchantAttributes]) -> Result<Self> {
        if attrs.is_empty() {
            return Err(PipelineError::EmptyData);
        }
        let categoricals = ["category", "state", "document_type", "ticket_band"]
            .into_iter()
            .map(|name| {
                let levels: BTreeSet<String> =
                    attrs.iter().map(|a| categorical_value(a, name)).collect();
                CategoricalColumn {
                    name,
                    levels: levels.into_iter().collect(),
                }
            })
            .collect();
        Ok(Self { categoricals })
    }

    /// Encode a registration table into a numeric frame: ordinal size tier,
    /// estimated volume, then one dummy column per non-reference level.
    /// Levels unseen at fit time encode as all-zero (same as the reference).
    pub fn encode(&self, attrs: &[MerchantAttributes]) -> Result<Frame> {
        if attrs.is_empty() {
            return Err(PipelineError::EmptyData);
        }
        let ids = attrs.iter().map(|a| a.id).collect();
        let mut frame = Frame::new(ids);

        frame.push_column(
            "size_tier",
            attrs.iter().map(|a| a.size_tier as f64).collect(),
        )?;
        frame.push_column(
            "estimated_volume",
            attrs.iter().map(|a| a.estimated_volume).collect(),
        )?;

        for column in &self.categoricals {
            for level in column.levels.iter().skip(1) {
                let values: Vec<f64> = attrs
                    .iter()
                    .map(|a| {
                        if categorical_value(a, column.name) == *level {
                            1.0
                        } else {
                            0.0
                        }
                    })
                    .collect();
                frame.push_column(format!("{}_{level}", column.name), values)?;
            }
        }
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MerchantId, StateCode};

    fn merchant(id: u64, category: &str, state: &str, ticket: &str) -> MerchantAttributes {
        MerchantAttributes {
            id: MerchantId(id),
            size_tier: (id % 3) as u8,
            category: category.to_string(),
            state: StateCode::Code(state.to_string()),
            document_type: "corporate".to_string(),
            ticket_band: ticket.to_string(),
            estimated_volume: 100.0 * id as f64,
            registered_month: 1,
        }
    }

    #[test]
    fn reference_level_is_dropped() {
        let attrs = vec![
            merchant(1, "food", "RJ", "low"),
            merchant(2, "retail", "SP", "mid"),
            merchant(3, "services", "SP", "low"),
        ];
        let encoder = OneHotEncoder::fit(&attrs).unwrap();
        let frame = encoder.encode(&attrs).unwrap();

        // "category" has 3 levels -> 2 dummies, reference "food" dropped
        assert!(frame.column("category_retail").is_some());
        assert!(frame.column("category_services").is_some());
        assert!(frame.column("category_food").is_none());

        // "state" has 2 levels -> 1 dummy
        assert!(frame.column("state_SP").is_some());
        assert!(frame.column("state_RJ").is_none());

        // Constant attribute contributes zero dummies
        assert!(frame.names().iter().all(|n| !n.starts_with("document_type")));
    }

    #[test]
    fn dummies_are_indicators() {
        let attrs = vec![merchant(1, "food", "RJ", "low"), merchant(2, "retail", "SP", "low")];
        let encoder = OneHotEncoder::fit(&attrs).unwrap();
        let frame = encoder.encode(&attrs).unwrap();

        assert_eq!(frame.column("category_retail").unwrap(), &[0.0, 1.0]);
        assert_eq!(frame.column("state_SP").unwrap(), &[0.0, 1.0]);
    }

    #[test]
    fn numeric_columns_pass_through() {
        let attrs = vec![merchant(1, "food", "RJ", "low"), merchant(2, "food", "RJ", "low")];
        let encoder = OneHotEncoder::fit(&attrs).unwrap();
        let frame = encoder.encode(&attrs).unwrap();

        assert_eq!(frame.column("size_tier").unwrap(), &[1.0, 2.0]);
        assert_eq!(frame.column("estimated_volume").unwrap(), &[100.0, 200.0]);
    }

    #[test]
    fn unseen_level_encodes_as_reference() {
        let train = vec![merchant(1, "food", "RJ", "low"), merchant(2, "retail", "SP", "low")];
        let encoder = OneHotEncoder::fit(&train).unwrap();

        let unseen = vec![merchant(3, "mining", "RJ", "low")];
        let frame = encoder.encode(&unseen).unwrap();
        assert_eq!(frame.column("category_retail").unwrap(), &[0.0]);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(OneHotEncoder::fit(&[]).is_err());
    }
}
