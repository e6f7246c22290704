//! Core data structures: merchant registration records, monthly volume
//! series, and the column-oriented frames the modeling stages consume.

pub mod frame;
pub mod lookup;
pub mod merchant;
pub mod series;

pub use frame::{Frame, TrainingFrame};
pub use lookup::{StateCode, StateLookup};
pub use merchant::{resolve_duplicates, MerchantAttributes, MerchantId, RegistrationRecord};
pub use series::{check_coverage, CompletedPanel, CompletedSeries, MonthlySeries, SeriesPanel};
