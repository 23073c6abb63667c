//! Cleaning stage and confirmed-tier certification.

mod certify;
mod cleaner;
mod rules;

pub use certify::{certify, fingerprint, Certified};
pub use cleaner::{clean_with, flag_column_name, output_name, Cleaner, CleaningReport};
pub use rules::{CleaningRules, FillPolicy, MISSING_FLAG_SUFFIX};
