//! Packages bundled with the crate.
//!
//! Embedded at compile time with `include_str!()` so the default registry
//! needs no file I/O.

/// EMIR REFIT subset (TRADE, POSITION, VALUATION, MARGIN).
pub const EMIR_REFIT: &str = include_str!("../data/packages/emir_refit.json");

/// MiFIR transaction reporting subset.
pub const MIFIR_TRANSACTIONS: &str = include_str!("../data/packages/mifir_transactions.json");

/// All embedded packages as `(name, json)` pairs.
pub const PACKAGES: &[(&str, &str)] = &[
    ("emir_refit.json", EMIR_REFIT),
    ("mifir_transactions.json", MIFIR_TRANSACTIONS),
];
