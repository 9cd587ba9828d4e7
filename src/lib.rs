//! Cross-cohort harmonization of GWAS summary statistics.

pub mod error;
pub mod logging;
pub mod types;

pub mod df_utils;
pub mod io;
pub mod parallel;
pub mod qc;
pub mod schema;
pub mod utils;

pub mod clump;
pub mod filter;
pub mod matching;
pub mod normalize;
pub mod pipeline;
pub mod reference;
