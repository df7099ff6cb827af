//! Statistical models for frequency comparisons.

pub mod lmm;

pub use lmm::{model_lmm, LmmConfig, LmmFit, RandomIntercept};
