//! Statistical hypothesis testing for responder vs non-responder differences.


pub use compare::{compare_response_groups, ComparisonReport};
pub use mann_whitney::{mann_whitney_u, MannWhitneyResult, MwuMethod};
pub use mixed::{test_mixed_response, MixedModelResult, RESPONSE_COEFFICIENT};
