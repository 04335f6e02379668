//! Entity resolution and project rollups.

mod resolver;
mod rollup;
mod signature;

pub use resolver::{resolve, Resolution};
pub use rollup::apply_rollups;
pub use signature::{
    compute_signature, extract_parcel_token, extract_plan_token, extract_title_signature, jaccard,
    normalize_company_name, ProjectSignature,
};
