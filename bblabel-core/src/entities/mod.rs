pub mod labels;
pub mod sessions;

pub use labels::{LabelRecord, normalize_product_id};
pub use sessions::PurgeSummary;
