pub mod normalize;
pub mod schema;
pub mod snapshot;

pub use normalize::{MIN_SIGNIFICANT_PERCENTAGE, NormalizeOutcome, normalize_rows};
pub use schema::{Customization, HolderRecord, RawHolderRow, short_wallet};
pub use snapshot::{load_customizations_file, load_snapshot_file};
