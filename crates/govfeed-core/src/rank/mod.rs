mod classify;
mod dedup;
mod score;

pub use classify::{Classifier, CATEGORY_GRANT, CATEGORY_OPPORTUNITY, CATEGORY_OTHER};
pub use dedup::SeenSet;
pub use score::ScoringPolicy;
