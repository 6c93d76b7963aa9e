// Transform stage: cleaning, aggregation and unification of the extracted tables

pub mod aggregate;
pub mod apps;
pub mod reviews;
pub mod size;
pub mod unify;

pub use aggregate::aggregate_reviews;
pub use apps::clean_apps;
pub use reviews::clean_reviews;
pub use size::normalize_size;
pub use unify::unify_tables;
