pub mod analytics;
pub mod data_fetcher;
pub mod export;
pub mod layout;
pub mod predictor;
pub mod presets;
pub mod stats_aggregator;

pub use analytics::*;
pub use data_fetcher::*;
pub use export::*;
pub use layout::*;
pub use predictor::*;
pub use presets::*;
pub use stats_aggregator::*;
