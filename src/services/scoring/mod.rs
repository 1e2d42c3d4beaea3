/// Scoring Module
///
/// The multi-factor scoring engine: a closed category catalog, the scorer
/// execution contract (feature mode vs feed mode), the per-run registry,
/// the user-adjustable weight table, and the pipeline that combines it all
/// into a per-post score breakdown.
pub mod category;
pub mod pipeline;
pub mod registry;
pub mod scorer;
pub mod weights;

pub use category::{CategoryInfo, ScoreCategory};
pub use pipeline::{PipelineState, ScoringPipeline};
pub use registry::ScorerRegistry;
pub use scorer::{Scorer, ScorerMode};
pub use weights::{Weight, WeightTable};
