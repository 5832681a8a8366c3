pub mod aggregate;
pub mod dimensions;
pub mod feedback;
pub mod scorer;

pub use aggregate::{aggregate, score_or_default, DimensionBreakdown, ScoreBreakdown};
pub use dimensions::{display_name, Dimension, ALL_DIMENSIONS};
pub use feedback::{generate_feedback, Feedback, FeedbackItem, Interpretation};
pub use scorer::{score_dimension, CriterionScore, DimensionResult, ScoringFailure};
