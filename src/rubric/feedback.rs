use serde::{Serialize, Serializer};
use std::fmt;

use super::aggregate::ScoreBreakdown;

const HIGHLIGHT_COUNT: usize = 3;

/// Qualitative reading of a final score. Lower bounds are inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Interpretation {
    Outstanding,
    Excellent,
    VeryGood,
    Good,
    Fair,
    NeedsImprovement,
    Unsatisfactory,
}

impl Interpretation {
    pub fn from_score(score: f64) -> Self {
        if score >= 4.5 {
            Interpretation::Outstanding
        } else if score >= 4.0 {
            Interpretation::Excellent
        } else if score >= 3.5 {
            Interpretation::VeryGood
        } else if score >= 3.0 {
            Interpretation::Good
        } else if score >= 2.5 {
            Interpretation::Fair
        } else if score >= 2.0 {
            Interpretation::NeedsImprovement
        } else {
            Interpretation::Unsatisfactory
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Interpretation::Outstanding => "Outstanding",
            Interpretation::Excellent => "Excellent",
            Interpretation::VeryGood => "Very Good",
            Interpretation::Good => "Good",
            Interpretation::Fair => "Fair",
            Interpretation::NeedsImprovement => "Needs Improvement",
            Interpretation::Unsatisfactory => "Unsatisfactory",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Interpretation::Outstanding => "Exceptional recipe that excels in nearly all areas",
            Interpretation::Excellent => "High-quality recipe with minor room for improvement",
            Interpretation::VeryGood => "Strong recipe with several notable strengths",
            Interpretation::Good => "Solid recipe meeting all basic requirements",
            Interpretation::Fair => "Acceptable recipe with notable weaknesses",
            Interpretation::NeedsImprovement => "Significant issues in multiple areas",
            Interpretation::Unsatisfactory => "Major issues requiring complete revision",
        }
    }

    /// Display colour for renderers, darkest green for the top bucket down to red.
    pub fn color_hex(&self) -> &'static str {
        match self {
            Interpretation::Outstanding => "#2e7d32",
            Interpretation::Excellent => "#4caf50",
            Interpretation::VeryGood => "#8bc34a",
            Interpretation::Good => "#cddc39",
            Interpretation::Fair => "#ffc107",
            Interpretation::NeedsImprovement => "#ff9800",
            Interpretation::Unsatisfactory => "#f44336",
        }
    }
}

impl fmt::Display for Interpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.label(), self.description())
    }
}

impl Serialize for Interpretation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub fn score_color(score: f64) -> &'static str {
    Interpretation::from_score(score).color_hex()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackItem {
    pub criterion: String,
    pub score: f64,
    pub evidence: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feedback {
    pub strengths: Vec<FeedbackItem>,
    pub areas_for_improvement: Vec<FeedbackItem>,
    pub interpretation: Interpretation,
}

/// Every criterion across all dimensions, highest score first.
/// The sort is stable, so ties keep dimension evaluation order.
pub fn rank_criteria(breakdown: &ScoreBreakdown) -> Vec<FeedbackItem> {
    let mut ranked: Vec<FeedbackItem> = breakdown
        .dimensions()
        .flat_map(|(_, dimension)| dimension.scores.iter())
        .map(|c| FeedbackItem {
            criterion: c.criterion.clone(),
            score: c.score,
            evidence: c.evidence.clone(),
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

/// Top three criteria become strengths and the last three of the ranking become
/// improvement areas. With fewer than six criteria the two lists overlap.
pub fn generate_feedback(breakdown: &ScoreBreakdown) -> Feedback {
    let ranked = rank_criteria(breakdown);
    let strengths = ranked.iter().take(HIGHLIGHT_COUNT).cloned().collect();
    let areas_for_improvement = ranked[ranked.len().saturating_sub(HIGHLIGHT_COUNT)..].to_vec();

    Feedback {
        strengths,
        areas_for_improvement,
        interpretation: Interpretation::from_score(breakdown.final_score),
    }
}
