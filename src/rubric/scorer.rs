use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::dimensions::{Dimension, MAX_SCORE, MIN_SCORE};
use crate::api_connection::{ApiConnectionError, CompletionBackend};
use crate::json_repair::parse_json_object;
use crate::prompts::{render_json_repair_prompt, JSON_REPAIR_SYSTEM_PROMPT};
use crate::recipe_components::RecipeComponents;

const RAW_RESPONSE_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub criterion: String,
    pub score: f64,
    pub evidence: String,
    /// Set when the neutral default stood in for a missing or corrupt score.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub defaulted: bool,
}

/// Error marker left by a scorer whose reply could not be parsed even after repair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringFailure {
    pub error: String,
    pub raw_response: String,
}

/// What one scorer produced for one dimension. `criteria` holds only the criteria
/// that came back well-formed, in the dimension's fixed order.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionResult {
    pub dimension: Dimension,
    pub criteria: Vec<CriterionScore>,
    pub failure: Option<ScoringFailure>,
}

impl DimensionResult {
    pub fn failed(dimension: Dimension, error: impl Into<String>, raw_response: &str) -> Self {
        let mut preview: String = raw_response.chars().take(RAW_RESPONSE_PREVIEW_CHARS).collect();
        if raw_response.chars().count() > RAW_RESPONSE_PREVIEW_CHARS {
            preview.push_str("...");
        }
        Self {
            dimension,
            criteria: Vec::new(),
            failure: Some(ScoringFailure {
                error: error.into(),
                raw_response: preview,
            }),
        }
    }

    pub fn from_scores(dimension: Dimension, scores: &[(&str, f64, &str)]) -> Self {
        Self {
            dimension,
            criteria: scores
                .iter()
                .map(|(criterion, score, evidence)| CriterionScore {
                    criterion: criterion.to_string(),
                    score: *score,
                    evidence: evidence.to_string(),
                    defaulted: false,
                })
                .collect(),
            failure: None,
        }
    }

    /// Reads `{criterion: {score, evidence}}` for this dimension's criteria.
    /// Criteria that are absent, non-numeric, or outside 1..=5 are left out.
    pub fn from_json_object(dimension: Dimension, object: &Map<String, Value>) -> Self {
        let holder = criteria_holder(dimension, object);
        let criteria = dimension
            .criteria()
            .iter()
            .filter_map(|criterion| {
                let entry = holder.get(*criterion)?;
                let parsed = parse_criterion(criterion, entry);
                if parsed.is_none() {
                    debug!(%dimension, criterion, entry = %entry, "discarding malformed criterion");
                }
                parsed
            })
            .collect();

        Self {
            dimension,
            criteria,
            failure: None,
        }
    }

    pub fn get(&self, criterion: &str) -> Option<&CriterionScore> {
        self.criteria.iter().find(|c| c.criterion == criterion)
    }
}

// Models sometimes nest the criteria under the dimension name.
fn criteria_holder<'a>(dimension: Dimension, object: &'a Map<String, Value>) -> &'a Map<String, Value> {
    let has_any = |map: &Map<String, Value>| dimension.criteria().iter().any(|c| map.contains_key(*c));
    if has_any(object) {
        return object;
    }
    object
        .values()
        .filter_map(Value::as_object)
        .find(|nested| has_any(nested))
        .unwrap_or(object)
}

fn parse_criterion(criterion: &str, entry: &Value) -> Option<CriterionScore> {
    let (score_value, evidence) = match entry {
        Value::Object(fields) => (fields.get("score")?, fields.get("evidence")),
        bare => (bare, None),
    };
    let score = match score_value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !score.is_finite() || !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return None;
    }
    let evidence = match evidence {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    Some(CriterionScore {
        criterion: criterion.to_string(),
        score,
        evidence,
        defaulted: false,
    })
}

/// Scores one rubric dimension for the extracted recipe.
///
/// Unparseable replies get exactly one repair round-trip; if that output is still
/// unusable the result carries a [`ScoringFailure`] instead of criteria. Only a failure
/// of the scoring call itself is returned as `Err`.
pub async fn score_dimension<C>(
    client: &C,
    dimension: Dimension,
    components: &RecipeComponents,
) -> Result<DimensionResult, ApiConnectionError>
where
    C: CompletionBackend + ?Sized,
{
    let payload = serde_json::to_string(components)?;
    let response = client
        .generate_completion(dimension.system_prompt(), &payload, true)
        .await?;
    debug!(%dimension, response = %response, "raw dimension response");

    if let Some(object) = parse_json_object(&response) {
        return Ok(DimensionResult::from_json_object(dimension, &object));
    }

    warn!(%dimension, "dimension response is not valid JSON, requesting repair");
    let repaired = match client
        .generate_completion(
            JSON_REPAIR_SYSTEM_PROMPT,
            &render_json_repair_prompt(&response),
            true,
        )
        .await
    {
        Ok(repaired) => repaired,
        Err(e) => {
            warn!(%dimension, error = %e, "JSON repair call failed");
            return Ok(DimensionResult::failed(
                dimension,
                format!("JSON repair call failed: {e}"),
                &response,
            ));
        }
    };

    match parse_json_object(&repaired) {
        Some(object) => Ok(DimensionResult::from_json_object(dimension, &object)),
        None => {
            warn!(%dimension, "repaired response still unparseable");
            Ok(DimensionResult::failed(
                dimension,
                "Failed to parse response",
                &response,
            ))
        }
    }
}
