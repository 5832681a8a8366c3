use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::api_connection::CompletionBackend;
use crate::json_repair::parse_json_object;
use crate::prompts::EXTRACTION_SYSTEM_PROMPT;

pub const FALLBACK_TITLE: &str = "Recipe";

/// Structured view of a free-form recipe, as handed to every rubric scorer.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct RecipeComponents {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serving_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<Vec<String>>,
}

const TITLE_KEYS: &[&str] = &["title", "recipe_title", "name"];
const DESCRIPTION_KEYS: &[&str] = &["description", "introduction", "description_introduction"];
const INGREDIENT_KEYS: &[&str] = &["ingredients", "ingredients_list"];
const INSTRUCTION_KEYS: &[&str] = &["instructions", "steps", "method", "directions"];
const NUTRITION_KEYS: &[&str] = &[
    "nutrition",
    "nutritional_information",
    "nutritional_info",
    "nutrition_facts",
];
const TIMING_KEYS: &[&str] = &[
    "timing",
    "times",
    "preparation_cooking_times",
    "preparation_times",
    "cooking_times",
];
const REASONING_KEYS: &[&str] = &[
    "reasoning",
    "chain_of_thought",
    "chain_of_thought_reasoning",
    "cot_reasoning",
    "thinking",
];
const COST_KEYS: &[&str] = &[
    "cost",
    "budget",
    "cost_information",
    "budget_information",
    "cost_budget_information",
];
const SERVING_KEYS: &[&str] = &["serving_size", "servings", "serving_size_information"];
const EQUIPMENT_KEYS: &[&str] = &["equipment", "equipment_needed"];

// Keys of an ingredient or step object that already hold the whole line.
const LINE_KEYS: &[&str] = &["raw_text", "raw", "text", "step", "instruction"];
// Otherwise the line is rebuilt as "<quantity> <unit> <name>".
const QUANTITY_KEYS: &[&str] = &["quantity", "amount", "qty", "unit"];
const NAME_KEYS: &[&str] = &["name", "item", "ingredient"];

fn normalize_key(key: &str) -> String {
    key.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' || c == '/' { '_' } else { c })
        .collect()
}

fn lookup<'a>(object: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|alias| {
        object
            .iter()
            .find(|(key, value)| normalize_key(key) == *alias && !value.is_null())
            .map(|(_, value)| value)
    })
}

fn value_as_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(value_as_text)
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(object) => object_as_text(object).unwrap_or_else(|| value.to_string()),
        other => other.to_string(),
    };
    if text.is_empty() { None } else { Some(text) }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Flattens an item object into one line without losing quantities or notes:
/// `{"name": "onion", "quantity": 1, "preparation": "diced"}` becomes `"1 onion, diced"`.
fn object_as_text(object: &Map<String, Value>) -> Option<String> {
    let field = |key: &&str| object.get(*key).and_then(scalar_text);
    let main = match LINE_KEYS.iter().find_map(field) {
        Some(line) => line,
        None => {
            let parts: Vec<String> = QUANTITY_KEYS.iter().chain(NAME_KEYS).filter_map(field).collect();
            if parts.is_empty() {
                return None;
            }
            parts.join(" ")
        }
    };

    let known = |key: &str| [LINE_KEYS, QUANTITY_KEYS, NAME_KEYS].iter().any(|keys| keys.contains(&key));
    let extras: Vec<String> = object
        .iter()
        .filter(|(key, _)| !known(key.as_str()))
        .filter_map(|(_, value)| scalar_text(value))
        .collect();
    if extras.is_empty() {
        Some(main)
    } else {
        Some(format!("{main}, {}", extras.join(", ")))
    }
}

fn value_as_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(value_as_text).collect(),
        Value::String(s) => s
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
        other => value_as_text(other).into_iter().collect(),
    }
}

fn value_as_map(value: &Value) -> Option<BTreeMap<String, String>> {
    let map: BTreeMap<String, String> = match value {
        Value::Object(object) => object
            .iter()
            .filter_map(|(key, value)| value_as_text(value).map(|text| (key.clone(), text)))
            .collect(),
        other => value_as_text(other)
            .map(|text| BTreeMap::from([("summary".to_string(), text)]))
            .unwrap_or_default(),
    };
    if map.is_empty() { None } else { Some(map) }
}

impl RecipeComponents {
    /// Builds components from an extraction object, tolerating the key spellings and
    /// value shapes models tend to produce. Returns `None` when no known field is present.
    pub fn from_json_object(object: &Map<String, Value>, recipe_text: &str) -> Option<Self> {
        let title = lookup(object, TITLE_KEYS).and_then(value_as_text);
        let ingredients = lookup(object, INGREDIENT_KEYS).map(value_as_list);
        let instructions = lookup(object, INSTRUCTION_KEYS).map(value_as_list);
        let reasoning = lookup(object, REASONING_KEYS).and_then(value_as_text);
        let description = lookup(object, DESCRIPTION_KEYS).and_then(value_as_text);
        let nutrition = lookup(object, NUTRITION_KEYS).and_then(value_as_map);
        let timing = lookup(object, TIMING_KEYS).and_then(value_as_map);
        let cost = lookup(object, COST_KEYS).and_then(value_as_text);
        let serving_size = lookup(object, SERVING_KEYS).and_then(value_as_text);
        let equipment = lookup(object, EQUIPMENT_KEYS)
            .map(value_as_list)
            .filter(|items| !items.is_empty());

        let recognized = title.is_some()
            || ingredients.is_some()
            || instructions.is_some()
            || reasoning.is_some()
            || description.is_some()
            || nutrition.is_some()
            || timing.is_some()
            || cost.is_some()
            || serving_size.is_some()
            || equipment.is_some();
        if !recognized {
            return None;
        }

        Some(Self {
            title: title.unwrap_or_else(|| guess_title(recipe_text)),
            description,
            ingredients: ingredients.unwrap_or_default(),
            instructions: instructions.unwrap_or_default(),
            nutrition,
            timing,
            reasoning: reasoning.unwrap_or_default(),
            cost,
            serving_size,
            equipment,
        })
    }

    /// Minimal record built by splitting the raw text on blank lines.
    /// Never fails; the full text is kept as `reasoning` so scorers still see everything.
    pub fn from_raw_text(recipe_text: &str) -> Self {
        let paragraphs: Vec<&str> = recipe_text
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        Self {
            title: guess_title(recipe_text),
            ingredients: paragraphs.get(2).map(|p| p.to_string()).into_iter().collect(),
            instructions: paragraphs.get(3).map(|p| p.to_string()).into_iter().collect(),
            reasoning: recipe_text.to_string(),
            ..Default::default()
        }
    }
}

fn guess_title(recipe_text: &str) -> String {
    recipe_text
        .lines()
        .map(|line| line.trim().trim_start_matches('#').trim())
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| FALLBACK_TITLE.to_string())
}

/// Extracts structured components from raw recipe text with one LLM call.
///
/// Falls back to [`RecipeComponents::from_raw_text`] when the call fails or the reply
/// holds no usable JSON object.
pub async fn extract_components<C>(client: &C, recipe_text: &str) -> RecipeComponents
where
    C: CompletionBackend + ?Sized,
{
    let response = match client
        .generate_completion(EXTRACTION_SYSTEM_PROMPT, recipe_text, true)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "component extraction call failed, segmenting raw text");
            return RecipeComponents::from_raw_text(recipe_text);
        }
    };
    debug!(response = %response, "raw extraction response");

    match parse_json_object(&response)
        .and_then(|object| RecipeComponents::from_json_object(&object, recipe_text))
    {
        Some(components) => components,
        None => {
            warn!("extraction response held no usable JSON object, segmenting raw text");
            RecipeComponents::from_raw_text(recipe_text)
        }
    }
}
