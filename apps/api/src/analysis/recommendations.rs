use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::llm_client::LlmError;

/// Strength/importance assumed for skills the model returned as bare strings.
const DEFAULT_RATING: u8 = 3;
const NOT_AVAILABLE: &str = "N/A";
const NO_RECOMMENDATIONS: &str =
    "No specific recommendations found. Try resubmitting with a more detailed resume or job description.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingSkill {
    pub skill: String,
    pub strength: u8,
    pub importance: u8,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingSkill {
    pub skill: String,
    pub importance: u8,
    pub suggestion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapAnalysis {
    pub overall_match: String,
    pub technical_match: String,
    pub experience_match: String,
    pub critical_gaps: Vec<String>,
}

impl GapAnalysis {
    fn unavailable() -> Self {
        GapAnalysis {
            overall_match: NOT_AVAILABLE.to_string(),
            technical_match: NOT_AVAILABLE.to_string(),
            experience_match: NOT_AVAILABLE.to_string(),
            critical_gaps: vec!["Unable to analyze".to_string()],
        }
    }

    fn sample() -> Self {
        GapAnalysis {
            overall_match: "65%".to_string(),
            technical_match: "70%".to_string(),
            experience_match: "60%".to_string(),
            critical_gaps: vec![
                "Consider adding more examples of leadership".to_string(),
                "Highlight specific technical skills".to_string(),
            ],
        }
    }
}

/// The `/api/optimize` payload. `error` is only present on fallback bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub matching_skills: Vec<MatchingSkill>,
    pub missing_skills: Vec<MissingSkill>,
    pub improvement_suggestions: Vec<String>,
    pub potential_red_flags: Vec<String>,
    pub experience_tailoring: Vec<String>,
    pub gap_analysis: GapAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Recommendations {
    /// Builds recommendations from whatever JSON object the model produced.
    /// Missing or empty keys get defaults; bare-string skills are lifted.
    pub fn normalize(value: Value) -> Self {
        let object = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let matching_skills = items(&object, "matching_skills")
            .map(|list| list.iter().filter_map(matching_skill).collect::<Vec<_>>())
            .filter(|skills| !skills.is_empty())
            .unwrap_or_else(sample_matching_skills);

        let missing_skills = items(&object, "missing_skills")
            .map(|list| list.iter().filter_map(missing_skill).collect::<Vec<_>>())
            .filter(|skills| !skills.is_empty())
            .unwrap_or_else(sample_missing_skills);

        let gap_analysis = object
            .get("gap_analysis")
            .and_then(Value::as_object)
            .filter(|gap| !gap.is_empty())
            .map(gap_analysis)
            .unwrap_or_else(GapAnalysis::sample);

        Recommendations {
            matching_skills,
            missing_skills,
            improvement_suggestions: string_list(&object, "improvement_suggestions"),
            potential_red_flags: string_list(&object, "potential_red_flags"),
            experience_tailoring: string_list(&object, "experience_tailoring"),
            gap_analysis,
            error: None,
        }
    }

    /// Answer for a failed model call; the endpoint still returns 200 with this.
    pub fn unavailable(err: &LlmError) -> Self {
        let message = if err.is_quota() {
            "The resume optimization service is temporarily unavailable due to high demand. Please try again in a few minutes.".to_string()
        } else {
            match err {
                LlmError::Api { status, .. } => format!(
                    "API Error: The Gemini API returned an error (code {status}). Please try again later."
                ),
                LlmError::EmptyContent => {
                    "The API returned an empty response. Please try again later.".to_string()
                }
                LlmError::NoJson | LlmError::Parse(_) => {
                    "Our system encountered an issue parsing the analysis results. Please try again.".to_string()
                }
                LlmError::Http(_) => {
                    "The analysis service could not be reached. Please try again later.".to_string()
                }
            }
        };

        Recommendations {
            matching_skills: vec![MatchingSkill {
                skill: "API Connection".to_string(),
                strength: DEFAULT_RATING,
                importance: 5,
                notes: err.to_string(),
            }],
            missing_skills: vec![MissingSkill {
                skill: "API Communication".to_string(),
                importance: 5,
                suggestion: "Please try again later when the service is available.".to_string(),
            }],
            improvement_suggestions: vec!["Try again later when API services are available.".to_string()],
            potential_red_flags: vec!["No analysis available due to API error.".to_string()],
            experience_tailoring: vec!["No tailoring suggestions available due to API error.".to_string()],
            gap_analysis: GapAnalysis::unavailable(),
            error: Some(message),
        }
    }

    /// Body of the 500 response when the request failed outside the model call.
    pub fn system_error(detail: &str) -> Self {
        Recommendations {
            matching_skills: vec![MatchingSkill {
                skill: "System Error".to_string(),
                strength: DEFAULT_RATING,
                importance: 5,
                notes: format!("An error occurred: {detail}"),
            }],
            missing_skills: vec![MissingSkill {
                skill: "Error Recovery".to_string(),
                importance: 5,
                suggestion: "Please try again or contact support if the issue persists.".to_string(),
            }],
            improvement_suggestions: vec![
                "Our system encountered an error processing your request. Please try again with a different resume or job description.".to_string(),
            ],
            potential_red_flags: vec!["No analysis available due to system error.".to_string()],
            experience_tailoring: vec!["No tailoring suggestions available due to system error.".to_string()],
            gap_analysis: GapAnalysis::unavailable(),
            error: None,
        }
    }
}

fn items<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Vec<Value>> {
    object.get(key).and_then(Value::as_array)
}

fn string_list(object: &Map<String, Value>, key: &str) -> Vec<String> {
    let list: Vec<String> = items(object, key)
        .map(|list| list.iter().filter_map(text).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();
    if list.is_empty() {
        vec![NO_RECOMMENDATIONS.to_string()]
    } else {
        list
    }
}

/// Strings pass through; numbers are rendered (models sometimes send `65`
/// instead of `"65%"`).
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn field_text(object: &Map<String, Value>, key: &str) -> String {
    object.get(key).and_then(text).unwrap_or_default()
}

/// Accepts integers, floats and numeric strings; clamps into 1..=5.
fn rating(object: &Map<String, Value>, key: &str) -> u8 {
    let value = match object.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value
        .map(|v| v.round().clamp(1.0, 5.0) as u8)
        .unwrap_or(DEFAULT_RATING)
}

fn matching_skill(value: &Value) -> Option<MatchingSkill> {
    match value {
        Value::String(skill) => Some(MatchingSkill {
            skill: skill.clone(),
            strength: DEFAULT_RATING,
            importance: DEFAULT_RATING,
            notes: "Automatically detected".to_string(),
        }),
        Value::Object(obj) => {
            let skill = field_text(obj, "skill");
            (!skill.is_empty()).then(|| MatchingSkill {
                skill,
                strength: rating(obj, "strength"),
                importance: rating(obj, "importance"),
                notes: field_text(obj, "notes"),
            })
        }
        _ => None,
    }
}

fn missing_skill(value: &Value) -> Option<MissingSkill> {
    match value {
        Value::String(skill) => Some(MissingSkill {
            skill: skill.clone(),
            importance: DEFAULT_RATING,
            suggestion: "Consider adding this skill".to_string(),
        }),
        Value::Object(obj) => {
            let skill = field_text(obj, "skill");
            (!skill.is_empty()).then(|| MissingSkill {
                skill,
                importance: rating(obj, "importance"),
                suggestion: field_text(obj, "suggestion"),
            })
        }
        _ => None,
    }
}

fn gap_analysis(object: &Map<String, Value>) -> GapAnalysis {
    let percent = |key: &str| {
        let value = field_text(object, key);
        if value.is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            value
        }
    };
    GapAnalysis {
        overall_match: percent("overall_match"),
        technical_match: percent("technical_match"),
        experience_match: percent("experience_match"),
        critical_gaps: items(object, "critical_gaps")
            .map(|list| list.iter().filter_map(text).collect())
            .unwrap_or_default(),
    }
}

fn sample_matching_skills() -> Vec<MatchingSkill> {
    vec![
        MatchingSkill {
            skill: "Communication".to_string(),
            strength: 3,
            importance: 4,
            notes: "Your resume shows some evidence of communication skills through your project descriptions.".to_string(),
        },
        MatchingSkill {
            skill: "Problem Solving".to_string(),
            strength: 4,
            importance: 5,
            notes: "Your experience demonstrates strong problem-solving capabilities.".to_string(),
        },
    ]
}

fn sample_missing_skills() -> Vec<MissingSkill> {
    vec![
        MissingSkill {
            skill: "Leadership".to_string(),
            importance: 4,
            suggestion: "Add examples of team leadership or project management.".to_string(),
        },
        MissingSkill {
            skill: "Technical Writing".to_string(),
            importance: 3,
            suggestion: "Include documentation or technical writing experience.".to_string(),
        },
    ]
}
