//! Inspection result as produced by the upstream analysis service.
//!
//! Every field is optional on the wire. Missing values are absorbed by serde
//! defaults here or by label sentinels in the builder; nothing is rejected.

use crate::util::{default_report_id, display_timestamp, now};
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionReport {
    #[serde(default = "default_timestamp", deserialize_with = "or_timestamp")]
    pub timestamp: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub inspector: Option<String>,
    #[serde(
        default = "generated_report_id",
        deserialize_with = "or_report_id",
        alias = "reportId"
    )]
    pub report_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub violations: Vec<Violation>,
    #[serde(default, deserialize_with = "nullable")]
    pub summary: Summary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default, alias = "riskLevel")]
    pub risk_level: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub regulations: Vec<Regulation>,
    #[serde(default, deserialize_with = "nullable")]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Regulation {
    #[serde(default, deserialize_with = "nullable")]
    pub code: String,
    #[serde(default, deserialize_with = "nullable")]
    pub article: String,
    #[serde(default, deserialize_with = "nullable")]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default, alias = "totalScore")]
    pub total_score: Score,
    #[serde(default, deserialize_with = "lenient_count", alias = "severeCount")]
    pub severe_count: u32,
    #[serde(default, deserialize_with = "lenient_count", alias = "normalCount")]
    pub normal_count: u32,
    #[serde(default, alias = "overallAssessment")]
    pub overall_assessment: Option<String>,
    #[serde(default, deserialize_with = "nullable", alias = "priorityActions")]
    pub priority_actions: Vec<String>,
}

/// Overall score as the analysis service sent it. Numbers stay numbers;
/// strings are shown as given. Anything else reads as 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Score {
    Number(serde_json::Number),
    Text(String),
}

impl Default for Score {
    fn default() -> Self {
        Score::Number(0.into())
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Number(n) => write!(f, "{n}"),
            Score::Text(t) => f.write_str(t),
        }
    }
}

impl From<serde_json::Number> for Score {
    fn from(n: serde_json::Number) -> Self {
        Score::Number(n)
    }
}

impl From<i64> for Score {
    fn from(v: i64) -> Self {
        Score::Number(v.into())
    }
}

impl From<f64> for Score {
    fn from(v: f64) -> Self {
        serde_json::Number::from_f64(v).map_or_else(Score::default, Score::Number)
    }
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        Ok(match serde_json::Value::deserialize(d)? {
            serde_json::Value::Number(n) => Score::Number(n),
            serde_json::Value::String(s) if !s.trim().is_empty() => {
                Score::Text(s.trim().to_string())
            }
            _ => Score::default(),
        })
    }
}

impl Default for InspectionReport {
    fn default() -> Self {
        Self {
            timestamp: default_timestamp(),
            location: None,
            inspector: None,
            report_id: generated_report_id(),
            violations: Vec::new(),
            summary: Summary::default(),
        }
    }
}

impl Default for Summary {
    fn default() -> Self {
        Self {
            total_score: Score::default(),
            severe_count: 0,
            normal_count: 0,
            overall_assessment: None,
            priority_actions: Vec::new(),
        }
    }
}

impl Summary {
    /// Caller-asserted total. Independent of the violation list length.
    pub fn total_count(&self) -> u64 {
        u64::from(self.severe_count) + u64::from(self.normal_count)
    }
}

impl InspectionReport {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading report: {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("parsing report: {}", path.display()))
    }

    /// Accepts either a bare report or the analysis envelope
    /// `{ "analysis": { violations, summary }, "timestamp": ... }`.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let mut value: serde_json::Value = serde_json::from_str(raw).context("invalid JSON")?;

        if let Some(obj) = value.as_object_mut() {
            let unwrap = !obj.contains_key("violations")
                && obj.get("analysis").is_some_and(|a| a.is_object());
            if unwrap {
                let mut inner = obj.remove("analysis").unwrap_or_default();
                if let Some(inner_obj) = inner.as_object_mut() {
                    for (k, v) in obj.iter() {
                        inner_obj.entry(k.clone()).or_insert_with(|| v.clone());
                    }
                }
                value = inner;
            }
        }

        serde_json::from_value(value).context("report does not match the expected shape")
    }

    /// Example payload mirroring what the analysis service emits.
    pub fn sample() -> Self {
        Self {
            timestamp: "2025-08-14 22:30:00".into(),
            location: Some("Riverside tower construction site".into()),
            inspector: Some("AI system".into()),
            report_id: "AI-20250814223000".into(),
            violations: vec![Violation {
                kind: Some("severe".into()),
                category: Some("excavation support".into()),
                description: Some(
                    "Trench deeper than 1.5 m has no guard rails along either edge".into(),
                ),
                severity: Some("high".into()),
                risk_level: Some("extreme".into()),
                regulations: vec![Regulation {
                    code: "JGJ59-2011".into(),
                    article: "4.1.3".into(),
                    content: "Excavations deeper than 1.5 m must be fenced with guard rails"
                        .into(),
                }],
                suggestions: vec![
                    "Install guard rails immediately".into(),
                    "Increase on-site safety patrols".into(),
                ],
            }],
            summary: Summary {
                total_score: Score::Number(60.into()),
                severe_count: 1,
                normal_count: 0,
                overall_assessment: Some(
                    "Serious hazards present; rectification required immediately".into(),
                ),
                priority_actions: vec!["Fence the excavation before work resumes".into()],
            },
        }
    }
}

fn default_timestamp() -> String {
    display_timestamp(now())
}

fn generated_report_id() -> String {
    default_report_id(now())
}

fn nullable<'de, D, T>(d: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

fn or_timestamp<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_else(default_timestamp))
}

fn or_report_id<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_else(generated_report_id))
}

/// Counts arrive as integers, floats or numeric strings. Fractions are
/// truncated; negative, non-numeric and missing values read as 0.
fn lenient_count<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u32, D::Error> {
    let from_float = |f: f64| (f.is_finite() && f >= 0.0).then_some(f as u64);
    let count = match serde_json::Value::deserialize(d)? {
        serde_json::Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(from_float)),
        serde_json::Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(from_float))
        }
        _ => None,
    };
    Ok(count.map_or(0, |c| u32::try_from(c).unwrap_or(u32::MAX)))
}
