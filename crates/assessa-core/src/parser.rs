//! TOML assessment parser.
//!
//! Loads assessments from TOML files and directories, and validates them.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{Assessment, Dependency, Question, QuestionGraph, QuestionKind, QuestionOption};

/// Intermediate TOML structure for parsing assessment files.
#[derive(Debug, Deserialize)]
struct TomlAssessmentFile {
    assessment: TomlAssessmentHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlAssessmentHeader {
    id: String,
    title: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    order_index: i64,
    #[serde(rename = "type", default = "default_kind")]
    kind: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    options: Vec<TomlOption>,
    #[serde(default)]
    dependency: Option<TomlDependency>,
}

fn default_kind() -> String {
    "choice".to_string()
}

#[derive(Debug, Deserialize)]
struct TomlOption {
    label: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    dimension: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TomlDependency {
    target_order_index: i64,
    trigger_value: String,
}

/// Parse a single TOML file into an `Assessment`.
pub fn parse_assessment(path: &Path) -> Result<Assessment> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read assessment file: {}", path.display()))?;

    parse_assessment_str(&content, path)
}

/// Parse a TOML string into an `Assessment` (useful for testing).
pub fn parse_assessment_str(content: &str, source_path: &Path) -> Result<Assessment> {
    let parsed: TomlAssessmentFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let questions = parsed
        .questions
        .into_iter()
        .map(|q| {
            let kind: QuestionKind = q
                .kind
                .parse()
                .map_err(|e: String| anyhow::anyhow!("question '{}': {}", q.id, e))?;

            let options = q
                .options
                .into_iter()
                .map(|o| QuestionOption {
                    label: o.label,
                    text: o.text,
                    score: o.score,
                    dimension: o.dimension,
                })
                .collect();

            Ok(Question {
                id: q.id,
                order_index: q.order_index,
                kind,
                content: q.content,
                options,
                dependency: q.dependency.map(|d| Dependency {
                    target_order_index: d.target_order_index,
                    trigger_value: d.trigger_value,
                }),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let questions = QuestionGraph::new(questions)
        .with_context(|| format!("invalid question graph: {}", source_path.display()))?;

    Ok(Assessment {
        id: parsed.assessment.id,
        title: parsed.assessment.title,
        category: parsed.assessment.category,
        description: parsed.assessment.description,
        questions,
    })
}

/// Recursively load all `.toml` assessment files from a directory.
pub fn load_assessment_directory(dir: &Path) -> Result<Vec<Assessment>> {
    let mut assessments = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            assessments.extend(load_assessment_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_assessment(&path) {
                Ok(assessment) => assessments.push(assessment),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(assessments)
}

/// A warning from assessment validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    fn question(id: &str, message: impl Into<String>) -> Self {
        Self {
            question_id: Some(id.to_string()),
            message: message.into(),
        }
    }
}

/// Validate an assessment for issues the engine tolerates but that are
/// almost certainly authoring mistakes.
pub fn validate_assessment(assessment: &Assessment) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let graph = &assessment.questions;

    if graph.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "assessment has no questions".into(),
        });
    }

    for question in graph.questions() {
        if question.content.trim().is_empty() {
            warnings.push(ValidationWarning::question(&question.id, "content is empty"));
        }

        match question.kind {
            QuestionKind::Choice => {
                if question.options.is_empty() {
                    warnings.push(ValidationWarning::question(
                        &question.id,
                        "choice question has no options",
                    ));
                }
                let mut labels = HashSet::new();
                for option in &question.options {
                    if !labels.insert(option.label.as_str()) {
                        warnings.push(ValidationWarning::question(
                            &question.id,
                            format!("duplicate option label: {}", option.label),
                        ));
                    }
                }
            }
            QuestionKind::FreeText => {
                if !question.options.is_empty() {
                    warnings.push(ValidationWarning::question(
                        &question.id,
                        "free-text question has options, they will be ignored",
                    ));
                }
            }
        }

        let Some(dependency) = &question.dependency else {
            continue;
        };
        let Some(target) = graph.by_order_index(dependency.target_order_index) else {
            warnings.push(ValidationWarning::question(
                &question.id,
                format!(
                    "dependency targets missing order_index {}; question will always be shown",
                    dependency.target_order_index
                ),
            ));
            continue;
        };

        if target.order_index >= question.order_index {
            warnings.push(ValidationWarning::question(
                &question.id,
                format!(
                    "dependency targets '{}' which is not an earlier question",
                    target.id
                ),
            ));
        }

        match target.kind {
            QuestionKind::FreeText => warnings.push(ValidationWarning::question(
                &question.id,
                format!(
                    "dependency targets free-text question '{}'; question will never be shown",
                    target.id
                ),
            )),
            QuestionKind::Choice => {
                if !target
                    .options
                    .iter()
                    .any(|o| o.label == dependency.trigger_value)
                {
                    warnings.push(ValidationWarning::question(
                        &question.id,
                        format!(
                            "trigger value '{}' matches no option of '{}'",
                            dependency.trigger_value, target.id
                        ),
                    ));
                }
            }
        }
    }

    warnings
}
