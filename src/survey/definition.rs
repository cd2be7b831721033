use crate::error::{AppError, AppResult};
use crate::survey::Condition;
use serde::Deserialize;

/// A survey definition deserialized from JSON.
///
/// Question flow: `core` first, then follow-ups triggered by recorded
/// answers, then condition-activated `modules`, then `closing`.
#[derive(Debug, Clone, Deserialize)]
pub struct SurveyDefinition {
    pub key: String,
    pub core: Vec<Question>,
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default)]
    pub closing: Vec<Question>,
    #[serde(default)]
    pub limits: Limits,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_total_questions: usize,
    pub max_text_questions: usize,
    /// Cap on follow-up questions triggered by a single answer.
    pub max_followups_per_answer: usize,
    /// Global cap on questions contributed by all modules combined.
    pub max_module_questions: usize,
    pub min_answered: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_total_questions: 25,
            max_text_questions: 3,
            max_followups_per_answer: 2,
            max_module_questions: 8,
            min_answered: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
    #[serde(default)]
    pub show_if: Option<Condition>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub follow_ups: Vec<FollowUp>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionKind {
    Slider {
        min: i64,
        max: i64,
    },
    Single {
        options: Vec<String>,
    },
    Multi {
        options: Vec<String>,
        #[serde(default)]
        max_select: Option<usize>,
    },
    Text {
        max_len: usize,
    },
}

impl QuestionKind {
    pub fn is_text(&self) -> bool {
        matches!(self, QuestionKind::Text { .. })
    }
}

/// Follow-up questions asked when `when` holds against the current answers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FollowUp {
    pub when: Condition,
    pub questions: Vec<Question>,
}

/// A condition-activated question group.
#[derive(Debug, Clone, Deserialize)]
pub struct Module {
    pub id: String,
    pub activate_if: Condition,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub max_questions: Option<usize>,
}

impl SurveyDefinition {
    pub fn from_json(json: &str) -> AppResult<Self> {
        let def: SurveyDefinition = serde_json::from_str(json)?;
        def.validate()?;
        Ok(def)
    }

    /// The compiled-in default definition.
    pub fn default_definition() -> Self {
        SurveyDefinition::from_json(include_str!("default_survey.json"))
            .expect("compiled-in survey definition is valid")
    }

    pub fn load(path: Option<&str>) -> AppResult<Self> {
        match path {
            Some(p) => {
                let json = std::fs::read_to_string(p)
                    .map_err(|e| AppError::ConfigError(format!("Cannot read {p}: {e}")))?;
                Self::from_json(&json)
            }
            None => Ok(Self::default_definition()),
        }
    }

    fn validate(&self) -> AppResult<()> {
        let mut seen = std::collections::HashSet::new();
        for q in self.all_questions() {
            if !seen.insert(q.id.as_str()) {
                return Err(AppError::ConfigError(format!(
                    "Duplicate question id in survey definition: {}",
                    q.id
                )));
            }
        }
        Ok(())
    }

    /// Every question reachable anywhere in the definition. Follow-ups are
    /// one level deep: a follow-up question cannot carry its own follow-ups.
    pub fn all_questions(&self) -> impl Iterator<Item = &Question> {
        let direct = self
            .core
            .iter()
            .chain(self.modules.iter().flat_map(|m| m.questions.iter()))
            .chain(self.closing.iter());
        direct
            .clone()
            .chain(direct.flat_map(|q| q.follow_ups.iter().flat_map(|f| f.questions.iter())))
    }

    pub fn find_question(&self, id: &str) -> Option<&Question> {
        self.all_questions().find(|q| q.id == id)
    }
}
