//! The data-driven survey engine.
//!
//! Pure logic over a JSON-defined question graph: condition evaluation,
//! answer validation, next-question selection and session transitions.
//! Persistence and reward issuance live in `services::survey_service`.

pub mod conditions;
pub mod definition;
pub mod engine;
pub mod validate;

pub use conditions::{Condition, EvalContext, Op};
pub use definition::{FollowUp, Limits, Module, Question, QuestionKind, SurveyDefinition};
pub use engine::{AnswerOutcome, EngineError, SessionState, SessionStatus, SurveyEngine};
pub use validate::validate_answer;
