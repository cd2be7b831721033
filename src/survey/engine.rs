use crate::survey::{
    Condition, EvalContext, Question, SurveyDefinition, validate_answer,
};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    InProgress,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "completed" => SessionStatus::Completed,
            _ => SessionStatus::InProgress,
        }
    }
}

/// In-memory session state the engine transitions. The service layer maps
/// this to and from the survey_sessions row.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub survey_key: String,
    pub status: SessionStatus,
    pub answers: Map<String, Value>,
    pub history: Vec<String>,
    pub current_question_id: Option<String>,
    pub version: i32,
    pub back_used: bool,
    pub meta: Map<String, Value>,
}

impl SessionState {
    pub fn new(survey_key: &str) -> Self {
        Self {
            survey_key: survey_key.to_string(),
            status: SessionStatus::InProgress,
            answers: Map::new(),
            history: Vec::new(),
            current_question_id: None,
            version: 0,
            back_used: false,
            meta: Map::new(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// Session advanced to the next question.
    Advanced,
    /// No next question remained; the session is now completed.
    Completed,
}

#[derive(Debug, PartialEq, Eq)]
pub enum EngineError {
    /// Client-supplied version does not match the stored one.
    VersionMismatch,
    /// The answered question is not the one the engine expects next.
    QuestionMismatch,
    /// Answer failed validation; payload is the reason code.
    Rejected(&'static str),
    /// The session has already completed (terminal state).
    AlreadyCompleted,
    /// The single undo has been spent or there is nothing to undo.
    BackUnavailable,
}

pub struct SurveyEngine {
    def: SurveyDefinition,
}

impl SurveyEngine {
    pub fn new(def: SurveyDefinition) -> Self {
        Self { def }
    }

    pub fn definition(&self) -> &SurveyDefinition {
        &self.def
    }

    /// Pick the next question: core, then follow-ups of recorded answers,
    /// then activated modules, then closing. Honors the show-if gates and
    /// the total / free-text / follow-up / module caps.
    pub fn next_question<'a>(&'a self, state: &SessionState) -> Option<&'a Question> {
        if state.status == SessionStatus::Completed {
            return None;
        }

        let limits = &self.def.limits;
        if state.answers.len() >= limits.max_total_questions {
            return None;
        }

        let ctx = EvalContext::new(&state.answers, &state.meta);
        let text_answered = self.answered_text_count(state);

        // 1. Core questions.
        for q in &self.def.core {
            if let Some(q) = self.eligible(q, state, &ctx, text_answered) {
                return Some(q);
            }
        }

        // 2. Follow-ups, walked in the order answers were recorded.
        for answered_id in &state.history {
            let Some(parent) = self.def.find_question(answered_id) else {
                continue;
            };
            let mut triggered = 0usize;
            for follow_up in &parent.follow_ups {
                if !follow_up.when.eval(&ctx) {
                    continue;
                }
                for q in &follow_up.questions {
                    if triggered >= limits.max_followups_per_answer {
                        break;
                    }
                    if state.answers.contains_key(&q.id) {
                        triggered += 1;
                        continue;
                    }
                    if let Some(q) = self.eligible(q, state, &ctx, text_answered) {
                        return Some(q);
                    }
                }
            }
        }

        // 3. Modules, capped per module and globally.
        let module_answered_total = self.answered_module_count(state);
        if module_answered_total < limits.max_module_questions {
            for module in &self.def.modules {
                if !module.activate_if.eval(&ctx) {
                    continue;
                }
                let answered_in_module = module
                    .questions
                    .iter()
                    .filter(|q| state.answers.contains_key(&q.id))
                    .count();
                let module_cap = module.max_questions.unwrap_or(usize::MAX);
                if answered_in_module >= module_cap {
                    continue;
                }
                for q in &module.questions {
                    if let Some(q) = self.eligible(q, state, &ctx, text_answered) {
                        return Some(q);
                    }
                }
            }
        }

        // 4. Closing questions.
        for q in &self.def.closing {
            if let Some(q) = self.eligible(q, state, &ctx, text_answered) {
                return Some(q);
            }
        }

        None
    }

    fn eligible<'a>(
        &self,
        q: &'a Question,
        state: &SessionState,
        ctx: &EvalContext,
        text_answered: usize,
    ) -> Option<&'a Question> {
        if state.answers.contains_key(&q.id) {
            return None;
        }
        if q.kind.is_text() && text_answered >= self.def.limits.max_text_questions {
            return None;
        }
        if let Some(cond) = &q.show_if
            && !cond.eval(ctx)
        {
            return None;
        }
        Some(q)
    }

    fn answered_text_count(&self, state: &SessionState) -> usize {
        state
            .answers
            .keys()
            .filter(|id| {
                self.def
                    .find_question(id)
                    .map(|q| q.kind.is_text())
                    .unwrap_or(false)
            })
            .count()
    }

    fn answered_module_count(&self, state: &SessionState) -> usize {
        self.def
            .modules
            .iter()
            .flat_map(|m| m.questions.iter())
            .filter(|q| state.answers.contains_key(&q.id))
            .count()
    }

    /// Apply an answer under the optimistic-lock protocol.
    pub fn submit_answer(
        &self,
        state: &mut SessionState,
        question_id: &str,
        value: Value,
        version: i32,
    ) -> Result<AnswerOutcome, EngineError> {
        if state.status == SessionStatus::Completed {
            return Err(EngineError::AlreadyCompleted);
        }
        if version != state.version {
            return Err(EngineError::VersionMismatch);
        }

        let expected = self.next_question(state).ok_or(EngineError::QuestionMismatch)?;
        if expected.id != question_id {
            return Err(EngineError::QuestionMismatch);
        }

        validate_answer(&expected.kind, &value).map_err(EngineError::Rejected)?;

        state.answers.insert(question_id.to_string(), value);
        state.history.push(question_id.to_string());
        state.version += 1;

        match self.next_question(state) {
            Some(next) => {
                state.current_question_id = Some(next.id.clone());
                Ok(AnswerOutcome::Advanced)
            }
            None => {
                state.current_question_id = None;
                if !self.completion_satisfied(state) {
                    // Caps exhausted the flow before min_answered was reached;
                    // nothing is left to ask, so the session completes anyway.
                    log::warn!(
                        "Survey {} completed with {} answers, below min_answered={}",
                        state.survey_key,
                        state.answers.len(),
                        self.def.limits.min_answered
                    );
                }
                state.status = SessionStatus::Completed;
                Ok(AnswerOutcome::Completed)
            }
        }
    }

    fn completion_satisfied(&self, state: &SessionState) -> bool {
        state.answers.len() >= self.def.limits.min_answered
    }

    /// Undo the last answer. Allowed once per session.
    pub fn go_back(&self, state: &mut SessionState, version: i32) -> Result<(), EngineError> {
        if state.status == SessionStatus::Completed {
            return Err(EngineError::AlreadyCompleted);
        }
        if version != state.version {
            return Err(EngineError::VersionMismatch);
        }
        if state.back_used || state.history.is_empty() {
            return Err(EngineError::BackUnavailable);
        }

        let Some(last) = state.history.pop() else {
            return Err(EngineError::BackUnavailable);
        };
        state.answers.remove(&last);
        state.back_used = true;
        state.version += 1;
        state.current_question_id = Some(last);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn definition() -> SurveyDefinition {
        SurveyDefinition::from_json(
            &json!({
                "key": "feedback-v1",
                "limits": {
                    "max_total_questions": 10,
                    "max_text_questions": 1,
                    "max_followups_per_answer": 1,
                    "max_module_questions": 2,
                    "min_answered": 1
                },
                "core": [
                    {
                        "id": "nps",
                        "prompt": "How likely are you to recommend us?",
                        "kind": "slider", "min": 0, "max": 10,
                        "required": true,
                        "follow_ups": [
                            {
                                "when": {"var": "answers.nps", "op": "lte", "value": 6},
                                "questions": [
                                    {
                                        "id": "nps_why",
                                        "prompt": "What went wrong?",
                                        "kind": "text", "max_len": 500
                                    },
                                    {
                                        "id": "nps_contact",
                                        "prompt": "May we contact you?",
                                        "kind": "single", "options": ["yes", "no"]
                                    }
                                ]
                            }
                        ]
                    },
                    {
                        "id": "channel",
                        "prompt": "How do you usually order?",
                        "kind": "multi", "options": ["site", "instagram", "phone"],
                        "max_select": 2
                    },
                    {
                        "id": "big_spender",
                        "prompt": "Interested in the wholesale program?",
                        "kind": "single", "options": ["yes", "no"],
                        "show_if": {"var": "answers.nps", "op": "gte", "value": 5}
                    }
                ],
                "modules": [
                    {
                        "id": "instagram",
                        "activate_if": {"var": "answers.channel", "op": "includes", "value": "instagram"},
                        "max_questions": 1,
                        "questions": [
                            {
                                "id": "ig_follow",
                                "prompt": "Do you follow our page?",
                                "kind": "single", "options": ["yes", "no"]
                            },
                            {
                                "id": "ig_stories",
                                "prompt": "Do you watch our stories?",
                                "kind": "single", "options": ["yes", "no"]
                            }
                        ]
                    }
                ],
                "closing": [
                    {
                        "id": "final_words",
                        "prompt": "Anything else?",
                        "kind": "text", "max_len": 300
                    }
                ]
            })
            .to_string(),
        )
        .unwrap()
    }

    fn engine() -> SurveyEngine {
        SurveyEngine::new(definition())
    }

    #[test]
    fn test_core_questions_come_first() {
        let engine = engine();
        let state = SessionState::new("feedback-v1");
        assert_eq!(engine.next_question(&state).unwrap().id, "nps");
    }

    #[test]
    fn test_show_if_gte_gates_question() {
        let engine = engine();
        let mut state = SessionState::new("feedback-v1");

        // nps >= 5: big_spender is shown after channel.
        engine.submit_answer(&mut state, "nps", json!(8), 0).unwrap();
        engine
            .submit_answer(&mut state, "channel", json!(["site"]), 1)
            .unwrap();
        assert_eq!(engine.next_question(&state).unwrap().id, "big_spender");

        // nps < 5: big_spender is skipped.
        let mut state = SessionState::new("feedback-v1");
        engine.submit_answer(&mut state, "nps", json!(3), 0).unwrap();
        engine
            .submit_answer(&mut state, "channel", json!(["site"]), 1)
            .unwrap();
        // Low score triggers the follow-up instead.
        assert_eq!(engine.next_question(&state).unwrap().id, "nps_why");
    }

    #[test]
    fn test_followup_cap_per_answer() {
        let engine = engine();
        let mut state = SessionState::new("feedback-v1");

        engine.submit_answer(&mut state, "nps", json!(2), 0).unwrap();
        engine
            .submit_answer(&mut state, "channel", json!(["site"]), 1)
            .unwrap();

        // max_followups_per_answer = 1: only nps_why is asked, never nps_contact.
        assert_eq!(engine.next_question(&state).unwrap().id, "nps_why");
        engine
            .submit_answer(&mut state, "nps_why", json!("slow delivery"), 2)
            .unwrap();
        let next = engine.next_question(&state);
        assert_ne!(next.map(|q| q.id.as_str()), Some("nps_contact"));
    }

    #[test]
    fn test_module_activation_and_cap() {
        let engine = engine();
        let mut state = SessionState::new("feedback-v1");

        engine.submit_answer(&mut state, "nps", json!(9), 0).unwrap();
        engine
            .submit_answer(&mut state, "channel", json!(["instagram"]), 1)
            .unwrap();
        engine
            .submit_answer(&mut state, "big_spender", json!("no"), 2)
            .unwrap();

        // Instagram module activates; its cap of 1 admits only ig_follow.
        assert_eq!(engine.next_question(&state).unwrap().id, "ig_follow");
        engine
            .submit_answer(&mut state, "ig_follow", json!("yes"), 3)
            .unwrap();
        assert_ne!(
            engine.next_question(&state).map(|q| q.id.as_str()),
            Some("ig_stories")
        );
    }

    #[test]
    fn test_module_skipped_when_not_activated() {
        let engine = engine();
        let mut state = SessionState::new("feedback-v1");

        engine.submit_answer(&mut state, "nps", json!(9), 0).unwrap();
        engine
            .submit_answer(&mut state, "channel", json!(["site"]), 1)
            .unwrap();
        engine
            .submit_answer(&mut state, "big_spender", json!("no"), 2)
            .unwrap();

        assert_eq!(engine.next_question(&state).unwrap().id, "final_words");
    }

    #[test]
    fn test_text_cap_skips_second_text_question() {
        let engine = engine();
        let mut state = SessionState::new("feedback-v1");

        // Low nps answers the text follow-up, exhausting max_text_questions = 1.
        engine.submit_answer(&mut state, "nps", json!(2), 0).unwrap();
        engine
            .submit_answer(&mut state, "channel", json!(["site"]), 1)
            .unwrap();
        engine
            .submit_answer(&mut state, "nps_why", json!("meh"), 2)
            .unwrap();

        // final_words is text and must be skipped, completing the session.
        assert_eq!(engine.next_question(&state), None);
        assert_eq!(state.status, SessionStatus::Completed);
    }

    #[test]
    fn test_stale_version_conflicts_and_leaves_state_unchanged() {
        let engine = engine();
        let mut state = SessionState::new("feedback-v1");
        engine.submit_answer(&mut state, "nps", json!(8), 0).unwrap();

        let before = state.clone();
        let err = engine
            .submit_answer(&mut state, "channel", json!(["site"]), 0)
            .unwrap_err();
        assert_eq!(err, EngineError::VersionMismatch);
        assert_eq!(state.answers, before.answers);
        assert_eq!(state.version, before.version);
    }

    #[test]
    fn test_wrong_question_conflicts() {
        let engine = engine();
        let mut state = SessionState::new("feedback-v1");
        let err = engine
            .submit_answer(&mut state, "channel", json!(["site"]), 0)
            .unwrap_err();
        assert_eq!(err, EngineError::QuestionMismatch);
    }

    #[test]
    fn test_invalid_slider_rejected_with_range() {
        let engine = engine();
        let mut state = SessionState::new("feedback-v1");
        let err = engine
            .submit_answer(&mut state, "nps", json!(11), 0)
            .unwrap_err();
        assert_eq!(err, EngineError::Rejected("range"));
        assert!(state.answers.is_empty());
    }

    #[test]
    fn test_back_allowed_once() {
        let engine = engine();
        let mut state = SessionState::new("feedback-v1");
        engine.submit_answer(&mut state, "nps", json!(8), 0).unwrap();

        engine.go_back(&mut state, 1).unwrap();
        assert!(state.back_used);
        assert!(!state.answers.contains_key("nps"));
        assert_eq!(engine.next_question(&state).unwrap().id, "nps");

        engine.submit_answer(&mut state, "nps", json!(9), 2).unwrap();
        let err = engine.go_back(&mut state, 3).unwrap_err();
        assert_eq!(err, EngineError::BackUnavailable);
    }

    #[test]
    fn test_back_with_stale_version_conflicts() {
        let engine = engine();
        let mut state = SessionState::new("feedback-v1");
        engine.submit_answer(&mut state, "nps", json!(8), 0).unwrap();
        assert_eq!(engine.go_back(&mut state, 0), Err(EngineError::VersionMismatch));
    }

    #[test]
    fn test_completed_session_is_terminal() {
        let engine = engine();
        let mut state = SessionState::new("feedback-v1");
        engine.submit_answer(&mut state, "nps", json!(9), 0).unwrap();
        engine
            .submit_answer(&mut state, "channel", json!(["site"]), 1)
            .unwrap();
        engine
            .submit_answer(&mut state, "big_spender", json!("no"), 2)
            .unwrap();
        let outcome = engine
            .submit_answer(&mut state, "final_words", json!("nope"), 3)
            .unwrap();
        assert_eq!(outcome, AnswerOutcome::Completed);
        assert_eq!(state.status, SessionStatus::Completed);

        let err = engine
            .submit_answer(&mut state, "final_words", json!("again"), 4)
            .unwrap_err();
        assert_eq!(err, EngineError::AlreadyCompleted);
        assert_eq!(engine.go_back(&mut state, 4), Err(EngineError::AlreadyCompleted));
    }

    #[test]
    fn test_total_cap_stops_flow() {
        let mut def = definition();
        def.limits.max_total_questions = 2;
        let engine = SurveyEngine::new(def);
        let mut state = SessionState::new("feedback-v1");

        engine.submit_answer(&mut state, "nps", json!(9), 0).unwrap();
        let outcome = engine
            .submit_answer(&mut state, "channel", json!(["site"]), 1)
            .unwrap();
        assert_eq!(outcome, AnswerOutcome::Completed);
    }
}
