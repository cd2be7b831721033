use crate::error::{AppError, AppResult};
use crate::external::TelegramService;
use crate::models::{QuestionPayload, SubmitAnswerRequest, SurveySessionRow, SurveyStateResponse};
use crate::services::PromoService;
use crate::survey::{AnswerOutcome, EngineError, SessionState, SessionStatus, SurveyEngine};
use serde_json::{Map, Value};
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;

#[derive(Clone)]
pub struct SurveyService {
    pool: PgPool,
    engine: Arc<SurveyEngine>,
    promo_service: PromoService,
    telegram: TelegramService,
}

impl SurveyService {
    pub fn new(
        pool: PgPool,
        engine: Arc<SurveyEngine>,
        promo_service: PromoService,
        telegram: TelegramService,
    ) -> Self {
        Self {
            pool,
            engine,
            promo_service,
            telegram,
        }
    }

    fn survey_key(&self) -> &str {
        &self.engine.definition().key
    }

    /// Return the user's open session for the active survey, creating one if
    /// none exists. A previously completed session comes back as-is so the
    /// client can show the awarded code instead of restarting the survey.
    pub async fn get_or_create_session(&self, user_id: i64) -> AppResult<SurveyStateResponse> {
        let key = self.survey_key();

        if let Some(row) = self.find_session(user_id, key).await? {
            return self.state_response(&row).await;
        }

        // The partial unique index on (user_id, survey_key) for in_progress
        // rows resolves a concurrent create; the loser re-reads.
        let inserted = sqlx::query_as::<_, SurveySessionRow>(
            r#"
            INSERT INTO survey_sessions (user_id, survey_key, current_question_id)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            RETURNING id, user_id, survey_key, status, current_question_id,
                      answers, history, version, back_used,
                      awarded_promo_code_id, report_sent, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(key)
        .bind(self.first_question_id())
        .fetch_optional(&self.pool)
        .await?;

        let row = match inserted {
            Some(row) => row,
            None => self
                .find_session(user_id, key)
                .await?
                .ok_or_else(|| AppError::InternalError("Session vanished after insert".to_string()))?,
        };

        self.state_response(&row).await
    }

    pub async fn submit_answer(
        &self,
        user_id: i64,
        request: SubmitAnswerRequest,
    ) -> AppResult<SurveyStateResponse> {
        let key = self.survey_key().to_string();
        let mut tx = self.pool.begin().await?;

        let row = self
            .lock_session(&mut tx, user_id, &key)
            .await?
            .ok_or_else(|| AppError::NotFound("No survey session".to_string()))?;

        let mut state = row_to_state(&row)?;
        let outcome = self.engine.submit_answer(
            &mut state,
            &request.question_id,
            request.value,
            request.version,
        );

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                tx.rollback().await?;
                return Err(self.map_engine_error(e, &row).await?);
            }
        };

        let awarded_id = if outcome == AnswerOutcome::Completed {
            let promo = self
                .promo_service
                .award_survey_promo(&mut tx, user_id, &key)
                .await?;
            Some(promo.id)
        } else {
            row.awarded_promo_code_id
        };

        self.persist_state(&mut tx, row.id, &state, awarded_id).await?;
        tx.commit().await?;

        let row = self
            .find_session(user_id, &key)
            .await?
            .ok_or_else(|| AppError::InternalError("Session vanished after update".to_string()))?;

        if outcome == AnswerOutcome::Completed {
            self.dispatch_report(row.clone());
        }

        self.state_response(&row).await
    }

    pub async fn go_back(&self, user_id: i64, version: i32) -> AppResult<SurveyStateResponse> {
        let key = self.survey_key().to_string();
        let mut tx = self.pool.begin().await?;

        let row = self
            .lock_session(&mut tx, user_id, &key)
            .await?
            .ok_or_else(|| AppError::NotFound("No survey session".to_string()))?;

        let mut state = row_to_state(&row)?;
        if let Err(e) = self.engine.go_back(&mut state, version) {
            tx.rollback().await?;
            return Err(self.map_engine_error(e, &row).await?);
        }

        self.persist_state(&mut tx, row.id, &state, row.awarded_promo_code_id)
            .await?;
        tx.commit().await?;

        let row = self
            .find_session(user_id, &key)
            .await?
            .ok_or_else(|| AppError::InternalError("Session vanished after update".to_string()))?;
        self.state_response(&row).await
    }

    /// Conflicting requests get a 409 carrying the current state so the
    /// client can resynchronize without an extra round trip. Validation
    /// failures carry the rejection reason instead.
    async fn map_engine_error(&self, e: EngineError, row: &SurveySessionRow) -> AppResult<AppError> {
        Ok(match e {
            EngineError::Rejected(reason) => AppError::AnswerRejected(reason.to_string()),
            EngineError::BackUnavailable => {
                AppError::ValidationError("Back is no longer available".to_string())
            }
            EngineError::VersionMismatch
            | EngineError::QuestionMismatch
            | EngineError::AlreadyCompleted => {
                let state = self.state_response(row).await?;
                AppError::VersionConflict(serde_json::to_value(state)?)
            }
        })
    }

    async fn state_response(&self, row: &SurveySessionRow) -> AppResult<SurveyStateResponse> {
        let state = row_to_state(row)?;
        let question = if state.status == SessionStatus::InProgress {
            self.engine.next_question(&state).map(QuestionPayload::from)
        } else {
            None
        };

        let awarded_code = if state.status == SessionStatus::Completed {
            self.promo_service
                .get_awarded_code(row.user_id, &row.survey_key)
                .await?
        } else {
            None
        };

        Ok(SurveyStateResponse {
            survey_key: row.survey_key.clone(),
            status: row.status.clone(),
            version: row.version,
            back_used: row.back_used,
            answered_count: state.answers.len(),
            question,
            awarded_code,
        })
    }

    fn first_question_id(&self) -> Option<String> {
        let state = SessionState::new(self.survey_key());
        self.engine.next_question(&state).map(|q| q.id.clone())
    }

    async fn find_session(
        &self,
        user_id: i64,
        survey_key: &str,
    ) -> AppResult<Option<SurveySessionRow>> {
        let row = sqlx::query_as::<_, SurveySessionRow>(
            r#"
            SELECT id, user_id, survey_key, status, current_question_id,
                   answers, history, version, back_used,
                   awarded_promo_code_id, report_sent, created_at, updated_at
            FROM survey_sessions
            WHERE user_id = $1 AND survey_key = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(survey_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn lock_session(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: i64,
        survey_key: &str,
    ) -> AppResult<Option<SurveySessionRow>> {
        let row = sqlx::query_as::<_, SurveySessionRow>(
            r#"
            SELECT id, user_id, survey_key, status, current_question_id,
                   answers, history, version, back_used,
                   awarded_promo_code_id, report_sent, created_at, updated_at
            FROM survey_sessions
            WHERE user_id = $1 AND survey_key = $2
            ORDER BY created_at DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(survey_key)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row)
    }

    async fn persist_state(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        session_id: i64,
        state: &SessionState,
        awarded_promo_code_id: Option<i64>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE survey_sessions
            SET status = $1, current_question_id = $2, answers = $3, history = $4,
                version = $5, back_used = $6, awarded_promo_code_id = $7,
                updated_at = now()
            WHERE id = $8
            "#,
        )
        .bind(state.status.as_str())
        .bind(&state.current_question_id)
        .bind(Value::Object(state.answers.clone()))
        .bind(Value::Array(
            state.history.iter().cloned().map(Value::String).collect(),
        ))
        .bind(state.version)
        .bind(state.back_used)
        .bind(awarded_promo_code_id)
        .bind(session_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Send the completion report off the request path. The report_sent flag
    /// stays false until delivery succeeds; the background sweep retries the
    /// rest.
    fn dispatch_report(&self, row: SurveySessionRow) {
        let service = self.clone();
        tokio::spawn(async move {
            if let Err(e) = service.send_report(&row).await {
                log::error!("Survey report for session {} failed: {e:?}", row.id);
            }
        });
    }

    async fn send_report(&self, row: &SurveySessionRow) -> AppResult<()> {
        let text = self.render_report(row);
        self.telegram.send_message(&text).await?;

        sqlx::query("UPDATE survey_sessions SET report_sent = TRUE, updated_at = now() WHERE id = $1")
            .bind(row.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn render_report(&self, row: &SurveySessionRow) -> String {
        let mut lines = vec![format!(
            "Survey {} completed by user {}",
            row.survey_key, row.user_id
        )];
        if let Value::Object(answers) = &row.answers {
            let history: Vec<String> = match &row.history {
                Value::Array(ids) => ids
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
                _ => answers.keys().cloned().collect(),
            };
            for id in history {
                if let Some(value) = answers.get(&id) {
                    let prompt = self
                        .engine
                        .definition()
                        .find_question(&id)
                        .map(|q| q.prompt.as_str())
                        .unwrap_or(id.as_str());
                    lines.push(format!("{prompt}: {value}"));
                }
            }
        }
        lines.join("\n")
    }

    /// Retry reports for completed sessions whose dispatch failed or whose
    /// process died before delivery.
    pub async fn send_pending_reports(&self) -> AppResult<usize> {
        let rows = sqlx::query_as::<_, SurveySessionRow>(
            r#"
            SELECT id, user_id, survey_key, status, current_question_id,
                   answers, history, version, back_used,
                   awarded_promo_code_id, report_sent, created_at, updated_at
            FROM survey_sessions
            WHERE status = 'completed' AND report_sent = FALSE
            ORDER BY updated_at
            LIMIT 20
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut sent = 0;
        for row in rows {
            match self.send_report(&row).await {
                Ok(()) => sent += 1,
                Err(e) => log::warn!("Report retry for session {} failed: {e:?}", row.id),
            }
        }
        Ok(sent)
    }
}

fn row_to_state(row: &SurveySessionRow) -> AppResult<SessionState> {
    let answers = match &row.answers {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    let history = match &row.history {
        Value::Array(ids) => ids
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };

    Ok(SessionState {
        survey_key: row.survey_key.clone(),
        status: SessionStatus::parse(&row.status),
        answers,
        history,
        current_question_id: row.current_question_id.clone(),
        version: row.version,
        back_used: row.back_used,
        meta: Map::new(),
    })
}
