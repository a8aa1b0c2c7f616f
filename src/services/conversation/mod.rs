//! Per-user conversation flows: registration, test upload, answer
//! submission, broadcast, export and the destructive clear.
//!
//! Each inbound event is resolved against the user's stored [`Session`].
//! Without a session the event is treated as a main-menu action. Storage is
//! reached only through [`QuizRepository`] and replies only through
//! [`Messenger`], so the engine holds no transport or database state.

pub(crate) mod error;
pub(crate) mod outbound;
pub(crate) mod session;
pub(crate) mod texts;


use std::sync::Arc;

use crate::core::config::QuizSettings;
use crate::db::models::{Attachment, QuizTest};
use crate::repositories::{CreateResult, CreateTest, QuizRepository};
use crate::services::answers::{parse_answer_key, parse_answers};
use crate::services::export;
use crate::services::grading;
use crate::services::role_policy::RolePolicy;

pub(crate) use error::FlowError;
pub(crate) use outbound::{
    ButtonAction, Inbound, Incoming, InlineButton, Keyboard, Messenger, Outbound, OutboundBody,
    Role,
};
pub(crate) use session::{Session, SessionStore};

#[derive(Clone)]
pub(crate) struct ConversationEngine {
    repo: Arc<dyn QuizRepository>,
    sessions: Arc<dyn SessionStore>,
    messenger: Arc<dyn Messenger>,
    roles: RolePolicy,
    limits: QuizSettings,
}

impl ConversationEngine {
    pub(crate) fn new(
        repo: Arc<dyn QuizRepository>,
        sessions: Arc<dyn SessionStore>,
        messenger: Arc<dyn Messenger>,
        roles: RolePolicy,
        limits: QuizSettings,
    ) -> Self {
        Self { repo, sessions, messenger, roles, limits }
    }

    /// Runs one inbound event to completion. Failures are turned into
    /// replies here and never escape to the transport loop.
    pub(crate) async fn handle(&self, incoming: Incoming) {
        let user_id = incoming.user_id;
        if let Err(error) = self.dispatch(incoming).await {
            self.report(user_id, error).await;
        }
    }

    async fn dispatch(&self, incoming: Incoming) -> Result<(), FlowError> {
        let user_id = incoming.user_id;
        match incoming.payload {
            Inbound::Text(text) if is_start_command(&text) => self.start(user_id).await,
            Inbound::Button(action) => self.on_button(user_id, action).await,
            payload => match self.sessions.get(user_id).await? {
                Some(session) => self.continue_flow(user_id, session, payload).await,
                None => self.on_idle(user_id, payload).await,
            },
        }
    }

    async fn report(&self, user_id: i64, error: FlowError) {
        let reply = match &error {
            FlowError::Unauthorized => {
                metrics::counter!("quiz_authorization_denied_total").increment(1);
                tracing::warn!(user_id, "Teacher action denied");
                texts::NOT_A_TEACHER
            }
            FlowError::TestNotFound(test_id) => {
                tracing::info!(user_id, test_id, "Selected test no longer exists");
                if let Err(clear_error) = self.sessions.clear(user_id).await {
                    tracing::error!(error = %clear_error, user_id, "Failed to clear session");
                }
                texts::TEST_NOT_FOUND
            }
            FlowError::NotRegistered => texts::REGISTER_FIRST,
            FlowError::Storage(_) | FlowError::Session(_) => {
                tracing::error!(error = %error, kind = error.kind(), user_id, "Flow failed");
                texts::GENERIC_FAILURE
            }
        };

        self.reply(user_id, reply).await;
    }

    async fn start(&self, user_id: i64) -> Result<(), FlowError> {
        self.sessions.clear(user_id).await?;

        if self.roles.is_teacher(user_id) {
            self.reply(user_id, texts::WELCOME).await;
            return Ok(());
        }

        if let Some(student) = self.repo.get_student(user_id).await? {
            self.reply(user_id, format!("{}\n{}", texts::WELCOME, texts::profile(&student.name)))
                .await;
            return Ok(());
        }

        self.sessions.put(user_id, Session::AwaitingName).await?;
        self.send(Outbound::text(user_id, format!("{}\n{}", texts::WELCOME, texts::ASK_NAME)))
            .await;
        Ok(())
    }

    async fn on_idle(&self, user_id: i64, payload: Inbound) -> Result<(), FlowError> {
        let Inbound::Text(text) = payload else {
            self.reply(user_id, texts::USE_MENU).await;
            return Ok(());
        };

        match text.trim() {
            texts::MENU_PROFILE => self.show_profile(user_id).await,
            texts::MENU_GET_TEST => self.send_latest_test(user_id).await,
            texts::MENU_MY_RESULTS => self.show_results(user_id).await,
            texts::MENU_UPLOAD_TEST => self.begin_upload(user_id).await,
            texts::MENU_SEND_TEST => self.offer_broadcast(user_id).await,
            texts::MENU_EXPORT => self.export_results(user_id).await,
            texts::MENU_CLEAN => self.ask_clean_confirmation(user_id).await,
            _ => {
                self.reply(user_id, texts::USE_MENU).await;
                Ok(())
            }
        }
    }

    async fn continue_flow(
        &self,
        user_id: i64,
        session: Session,
        payload: Inbound,
    ) -> Result<(), FlowError> {
        if session.is_teacher_flow() {
            self.require_teacher(user_id)?;
        }

        match (session, payload) {
            (Session::AwaitingName, Inbound::Text(text)) => self.register(user_id, &text).await,
            (Session::AwaitingTitle, Inbound::Text(text)) => {
                self.receive_title(user_id, &text).await
            }
            (Session::AwaitingFile { title }, Inbound::Attachment(attachment)) => {
                self.sessions.put(user_id, Session::AwaitingAnswerKey { title, attachment }).await?;
                self.send(Outbound::text(user_id, texts::ask_answer_key())).await;
                Ok(())
            }
            (Session::AwaitingAnswerKey { title, attachment }, Inbound::Text(text)) => {
                self.receive_answer_key(user_id, &title, attachment, &text).await
            }
            (Session::AwaitingAnswers { test_id }, Inbound::Text(text)) => {
                self.submit_answers(user_id, test_id, &text).await
            }
            (session, _) => {
                self.reprompt(user_id, &session).await;
                Ok(())
            }
        }
    }

    async fn reprompt(&self, user_id: i64, session: &Session) {
        tracing::debug!(user_id, state = session.state_name(), "Unexpected input, re-prompting");
        let message = match session {
            Session::AwaitingName => Outbound::text(user_id, texts::ASK_NAME),
            Session::AwaitingTitle => Outbound::text(user_id, texts::ASK_TITLE),
            Session::AwaitingFile { .. } => Outbound::text(user_id, texts::FILE_REQUIRED),
            Session::AwaitingAnswerKey { .. } => Outbound::text(user_id, texts::ask_answer_key()),
            Session::AwaitingAnswers { .. } => Outbound::text(user_id, texts::ask_answers()),
            Session::AwaitingConfirmation => clean_confirmation(user_id),
        };
        self.send(message).await;
    }

    async fn register(&self, user_id: i64, raw_name: &str) -> Result<(), FlowError> {
        let name = raw_name.trim();
        if name.is_empty() {
            self.send(Outbound::text(user_id, texts::ASK_NAME)).await;
            return Ok(());
        }

        let student = self.repo.insert_or_replace_student(user_id, name).await?;
        self.sessions.clear(user_id).await?;

        tracing::info!(user_id, name = %student.name, "Student registered");
        self.reply(user_id, texts::REGISTERED).await;
        Ok(())
    }

    async fn receive_title(&self, user_id: i64, raw_title: &str) -> Result<(), FlowError> {
        let title = raw_title.trim();
        if title.is_empty() {
            self.send(Outbound::text(user_id, texts::ASK_TITLE)).await;
            return Ok(());
        }

        self.sessions.put(user_id, Session::AwaitingFile { title: title.to_string() }).await?;
        self.send(Outbound::text(user_id, texts::ASK_FILE)).await;
        Ok(())
    }

    async fn receive_answer_key(
        &self,
        user_id: i64,
        title: &str,
        attachment: Attachment,
        raw_key: &str,
    ) -> Result<(), FlowError> {
        let Ok(answer_key) = parse_answer_key(raw_key) else {
            metrics::counter!("quiz_answer_parse_failures_total", "flow" => "answer_key")
                .increment(1);
            self.send(Outbound::text(user_id, texts::invalid_format())).await;
            return Ok(());
        };

        let test = self
            .repo
            .insert_test(CreateTest {
                title,
                file_id: &attachment.file_id,
                file_type: attachment.kind,
                answer_key: &answer_key,
                created_by: user_id,
            })
            .await?;
        self.sessions.clear(user_id).await?;

        metrics::counter!("quiz_tests_created_total").increment(1);
        tracing::info!(
            user_id,
            test_id = test.id,
            questions = answer_key.len(),
            kind = attachment.kind.as_str(),
            "Test created"
        );
        self.reply(user_id, texts::test_saved(test.id, answer_key.len())).await;
        Ok(())
    }

    async fn submit_answers(&self, user_id: i64, test_id: i64, raw: &str) -> Result<(), FlowError> {
        let Ok(submission) = parse_answers(raw) else {
            metrics::counter!("quiz_answer_parse_failures_total", "flow" => "answers")
                .increment(1);
            self.send(Outbound::text(user_id, texts::invalid_format())).await;
            return Ok(());
        };

        let Some(test) = self.repo.get_test(test_id).await? else {
            return Err(FlowError::TestNotFound(test_id));
        };

        let score = grading::grade(test.answer_key(), &submission);
        // Leave the answering state before the write: once a result row
        // exists, no copy of this text can reach an open flow again.
        self.sessions.clear(user_id).await?;
        let inserted = self
            .repo
            .insert_result(CreateResult {
                test_id,
                student_tg_id: user_id,
                raw_answers: &submission,
                score,
            })
            .await;
        let result = match inserted {
            Ok(result) => result,
            Err(error) => {
                self.restore_session(user_id, Session::AwaitingAnswers { test_id }).await;
                return Err(error.into());
            }
        };

        metrics::counter!("quiz_results_total", "grade" => score.grade.as_metric_label())
            .increment(1);
        tracing::info!(
            user_id,
            test_id,
            result_id = result.id,
            correct = score.correct,
            wrong = score.wrong,
            percent = score.percent,
            "Submission graded"
        );
        self.reply(user_id, texts::submission_accepted(&score)).await;
        Ok(())
    }

    async fn show_profile(&self, user_id: i64) -> Result<(), FlowError> {
        let Some(student) = self.repo.get_student(user_id).await? else {
            return Err(FlowError::NotRegistered);
        };
        self.reply(user_id, texts::profile(&student.name)).await;
        Ok(())
    }

    async fn send_latest_test(&self, user_id: i64) -> Result<(), FlowError> {
        let Some(test) = self.repo.get_latest_test().await? else {
            self.reply(user_id, texts::NO_TESTS).await;
            return Ok(());
        };
        self.send(test_delivery(user_id, &test)).await;
        Ok(())
    }

    async fn show_results(&self, user_id: i64) -> Result<(), FlowError> {
        if self.repo.get_student(user_id).await?.is_none() {
            return Err(FlowError::NotRegistered);
        }

        let results =
            self.repo.list_results_for_student(user_id, self.limits.recent_results_limit).await?;
        if results.is_empty() {
            self.reply(user_id, texts::NO_RESULTS).await;
        } else {
            self.reply(user_id, texts::recent_results(&results)).await;
        }
        Ok(())
    }

    async fn begin_upload(&self, user_id: i64) -> Result<(), FlowError> {
        self.require_teacher(user_id)?;
        self.sessions.put(user_id, Session::AwaitingTitle).await?;
        self.send(Outbound::text(user_id, texts::ASK_TITLE)).await;
        Ok(())
    }

    async fn offer_broadcast(&self, user_id: i64) -> Result<(), FlowError> {
        self.require_teacher(user_id)?;

        let tests = self.repo.list_recent_tests(self.limits.broadcast_pick_limit).await?;
        if tests.is_empty() {
            self.reply(user_id, texts::NO_TESTS).await;
            return Ok(());
        }

        let rows = tests
            .iter()
            .map(|test| {
                vec![InlineButton {
                    text: texts::test_button(test.id, &test.title),
                    action: ButtonAction::Broadcast(test.id),
                }]
            })
            .collect();
        self.send(
            Outbound::text(user_id, texts::PICK_TEST_TO_SEND).with_keyboard(Keyboard::Inline(rows)),
        )
        .await;
        Ok(())
    }

    async fn export_results(&self, user_id: i64) -> Result<(), FlowError> {
        self.require_teacher(user_id)?;

        let rows = self.repo.list_all_results_joined_with_students().await?;
        if rows.is_empty() {
            self.reply(user_id, texts::NO_RESULTS_TO_EXPORT).await;
            return Ok(());
        }

        let csv = export::render_csv(&rows).into_bytes();
        tracing::info!(user_id, rows = rows.len(), bytes = csv.len(), "Exporting results");
        let upload =
            Outbound::upload(user_id, texts::EXPORT_FILENAME, csv, texts::EXPORT_CAPTION);
        self.send(upload.with_keyboard(Keyboard::MainMenu(Role::Teacher))).await;
        Ok(())
    }

    async fn ask_clean_confirmation(&self, user_id: i64) -> Result<(), FlowError> {
        self.require_teacher(user_id)?;
        self.sessions.put(user_id, Session::AwaitingConfirmation).await?;
        self.send(clean_confirmation(user_id)).await;
        Ok(())
    }

    async fn on_button(&self, user_id: i64, action: ButtonAction) -> Result<(), FlowError> {
        match action {
            ButtonAction::Answer(test_id) => self.begin_answers(user_id, test_id).await,
            ButtonAction::Broadcast(test_id) => self.broadcast(user_id, test_id).await,
            ButtonAction::ConfirmClean => self.confirm_clean(user_id).await,
            ButtonAction::CancelClean => self.cancel_clean(user_id).await,
        }
    }

    async fn begin_answers(&self, user_id: i64, test_id: i64) -> Result<(), FlowError> {
        if self.repo.get_student(user_id).await?.is_none() {
            return Err(FlowError::NotRegistered);
        }
        if self.repo.get_test(test_id).await?.is_none() {
            return Err(FlowError::TestNotFound(test_id));
        }

        self.sessions.put(user_id, Session::AwaitingAnswers { test_id }).await?;
        self.send(Outbound::text(user_id, texts::ask_answers())).await;
        Ok(())
    }

    async fn broadcast(&self, user_id: i64, test_id: i64) -> Result<(), FlowError> {
        self.require_teacher(user_id)?;

        let Some(test) = self.repo.get_test(test_id).await? else {
            self.reply(user_id, texts::TEST_NOT_FOUND).await;
            return Ok(());
        };

        let students = self.repo.list_students().await?;
        if students.is_empty() {
            self.reply(user_id, texts::NO_STUDENTS).await;
            return Ok(());
        }

        let mut delivered = 0usize;
        let mut failed = 0usize;
        for student in &students {
            match self.messenger.deliver(&test_delivery(student.tg_id, &test)).await {
                Ok(()) => {
                    delivered += 1;
                    metrics::counter!("quiz_broadcast_deliveries_total", "status" => "delivered")
                        .increment(1);
                }
                Err(error) => {
                    failed += 1;
                    metrics::counter!("quiz_broadcast_deliveries_total", "status" => "failed")
                        .increment(1);
                    tracing::warn!(
                        error = %error,
                        test_id,
                        recipient = student.tg_id,
                        "Failed to deliver broadcast test"
                    );
                }
            }
        }

        tracing::info!(user_id, test_id, delivered, failed, "Test broadcast finished");
        self.reply(user_id, texts::broadcast_summary(delivered, failed)).await;
        Ok(())
    }

    async fn confirm_clean(&self, user_id: i64) -> Result<(), FlowError> {
        self.require_teacher(user_id)?;

        if self.sessions.get(user_id).await? != Some(Session::AwaitingConfirmation) {
            self.reply(user_id, texts::CLEAN_STALE).await;
            return Ok(());
        }

        let outcome = self.repo.delete_all_tests_and_results().await;
        self.sessions.clear(user_id).await?;

        match outcome {
            Ok((tests, results)) => {
                tracing::warn!(user_id, tests, results, "Tests and results cleared");
                self.reply(user_id, texts::cleaned(tests, results)).await;
            }
            Err(error) => {
                tracing::error!(error = %error, user_id, "Failed to clear tests and results");
                self.reply(user_id, texts::clean_failed(&error.to_string())).await;
            }
        }
        Ok(())
    }

    async fn cancel_clean(&self, user_id: i64) -> Result<(), FlowError> {
        self.require_teacher(user_id)?;

        if self.sessions.get(user_id).await? != Some(Session::AwaitingConfirmation) {
            self.reply(user_id, texts::CLEAN_STALE).await;
            return Ok(());
        }

        self.sessions.clear(user_id).await?;
        self.reply(user_id, texts::CLEAN_CANCELLED).await;
        Ok(())
    }

    fn require_teacher(&self, user_id: i64) -> Result<(), FlowError> {
        if self.roles.is_teacher(user_id) {
            Ok(())
        } else {
            Err(FlowError::Unauthorized)
        }
    }

    fn role_of(&self, user_id: i64) -> Role {
        if self.roles.is_teacher(user_id) {
            Role::Teacher
        } else {
            Role::Student
        }
    }

    /// Text reply carrying the user's main menu.
    async fn reply(&self, user_id: i64, text: impl Into<String>) {
        let keyboard = Keyboard::MainMenu(self.role_of(user_id));
        self.send(Outbound::text(user_id, text).with_keyboard(keyboard)).await;
    }

    async fn send(&self, message: Outbound) {
        if let Err(error) = self.messenger.deliver(&message).await {
            tracing::error!(error = %error, chat_id = message.chat_id, "Failed to deliver reply");
        }
    }

    /// Puts a session back after a failed write so the user can retry.
    async fn restore_session(&self, user_id: i64, session: Session) {
        let state = session.state_name();
        if let Err(error) = self.sessions.put(user_id, session).await {
            tracing::error!(error = %error, user_id, state, "Failed to restore session");
        }
    }
}

fn is_start_command(text: &str) -> bool {
    let command = text.trim();
    command == "/start" || command.starts_with("/start ") || command.starts_with("/start@")
}

fn test_delivery(chat_id: i64, test: &QuizTest) -> Outbound {
    let button = InlineButton {
        text: texts::BUTTON_ANSWER.to_string(),
        action: ButtonAction::Answer(test.id),
    };
    Outbound::attachment(chat_id, test.attachment(), texts::test_caption(&test.title))
        .with_keyboard(Keyboard::Inline(vec![vec![button]]))
}

fn clean_confirmation(chat_id: i64) -> Outbound {
    let buttons = vec![
        InlineButton {
            text: texts::BUTTON_CONFIRM_CLEAN.to_string(),
            action: ButtonAction::ConfirmClean,
        },
        InlineButton {
            text: texts::BUTTON_CANCEL_CLEAN.to_string(),
            action: ButtonAction::CancelClean,
        },
    ];
    Outbound::text(chat_id, texts::CONFIRM_CLEAN).with_keyboard(Keyboard::Inline(vec![buttons]))
}
