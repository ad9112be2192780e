//! Application state container.
//!
//! Holds what the front end needs between interactions: the signed-in user,
//! year/track selections, cached bank/results/students, the running session
//! and its timer, the pending-sync queue, and user-facing notices. Every
//! store-facing operation catches its failure, records a notice, and leaves
//! the state navigable.

use std::path::PathBuf;

use chrono::Utc;
use rand::Rng;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::bulk::{normalize_question, parse_bulk_import, validate_question};
use crate::catalog;
use crate::error::CbtError;
use crate::model::{
    Classification, ExamResult, ExamType, NewQuestion, Question, Role, Section, Student, Track,
};
use crate::pending::{PendingQueue, SyncReport};
use crate::scorer::{grade_session, outcome_message};
use crate::selector::select_questions;
use crate::session::ExamSession;
use crate::statistics::{filter_results, summarize, ResultFilter, ResultSummary};
use crate::timer::Timer;
use crate::traits::ResultStore;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A short message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Which screen the front end should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Home,
    SubjectSelect,
    Exam,
    Result,
    Admin,
}

/// Where a submitted result ended up.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedResult {
    /// Saved by the store.
    Persisted(ExamResult),
    /// Save failed; kept locally until [`App::sync_pending`] succeeds.
    PendingSync { local_id: Uuid, result: ExamResult },
    /// Practice results are never saved.
    Practice(ExamResult),
}

impl RecordedResult {
    pub fn result(&self) -> &ExamResult {
        match self {
            RecordedResult::Persisted(r)
            | RecordedResult::PendingSync { result: r, .. }
            | RecordedResult::Practice(r) => r,
        }
    }
}

/// What started a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    /// The learner asked to submit; unanswered questions need confirmation.
    Manual,
    /// The timer ran out; submit whatever is recorded.
    TimeExpired,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Manual submit with unanswered questions; call again with confirmation.
    NeedsConfirmation { answered: usize, total: usize },
    Submitted(RecordedResult),
}

/// Identifies one session-start request so a late response can be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken(u64);

const ADMIN_ID: &str = "admin";
const ADMIN_NAME: &str = "Administrator";

/// The front end's state.
pub struct App {
    view: View,
    user: Option<Student>,
    section: Option<Section>,
    year: Option<u8>,
    track: Option<Track>,
    connected: bool,
    bank: Vec<Question>,
    results: Vec<ExamResult>,
    students: Vec<Student>,
    session: Option<ExamSession>,
    last_result: Option<RecordedResult>,
    expiry: Option<oneshot::Receiver<Uuid>>,
    timer: Timer,
    pending: PendingQueue,
    pending_path: Option<PathBuf>,
    notices: Vec<Notice>,
    epoch: u64,
    admin_secret: Option<String>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            view: View::Home,
            user: None,
            section: None,
            year: None,
            track: None,
            connected: false,
            bank: Vec::new(),
            results: Vec::new(),
            students: Vec::new(),
            session: None,
            last_result: None,
            expiry: None,
            timer: Timer::new(),
            pending: PendingQueue::new(),
            pending_path: None,
            notices: Vec::new(),
            epoch: 0,
            admin_secret: None,
        }
    }

    /// Set the shared secret accepted by [`App::login_admin`].
    pub fn with_admin_secret(mut self, secret: Option<String>) -> Self {
        self.admin_secret = secret;
        self
    }

    /// Back the pending-sync queue with a JSON file, loading what it holds.
    pub fn with_pending_file(mut self, path: PathBuf) -> anyhow::Result<Self> {
        self.pending = PendingQueue::load_json(&path)?;
        self.pending_path = Some(path);
        Ok(self)
    }

    // -- accessors ----------------------------------------------------------

    pub fn view(&self) -> View {
        self.view
    }

    pub fn user(&self) -> Option<&Student> {
        self.user.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn bank(&self) -> &[Question] {
        &self.bank
    }

    pub fn results(&self) -> &[ExamResult] {
        &self.results
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn session(&self) -> Option<&ExamSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut ExamSession> {
        self.session.as_mut()
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub fn last_result(&self) -> Option<&RecordedResult> {
        self.last_result.as_ref()
    }

    pub fn pending(&self) -> &PendingQueue {
        &self.pending
    }

    /// Take the receiver that fires when the running session's time is up.
    pub fn take_expiry(&mut self) -> Option<oneshot::Receiver<Uuid>> {
        self.expiry.take()
    }

    /// Remove and return the queued notices.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(?level, %message, "notice");
        self.notices.push(Notice { level, message });
    }

    /// Record a failure notice and hand the error back.
    fn fail(&mut self, store_message: &str, err: CbtError) -> CbtError {
        let message = match &err {
            CbtError::Store(e) => {
                tracing::warn!("{store_message}: {e}");
                store_message.to_string()
            }
            other => other.notice(),
        };
        let level = match &err {
            CbtError::NoQuestionsAvailable { .. } => NoticeLevel::Warning,
            _ => NoticeLevel::Error,
        };
        self.notify(level, message);
        err
    }

    // -- connection ---------------------------------------------------------

    /// Probe the store and remember whether it is reachable.
    pub async fn check_health(&mut self, store: &dyn ResultStore) -> bool {
        self.connected = match store.health().await {
            Ok(status) => status.connected,
            Err(e) => {
                tracing::warn!("health check failed: {e}");
                false
            }
        };
        self.connected
    }

    /// Refresh the bank, results, and students caches together. On failure
    /// the existing caches stay in place.
    pub async fn load_all(&mut self, store: &dyn ResultStore) -> Result<(), CbtError> {
        let loaded = futures::try_join!(
            store.fetch_questions(),
            store.fetch_results(),
            store.fetch_students()
        );
        match loaded {
            Ok((bank, results, students)) => {
                tracing::info!(
                    questions = bank.len(),
                    results = results.len(),
                    students = students.len(),
                    "loaded store data"
                );
                self.bank = bank;
                self.results = results;
                self.students = students;
                self.connected = true;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("initial load failed: {e}");
                if e.is_connectivity() {
                    self.connected = false;
                }
                self.notify(
                    NoticeLevel::Warning,
                    "Error connecting to database. Using offline mode.",
                );
                Err(e.into())
            }
        }
    }

    // -- login and selection ------------------------------------------------

    pub fn choose_section(&mut self, section: Section) {
        self.section = Some(section);
        self.year = None;
        self.track = None;
    }

    pub fn choose_year(&mut self, year: u8) {
        self.year = Some(year);
        if !catalog::is_senior(year) {
            self.track = None;
        }
    }

    pub fn choose_track(&mut self, track: Option<Track>) {
        self.track = track;
    }

    /// Subjects for the current section/year/track selection.
    pub fn available_subjects(&self) -> Vec<&'static str> {
        match (self.section, self.year) {
            (Some(section), Some(year)) => catalog::subjects_for(section, year, self.track),
            _ => Vec::new(),
        }
    }

    /// Sign a student in and register them with the store. Registration is
    /// best-effort: a store failure is logged and the login still succeeds.
    pub async fn login_student(
        &mut self,
        store: &dyn ResultStore,
        id: &str,
        name: &str,
    ) -> &Student {
        let student = Student::new(id.trim(), name.trim(), self.section);
        self.view = View::SubjectSelect;

        match store.upsert_student(&student).await {
            Ok(_) => match store.fetch_students().await {
                Ok(students) => self.students = students,
                Err(e) => tracing::warn!("failed to refresh students: {e}"),
            },
            Err(e) => tracing::warn!(student = %student.id, "failed to register student: {e}"),
        }

        self.notify(NoticeLevel::Success, format!("Welcome, {}!", student.name));
        self.user.insert(student)
    }

    /// Sign in as admin with the shared secret.
    pub fn login_admin(&mut self, password: &str) -> Result<(), CbtError> {
        match &self.admin_secret {
            Some(secret) if secret == password => {
                self.user = Some(Student {
                    id: ADMIN_ID.to_string(),
                    name: ADMIN_NAME.to_string(),
                    role: Role::Admin,
                    section: None,
                    created_at: None,
                });
                self.view = View::Admin;
                self.notify(NoticeLevel::Success, format!("Welcome, {ADMIN_NAME}!"));
                Ok(())
            }
            _ => Err(self.fail("", CbtError::Unauthorized)),
        }
    }

    /// Discard the user, selections, and any running session.
    pub fn logout(&mut self) {
        self.timer.stop();
        self.session = None;
        self.expiry = None;
        self.last_result = None;
        self.user = None;
        self.section = None;
        self.year = None;
        self.track = None;
        self.epoch += 1;
        self.view = View::Home;
    }

    // -- exam flow ----------------------------------------------------------

    /// Start a new request; any earlier token becomes stale.
    pub fn begin_request(&mut self) -> RequestToken {
        self.epoch += 1;
        RequestToken(self.epoch)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.epoch
    }

    /// The classification a new session for `subject` would use.
    pub fn criteria_for(&self, subject: &str, exam_type: ExamType) -> Result<Classification, CbtError> {
        let (Some(section), Some(year)) = (self.section, self.year) else {
            return Err(CbtError::Validation(vec![
                "choose a section and year first".to_string(),
            ]));
        };
        let mut criteria = Classification::new(section, year, subject, exam_type);
        criteria.track = self.track.filter(|_| catalog::is_senior(year));
        Ok(criteria)
    }

    /// Select questions and start a timed session.
    pub async fn start_exam<R: Rng + ?Sized>(
        &mut self,
        store: &dyn ResultStore,
        subject: &str,
        exam_type: ExamType,
        rng: &mut R,
    ) -> Result<&ExamSession, CbtError> {
        let criteria = match self.criteria_for(subject, exam_type) {
            Ok(c) => c,
            Err(e) => return Err(self.fail("", e)),
        };
        let token = self.begin_request();

        let questions = match select_questions(store, &criteria, rng).await {
            Ok(q) => q,
            Err(e) => return Err(self.fail("Error loading questions. Please try again.", e)),
        };

        self.begin_session(token, criteria, questions)
            .ok_or(CbtError::NoActiveSession)
    }

    /// Install a session from a completed question request. Returns `None`
    /// and changes nothing when the token is stale or nobody is signed in.
    pub fn begin_session(
        &mut self,
        token: RequestToken,
        criteria: Classification,
        questions: Vec<Question>,
    ) -> Option<&ExamSession> {
        if !self.is_current(token) {
            tracing::debug!("dropping stale question response");
            return None;
        }
        let student = self.user.clone()?;

        let session = ExamSession::new(student, criteria, questions);
        let session_id = session.id();
        tracing::info!(
            session = %session_id,
            subject = %session.classification().subject,
            exam_type = %session.classification().exam_type,
            questions = session.total(),
            "session started"
        );

        let (tx, rx) = oneshot::channel();
        let minutes = session.classification().exam_type.duration_minutes();
        self.timer.start(minutes, move || {
            let _ = tx.send(session_id);
        });

        self.expiry = Some(rx);
        self.last_result = None;
        self.view = View::Exam;
        self.session = Some(session);
        self.session.as_ref()
    }

    /// Score the running session and record the result.
    ///
    /// The timer stops and the session is discarded before the store is
    /// contacted, so a session is scored at most once. A failed save keeps the
    /// result in the pending queue; the view moves to the result either way.
    pub async fn submit(
        &mut self,
        store: &dyn ResultStore,
        trigger: SubmitTrigger,
        confirmed: bool,
    ) -> Result<SubmitOutcome, CbtError> {
        let Some(session) = self.session.as_ref() else {
            return Err(CbtError::NoActiveSession);
        };
        if trigger == SubmitTrigger::Manual && !confirmed && session.unanswered() > 0 {
            return Ok(SubmitOutcome::NeedsConfirmation {
                answered: session.progress(),
                total: session.total(),
            });
        }

        self.timer.stop();
        self.expiry = None;
        let Some(session) = self.session.take() else {
            return Err(CbtError::NoActiveSession);
        };
        let result = grade_session(&session, Utc::now());
        tracing::info!(
            session = %session.id(),
            ?trigger,
            score = result.score,
            correct = result.correct,
            total = result.total,
            "session submitted"
        );

        let recorded = if !result.classification.exam_type.is_persisted() {
            RecordedResult::Practice(result)
        } else {
            match store.save_result(&result).await {
                Ok(saved) => {
                    self.results.insert(0, saved.clone());
                    RecordedResult::Persisted(saved)
                }
                Err(e) => {
                    tracing::warn!("failed to save result, queued for sync: {e}");
                    let local_id = self.pending.push(result.clone(), Some(e.to_string()));
                    self.persist_pending();
                    self.results.insert(0, result.clone());
                    self.notify(
                        NoticeLevel::Warning,
                        "Result saved locally. Will sync when online.",
                    );
                    RecordedResult::PendingSync { local_id, result }
                }
            }
        };

        let score = recorded.result().score;
        let level = if crate::scorer::is_pass(score) {
            NoticeLevel::Success
        } else {
            NoticeLevel::Info
        };
        self.notify(level, outcome_message(score));

        self.view = View::Result;
        self.last_result = Some(recorded.clone());
        Ok(SubmitOutcome::Submitted(recorded))
    }

    /// Retry saving queued results. Synced results replace their local
    /// copies in the results cache.
    pub async fn sync_pending(&mut self, store: &dyn ResultStore) -> SyncReport {
        if self.pending.is_empty() {
            return SyncReport::default();
        }
        let report = self.pending.sync(store).await;
        for entry in &report.synced {
            // The store may restamp the result, so match the queued copy itself.
            let local = self
                .results
                .iter()
                .position(|r| r.id.is_none() && *r == entry.local);
            match local {
                Some(i) => self.results[i] = entry.saved.clone(),
                None => self.results.insert(0, entry.saved.clone()),
            }
        }
        self.persist_pending();

        if !report.synced.is_empty() {
            self.notify(
                NoticeLevel::Success,
                format!("{} pending result(s) synced", report.synced.len()),
            );
        }
        if report.remaining > 0 {
            self.notify(
                NoticeLevel::Warning,
                format!("{} result(s) still waiting to sync", report.remaining),
            );
        }
        report
    }

    fn persist_pending(&self) {
        if let Some(path) = &self.pending_path {
            if let Err(e) = self.pending.save_json(path) {
                tracing::warn!("failed to write pending queue: {e:#}");
            }
        }
    }

    // -- admin: questions ---------------------------------------------------

    pub async fn add_question(
        &mut self,
        store: &dyn ResultStore,
        question: NewQuestion,
    ) -> Result<Question, CbtError> {
        let question = normalize_question(question);
        if let Err(e) = validate_question(&question) {
            return Err(self.fail("", e));
        }
        match store.add_question(&question).await {
            Ok(saved) => {
                self.bank.insert(0, saved.clone());
                self.notify(NoticeLevel::Success, "Question added successfully!");
                Ok(saved)
            }
            Err(e) => Err(self.fail("Error adding question. Please try again.", e.into())),
        }
    }

    /// Parse bulk import text and upload it in one request. Nothing is sent
    /// unless every entry is valid.
    pub async fn bulk_import(
        &mut self,
        store: &dyn ResultStore,
        text: &str,
    ) -> Result<Vec<Question>, CbtError> {
        let questions = match parse_bulk_import(text) {
            Ok(q) => q,
            Err(e) => return Err(self.fail("", e)),
        };
        match store.add_questions(&questions).await {
            Ok(saved) => {
                let mut bank = saved.clone();
                bank.append(&mut self.bank);
                self.bank = bank;
                self.notify(
                    NoticeLevel::Success,
                    format!("{} questions uploaded successfully!", saved.len()),
                );
                Ok(saved)
            }
            Err(e) => Err(self.fail("Error uploading questions. Please try again.", e.into())),
        }
    }

    /// Replace an existing question, keeping its id.
    pub async fn update_question(
        &mut self,
        store: &dyn ResultStore,
        id: &str,
        question: NewQuestion,
    ) -> Result<Question, CbtError> {
        let question = normalize_question(question);
        if let Err(e) = validate_question(&question) {
            return Err(self.fail("", e));
        }
        match store.update_question(id, &question).await {
            Ok(saved) => {
                if let Some(slot) = self.bank.iter_mut().find(|q| q.id == id) {
                    *slot = saved.clone();
                }
                self.notify(NoticeLevel::Success, "Question updated");
                Ok(saved)
            }
            Err(e) => Err(self.fail("Error updating question", e.into())),
        }
    }

    pub async fn delete_question(
        &mut self,
        store: &dyn ResultStore,
        id: &str,
    ) -> Result<(), CbtError> {
        match store.delete_question(id).await {
            Ok(()) => {
                self.bank.retain(|q| q.id != id);
                self.notify(NoticeLevel::Info, "Question deleted");
                Ok(())
            }
            Err(e) => Err(self.fail("Error deleting question", e.into())),
        }
    }

    pub async fn delete_questions(
        &mut self,
        store: &dyn ResultStore,
        ids: &[String],
    ) -> Result<(), CbtError> {
        match store.delete_questions(ids).await {
            Ok(()) => {
                self.bank.retain(|q| !ids.contains(&q.id));
                self.notify(NoticeLevel::Info, format!("{} questions deleted", ids.len()));
                Ok(())
            }
            Err(e) => Err(self.fail("Error deleting questions", e.into())),
        }
    }

    // -- admin: results -----------------------------------------------------

    /// Remove every stored result. Callers confirm with the user first.
    pub async fn clear_results(&mut self, store: &dyn ResultStore) -> Result<(), CbtError> {
        match store.clear_results().await {
            Ok(()) => {
                self.results.clear();
                self.notify(NoticeLevel::Info, "All results cleared");
                Ok(())
            }
            Err(e) => Err(self.fail("Error clearing results", e.into())),
        }
    }

    pub fn filtered_results(&self, filter: &ResultFilter) -> Vec<&ExamResult> {
        filter_results(&self.results, filter)
    }

    pub fn summary(&self, filter: &ResultFilter) -> ResultSummary {
        summarize(self.filtered_results(filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::question;

    fn signed_in() -> App {
        let mut app = App::new();
        app.choose_section(Section::College);
        app.choose_year(8);
        app.user = Some(Student::new("s1", "Ada", Some(Section::College)));
        app
    }

    #[test]
    fn admin_login_checks_secret() {
        let mut app = App::new().with_admin_secret(Some("letmein".into()));
        assert!(matches!(app.login_admin("nope"), Err(CbtError::Unauthorized)));
        assert_eq!(app.view(), View::Home);
        assert_eq!(app.drain_notices()[0].message, "Invalid password");

        app.login_admin("letmein").unwrap();
        assert_eq!(app.view(), View::Admin);
        assert_eq!(app.user().unwrap().role, Role::Admin);
    }

    #[test]
    fn admin_login_without_secret_is_refused() {
        let mut app = App::new();
        assert!(app.login_admin("").is_err());
    }

    #[test]
    fn subjects_follow_selection() {
        let mut app = App::new();
        assert!(app.available_subjects().is_empty());
        app.choose_section(Section::College);
        app.choose_year(11);
        assert!(app.available_subjects().is_empty());
        app.choose_track(Some(Track::Commercial));
        assert!(app.available_subjects().contains(&"Accounting"));
        app.choose_year(8);
        assert!(app.available_subjects().contains(&"Home Economics"));
    }

    #[test]
    fn criteria_needs_selection() {
        let app = App::new();
        assert!(matches!(
            app.criteria_for("Mathematics", ExamType::Test),
            Err(CbtError::Validation(_))
        ));
        let app = signed_in();
        let c = app.criteria_for("French", ExamType::Exam).unwrap();
        assert_eq!(c.year, 8);
        assert_eq!(c.track, None);
    }

    #[tokio::test]
    async fn stale_token_is_ignored() {
        let mut app = signed_in();
        let criteria = app.criteria_for("French", ExamType::Test).unwrap();
        let stale = app.begin_request();
        let fresh = app.begin_request();

        assert!(app
            .begin_session(stale, criteria.clone(), vec![question(0, 1)])
            .is_none());
        assert!(app.session().is_none());

        let session = app.begin_session(fresh, criteria, vec![question(0, 1)]).unwrap();
        assert_eq!(session.total(), 1);
        assert_eq!(app.view(), View::Exam);
        assert_eq!(app.timer().remaining(), 30 * 60);
    }

    #[tokio::test]
    async fn logout_discards_session_and_invalidates_requests() {
        let mut app = signed_in();
        let criteria = app.criteria_for("French", ExamType::Test).unwrap();
        let token = app.begin_request();
        app.logout();
        assert!(app.begin_session(token, criteria, vec![question(0, 1)]).is_none());
        assert!(app.user().is_none());
        assert_eq!(app.view(), View::Home);
        assert!(!app.timer().is_running());
    }
}
