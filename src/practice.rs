use crate::clock::{Clock, SystemClock};
use crate::content::{ContentProvider, PracticeContent};
use crate::error::PracticeError;
use crate::identity::{Identity, IdentityProvider};
use crate::results::{ResultsSink, SessionRecord};
use crate::session::{Session, Snapshot};
use chrono::{DateTime, Local};
use tracing::{info, warn};

/// What happened to a finished session's result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Saved,
    /// Nobody was logged in, the result only exists locally
    NotSaved,
    /// The sink rejected the result; it is not retried
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PracticeUpdate {
    pub snapshot: Snapshot,
    pub finished_now: bool,
    /// Set once the session has finished
    pub save_status: Option<SaveStatus>,
}

/// One practice attempt bound to its content, reporting to a results sink on finish
#[derive(Debug)]
pub struct Practice<C: Clock = SystemClock> {
    content: PracticeContent,
    session: Session<C>,
    save_status: Option<SaveStatus>,
}

impl Practice<SystemClock> {
    pub fn begin<P>(provider: &P, content_id: &str) -> Result<Self, PracticeError>
    where
        P: ContentProvider + ?Sized,
    {
        Self::begin_with_clock(provider, content_id, SystemClock)
    }
}

impl<C: Clock> Practice<C> {
    pub fn begin_with_clock<P>(provider: &P, content_id: &str, clock: C) -> Result<Self, PracticeError>
    where
        P: ContentProvider + ?Sized,
    {
        let content = provider
            .get_practice_content(content_id)
            .map_err(|source| PracticeError::ContentUnavailable {
                id: content_id.to_string(),
                source,
            })?;
        Ok(Self::from_content(content, clock))
    }

    pub fn from_content(content: PracticeContent, clock: C) -> Self {
        info!(id = %content.id, chars = content.char_count(), "practice started");
        let session = Session::with_clock(content.text.clone(), clock);
        Self {
            content,
            session,
            save_status: None,
        }
    }

    /// Feeds the latest input; on the finishing call the result goes to `sink`
    /// if `identity` names a user.
    pub fn submit_input(
        &mut self,
        input: &str,
        identity: &dyn IdentityProvider,
        sink: &mut dyn ResultsSink,
    ) -> PracticeUpdate {
        let submission = self.session.submit_input(input);

        if submission.finished_now {
            self.save_status = Some(self.save_result(identity, sink));
        }

        PracticeUpdate {
            snapshot: submission.snapshot,
            finished_now: submission.finished_now,
            save_status: self.save_status.clone(),
        }
    }

    fn save_result(&self, identity: &dyn IdentityProvider, sink: &mut dyn ResultsSink) -> SaveStatus {
        let Some(metrics) = self.session.metrics() else {
            return SaveStatus::NotSaved;
        };

        let user_id = match identity.current_user() {
            Identity::User(user_id) => user_id,
            Identity::Anonymous => {
                warn!(id = %self.content.id, "finished without a logged in user, result not saved");
                return SaveStatus::NotSaved;
            }
        };

        let finished_at: DateTime<Local> = self
            .session
            .finished_at()
            .map(DateTime::<Local>::from)
            .unwrap_or_else(Local::now);
        let record = SessionRecord::new(user_id, self.content.id.clone(), metrics, finished_at);

        match sink.submit_result(&record) {
            Ok(()) => {
                info!(
                    user = %record.user_id,
                    id = %record.content_id,
                    speed = record.speed,
                    accuracy = record.accuracy,
                    "practice result saved"
                );
                SaveStatus::Saved
            }
            Err(e) => {
                warn!(error = %e, "failed to save practice result");
                SaveStatus::Failed(e.to_string())
            }
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.session.snapshot()
    }

    pub fn content(&self) -> &PracticeContent {
        &self.content
    }

    pub fn session(&self) -> &Session<C> {
        &self.session
    }

    pub fn save_status(&self) -> Option<&SaveStatus> {
        self.save_status.as_ref()
    }
}
