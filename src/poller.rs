//! The polling loop: fetch, validate, interpret, diff, notify, sleep.
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::notifier::{ChatSink, Notifier};
use crate::practicum::{self, ContractError, FetchError, HomeworkSource};
use crate::status::{self, StatusError, NO_HOMEWORK_MESSAGE};

#[derive(Debug, Error)]
pub enum PollError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Contract(#[from] ContractError),
    #[error(transparent)]
    Status(#[from] StatusError),
    #[error("failed to deliver message: {0:#}")]
    Delivery(anyhow::Error),
}

/// Result of one successful iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Notified(String),
    Unchanged(String),
}

/// Result of one contained iteration, as seen by the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Notified(String),
    Unchanged,
    Failed(String),
}

pub struct Poller<A, S> {
    source: A,
    notifier: Notifier<S>,
    cursor: Option<i64>,
    last_message: Option<String>,
}

impl<A, S> Poller<A, S>
where
    A: HomeworkSource,
    S: ChatSink,
{
    /// Start polling from the current time.
    pub fn new(source: A, notifier: Notifier<S>) -> Self {
        Self::with_cursor(source, notifier, Some(practicum::now_timestamp()))
    }

    /// `None` makes the next query start from the time it is sent.
    pub fn with_cursor(source: A, notifier: Notifier<S>, cursor: Option<i64>) -> Self {
        Self {
            source,
            notifier,
            cursor,
            last_message: None,
        }
    }

    pub fn cursor(&self) -> Option<i64> {
        self.cursor
    }

    pub fn last_message(&self) -> Option<&str> {
        self.last_message.as_deref()
    }

    pub fn source(&self) -> &A {
        &self.source
    }

    /// One iteration. State is committed only when every step succeeds.
    pub async fn poll_once(&mut self) -> Result<PollOutcome, PollError> {
        let response = practicum::get_api_answer(&self.source, self.cursor).await?;
        let homeworks = practicum::check_response(&response)?;
        let message = match homeworks.first() {
            Some(newest) => status::parse_status(newest)?,
            None => NO_HOMEWORK_MESSAGE.to_string(),
        };
        let next_cursor = practicum::current_date(&response);
        if next_cursor.is_none() {
            warn!("response has no current_date; next query starts from now");
        }

        let outcome = if self.last_message.as_deref() == Some(message.as_str()) {
            debug!("homework status unchanged");
            PollOutcome::Unchanged(message)
        } else {
            self.notifier
                .notify(&message)
                .await
                .map_err(PollError::Delivery)?;
            self.last_message = Some(message.clone());
            PollOutcome::Notified(message)
        };
        self.cursor = next_cursor;
        Ok(outcome)
    }

    /// One iteration with every failure contained and logged.
    #[instrument(skip_all, fields(cursor = ?self.cursor))]
    pub async fn tick(&mut self) -> TickOutcome {
        match self.poll_once().await {
            Ok(PollOutcome::Notified(message)) => TickOutcome::Notified(message),
            Ok(PollOutcome::Unchanged(_)) => TickOutcome::Unchanged,
            Err(err) => {
                let kind = match &err {
                    PollError::Fetch(_) => "transport",
                    PollError::Contract(_) => "contract",
                    PollError::Status(_) => "status",
                    PollError::Delivery(_) => "delivery",
                };
                error!(kind, "program failure: {}", err);
                TickOutcome::Failed(err.to_string())
            }
        }
    }

    /// Poll forever, sleeping `interval` after every iteration.
    pub async fn run(mut self, interval: Duration) {
        info!(interval_secs = interval.as_secs(), cursor = ?self.cursor, "starting poll loop");
        loop {
            self.tick().await;
            tokio::time::sleep(interval).await;
        }
    }
}
