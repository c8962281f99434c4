use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MsaError;
use crate::task::{ResultId, TaskId, TaskStatus};

/// Un job lógico se envía como mucho dos veces: el original y un reintento.
pub const MAX_SUBMISSIONS: u32 = 2;

/// Estados del job lógico dentro del orquestador.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    NotStarted,
    Submitted,
    Polling,
    Completed,
    Failed,
    Retrying,
    FailedPermanently,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::FailedPermanently)
    }

    /// NotStarted -> Submitted -> Polling -> {Completed, Failed}
    /// Failed -> Retrying -> Submitted | Failed -> FailedPermanently
    /// NotStarted -> Completed cuando ya había un resultado previo.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (NotStarted, Submitted)
                | (NotStarted, Completed)
                | (Submitted, Polling)
                | (Polling, Completed)
                | (Polling, Failed)
                | (Failed, Retrying)
                | (Failed, FailedPermanently)
                | (Retrying, Submitted)
        )
    }
}

/// Seguimiento de un job lógico (una entrada del usuario).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Nombre del archivo de entrada
    pub input: String,
    pub state: JobState,
    /// Estados recorridos, en orden (incluye el inicial)
    pub history: Vec<JobState>,

    /// Intento actual: 0 antes de enviar, luego 1 o 2
    pub attempt: u32,
    /// task_id vigente (el del último envío)
    pub task_id: Option<TaskId>,
    /// Todos los task_id obtenidos para este job
    pub task_ids: Vec<TaskId>,

    /// Último estado reportado por el servidor
    pub status: Option<TaskStatus>,
    pub result_id: Option<ResultId>,

    pub submitted_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            state: JobState::NotStarted,
            history: vec![JobState::NotStarted],
            attempt: 0,
            task_id: None,
            task_ids: Vec::new(),
            status: None,
            result_id: None,
            submitted_at: None,
            finished_at: None,
        }
    }

    pub fn transition(&mut self, next: JobState) -> Result<(), MsaError> {
        if !self.state.can_transition_to(next) {
            return Err(MsaError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        self.history.push(next);
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Queda presupuesto para un reenvío.
    pub fn can_retry(&self) -> bool {
        self.attempt < MAX_SUBMISSIONS
    }

    /// Registra un envío aceptado por el servidor con su task_id nuevo.
    pub fn record_submission(&mut self, task_id: TaskId) -> Result<(), MsaError> {
        if self.attempt >= MAX_SUBMISSIONS {
            return Err(MsaError::InvalidTransition {
                from: self.state,
                to: JobState::Submitted,
            });
        }
        self.transition(JobState::Submitted)?;
        self.attempt += 1;
        self.task_id = Some(task_id.clone());
        self.task_ids.push(task_id);
        self.status = Some(TaskStatus::Pending);
        self.result_id = None;
        self.submitted_at = Some(Utc::now());
        Ok(())
    }

    pub fn record_completion(&mut self, result_id: ResultId) -> Result<(), MsaError> {
        self.transition(JobState::Completed)?;
        self.status = Some(TaskStatus::Complete);
        self.result_id = Some(result_id);
        Ok(())
    }

    pub fn record_failure(&mut self) -> Result<(), MsaError> {
        self.transition(JobState::Failed)?;
        self.status = Some(TaskStatus::Failed);
        Ok(())
    }
}
