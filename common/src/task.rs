use serde::{Deserialize, Serialize};

pub type TaskId = String;

/// Identificador del artefacto descargable (el servidor lo llama `job_id`).
pub type ResultId = String;

/// Estado de una tarea tal cual lo reporta el servidor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Complete,
    Failed,
}

/// Respuesta de POST /submit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub task_id: TaskId,
}

/// Respuesta de GET /task-status/{task_id}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatusReport {
    pub status: TaskStatus,

    /// Sólo viene cuando status == complete
    #[serde(rename = "job_id", default, skip_serializing_if = "Option::is_none")]
    pub result_id: Option<ResultId>,

    /// Detalle del error cuando status == failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskStatusReport {
    pub fn pending() -> Self {
        Self {
            status: TaskStatus::Pending,
            result_id: None,
            error: None,
        }
    }

    pub fn complete(result_id: impl Into<ResultId>) -> Self {
        Self {
            status: TaskStatus::Complete,
            result_id: Some(result_id.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Failed,
            result_id: None,
            error: Some(error.into()),
        }
    }
}
