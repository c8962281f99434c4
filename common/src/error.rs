use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::job::JobState;
use crate::task::TaskId;
use crate::worker::WorkerSet;

/// Errores del cliente MSA.
///
/// Todos son fatales para `run()`: el único reintento local es el ciclo
/// restart + reenvío después de un `failed` reportado por el servidor.
#[derive(Debug, Error)]
pub enum MsaError {
    /// Fallo de red o respuesta no exitosa del servidor.
    #[error("no se pudo contactar al servidor {url}: {reason}")]
    Unreachable { url: String, reason: String },

    /// El pool no quedó completo después del warm-up.
    #[error("los gpu servers no arrancaron tras el warm-up: {workers}")]
    Startup { workers: WorkerSet },

    /// Los workers no se detuvieron dentro del timeout de terminación.
    #[error("los gpu servers no se detuvieron en {timeout:?}: {workers}")]
    TerminationTimeout { timeout: Duration, workers: WorkerSet },

    /// El servidor rechazó el envío; `body` es la respuesta tal cual.
    #[error("falló el envío (status {status}): {body}")]
    Submission { status: u16, body: String },

    /// La tarea falló también en el reintento.
    #[error("la tarea {task_id} falló tras el reintento: {detail}")]
    PermanentFailure { task_id: TaskId, detail: String },

    /// Sólo si se configuró un timeout de polling.
    #[error("la tarea {task_id} sigue sin terminar tras {elapsed:?}")]
    PollTimeout { task_id: TaskId, elapsed: Duration },

    /// El servidor respondió algo que no cumple el contrato.
    #[error("respuesta inválida del servidor: {0}")]
    MalformedResponse(String),

    #[error("no hay token configurado (usa --token o MSA_TOKEN)")]
    MissingToken,

    #[error("configuración inválida: {0}")]
    InvalidConfig(String),

    #[error("transición inválida: {from:?} -> {to:?}")]
    InvalidTransition { from: JobState, to: JobState },

    #[error("no se pudo leer la entrada {}: {source}", .path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Descarga, escritura del zip o extracción.
    #[error("falló la recuperación del resultado: {0}")]
    Retrieval(String),
}
