use msa_common::{
    ArtifactHandle, ClientConfig, Job, JobState, MsaError, ResultId, TaskId, TaskStatus,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::pool::PoolController;
use crate::retrieval;
use crate::transport::MsaTransport;

/// Resultado final de una tarea según el servidor.
enum TaskOutcome {
    Complete(Option<ResultId>),
    Failed(Option<String>),
}

/// Lleva un job lógico de punta a punta:
/// ensure_ready -> submit -> polling -> (restart + reenvío una vez) -> descarga.
///
/// Un job a la vez por orquestador: `run` toma un lock durante toda la
/// ejecución. Para varios jobs, un orquestador por job compartiendo el pool.
pub struct JobOrchestrator<T> {
    pool: Arc<PoolController<T>>,
    transport: Arc<T>,
    config: ClientConfig,
    in_flight: Mutex<()>,
}

impl<T: MsaTransport> JobOrchestrator<T> {
    pub fn new(pool: Arc<PoolController<T>>) -> Self {
        let transport = pool.transport().clone();
        let config = pool.config().clone();
        Self {
            pool,
            transport,
            config,
            in_flight: Mutex::new(()),
        }
    }

    /// Sube la entrada y devuelve el task_id nuevo.
    pub async fn submit(&self, input: &Path) -> Result<TaskId, MsaError> {
        self.transport.submit(input).await
    }

    /// Corre el job completo para `input` y deja el resultado en `output_dir`.
    ///
    /// Si ya hay un resultado terminado para esta entrada en `output_dir`
    /// no se envía nada y se devuelve ese.
    pub async fn run(&self, input: &Path, output_dir: &Path) -> Result<ArtifactHandle, MsaError> {
        let _guard = self.in_flight.lock().await;

        let input_name = input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| input.display().to_string());
        let mut job = Job::new(input_name);
        // si no se puede resolver, el submit reporta el error de entrada
        let source = tokio::fs::canonicalize(input)
            .await
            .unwrap_or_else(|_| input.to_path_buf());

        // 1) pool listo (si falla, se corta acá)
        self.pool.ensure_ready().await?;

        // 2) ¿ya estaba hecho?
        if let Some(handle) = retrieval::find_existing(&job.input, &source, output_dir).await? {
            info!(
                "{} ya tiene resultado {} en {}, no se reenvía",
                job.input,
                handle.result_id,
                output_dir.display()
            );
            job.transition(JobState::Completed)?;
            return Ok(handle);
        }

        retrieval::ensure_output_dir(output_dir).await?;

        // 3-7) submit / polling / reintento
        let result_id = self.drive(&mut job, input).await?;

        // entrega al paso de descarga
        let archive = retrieval::retrieve(self.transport.as_ref(), &result_id, output_dir).await?;
        if let Err(e) = retrieval::write_marker(
            &job.input,
            &source,
            &result_id,
            job.task_id.clone(),
            &archive,
            output_dir,
        )
        .await
        {
            // el resultado ya está en disco; sólo se pierde el atajo
            warn!("no se pudo dejar el marcador de {}: {}", job.input, e);
        }

        Ok(ArtifactHandle {
            result_id,
            task_id: job.task_id.clone(),
            archive,
            output_dir: output_dir.to_path_buf(),
            attempts: job.attempt,
            resumed: false,
        })
    }

    /// Ciclo submit -> polling -> {complete, failed}, con un único reintento.
    async fn drive(&self, job: &mut Job, input: &Path) -> Result<ResultId, MsaError> {
        self.submit_attempt(job, input).await?;

        loop {
            let started = Instant::now();
            match self.poll_until_terminal(job).await? {
                TaskOutcome::Complete(result_id) => {
                    let task_id = current_task(job);
                    let result_id = result_id.ok_or_else(|| {
                        MsaError::MalformedResponse(format!(
                            "la tarea {} terminó sin job_id",
                            task_id
                        ))
                    })?;
                    job.record_completion(result_id.clone())?;
                    info!(
                        "job completo en {:.1}s (intento {}): result_id={}",
                        started.elapsed().as_secs_f64(),
                        job.attempt,
                        result_id
                    );
                    return Ok(result_id);
                }
                TaskOutcome::Failed(detail) => {
                    let task_id = current_task(job);
                    let detail = detail.unwrap_or_else(|| "sin detalle del servidor".to_string());
                    job.record_failure()?;

                    if !job.can_retry() {
                        warn!(
                            "la tarea {} falló otra vez ({}), no hay más reintentos",
                            task_id, detail
                        );
                        job.transition(JobState::FailedPermanently)?;
                        return Err(MsaError::PermanentFailure { task_id, detail });
                    }

                    warn!(
                        "la tarea {} falló ({}), reiniciando gpu servers y reenviando...",
                        task_id, detail
                    );
                    job.transition(JobState::Retrying)?;
                    self.pool.restart().await?;
                    self.submit_attempt(job, input).await?;
                }
            }
        }
    }

    async fn submit_attempt(&self, job: &mut Job, input: &Path) -> Result<(), MsaError> {
        let task_id = self.submit(input).await?;
        job.record_submission(task_id.clone())?;
        info!(
            "job enviado (intento {}). task_id: {}. Consultando resultado...",
            job.attempt, task_id
        );
        Ok(())
    }

    /// Consulta cada `poll_interval` hasta ver complete o failed.
    ///
    /// Sin límite de tiempo salvo que se configure `task_poll_timeout`.
    /// Un error de red al consultar no es un fallo de la tarea: se loguea y
    /// se vuelve a consultar en el siguiente intervalo.
    async fn poll_until_terminal(&self, job: &mut Job) -> Result<TaskOutcome, MsaError> {
        job.transition(JobState::Polling)?;
        let task_id = current_task(job);
        let started = Instant::now();
        let mut polls: u32 = 0;

        loop {
            polls += 1;
            match self.transport.task_status(&task_id).await {
                Ok(report) => {
                    job.status = Some(report.status);
                    match report.status {
                        TaskStatus::Complete => return Ok(TaskOutcome::Complete(report.result_id)),
                        TaskStatus::Failed => return Ok(TaskOutcome::Failed(report.error)),
                        TaskStatus::Pending => {
                            debug!("tarea {} pendiente (consulta {})", task_id, polls)
                        }
                    }
                }
                Err(e) => warn!(
                    "no se pudo consultar la tarea {} (consulta {}), se reintenta: {}",
                    task_id, polls, e
                ),
            }

            if let Some(limit) = self.config.task_poll_timeout {
                let elapsed = started.elapsed();
                if elapsed >= limit {
                    return Err(MsaError::PollTimeout { task_id, elapsed });
                }
            }

            sleep(self.config.poll_interval).await;
        }
    }
}

fn current_task(job: &Job) -> TaskId {
    job.task_id.clone().unwrap_or_default()
}
