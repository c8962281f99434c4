use msa_common::{ClientConfig, MsaError, WorkerSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::transport::MsaTransport;

/// Controla el pool de gpu servers del servidor MSA.
///
/// El estado del pool lo maneja otro servicio, así que nunca se asume:
/// cada decisión sale de una consulta fresca a `status()`.
/// `ensure_ready` y `restart` se serializan con un lock del pool, para que
/// dos jobs que comparten el controller no lo reinicien a la vez.
pub struct PoolController<T> {
    transport: Arc<T>,
    config: ClientConfig,
    lifecycle: Mutex<()>,
}

impl<T: MsaTransport> PoolController<T> {
    pub fn new(transport: Arc<T>, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            lifecycle: Mutex::new(()),
        }
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Foto actual del pool. O llega completa o es error.
    pub async fn status(&self) -> Result<WorkerSet, MsaError> {
        let workers = self.transport.server_status().await?;
        debug!("estado de gpu servers: {}", workers);
        Ok(workers)
    }

    /// Deja el pool completo corriendo o falla con `Startup`.
    /// Si ya estaba todo arriba no manda nada.
    pub async fn ensure_ready(&self) -> Result<WorkerSet, MsaError> {
        let _guard = self.lifecycle.lock().await;

        let workers = self.status().await?;
        if workers.all_running() {
            info!("gpu servers listos ({})", workers);
            return Ok(workers);
        }

        warn!(
            "gpu servers sin arrancar ({}), arrancando y esperando {:?}...",
            workers.not_running().join(", "),
            self.config.warmup
        );
        self.transport.start_servers().await?;
        sleep(self.config.warmup).await;

        let workers = self.status().await?;
        if !workers.all_running() {
            warn!("los gpu servers siguen sin arrancar: {}", workers);
            return Err(MsaError::Startup { workers });
        }

        info!("gpu servers arrancados ({})", workers);
        Ok(workers)
    }

    /// Detiene todo, espera a verlo parado y vuelve a arrancar.
    ///
    /// No verifica que quede listo; eso le toca a quien llama.
    pub async fn restart(&self) -> Result<(), MsaError> {
        let _guard = self.lifecycle.lock().await;

        info!("reiniciando gpu servers...");
        self.transport.stop_servers().await?;

        let started = Instant::now();
        loop {
            let workers = self.status().await?;
            if workers.all_stopped() {
                info!("gpu servers detenidos tras {:?}", started.elapsed());
                break;
            }

            if started.elapsed() >= self.config.termination_timeout {
                warn!(
                    "los gpu servers no se detuvieron en {:?}: {}",
                    self.config.termination_timeout, workers
                );
                return Err(MsaError::TerminationTimeout {
                    timeout: self.config.termination_timeout,
                    workers,
                });
            }

            debug!("esperando que se detengan: {}", workers);
            sleep(self.config.termination_poll_interval).await;
        }

        self.transport.start_servers().await?;
        info!("arranque enviado, esperando warm-up de {:?}", self.config.warmup);
        sleep(self.config.warmup).await;
        Ok(())
    }
}
