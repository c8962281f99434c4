//! Cliente del servidor MSA: controla el pool de gpu servers y lleva cada
//! job de punta a punta (envío, polling, reintento, descarga).

pub mod orchestrator;
pub mod pool;
pub mod retrieval;
pub mod transport;

#[cfg(test)]
mod testing;

pub use orchestrator::JobOrchestrator;
pub use pool::PoolController;
pub use transport::{HttpTransport, MsaTransport};
