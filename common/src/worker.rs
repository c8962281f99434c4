use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type WorkerName = String;

/// Foto del pool de GPU servers: nombre -> corriendo (true) o parado (false).
///
/// Siempre sale de una consulta fresca al servidor; no se guarda entre llamadas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerSet(BTreeMap<WorkerName, bool>);

impl WorkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<WorkerName>, running: bool) {
        self.0.insert(name.into(), running);
    }

    pub fn get(&self, name: &str) -> Option<bool> {
        self.0.get(name).copied()
    }

    /// Todos los workers reportan estar corriendo.
    /// Un set vacío cuenta como listo (igual que `all()` sobre nada).
    pub fn all_running(&self) -> bool {
        self.0.values().all(|running| *running)
    }

    /// Todos los workers reportan estar parados.
    pub fn all_stopped(&self) -> bool {
        self.0.values().all(|running| !*running)
    }

    /// Nombres de los workers que no están corriendo.
    pub fn not_running(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(_, running)| !**running)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(name, running)| (name.as_str(), *running))
    }
}

impl<S: Into<WorkerName>> FromIterator<(S, bool)> for WorkerSet {
    fn from_iter<I: IntoIterator<Item = (S, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(n, r)| (n.into(), r)).collect())
    }
}

impl fmt::Display for WorkerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "(sin workers)");
        }
        let parts: Vec<String> = self
            .iter()
            .map(|(name, running)| format!("{}={}", name, if running { "up" } else { "down" }))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Respuesta de GET /gpuserver-status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStatusResponse {
    pub details: WorkerSet,
}
