use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::task::{ResultId, TaskId};

const MARKER_SUFFIX: &str = ".msa-result.json";

/// Lo que devuelve el orquestador al terminar un job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactHandle {
    pub result_id: ResultId,
    /// task_id que produjo el resultado (None si se reutilizó uno previo sin registro)
    pub task_id: Option<TaskId>,
    /// Zip descargado dentro de output_dir
    pub archive: PathBuf,
    /// Directorio donde quedó descomprimido
    pub output_dir: PathBuf,
    /// Envíos hechos en esta ejecución (0 si se reutilizó un resultado previo)
    pub attempts: u32,
    pub resumed: bool,
}

/// Marca de "ya terminado" que queda en el directorio de salida.
/// Permite saltarse el envío si se vuelve a correr la misma entrada.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMarker {
    pub input: String,
    /// Ruta canónica de la entrada; dos entradas con el mismo nombre de
    /// archivo comparten marcador, y esto las distingue
    pub source: PathBuf,
    pub result_id: ResultId,
    pub task_id: Option<TaskId>,
    pub archive: PathBuf,
    pub completed_at: DateTime<Utc>,
}

impl ResultMarker {
    /// Ruta del marcador para una entrada, ej: `out/query.fasta.msa-result.json`
    pub fn path_in(output_dir: &Path, input: &str) -> PathBuf {
        output_dir.join(format!("{}{}", input, MARKER_SUFFIX))
    }

    /// El marcador sólo vale para la misma entrada que lo escribió.
    pub fn belongs_to(&self, source: &Path) -> bool {
        self.source == source
    }

    pub fn into_handle(self, output_dir: &Path) -> ArtifactHandle {
        ArtifactHandle {
            result_id: self.result_id,
            task_id: self.task_id,
            archive: self.archive,
            output_dir: output_dir.to_path_buf(),
            attempts: 0,
            resumed: true,
        }
    }
}

/// Nombre del zip para un resultado: `<result_id>.zip`
pub fn archive_path(output_dir: &Path, result_id: &str) -> PathBuf {
    output_dir.join(format!("{}.zip", result_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rutas_de_marcador_y_zip() {
        let out = Path::new("/data/out");

        assert_eq!(
            ResultMarker::path_in(out, "query.fasta"),
            PathBuf::from("/data/out/query.fasta.msa-result.json")
        );
        assert_eq!(archive_path(out, "R"), PathBuf::from("/data/out/R.zip"));
    }

    #[test]
    fn marcador_se_convierte_en_handle_reanudado() {
        let marker = ResultMarker {
            input: "query.fasta".to_string(),
            source: PathBuf::from("/data/a/query.fasta"),
            result_id: "R".to_string(),
            task_id: Some("t1".to_string()),
            archive: PathBuf::from("/data/out/R.zip"),
            completed_at: Utc::now(),
        };

        assert!(marker.belongs_to(Path::new("/data/a/query.fasta")));
        assert!(!marker.belongs_to(Path::new("/data/b/query.fasta")));

        let handle = marker.into_handle(Path::new("/data/out"));
        assert!(handle.resumed);
        assert_eq!(handle.attempts, 0);
        assert_eq!(handle.result_id, "R");
        assert_eq!(handle.task_id.as_deref(), Some("t1"));
    }
}
