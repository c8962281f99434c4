//! Descarga y extracción de resultados, y el marcador de "ya terminado".

use chrono::Utc;
use msa_common::{archive_path, ArtifactHandle, MsaError, ResultMarker, TaskId};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::transport::MsaTransport;

/// Busca un resultado previo para `input` en `output_dir`.
///
/// Sólo cuenta si el marcador se puede leer, lo escribió la misma entrada
/// (`source`) y el zip sigue en disco; cualquier otra cosa se trata como
/// "no hay resultado".
pub async fn find_existing(
    input: &str,
    source: &Path,
    output_dir: &Path,
) -> Result<Option<ArtifactHandle>, MsaError> {
    let marker_path = ResultMarker::path_in(output_dir, input);
    let raw = match tokio::fs::read(&marker_path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            warn!("no se pudo leer {}, se ignora: {}", marker_path.display(), e);
            return Ok(None);
        }
    };

    let marker: ResultMarker = match serde_json::from_slice(&raw) {
        Ok(m) => m,
        Err(e) => {
            warn!("marcador ilegible {}, se ignora: {}", marker_path.display(), e);
            return Ok(None);
        }
    };

    if !marker.belongs_to(source) {
        debug!(
            "el marcador de {} es de otra entrada ({}), se ignora",
            input,
            marker.source.display()
        );
        return Ok(None);
    }

    if !tokio::fs::try_exists(&marker.archive).await.unwrap_or(false) {
        debug!(
            "el marcador de {} apunta a {} que ya no existe",
            input,
            marker.archive.display()
        );
        return Ok(None);
    }

    Ok(Some(marker.into_handle(output_dir)))
}

/// Descarga `<result_id>.zip` en `output_dir` y lo descomprime ahí mismo.
pub async fn retrieve<T: MsaTransport + ?Sized>(
    transport: &T,
    result_id: &str,
    output_dir: &Path,
) -> Result<PathBuf, MsaError> {
    ensure_output_dir(output_dir).await?;

    let archive = archive_path(output_dir, result_id);
    info!("descargando resultado {}...", result_id);
    let bytes = transport.download(result_id, &archive).await?;
    info!("descargado: {} ({} bytes)", archive.display(), bytes);

    let entries = extract(&archive, output_dir).await?;
    info!(
        "descomprimido en {} ({} entradas)",
        output_dir.display(),
        entries
    );
    Ok(archive)
}

/// Descomprime un zip en `dest`. Corre en un hilo de bloqueo.
pub async fn extract(archive: &Path, dest: &Path) -> Result<usize, MsaError> {
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();

    let handle = tokio::task::spawn_blocking(move || -> Result<usize, zip::result::ZipError> {
        let file = std::fs::File::open(&archive)?;
        let mut zip = zip::ZipArchive::new(file)?;
        let entries = zip.len();
        zip.extract(&dest)?;
        Ok(entries)
    });

    match handle.await {
        Ok(Ok(entries)) => Ok(entries),
        Ok(Err(e)) => Err(MsaError::Retrieval(format!("error descomprimiendo: {}", e))),
        Err(e) => Err(MsaError::Retrieval(format!(
            "panic o join error descomprimiendo: {}",
            e
        ))),
    }
}

/// Deja el marcador para que una segunda corrida no reenvíe el job.
pub async fn write_marker(
    input: &str,
    source: &Path,
    result_id: &str,
    task_id: Option<TaskId>,
    archive: &Path,
    output_dir: &Path,
) -> Result<(), MsaError> {
    let marker = ResultMarker {
        input: input.to_string(),
        source: source.to_path_buf(),
        result_id: result_id.to_string(),
        task_id,
        archive: archive.to_path_buf(),
        completed_at: Utc::now(),
    };
    let path = ResultMarker::path_in(output_dir, input);
    let json = serde_json::to_vec_pretty(&marker)
        .map_err(|e| MsaError::Retrieval(format!("no se pudo serializar el marcador: {}", e)))?;
    tokio::fs::write(&path, json)
        .await
        .map_err(|e| MsaError::Retrieval(format!("no se pudo escribir {}: {}", path.display(), e)))
}

pub async fn ensure_output_dir(output_dir: &Path) -> Result<(), MsaError> {
    tokio::fs::create_dir_all(output_dir).await.map_err(|e| {
        MsaError::Retrieval(format!(
            "no se pudo crear {}: {}",
            output_dir.display(),
            e
        ))
    })
}
