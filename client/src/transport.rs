use async_trait::async_trait;
use msa_common::{
    ClientConfig, MsaError, ServerStatusResponse, SubmitResponse, TaskId, TaskStatusReport,
    WorkerSet,
};
use reqwest::{multipart, Client, Response};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

const TOKEN_HEADER: &str = "x-token";

/// Operaciones del servidor MSA que usa el núcleo.
///
/// start/stop son "dispara y olvida": el efecto sólo se ve consultando
/// `server_status` después.
#[async_trait]
pub trait MsaTransport: Send + Sync {
    async fn server_status(&self) -> Result<WorkerSet, MsaError>;

    async fn start_servers(&self) -> Result<(), MsaError>;

    async fn stop_servers(&self) -> Result<(), MsaError>;

    /// Sube el archivo de entrada y devuelve el task_id asignado.
    async fn submit(&self, input: &Path) -> Result<TaskId, MsaError>;

    async fn task_status(&self, task_id: &str) -> Result<TaskStatusReport, MsaError>;

    /// Descarga el zip de un resultado a `dest`; devuelve los bytes escritos.
    async fn download(&self, result_id: &str, dest: &Path) -> Result<u64, MsaError>;
}

/// Transporte HTTP contra el servidor MSA (reqwest).
pub struct HttpTransport {
    inner: Client,
    base_url: String,
    token: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, MsaError> {
        config.validate()?;
        Ok(Self {
            inner: Client::new(),
            base_url: config.base_url().to_string(),
            token: config.token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn unreachable(&self, reason: impl ToString) -> MsaError {
        MsaError::Unreachable {
            url: self.base_url.clone(),
            reason: reason.to_string(),
        }
    }

    /// GET con token; cualquier status no exitoso se trata como inalcanzable.
    async fn get(&self, path: &str) -> Result<Response, MsaError> {
        let url = self.url(path);
        debug!("GET {}", url);

        let resp = self
            .inner
            .get(&url)
            .header(TOKEN_HEADER, &self.token)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(self.unreachable(format!("GET {} -> {}: {}", path, status, body)));
        }
        Ok(resp)
    }
}

#[async_trait]
impl MsaTransport for HttpTransport {
    async fn server_status(&self) -> Result<WorkerSet, MsaError> {
        let resp = self.get("/gpuserver-status").await?;
        let status: ServerStatusResponse = resp.json().await.map_err(|e| self.unreachable(e))?;
        Ok(status.details)
    }

    async fn start_servers(&self) -> Result<(), MsaError> {
        self.get("/start-gpuservers").await?;
        Ok(())
    }

    async fn stop_servers(&self) -> Result<(), MsaError> {
        self.get("/stop-gpuservers").await?;
        Ok(())
    }

    async fn submit(&self, input: &Path) -> Result<TaskId, MsaError> {
        let bytes = tokio::fs::read(input).await.map_err(|source| MsaError::Input {
            path: input.to_path_buf(),
            source,
        })?;
        let file_name = input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "input.fasta".to_string());

        let form = multipart::Form::new().part("file", multipart::Part::bytes(bytes).file_name(file_name));

        let url = self.url("/submit");
        debug!("POST {}", url);
        let resp = self
            .inner
            .post(&url)
            .header(TOKEN_HEADER, &self.token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;

        // El body va tal cual en el error para poder diagnosticar
        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.unreachable(e))?;
        if !status.is_success() {
            return Err(MsaError::Submission {
                status: status.as_u16(),
                body,
            });
        }

        // 2xx sin task_id: el servidor no cumplió el contrato
        serde_json::from_str::<SubmitResponse>(&body)
            .map(|submitted| submitted.task_id)
            .map_err(|e| {
                MsaError::MalformedResponse(format!(
                    "respuesta de /submit sin task_id ({}): {}",
                    e, body
                ))
            })
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatusReport, MsaError> {
        let resp = self.get(&format!("/task-status/{}", task_id)).await?;
        resp.json().await.map_err(|e| self.unreachable(e))
    }

    async fn download(&self, result_id: &str, dest: &Path) -> Result<u64, MsaError> {
        let mut resp = self.get(&format!("/download/{}", result_id)).await?;

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| MsaError::Retrieval(format!("no se pudo crear {}: {}", dest.display(), e)))?;

        let mut written: u64 = 0;
        while let Some(chunk) = resp.chunk().await.map_err(|e| self.unreachable(e))? {
            file.write_all(&chunk)
                .await
                .map_err(|e| MsaError::Retrieval(format!("error escribiendo {}: {}", dest.display(), e)))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| MsaError::Retrieval(format!("error escribiendo {}: {}", dest.display(), e)))?;

        Ok(written)
    }
}
