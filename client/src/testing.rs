//! Transporte en memoria con guion, para probar el pool y el orquestador
//! sin servidor.

use async_trait::async_trait;
use msa_common::{MsaError, TaskId, TaskStatusReport, WorkerSet};
use std::collections::VecDeque;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use crate::transport::MsaTransport;

/// Llamadas observadas, en orden.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Status(WorkerSet),
    Start,
    Stop,
    Submit(TaskId),
    TaskStatus(TaskId),
    Download(String),
}

#[derive(Default)]
struct FakeState {
    workers: WorkerSet,
    calls: Vec<Call>,

    /// start deja todos los workers corriendo
    start_works: bool,
    /// consultas de estado que tardan en verse parados tras un stop (None = nunca)
    stop_delay: Option<u32>,
    stopping: Option<u32>,
    offline: bool,

    /// guion de estados por envío (índice 0 = primer envío)
    scripts: VecDeque<VecDeque<TaskStatusReport>>,
    /// guiones asignados: task_id -> reportes restantes
    active: Vec<(TaskId, VecDeque<TaskStatusReport>)>,
    submissions: u32,
    rejected: Option<(u16, String)>,
    poll_errors: u32,
}

pub struct FakeTransport {
    state: Mutex<FakeState>,
}

impl FakeTransport {
    pub fn new(workers: &[(&str, bool)]) -> Self {
        let state = FakeState {
            workers: workers.iter().map(|(n, r)| (n.to_string(), *r)).collect(),
            start_works: true,
            stop_delay: Some(0),
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn start_fails(self) -> Self {
        self.state.lock().unwrap().start_works = false;
        self
    }

    pub fn stop_after_polls(self, polls: u32) -> Self {
        self.state.lock().unwrap().stop_delay = Some(polls);
        self
    }

    pub fn stop_hangs(self) -> Self {
        self.state.lock().unwrap().stop_delay = None;
        self
    }

    pub fn offline(self) -> Self {
        self.state.lock().unwrap().offline = true;
        self
    }

    pub fn reject_submissions(self, status: u16, body: &str) -> Self {
        self.state.lock().unwrap().rejected = Some((status, body.to_string()));
        self
    }

    pub fn poll_errors(self, count: u32) -> Self {
        self.state.lock().unwrap().poll_errors = count;
        self
    }

    /// Agrega el guion de reportes para el siguiente envío.
    /// El último reporte se repite si se sigue consultando.
    pub fn with_script(self, reports: Vec<TaskStatusReport>) -> Self {
        self.state.lock().unwrap().scripts.push_back(reports.into());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    pub fn submissions(&self) -> usize {
        self.count(|c| matches!(c, Call::Submit(_)))
    }

    pub fn starts(&self) -> usize {
        self.count(|c| matches!(c, Call::Start))
    }

    pub fn stops(&self) -> usize {
        self.count(|c| matches!(c, Call::Stop))
    }

    fn offline_error() -> MsaError {
        MsaError::Unreachable {
            url: "http://fake".to_string(),
            reason: "connection refused".to_string(),
        }
    }
}

/// Zip mínimo con un a3m adentro.
pub fn fixture_zip() -> Vec<u8> {
    let mut buf = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buf);
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("msas/query.a3m", options).unwrap();
        zip.write_all(b">query\nMKV\n").unwrap();
        zip.finish().unwrap();
    }
    buf.into_inner()
}

#[async_trait]
impl MsaTransport for FakeTransport {
    async fn server_status(&self) -> Result<WorkerSet, MsaError> {
        let mut st = self.state.lock().unwrap();
        if st.offline {
            return Err(Self::offline_error());
        }
        if let Some(left) = st.stopping {
            if left == 0 {
                let names: Vec<String> = st.workers.iter().map(|(n, _)| n.to_string()).collect();
                for name in names {
                    st.workers.insert(name, false);
                }
                st.stopping = None;
            } else {
                st.stopping = Some(left - 1);
            }
        }
        let snapshot = st.workers.clone();
        st.calls.push(Call::Status(snapshot.clone()));
        Ok(snapshot)
    }

    async fn start_servers(&self) -> Result<(), MsaError> {
        let mut st = self.state.lock().unwrap();
        if st.offline {
            return Err(Self::offline_error());
        }
        st.calls.push(Call::Start);
        if st.start_works {
            let names: Vec<String> = st.workers.iter().map(|(n, _)| n.to_string()).collect();
            for name in names {
                st.workers.insert(name, true);
            }
        }
        Ok(())
    }

    async fn stop_servers(&self) -> Result<(), MsaError> {
        let mut st = self.state.lock().unwrap();
        if st.offline {
            return Err(Self::offline_error());
        }
        st.calls.push(Call::Stop);
        st.stopping = st.stop_delay;
        Ok(())
    }

    async fn submit(&self, _input: &Path) -> Result<TaskId, MsaError> {
        let mut st = self.state.lock().unwrap();
        if let Some((status, body)) = st.rejected.clone() {
            return Err(MsaError::Submission { status, body });
        }
        st.submissions += 1;
        let task_id = format!("task-{}", st.submissions);
        let script = st
            .scripts
            .pop_front()
            .unwrap_or_else(|| VecDeque::from(vec![TaskStatusReport::pending()]));
        st.active.push((task_id.clone(), script));
        st.calls.push(Call::Submit(task_id.clone()));
        Ok(task_id)
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatusReport, MsaError> {
        let mut st = self.state.lock().unwrap();
        st.calls.push(Call::TaskStatus(task_id.to_string()));
        if st.poll_errors > 0 {
            st.poll_errors -= 1;
            return Err(Self::offline_error());
        }
        let script = st
            .active
            .iter_mut()
            .find(|(id, _)| id == task_id)
            .map(|(_, s)| s)
            .ok_or_else(|| MsaError::MalformedResponse(format!("task desconocida {}", task_id)))?;
        let report = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        report.ok_or_else(|| MsaError::MalformedResponse("guion vacío".to_string()))
    }

    async fn download(&self, result_id: &str, dest: &Path) -> Result<u64, MsaError> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(Call::Download(result_id.to_string()));
        let bytes = fixture_zip();
        std::fs::write(dest, &bytes).map_err(|e| MsaError::Retrieval(e.to_string()))?;
        Ok(bytes.len() as u64)
    }
}
