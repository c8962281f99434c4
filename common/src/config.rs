use std::env;
use std::fmt;
use std::time::Duration;

use crate::error::MsaError;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";
pub const DEFAULT_WARMUP: Duration = Duration::from_secs(10);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_TERMINATION_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_TERMINATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Configuración del cliente. Se pasa explícitamente a cada componente;
/// no hay estado global con el token.
#[derive(Clone)]
pub struct ClientConfig {
    pub server_url: String,
    pub token: String,

    /// Espera después de mandar a arrancar los gpu servers
    pub warmup: Duration,
    /// Cada cuánto se consulta el estado de una tarea
    pub poll_interval: Duration,
    /// Cada cuánto se consulta el pool mientras se detiene
    pub termination_poll_interval: Duration,
    pub termination_timeout: Duration,
    /// None = polling sin límite mientras la tarea siga pending
    pub task_poll_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(server_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            token: token.into(),
            warmup: DEFAULT_WARMUP,
            poll_interval: DEFAULT_POLL_INTERVAL,
            termination_poll_interval: DEFAULT_TERMINATION_POLL_INTERVAL,
            termination_timeout: DEFAULT_TERMINATION_TIMEOUT,
            task_poll_timeout: None,
        }
    }

    /// Lee la config desde variables de entorno:
    /// - MSA_SERVER_URL (default http://localhost:8000)
    /// - MSA_TOKEN (puede faltar; se valida al construir el transporte)
    /// - MSA_WARMUP_SECS, MSA_POLL_INTERVAL_SECS, MSA_TERMINATION_TIMEOUT_SECS,
    ///   MSA_TASK_POLL_TIMEOUT_SECS
    pub fn from_env() -> Self {
        let server_url =
            env::var("MSA_SERVER_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());
        let token = env::var("MSA_TOKEN").unwrap_or_default();

        let mut config = Self::new(server_url, token);
        config.warmup = secs_from_env("MSA_WARMUP_SECS").unwrap_or(DEFAULT_WARMUP);
        config.poll_interval =
            secs_from_env("MSA_POLL_INTERVAL_SECS").unwrap_or(DEFAULT_POLL_INTERVAL);
        config.termination_timeout =
            secs_from_env("MSA_TERMINATION_TIMEOUT_SECS").unwrap_or(DEFAULT_TERMINATION_TIMEOUT);
        config.task_poll_timeout = secs_from_env("MSA_TASK_POLL_TIMEOUT_SECS");
        config
    }

    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_termination(mut self, poll_interval: Duration, timeout: Duration) -> Self {
        self.termination_poll_interval = poll_interval;
        self.termination_timeout = timeout;
        self
    }

    pub fn with_task_poll_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.task_poll_timeout = timeout;
        self
    }

    /// URL base sin la barra final
    pub fn base_url(&self) -> &str {
        self.server_url.trim_end_matches('/')
    }

    pub fn validate(&self) -> Result<(), MsaError> {
        if self.token.trim().is_empty() {
            return Err(MsaError::MissingToken);
        }
        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(MsaError::InvalidConfig(format!(
                "server_url debe empezar con http:// o https:// ({})",
                self.server_url
            )));
        }
        if self.poll_interval.is_zero() || self.termination_poll_interval.is_zero() {
            return Err(MsaError::InvalidConfig(
                "los intervalos de polling no pueden ser 0".to_string(),
            ));
        }
        Ok(())
    }
}

// El token no sale en logs
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("server_url", &self.server_url)
            .field("token", &"***")
            .field("warmup", &self.warmup)
            .field("poll_interval", &self.poll_interval)
            .field("termination_poll_interval", &self.termination_poll_interval)
            .field("termination_timeout", &self.termination_timeout)
            .field("task_poll_timeout", &self.task_poll_timeout)
            .finish()
    }
}

fn secs_from_env(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_de_warmup_y_polling() {
        let config = ClientConfig::new("http://msa:8000/", "tok");

        assert_eq!(config.base_url(), "http://msa:8000");
        assert_eq!(config.warmup, Duration::from_secs(10));
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert!(config.task_poll_timeout.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rechaza_token_vacio() {
        let config = ClientConfig::new(DEFAULT_SERVER_URL, "  ");
        assert!(matches!(config.validate(), Err(MsaError::MissingToken)));
    }

    #[test]
    fn validate_rechaza_url_e_intervalos_invalidos() {
        let bad_url = ClientConfig::new("msa:8000", "tok");
        assert!(matches!(bad_url.validate(), Err(MsaError::InvalidConfig(_))));

        let zero = ClientConfig::new(DEFAULT_SERVER_URL, "tok").with_poll_interval(Duration::ZERO);
        assert!(matches!(zero.validate(), Err(MsaError::InvalidConfig(_))));
    }

    #[test]
    fn debug_no_muestra_el_token() {
        let config = ClientConfig::new(DEFAULT_SERVER_URL, "super-secreto");
        let out = format!("{:?}", config);
        assert!(!out.contains("super-secreto"));
    }
}
