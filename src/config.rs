//! Carga y gestión de configuración de la aplicación (pipeline + LLM).

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Result};

use crate::consolidate::DEFAULT_FACTS_LIMIT;

/// Versión del servicio, expuesta en /api/health y /api/stats.
pub const SERVICE_VERSION: &str = "3.0.0";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAI,
    Gemini,
    Ollama,
}

impl LlmProvider {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            other => Err(anyhow!("Proveedor LLM no soportado: {other}")),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
        }
    }
}

/// Configuración completa de la aplicación.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_addr: String,
    /// Directorio raíz para caché, feedback, conocimiento aprendido e índice.
    pub data_dir: PathBuf,
    pub use_cache: bool,
    /// Permite deshabilitar la IA generativa aunque haya clave configurada.
    pub use_ai: bool,

    /// Timeout para las búsquedas web salientes, en segundos.
    pub fetch_timeout_secs: u64,
    /// Umbral de fragmentos a partir del cual se deja de consultar fuentes.
    pub max_search_results: usize,
    /// Límite de facts consolidados por respuesta.
    pub facts_limit: usize,

    pub llm_provider: LlmProvider,
    pub llm_chat_model: String,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        let server_addr =
            env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:5000".to_string());

        let data_dir = match env::var("DATA_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => dirs::data_local_dir()
                .map(|d| d.join("crawler_rag"))
                .unwrap_or_else(|| PathBuf::from("data")),
        };

        let use_cache = env::var("USE_CACHE")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let use_ai = env::var("USE_AI")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let fetch_timeout_secs = env::var("FETCH_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        let max_search_results = env::var("MAX_SEARCH_RESULTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        let facts_limit = env::var("FACTS_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_FACTS_LIMIT);

        let llm_provider_str =
            env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string());
        let llm_provider = LlmProvider::from_str(&llm_provider_str)?;

        let llm_chat_model =
            env::var("LLM_CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        Ok(Self {
            server_addr,
            data_dir,
            use_cache,
            use_ai,
            fetch_timeout_secs,
            max_search_results,
            facts_limit,
            llm_provider,
            llm_chat_model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_from_str_accepts_known_names() {
        assert_eq!(LlmProvider::from_str("OpenAI").unwrap(), LlmProvider::OpenAI);
        assert_eq!(LlmProvider::from_str("ollama").unwrap(), LlmProvider::Ollama);
        assert!(LlmProvider::from_str("bard").is_err());
    }
}
