//! Abstracción sobre Rig para la generación de prosa con distintos
//! proveedores de LLM. De momento se implementa OpenAI; Gemini/Ollama quedan
//! preparados para el futuro.
//!
//! La disponibilidad se comprueba una sola vez al construir el proveedor;
//! los puntos de llamada sólo consultan `is_available`.

use std::env;

use anyhow::{anyhow, Result};
use rig::completion::Prompt;
use tracing::info;

use crate::config::{AppConfig, LlmProvider};

/// Máximo de facts de contexto que se transmiten al proveedor.
const MAX_CONTEXT_FACTS: usize = 10;

/// Capacidad de IA generativa, posiblemente no disponible.
#[derive(Debug, Clone)]
pub struct AiProvider {
    provider: Option<LlmProvider>,
    chat_model: String,
}

impl AiProvider {
    /// Construye el proveedor a partir de la configuración, comprobando la
    /// disponibilidad (clave de API en el entorno) una única vez.
    pub fn from_config(cfg: &AppConfig) -> Self {
        let provider = match cfg.llm_provider {
            LlmProvider::OpenAI if env::var("OPENAI_API_KEY").is_ok() => {
                Some(LlmProvider::OpenAI)
            }
            _ => None,
        };

        if provider.is_none() {
            info!("IA generativa no disponible; se usará la plantilla determinista.");
        }

        Self {
            provider,
            chat_model: cfg.llm_chat_model.clone(),
        }
    }

    /// Proveedor deshabilitado explícitamente (modo sin IA).
    pub fn disabled() -> Self {
        Self {
            provider: None,
            chat_model: String::new(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    /// Nombre del proveedor activo, o `None` si no hay IA disponible.
    pub fn provider_name(&self) -> Option<&'static str> {
        self.provider.as_ref().map(LlmProvider::as_str)
    }

    /// Genera la prosa de respuesta a partir del prompt y los facts de
    /// contexto. Cualquier fallo se devuelve al llamador, que degrada a la
    /// plantilla determinista.
    pub async fn generate(&self, prompt: &str, context: &[String]) -> Result<String> {
        match self.provider {
            Some(LlmProvider::OpenAI) => self.generate_with_openai(prompt, context).await,
            Some(ref other) => Err(anyhow!(
                "Proveedor LLM {:?} aún no implementado para generación",
                other
            )),
            None => Err(anyhow!("No hay proveedor de IA generativa disponible")),
        }
    }

    async fn generate_with_openai(&self, prompt: &str, context: &[String]) -> Result<String> {
        use rig::client::CompletionClient as _;
        use rig::providers::openai;

        const SYSTEM_PROMPT: &str = r#"
Eres un asistente que responde en español de forma natural, clara y conversacional.
Sintetiza la información suministrada en el contexto.
Si el contexto no es suficiente, indica qué información falta.
Estructura la respuesta en párrafos claros y sé preciso pero accesible.
"#;

        let client = openai::Client::from_env();

        let model_name = if self.chat_model.is_empty() {
            "gpt-4o-mini"
        } else {
            self.chat_model.as_str()
        };

        let context_text = context
            .iter()
            .take(MAX_CONTEXT_FACTS)
            .map(|fact| format!("- {fact}"))
            .collect::<Vec<_>>()
            .join("\n");

        let full_context = format!(
            "Contexto:\n{}\n\nPregunta del usuario:\n{}",
            context_text, prompt
        );

        let agent = client
            .agent(model_name)
            .preamble(SYSTEM_PROMPT)
            .context(&full_context)
            .build();

        let answer = agent.prompt(prompt).await?;
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_provider_reports_unavailable() {
        let provider = AiProvider::disabled();
        assert!(!provider.is_available());
        assert_eq!(provider.provider_name(), None);
    }

    #[test]
    fn generate_without_provider_fails() {
        let provider = AiProvider::disabled();
        let result = tokio_test::block_on(provider.generate("hola", &[]));
        assert!(result.is_err());
    }
}
