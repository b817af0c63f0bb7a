//! Modelos de dominio (respuesta del pipeline, feedback y estadísticas).

use serde::{Deserialize, Serialize};

use crate::processor::{Complexity, Intent, QuestionType, Style};

/// Un turno del diálogo generado.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueTurn {
    pub speaker: String,
    pub text: String,
}

impl DialogueTurn {
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: "assistant".to_string(),
            text: text.into(),
        }
    }
}

/// Respuesta completa de una consulta.
/// Es la unidad que viaja por la API, se guarda en el feedback y alimenta
/// el aprendizaje.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerResponse {
    pub id: String,
    pub query: String,
    pub intent: Intent,
    /// Primeras 5 keywords, usadas como temas de la consulta.
    pub topics: Vec<String>,
    pub keywords: Vec<String>,
    pub complexity: Complexity,
    pub question_type: QuestionType,
    /// Facts consolidados: sin duplicados, orden de relevancia descendente.
    pub facts: Vec<String>,
    pub summary: String,
    /// Etiquetas de procedencia, deduplicadas conservando el orden.
    pub sources: Vec<String>,
    pub style: Style,
    pub dialogue: Vec<DialogueTurn>,
    /// Cuerpo de la respuesta: prosa del proveedor de IA o plantilla determinista.
    pub response_text: String,
    pub confidence: f64,
    /// "openai" / "gemini" / "ollama" o "fallback" si no hay IA disponible.
    pub ai_provider: String,
    pub learning_stats: LearningStats,
}

/// Resultado del pipeline: el contrato de `Crawler::run`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub prompt: String,
    pub response: CrawlerResponse,
}

/// Registro de feedback del usuario, append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub prompt: String,
    pub response: CrawlerResponse,
    pub useful: bool,
    pub timestamp: String,
}

/// Estadísticas del sistema de aprendizaje.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningStats {
    pub total_feedback: usize,
    pub positive_feedback: usize,
    pub learned_topics: usize,
    pub learned_facts: usize,
}

/// Información del sistema expuesta en /api/stats.
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub ai_provider: Option<String>,
    pub cache_enabled: bool,
    pub version: &'static str,
}
