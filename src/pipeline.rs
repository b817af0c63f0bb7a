//! Orquestador del pipeline: analizar → buscar evidencia → consolidar →
//! componer la respuesta.
//!
//! El `Crawler` posee explícitamente todas sus dependencias (fetcher, IA,
//! almacén de aprendizaje); no hay estado global. Ningún error de fuentes o
//! de IA es fatal para una consulta: todo degrada a la siguiente alternativa.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::consolidate::consolidate;
use crate::fetch::ContentFetcher;
use crate::learning::LearningStore;
use crate::llm::AiProvider;
use crate::models::{CrawlerResponse, LearningStats, RunResult};
use crate::processor::TextProcessor;
use crate::respond::{build_dialogue, fallback_response_text, summarize};

pub struct Crawler {
    fetcher: ContentFetcher,
    ai: AiProvider,
    learning: Arc<LearningStore>,
    facts_limit: usize,
}

impl Crawler {
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let learning = Arc::new(LearningStore::new(cfg.data_dir.clone())?);
        let fetcher = ContentFetcher::new(cfg, learning.clone());
        let ai = if cfg.use_ai {
            AiProvider::from_config(cfg)
        } else {
            AiProvider::disabled()
        };
        Ok(Self::new(fetcher, ai, learning, cfg.facts_limit))
    }

    pub fn new(
        fetcher: ContentFetcher,
        ai: AiProvider,
        learning: Arc<LearningStore>,
        facts_limit: usize,
    ) -> Self {
        Self {
            fetcher,
            ai,
            learning,
            facts_limit,
        }
    }

    /// Ejecuta un ciclo completo para un prompt no vacío (precondición que
    /// valida el llamador).
    pub async fn run(&self, prompt: &str) -> RunResult {
        // 1. Análisis léxico
        let processed = TextProcessor::new(prompt).process();

        // 2. Búsqueda de evidencia (con caché y corte por umbral)
        let (fragments, raw_sources) = self.fetcher.search(prompt, &processed.keywords).await;

        // 3. Consolidación de facts
        let facts = consolidate(&fragments, &processed.keywords, self.facts_limit);

        // 4. Cuerpo de respuesta: IA generativa o plantilla determinista
        let (response_text, ai_provider) = if self.ai.is_available() {
            match self.ai.generate(prompt, &facts).await {
                Ok(text) => (
                    text,
                    self.ai.provider_name().unwrap_or("fallback").to_string(),
                ),
                Err(e) => {
                    warn!("Fallo del proveedor de IA, se usa la plantilla: {e}");
                    (fallback_response_text(&facts), "fallback".to_string())
                }
            }
        } else {
            (fallback_response_text(&facts), "fallback".to_string())
        };

        // 5. Diálogo, resumen y respuesta completa
        let dialogue = build_dialogue(prompt, &processed, &facts);
        let summary = summarize(&facts);
        let sources = dedupe_preserving_order(raw_sources);
        let confidence = calculate_confidence(&facts, &processed.keywords);

        info!(
            "Consulta procesada: estilo {:?}, {} facts, confianza {:.2}.",
            processed.style,
            facts.len(),
            confidence
        );

        let response = CrawlerResponse {
            id: Uuid::new_v4().to_string(),
            query: prompt.to_string(),
            intent: processed.intent,
            topics: processed.keywords.iter().take(5).cloned().collect(),
            keywords: processed.keywords.clone(),
            complexity: processed.complexity,
            question_type: processed.question_type,
            facts,
            summary,
            sources,
            style: processed.style,
            dialogue,
            response_text,
            confidence,
            ai_provider,
            learning_stats: self.learning.stats(),
        };

        RunResult {
            prompt: prompt.to_string(),
            response,
        }
    }

    /// Registra feedback; el efecto se limita al almacén de aprendizaje.
    pub fn add_feedback(&self, prompt: &str, response: &CrawlerResponse, useful: bool) {
        self.learning.add_feedback(prompt, response, useful);
    }

    pub fn learning_stats(&self) -> LearningStats {
        self.learning.stats()
    }

    pub fn ai_provider_name(&self) -> Option<&'static str> {
        self.ai.provider_name()
    }

    pub fn cache_enabled(&self) -> bool {
        self.fetcher.cache_enabled()
    }
}

fn dedupe_preserving_order(sources: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    sources.into_iter().filter(|s| seen.insert(s.clone())).collect()
}

/// Confianza en la respuesta: 40% por cantidad de facts (saturando en 5) y
/// 60% por relevancia de keywords, redondeada a 2 decimales.
fn calculate_confidence(facts: &[String], keywords: &[String]) -> f64 {
    if facts.is_empty() {
        return 0.0;
    }

    let fact_count_score = (facts.len() as f64 / 5.0).min(1.0);

    let relevance_score = if keywords.is_empty() {
        0.5
    } else {
        let mut matches = 0usize;
        for fact in facts {
            let fact_lower = fact.to_lowercase();
            matches += keywords
                .iter()
                .filter(|kw| fact_lower.contains(&kw.to_lowercase()))
                .count();
        }
        (matches as f64 / (keywords.len() * facts.len()) as f64).min(1.0)
    };

    let confidence = fact_count_score * 0.4 + relevance_score * 0.6;
    (confidence * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmProvider;
    use crate::knowledge::{KB_SOURCE_LABEL, KNOWLEDGE_BASE};
    use std::collections::HashSet;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn test_config(data_dir: PathBuf, use_cache: bool) -> AppConfig {
        AppConfig {
            server_addr: "127.0.0.1:0".to_string(),
            data_dir,
            use_cache,
            use_ai: false,
            fetch_timeout_secs: 1,
            max_search_results: 5,
            facts_limit: 8,
            llm_provider: LlmProvider::OpenAI,
            llm_chat_model: String::new(),
        }
    }

    fn test_crawler(dir: &TempDir, use_cache: bool) -> Crawler {
        let cfg = test_config(dir.path().to_path_buf(), use_cache);
        let learning = Arc::new(LearningStore::new(cfg.data_dir.clone()).unwrap());
        let fetcher = ContentFetcher::new(&cfg, learning.clone());
        Crawler::new(fetcher, AiProvider::disabled(), learning, cfg.facts_limit)
    }

    #[tokio::test]
    async fn facts_are_bounded_and_unique() {
        let dir = TempDir::new().unwrap();
        let crawler = test_crawler(&dir, false);

        let result = crawler.run("¿Qué es Python?").await;
        let facts = &result.response.facts;

        assert!(facts.len() <= 8);
        let unique: HashSet<&String> = facts.iter().collect();
        assert_eq!(unique.len(), facts.len());
    }

    #[tokio::test]
    async fn kb_query_returns_kb_label_and_subset() {
        let dir = TempDir::new().unwrap();
        let crawler = test_crawler(&dir, false);

        let result = crawler.run("¿Qué es Python?").await;
        let response = &result.response;

        assert!(response.sources.iter().any(|s| s == KB_SOURCE_LABEL));
        let topic_facts = &KNOWLEDGE_BASE["python"];
        assert!(response
            .facts
            .iter()
            .all(|f| topic_facts.contains(&f.as_str())));
    }

    #[tokio::test]
    async fn explain_style_end_to_end() {
        let dir = TempDir::new().unwrap();
        let crawler = test_crawler(&dir, false);

        let result = crawler.run("¿Qué es Python?").await;
        let response = &result.response;

        assert!(response.keywords.contains(&"python".to_string()));
        assert_eq!(
            serde_json::to_value(response.style).unwrap(),
            serde_json::json!("explain")
        );
        assert!(response.dialogue[0].text.contains("te lo explico"));
        assert!(response.dialogue.len() > 2);
        assert!(response.confidence > 0.0);
        assert_eq!(response.ai_provider, "fallback");
    }

    #[tokio::test]
    async fn cached_runs_return_identical_evidence() {
        let dir = TempDir::new().unwrap();
        let crawler = test_crawler(&dir, true);

        let first = crawler.run("¿Qué es Python?").await;
        let second = crawler.run("¿Qué es Python?").await;

        assert_eq!(first.response.facts, second.response.facts);
        assert_eq!(first.response.sources, second.response.sources);
    }

    #[tokio::test]
    async fn feedback_round_trip_through_crawler() {
        let dir = TempDir::new().unwrap();
        let crawler = test_crawler(&dir, false);

        let result = crawler.run("¿Qué es Python?").await;
        let before = crawler.learning_stats();

        crawler.add_feedback("¿Qué es Python?", &result.response, true);

        let after = crawler.learning_stats();
        assert_eq!(after.total_feedback, before.total_feedback + 1);
        assert_eq!(after.positive_feedback, before.positive_feedback + 1);
    }

    #[test]
    fn confidence_is_zero_without_facts() {
        assert_eq!(calculate_confidence(&[], &["python".to_string()]), 0.0);
    }

    #[test]
    fn confidence_combines_count_and_relevance() {
        let facts: Vec<String> = (0..5)
            .map(|i| format!("El dato {i} menciona python explícitamente."))
            .collect();
        let keywords = vec!["python".to_string()];
        // 5 facts saturan el componente de cantidad; relevancia completa.
        assert_eq!(calculate_confidence(&facts, &keywords), 1.0);
    }

    #[test]
    fn sources_deduplicate_preserving_order() {
        let sources = vec![
            "Base de conocimiento".to_string(),
            "DuckDuckGo".to_string(),
            "Base de conocimiento".to_string(),
        ];
        assert_eq!(
            dedupe_preserving_order(sources),
            vec!["Base de conocimiento".to_string(), "DuckDuckGo".to_string()]
        );
    }
}
