//! Sistema de aprendizaje continuo: registro de feedback y promoción de
//! oraciones bien valoradas a la capa aprendida de la base de conocimiento.
//!
//! Ambos ficheros se reescriben completos en cada operación; las escrituras
//! concurrentes de feedback pueden perder una actualización (limitación
//! aceptada).

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::models::{CrawlerResponse, FeedbackRecord, LearningStats};

/// Longitud mínima de una oración para ser promovida a conocimiento aprendido.
const MIN_LEARNED_SENTENCE_CHARS: usize = 30;

static SENTENCE_SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+").unwrap());

/// Almacén de feedback y conocimiento aprendido.
pub struct LearningStore {
    feedback_file: PathBuf,
    learned_file: PathBuf,
}

impl LearningStore {
    /// Crea el almacén asegurando que exista el directorio de datos.
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("No se pudo crear el directorio de datos {data_dir:?}"))?;

        Ok(Self {
            feedback_file: data_dir.join("feedback.json"),
            learned_file: data_dir.join("learned_knowledge.json"),
        })
    }

    /// Añade un registro de feedback; si fue útil, aprende de la respuesta.
    pub fn add_feedback(&self, prompt: &str, response: &CrawlerResponse, useful: bool) {
        let record = FeedbackRecord {
            prompt: prompt.to_string(),
            response: response.clone(),
            useful,
            timestamp: Utc::now().to_rfc3339(),
        };

        let mut records = self.load_feedback();
        records.push(record);
        self.save_json(&self.feedback_file, &records);

        if useful {
            self.learn_from(response);
        }
    }

    /// Promociona oraciones largas del texto de respuesta bajo las primeras
    /// keywords. Idempotente: una oración ya presente bajo un tema no se
    /// vuelve a añadir.
    fn learn_from(&self, response: &CrawlerResponse) {
        let sentences: Vec<String> = SENTENCE_SPLIT_RE
            .split(&response.response_text)
            .map(|s| s.trim().to_string())
            .filter(|s| s.chars().count() > MIN_LEARNED_SENTENCE_CHARS)
            .collect();

        if sentences.is_empty() {
            return;
        }

        let mut learned = self.load_learned();

        for keyword in response.keywords.iter().take(3) {
            let topic = keyword.to_lowercase();
            let facts = learned.entry(topic).or_default();
            for sentence in sentences.iter().take(3) {
                if !facts.contains(sentence) {
                    facts.push(sentence.clone());
                }
            }
        }

        self.save_json(&self.learned_file, &learned);
    }

    /// Carga la capa aprendida (tema → oraciones).
    pub fn load_learned(&self) -> BTreeMap<String, Vec<String>> {
        self.load_json(&self.learned_file)
    }

    fn load_feedback(&self) -> Vec<FeedbackRecord> {
        self.load_json(&self.feedback_file)
    }

    /// Estadísticas derivadas de los ficheros persistidos.
    pub fn stats(&self) -> LearningStats {
        let feedback = self.load_feedback();
        let learned = self.load_learned();

        LearningStats {
            total_feedback: feedback.len(),
            positive_feedback: feedback.iter().filter(|r| r.useful).count(),
            learned_topics: learned.len(),
            learned_facts: learned.values().map(Vec::len).sum(),
        }
    }

    fn load_json<T: serde::de::DeserializeOwned + Default>(&self, path: &PathBuf) -> T {
        match fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Fichero {path:?} corrupto, se trata como estado vacío: {e}");
                T::default()
            }),
            Err(_) => T::default(),
        }
    }

    fn save_json<T: serde::Serialize>(&self, path: &PathBuf, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(raw) => {
                if let Err(e) = fs::write(path, raw) {
                    warn!("No se pudo escribir {path:?}: {e}");
                }
            }
            Err(e) => warn!("No se pudo serializar {path:?}: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DialogueTurn;
    use crate::processor::{Complexity, Intent, QuestionType, Style};
    use tempfile::TempDir;

    fn sample_response(response_text: &str, keywords: &[&str]) -> CrawlerResponse {
        CrawlerResponse {
            id: "prueba".to_string(),
            query: "¿qué es python?".to_string(),
            intent: Intent::Explicacion,
            topics: keywords.iter().map(|k| k.to_string()).collect(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            complexity: Complexity::Baja,
            question_type: QuestionType::Definition,
            facts: vec![],
            summary: String::new(),
            sources: vec![],
            style: Style::Explain,
            dialogue: vec![DialogueTurn::assistant("hola")],
            response_text: response_text.to_string(),
            confidence: 0.5,
            ai_provider: "fallback".to_string(),
            learning_stats: LearningStats::default(),
        }
    }

    #[test]
    fn feedback_round_trip_increments_stats() {
        let dir = TempDir::new().unwrap();
        let store = LearningStore::new(dir.path().to_path_buf()).unwrap();
        let before = store.stats();

        let response = sample_response("Una respuesta corta.", &["python"]);
        store.add_feedback("¿qué es python?", &response, true);

        let after = store.stats();
        assert_eq!(after.total_feedback, before.total_feedback + 1);
        assert_eq!(after.positive_feedback, before.positive_feedback + 1);
    }

    #[test]
    fn negative_feedback_does_not_learn() {
        let dir = TempDir::new().unwrap();
        let store = LearningStore::new(dir.path().to_path_buf()).unwrap();

        let text = "Python es un lenguaje de programación con tipado dinámico y memoria gestionada.";
        store.add_feedback("consulta", &sample_response(text, &["python"]), false);

        assert!(store.load_learned().is_empty());
        assert_eq!(store.stats().positive_feedback, 0);
        assert_eq!(store.stats().total_feedback, 1);
    }

    #[test]
    fn positive_feedback_promotes_long_sentences() {
        let dir = TempDir::new().unwrap();
        let store = LearningStore::new(dir.path().to_path_buf()).unwrap();

        let text = "Python es un lenguaje de programación interpretado y multipropósito. \
                    Ok. \
                    Su filosofía hace hincapié en la legibilidad del código fuente.";
        store.add_feedback("consulta", &sample_response(text, &["python", "lenguaje"]), true);

        let learned = store.load_learned();
        let facts = &learned["python"];
        // La oración corta ("Ok") no se promueve.
        assert_eq!(facts.len(), 2);
        assert!(learned.contains_key("lenguaje"));
    }

    #[test]
    fn learning_is_idempotent_per_topic() {
        let dir = TempDir::new().unwrap();
        let store = LearningStore::new(dir.path().to_path_buf()).unwrap();

        let text = "Python es un lenguaje de programación interpretado y multipropósito.";
        let response = sample_response(text, &["python"]);
        store.add_feedback("consulta", &response, true);
        store.add_feedback("consulta", &response, true);

        let learned = store.load_learned();
        assert_eq!(learned["python"].len(), 1);
    }

    #[test]
    fn corrupt_feedback_file_loads_as_empty() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("feedback.json"), "{rotísimo").unwrap();

        let store = LearningStore::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(store.stats().total_feedback, 0);
    }
}
