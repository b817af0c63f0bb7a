//! Índice entrenado sobre la base de conocimiento: entrenador TF-IDF y
//! recuperador por similitud de coseno, con fallback por solapamiento de
//! tokens cuando faltan los artefactos del modelo vectorial.
//!
//! El entrenamiento se invoca fuera de banda (`--train`), nunca durante el
//! servicio de consultas.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::knowledge::KNOWLEDGE_BASE;
use crate::processor::STOPWORDS;

static INDEX_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[\wáéíóúñü]+\b").unwrap());

/// Documento indexado: cada hecho de la base (o documento scrapeado) es un doc.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedDoc {
    pub id: usize,
    pub topic: String,
    pub text: String,
    pub source: String,
}

/// Documento recuperado con su puntuación.
#[derive(Debug, Clone)]
pub struct RetrievedDoc {
    pub score: f64,
    pub topic: String,
    pub text: String,
    pub source: String,
}

/// Documento scrapeado pendiente de indexar (`scraped_docs.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedDoc {
    pub id: usize,
    pub url: String,
    pub title: String,
    pub text: String,
    pub source: String,
}

/// Modelo vectorial: vocabulario y pesos IDF.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorModel {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

/// Fila dispersa de la matriz ponderada: pares (índice de término, peso),
/// normalizada en L2.
type SparseRow = Vec<(usize, f64)>;

/// Resumen del entrenamiento.
#[derive(Debug, Clone, Serialize)]
pub struct TrainSummary {
    pub n_docs: usize,
    pub vocabulary_size: usize,
    pub index_dir: PathBuf,
}

fn index_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("index")
}

fn tokenize(text: &str) -> Vec<String> {
    INDEX_TOKEN_RE
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .filter(|t| t.chars().count() > 2 && !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// Carga los documentos scrapeados si existen.
pub fn load_scraped_docs(data_dir: &Path) -> Vec<ScrapedDoc> {
    let path = data_dir.join("scraped_docs.json");
    match fs::read_to_string(&path) {
        Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("scraped_docs.json corrupto, se ignora: {e}");
            Vec::new()
        }),
        Err(_) => Vec::new(),
    }
}

/// Entrenador del índice TF-IDF.
pub struct Trainer;

impl Trainer {
    /// Reconstruye los artefactos del índice a partir de la base de
    /// conocimiento integrada más el corpus scrapeado.
    pub fn train(data_dir: &Path) -> Result<TrainSummary> {
        let out_dir = index_dir(data_dir);
        fs::create_dir_all(&out_dir)
            .with_context(|| format!("No se pudo crear el directorio de índice {out_dir:?}"))?;

        // Cada hecho de la base es un documento independiente.
        let mut docs: Vec<IndexedDoc> = Vec::new();
        for (topic, facts) in KNOWLEDGE_BASE.iter() {
            for fact in facts {
                docs.push(IndexedDoc {
                    id: docs.len(),
                    topic: topic.to_string(),
                    text: fact.to_string(),
                    source: format!("KB:{topic}"),
                });
            }
        }

        for scraped in load_scraped_docs(data_dir) {
            docs.push(IndexedDoc {
                id: docs.len(),
                topic: if scraped.title.is_empty() { "scraped".to_string() } else { scraped.title },
                text: scraped.text,
                source: scraped.url,
            });
        }

        if docs.is_empty() {
            return Err(anyhow!("No hay documentos que indexar"));
        }

        let tokenized: Vec<Vec<String>> = docs.iter().map(|d| tokenize(&d.text)).collect();

        // Vocabulario y frecuencias de documento.
        let mut vocabulary: BTreeMap<String, usize> = BTreeMap::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        for tokens in &tokenized {
            let unique: HashSet<&String> = tokens.iter().collect();
            for term in unique {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
        }
        for term in doc_freq.keys() {
            let next = vocabulary.len();
            vocabulary.entry(term.clone()).or_insert(next);
        }

        // IDF suavizado: ln((1 + n) / (1 + df)) + 1.
        let n_docs = docs.len() as f64;
        let mut idf = vec![0.0; vocabulary.len()];
        for (term, &term_idx) in &vocabulary {
            let df = doc_freq[term] as f64;
            idf[term_idx] = ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0;
        }

        let model = VectorModel { vocabulary, idf };
        let matrix: Vec<SparseRow> = tokenized.iter().map(|t| model.vectorize(t)).collect();

        Self::save_json(&out_dir.join("model.json"), &model)?;
        Self::save_json(&out_dir.join("matrix.json"), &matrix)?;
        Self::save_json(&out_dir.join("docs.json"), &docs)?;

        let summary = TrainSummary {
            n_docs: docs.len(),
            vocabulary_size: model.vocabulary.len(),
            index_dir: out_dir,
        };
        info!(
            "Entrenamiento completado: {} documentos, {} términos.",
            summary.n_docs, summary.vocabulary_size
        );
        Ok(summary)
    }

    fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)
            .with_context(|| format!("No se pudo serializar {path:?}"))?;
        fs::write(path, raw).with_context(|| format!("No se pudo escribir {path:?}"))?;
        Ok(())
    }
}

impl VectorModel {
    /// Vector TF-IDF disperso y normalizado en L2 para una lista de tokens.
    fn vectorize(&self, tokens: &[String]) -> SparseRow {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for token in tokens {
            if let Some(&term_idx) = self.vocabulary.get(token) {
                *counts.entry(term_idx).or_insert(0.0) += 1.0;
            }
        }

        let mut row: SparseRow = counts
            .into_iter()
            .map(|(term_idx, tf)| (term_idx, tf * self.idf[term_idx]))
            .collect();

        let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in &mut row {
                *w /= norm;
            }
        }

        row.sort_by_key(|(term_idx, _)| *term_idx);
        row
    }
}

fn dot_sparse(a: &SparseRow, b: &SparseRow) -> f64 {
    // Ambas filas vienen ordenadas por índice de término.
    let mut score = 0.0;
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                score += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    score
}

/// Recuperador sobre los artefactos del índice.
pub struct Retriever {
    docs: Vec<IndexedDoc>,
    model: Option<VectorModel>,
    matrix: Option<Vec<SparseRow>>,
}

impl Retriever {
    /// Carga los artefactos. `docs.json` es obligatorio; si faltan el modelo
    /// o la matriz se usa el fallback por solapamiento de tokens.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let dir = index_dir(data_dir);

        let docs_raw = fs::read_to_string(dir.join("docs.json"))
            .map_err(|_| anyhow!("Documentos no encontrados. Ejecuta el entrenamiento primero."))?;
        let docs: Vec<IndexedDoc> =
            serde_json::from_str(&docs_raw).context("docs.json corrupto")?;

        let model = fs::read_to_string(dir.join("model.json"))
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok());
        let matrix = fs::read_to_string(dir.join("matrix.json"))
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok());

        Ok(Self { docs, model, matrix })
    }

    /// Recupera los `topk` documentos más relevantes con puntuación positiva.
    pub fn retrieve(&self, query: &str, topk: usize) -> Vec<RetrievedDoc> {
        if query.trim().is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(f64, &IndexedDoc)> = match (&self.model, &self.matrix) {
            (Some(model), Some(matrix)) => {
                let query_vec = model.vectorize(&tokenize(query));
                self.docs
                    .iter()
                    .zip(matrix.iter())
                    .map(|(doc, row)| (dot_sparse(&query_vec, row), doc))
                    .collect()
            }
            _ => {
                // Fallback: solapamiento simple de tokens.
                let q_tokens: HashSet<String> = tokenize(query).into_iter().collect();
                self.docs
                    .iter()
                    .map(|doc| {
                        let d_tokens: HashSet<String> = tokenize(&doc.text).into_iter().collect();
                        (q_tokens.intersection(&d_tokens).count() as f64, doc)
                    })
                    .collect()
            }
        };

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        scored
            .into_iter()
            .filter(|(score, _)| *score > 0.0)
            .take(topk)
            .map(|(score, doc)| RetrievedDoc {
                score,
                topic: doc.topic.clone(),
                text: doc.text.clone(),
                source: doc.source.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn train_writes_all_artifacts() {
        let dir = TempDir::new().unwrap();
        let summary = Trainer::train(dir.path()).unwrap();

        assert!(summary.n_docs > 0);
        assert!(dir.path().join("index/model.json").exists());
        assert!(dir.path().join("index/matrix.json").exists());
        assert!(dir.path().join("index/docs.json").exists());
    }

    #[test]
    fn retrieve_finds_relevant_documents() {
        let dir = TempDir::new().unwrap();
        Trainer::train(dir.path()).unwrap();

        let retriever = Retriever::load(dir.path()).unwrap();
        let results = retriever.retrieve("lenguaje python interpretado", 5);

        assert!(!results.is_empty());
        assert!(results.len() <= 5);
        assert!(results[0].text.to_lowercase().contains("python"));
        assert!(results.iter().all(|r| r.score > 0.0));
    }

    #[test]
    fn retrieve_falls_back_to_token_overlap() {
        let dir = TempDir::new().unwrap();
        Trainer::train(dir.path()).unwrap();
        std::fs::remove_file(dir.path().join("index/model.json")).unwrap();

        let retriever = Retriever::load(dir.path()).unwrap();
        let results = retriever.retrieve("redes neuronales", 3);

        assert!(!results.is_empty());
        assert!(results[0].text.to_lowercase().contains("neuronales"));
    }

    #[test]
    fn load_fails_without_docs() {
        let dir = TempDir::new().unwrap();
        assert!(Retriever::load(dir.path()).is_err());
    }

    #[test]
    fn train_includes_scraped_corpus() {
        let dir = TempDir::new().unwrap();
        let scraped = vec![ScrapedDoc {
            id: 0,
            url: "https://example.com/rust".to_string(),
            title: "Rust".to_string(),
            text: "Rust es un lenguaje de sistemas centrado en seguridad de memoria.".to_string(),
            source: "https://example.com/rust".to_string(),
        }];
        std::fs::write(
            dir.path().join("scraped_docs.json"),
            serde_json::to_string(&scraped).unwrap(),
        )
        .unwrap();

        Trainer::train(dir.path()).unwrap();
        let retriever = Retriever::load(dir.path()).unwrap();
        let results = retriever.retrieve("seguridad de memoria en rust", 3);

        assert!(results.iter().any(|r| r.source.contains("example.com")));
    }
}
