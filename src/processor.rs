//! Análisis léxico del prompt: intención, keywords, entidades, complejidad,
//! tipo de pregunta y estilo de respuesta.
//!
//! Todo el análisis es heurístico (tablas de patrones y regex); no hay ningún
//! modelo de lenguaje entrenado en este módulo.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Stopwords en español.
pub(crate) const STOPWORDS: &[&str] = &[
    "de", "la", "el", "los", "las", "y", "o", "a", "en", "por", "para", "con", "sin", "que",
    "un", "una", "su", "sus", "al", "del", "es", "mi", "tu", "pero", "como", "si", "no",
    "más", "muy", "este", "ese",
];

/// Intención detectada en el prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    #[serde(rename = "explicación")]
    Explicacion,
    #[serde(rename = "comparación")]
    Comparacion,
    #[serde(rename = "procedimiento")]
    Procedimiento,
    #[serde(rename = "causas")]
    Causas,
    #[serde(rename = "ejemplos")]
    Ejemplos,
    #[serde(rename = "actualidad")]
    Actualidad,
    #[serde(rename = "listado")]
    Listado,
    #[serde(rename = "consulta_general")]
    ConsultaGeneral,
}

/// Tabla de patrones de intención. El orden de la tabla decide los empates.
const INTENT_PATTERNS: &[(Intent, &[&str])] = &[
    (Intent::Explicacion, &["qué es", "que es", "explica", "definir", "definición"]),
    (Intent::Comparacion, &["diferencia", "comparar", "vs", "versus", "mejor que"]),
    (Intent::Procedimiento, &["cómo", "como", "pasos", "tutorial", "guía"]),
    (Intent::Causas, &["por qué", "porque", "razón", "motivo", "causa"]),
    (Intent::Ejemplos, &["ejemplo", "ejemplos", "caso", "demostración"]),
    (Intent::Actualidad, &["actual", "últimas", "reciente", "hoy", "ahora"]),
    (Intent::Listado, &["lista", "enumera", "cuáles", "tipos", "categorías"]),
];

/// Complejidad estimada de la consulta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Complexity {
    #[serde(rename = "baja")]
    Baja,
    #[serde(rename = "media")]
    Media,
    #[serde(rename = "alta")]
    Alta,
    #[serde(rename = "muy_alta")]
    MuyAlta,
}

/// Tipo de pregunta, clasificado por cadena de prioridad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Closed,
    Definition,
    Procedural,
    Causal,
    Comparative,
    Open,
}

/// Estilo de respuesta. Taxonomía canónica de nueve valores (ver DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    News,
    Historical,
    Formula,
    Tutor,
    Technical,
    Recommendation,
    Explain,
    Overview,
    Casual,
}

/// Resultado del análisis léxico. Se crea una vez por consulta y después
/// es de sólo lectura.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedQuery {
    pub intent: Intent,
    pub keywords: Vec<String>,
    /// Sólo las categorías con coincidencias están presentes.
    pub entities: BTreeMap<String, Vec<String>>,
    pub complexity: Complexity,
    pub question_type: QuestionType,
    pub style: Style,
}

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[\wáéíóúñü]+\b").unwrap());
static QUOTED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]+)"|'([^']+)'"#).unwrap());
static PROPER_NOUN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-ZÁÉÍÓÚÜ][a-záéíóúñü]+(?:\s+[A-ZÁÉÍÓÚÜ][a-záéíóúñü]+)*\b").unwrap()
});
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{1,4}\b").unwrap());
static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{4}\b|\b\d{1,2}/\d{1,2}/\d{2,4}\b").unwrap());
static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://[^\s]+|www\.[^\s]+").unwrap());
static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(1[0-9]{3}|20[0-9]{2})\b").unwrap());
static MATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[=∫Σ√π\^]|deriv|derivada|integral|demostr").unwrap());

/// Procesador de texto del prompt.
pub struct TextProcessor {
    prompt: String,
    lower: String,
}

impl TextProcessor {
    pub fn new(prompt: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            lower: prompt.to_lowercase(),
        }
    }

    /// Análisis completo del prompt.
    pub fn process(&self) -> ProcessedQuery {
        let keywords = self.extract_keywords();
        let style = self.classify_style(&keywords);

        ProcessedQuery {
            intent: self.extract_intent(),
            entities: self.extract_entities(),
            complexity: self.assess_complexity(&keywords),
            question_type: self.classify_question_type(),
            style,
            keywords,
        }
    }

    /// Puntúa cada intención por apariciones de sus patrones; gana la de mayor
    /// puntuación y los empates los decide el orden de la tabla.
    fn extract_intent(&self) -> Intent {
        let mut best = Intent::ConsultaGeneral;
        let mut best_score = 0usize;

        for (intent, patterns) in INTENT_PATTERNS {
            let score = patterns.iter().filter(|p| self.lower.contains(**p)).count();
            if score > best_score {
                best_score = score;
                best = *intent;
            }
        }

        best
    }

    /// Tokeniza, filtra stopwords y tokens cortos, añade frases clave y
    /// devuelve las 15 keywords mejor puntuadas.
    fn extract_keywords(&self) -> Vec<String> {
        let base: Vec<String> = TOKEN_RE
            .find_iter(&self.lower)
            .map(|m| m.as_str().to_string())
            .filter(|t| !STOPWORDS.contains(&t.as_str()) && t.chars().count() >= 3)
            .collect();

        let phrases = self.extract_key_phrases();

        // Recuento estilo Counter: conserva el orden de primera aparición
        // para desempatar de forma estable.
        let mut order: Vec<String> = Vec::new();
        let mut scores: HashMap<String, usize> = HashMap::new();
        for kw in base.iter().chain(phrases.iter()) {
            if !scores.contains_key(kw) {
                order.push(kw.clone());
            }
            *scores.entry(kw.clone()).or_insert(0) += 1;
        }

        // Bonus posicional: las primeras 5 keywords del texto pesan más.
        for (i, kw) in base.iter().take(5).enumerate() {
            if let Some(score) = scores.get_mut(kw) {
                *score += 5 - i;
            }
        }

        let mut ranked = order;
        ranked.sort_by_key(|kw| std::cmp::Reverse(scores[kw]));
        ranked.truncate(15);
        ranked
    }

    /// Frases entre comillas y secuencias de nombres propios, en minúsculas.
    fn extract_key_phrases(&self) -> Vec<String> {
        let mut phrases = Vec::new();

        for cap in QUOTED_RE.captures_iter(&self.prompt) {
            let quoted = cap.get(1).or_else(|| cap.get(2));
            if let Some(q) = quoted {
                let phrase = q.as_str().to_lowercase();
                if !phrase.is_empty() {
                    phrases.push(phrase);
                }
            }
        }

        for m in PROPER_NOUN_RE.find_iter(&self.prompt) {
            phrases.push(m.as_str().to_lowercase());
        }

        phrases.truncate(10);
        phrases
    }

    /// Captura números, fechas, citas y URLs. Las categorías sin coincidencias
    /// no aparecen en el mapa.
    fn extract_entities(&self) -> BTreeMap<String, Vec<String>> {
        let mut entities = BTreeMap::new();

        let numbers: Vec<String> = NUMBER_RE
            .find_iter(&self.prompt)
            .map(|m| m.as_str().to_string())
            .collect();
        if !numbers.is_empty() {
            entities.insert("numbers".to_string(), numbers);
        }

        let dates: Vec<String> = DATE_RE
            .find_iter(&self.prompt)
            .map(|m| m.as_str().to_string())
            .collect();
        if !dates.is_empty() {
            entities.insert("dates".to_string(), dates);
        }

        let quotes: Vec<String> = QUOTED_RE
            .captures_iter(&self.prompt)
            .filter_map(|cap| cap.get(1).or_else(|| cap.get(2)))
            .map(|m| m.as_str().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if !quotes.is_empty() {
            entities.insert("quotes".to_string(), quotes);
        }

        let urls: Vec<String> = URL_RE
            .find_iter(&self.prompt)
            .map(|m| m.as_str().to_string())
            .collect();
        if !urls.is_empty() {
            entities.insert("urls".to_string(), urls);
        }

        entities
    }

    /// Puntuación aditiva por palabras, keywords y signos de interrogación,
    /// con umbrales fijos para los cuatro niveles.
    fn assess_complexity(&self, keywords: &[String]) -> Complexity {
        let mut score = 0;

        let word_count = self.lower.split_whitespace().count();
        if word_count > 20 {
            score += 3;
        } else if word_count > 10 {
            score += 2;
        } else if word_count > 5 {
            score += 1;
        }

        if keywords.len() > 10 {
            score += 2;
        } else if keywords.len() > 5 {
            score += 1;
        }

        if self.lower.matches('?').count() > 1 {
            score += 2;
        }

        match score {
            s if s >= 7 => Complexity::MuyAlta,
            s if s >= 5 => Complexity::Alta,
            s if s >= 3 => Complexity::Media,
            _ => Complexity::Baja,
        }
    }

    /// Cadena de prioridad: cerrada → definición → procedimental → causal →
    /// comparativa → abierta.
    fn classify_question_type(&self) -> QuestionType {
        if ["es", "son", "tiene", "hay"].iter().any(|w| self.lower.starts_with(w)) {
            return QuestionType::Closed;
        }

        if self.lower.contains("qué es") || self.lower.contains("definición") {
            return QuestionType::Definition;
        }

        if self.lower.starts_with("cómo") || self.lower.starts_with("como")
            || self.lower.contains("pasos")
        {
            return QuestionType::Procedural;
        }

        if self.lower.contains("por qué") {
            return QuestionType::Causal;
        }

        if ["diferencia", "comparar", "mejor"].iter().any(|w| self.lower.contains(w)) {
            return QuestionType::Comparative;
        }

        QuestionType::Open
    }

    /// Cadena de prioridad de estilos. La comprobación de definiciones va antes
    /// que la técnica: una pregunta "qué es X" sobre un tema de programación
    /// se responde como explicación, no como ficha técnica.
    fn classify_style(&self, keywords: &[String]) -> Style {
        let lower = &self.lower;

        if ["noticias", "últimas", "último", "reciente"].iter().any(|w| lower.contains(w)) {
            return Style::News;
        }

        let historical_markers = [
            "qué pasó", "que pasó", "acontecimiento", "batalla", "revolución", "guerra",
            "nació", "murió", "fundó", "fundación",
        ];
        if YEAR_RE.is_match(lower) || historical_markers.iter().any(|w| lower.contains(w)) {
            return Style::Historical;
        }

        if ["fórmula", "formula", "ecuación", "teorema"].iter().any(|w| lower.contains(w))
            || MATH_RE.is_match(lower)
        {
            return Style::Formula;
        }

        let tutor_markers = [
            "cómo", "como", "ejemplo", "pasos", "tutorial", "programa", "codigo", "código",
        ];
        if tutor_markers.iter().any(|w| lower.contains(w)) {
            return Style::Tutor;
        }

        let explain_markers = [
            "qué es", "que es", "definición", "definicion", "explica", "explicar",
        ];
        if explain_markers.iter().any(|w| lower.contains(w)) {
            return Style::Explain;
        }

        let technical_keywords = ["python", "javascript", "programacion", "programación", "api", "json"];
        if keywords.iter().any(|k| technical_keywords.contains(&k.as_str())) {
            return Style::Technical;
        }

        if ["mejor", "recomienda", "comprar", "recomendación"].iter().any(|w| lower.contains(w)) {
            return Style::Recommendation;
        }

        let overview_markers = [
            "introducción", "introduccion", "resumen", "visión general", "vision general",
            "tema", "concepto",
        ];
        if overview_markers.iter().any(|w| lower.contains(w)) {
            return Style::Overview;
        }

        Style::Casual
    }
}
