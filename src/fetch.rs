//! Fuentes de evidencia: base de conocimiento local, índice entrenado,
//! búsqueda web en vivo y generador de respaldo.
//!
//! Las fuentes se consultan en orden de prioridad fijo con corte al alcanzar
//! el umbral de resultados; cualquier fallo de red, parseo o timeout se traga
//! localmente y cuenta como cero resultados. La caché de consultas, si está
//! activa, envuelve toda la fase de búsqueda.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::{CachedSearch, QueryCache, CACHE_TTL_HOURS};
use crate::config::AppConfig;
use crate::extract::{extract_fragments, is_valid_fragment};
use crate::index::Retriever;
use crate::knowledge;
use crate::learning::LearningStore;

/// Etiqueta de procedencia del índice entrenado.
pub const INDEX_SOURCE_LABEL: &str = "Índice local";
/// Etiqueta de procedencia del generador de respaldo.
pub const FALLBACK_SOURCE_LABEL: &str = "Sistema de respaldo";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const DUCKDUCKGO_URL: &str = "https://html.duckduckgo.com/html/";
const WIKIPEDIA_API_URL: &str = "https://es.wikipedia.org/w/api.php";

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Resultado de una fuente: fragmentos y etiquetas de procedencia de igual
/// longitud.
pub type SearchHits = (Vec<String>, Vec<String>);

/// Proveedor de fragmentos candidatos.
///
/// Los fallos nunca se propagan: una fuente que no puede responder devuelve
/// listas vacías y el orquestador pasa a la siguiente.
#[async_trait]
pub trait EvidenceSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(&self, query: &str, keywords: &[String]) -> SearchHits;
}

// ---------------------------------------------------------------------
// Base de conocimiento local
// ---------------------------------------------------------------------

pub struct KnowledgeBaseSource {
    learning: Arc<LearningStore>,
}

impl KnowledgeBaseSource {
    pub fn new(learning: Arc<LearningStore>) -> Self {
        Self { learning }
    }
}

#[async_trait]
impl EvidenceSource for KnowledgeBaseSource {
    fn name(&self) -> &'static str {
        "base de conocimiento"
    }

    async fn search(&self, _query: &str, keywords: &[String]) -> SearchHits {
        let learned = self.learning.load_learned();
        knowledge::search_knowledge_base(keywords, &learned)
    }
}

// ---------------------------------------------------------------------
// Índice entrenado (opcional)
// ---------------------------------------------------------------------

pub struct TrainedIndexSource {
    retriever: Option<Retriever>,
    topk: usize,
}

impl TrainedIndexSource {
    /// Carga el recuperador si los artefactos existen; si no, la fuente queda
    /// inactiva y siempre devuelve vacío.
    pub fn new(cfg: &AppConfig) -> Self {
        let retriever = match Retriever::load(&cfg.data_dir) {
            Ok(r) => {
                info!("Índice entrenado cargado.");
                Some(r)
            }
            Err(e) => {
                debug!("Índice entrenado no disponible: {e}");
                None
            }
        };
        Self {
            retriever,
            topk: cfg.max_search_results,
        }
    }
}

#[async_trait]
impl EvidenceSource for TrainedIndexSource {
    fn name(&self) -> &'static str {
        "índice entrenado"
    }

    async fn search(&self, query: &str, _keywords: &[String]) -> SearchHits {
        let Some(retriever) = &self.retriever else {
            return (Vec::new(), Vec::new());
        };

        let mut fragments = Vec::new();
        let mut sources = Vec::new();
        for doc in retriever.retrieve(query, self.topk) {
            debug!("Índice: {:.3} para el tema '{}'.", doc.score, doc.topic);
            if is_valid_fragment(&doc.text) {
                fragments.push(doc.text);
                sources.push(INDEX_SOURCE_LABEL.to_string());
            }
        }
        (fragments, sources)
    }
}

// ---------------------------------------------------------------------
// Búsqueda web en vivo
// ---------------------------------------------------------------------

pub struct LiveFetchSource {
    http: Option<reqwest::Client>,
    max_results: usize,
}

impl LiveFetchSource {
    pub fn new(cfg: &AppConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.fetch_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| warn!("No se pudo construir el cliente HTTP: {e}"))
            .ok();

        Self {
            http,
            max_results: cfg.max_search_results,
        }
    }

    async fn search_duckduckgo(&self, http: &reqwest::Client, query: &str) -> SearchHits {
        let mut fragments = Vec::new();
        let mut sources = Vec::new();

        let url = match Url::parse_with_params(DUCKDUCKGO_URL, &[("q", query)]) {
            Ok(url) => url,
            Err(_) => return (fragments, sources),
        };

        match http.get(url).send().await {
            Ok(response) if response.status().is_success() => {
                if let Ok(html) = response.text().await {
                    for fragment in extract_fragments(&html).into_iter().take(10) {
                        fragments.push(fragment);
                        sources.push("DuckDuckGo".to_string());
                    }
                }
            }
            Ok(response) => debug!("DuckDuckGo devolvió estado {}", response.status()),
            Err(e) => debug!("Fallo de red en DuckDuckGo: {e}"),
        }

        (fragments, sources)
    }

    async fn search_wikipedia(&self, http: &reqwest::Client, query: &str) -> SearchHits {
        let mut fragments = Vec::new();
        let mut sources = Vec::new();

        let request = http.get(WIKIPEDIA_API_URL).query(&[
            ("action", "query"),
            ("list", "search"),
            ("srsearch", query),
            ("format", "json"),
            ("utf8", "1"),
            ("srlimit", "3"),
        ]);

        let data: serde_json::Value = match request.send().await {
            Ok(response) => match response.json().await {
                Ok(data) => data,
                Err(e) => {
                    debug!("Respuesta de Wikipedia no parseable: {e}");
                    return (fragments, sources);
                }
            },
            Err(e) => {
                debug!("Fallo de red en Wikipedia: {e}");
                return (fragments, sources);
            }
        };

        if let Some(results) = data["query"]["search"].as_array() {
            for result in results.iter().take(3) {
                let snippet = result["snippet"].as_str().unwrap_or_default();
                let clean = TAG_RE.replace_all(snippet, "").into_owned();
                if is_valid_fragment(&clean) {
                    let title = result["title"].as_str().unwrap_or("Artículo");
                    fragments.push(clean);
                    sources.push(format!("Wikipedia: {title}"));
                }
            }
        }

        (fragments, sources)
    }
}

#[async_trait]
impl EvidenceSource for LiveFetchSource {
    fn name(&self) -> &'static str {
        "búsqueda web"
    }

    async fn search(&self, _query: &str, keywords: &[String]) -> SearchHits {
        let Some(http) = &self.http else {
            return (Vec::new(), Vec::new());
        };

        let search_query = keywords
            .iter()
            .take(5)
            .cloned()
            .collect::<Vec<_>>()
            .join(" ");
        if search_query.is_empty() {
            return (Vec::new(), Vec::new());
        }

        let (mut fragments, mut sources) = self.search_duckduckgo(http, &search_query).await;

        if fragments.len() < self.max_results {
            let (wiki_fragments, wiki_sources) =
                self.search_wikipedia(http, &search_query).await;
            fragments.extend(wiki_fragments);
            sources.extend(wiki_sources);
        }

        (fragments, sources)
    }
}

// ---------------------------------------------------------------------
// Generador de respaldo
// ---------------------------------------------------------------------

pub struct FallbackSource;

#[async_trait]
impl EvidenceSource for FallbackSource {
    fn name(&self) -> &'static str {
        "sistema de respaldo"
    }

    async fn search(&self, query: &str, keywords: &[String]) -> SearchHits {
        let kw = keywords
            .first()
            .map(String::as_str)
            .unwrap_or("este tema");

        let fragments = vec![
            format!("Basándome en tu consulta sobre '{query}', puedo ofrecerte información general."),
            format!("El tema de '{kw}' es amplio y tiene múltiples perspectivas."),
            format!("Para obtener información más específica sobre '{query}', te recomiendo precisar tu pregunta."),
        ];
        let sources = vec![FALLBACK_SOURCE_LABEL.to_string(); fragments.len()];

        (fragments, sources)
    }
}

// ---------------------------------------------------------------------
// Orquestador
// ---------------------------------------------------------------------

/// Consulta las fuentes en orden de prioridad, con caché y corte por umbral.
pub struct ContentFetcher {
    sources: Vec<Box<dyn EvidenceSource>>,
    fallback: FallbackSource,
    cache: Option<QueryCache>,
    max_results: usize,
}

impl ContentFetcher {
    /// Orden de prioridad canónico: base de conocimiento → índice entrenado →
    /// búsqueda web → respaldo.
    pub fn new(cfg: &AppConfig, learning: Arc<LearningStore>) -> Self {
        let sources: Vec<Box<dyn EvidenceSource>> = vec![
            Box::new(KnowledgeBaseSource::new(learning)),
            Box::new(TrainedIndexSource::new(cfg)),
            Box::new(LiveFetchSource::new(cfg)),
        ];

        let cache = if cfg.use_cache {
            QueryCache::new(cfg.data_dir.join("cache"), CACHE_TTL_HOURS)
                .map_err(|e| warn!("Caché deshabilitada: {e}"))
                .ok()
        } else {
            None
        };

        Self {
            sources,
            fallback: FallbackSource,
            cache,
            max_results: cfg.max_search_results,
        }
    }

    #[cfg(test)]
    fn with_sources(
        sources: Vec<Box<dyn EvidenceSource>>,
        cache: Option<QueryCache>,
        max_results: usize,
    ) -> Self {
        Self {
            sources,
            fallback: FallbackSource,
            cache,
            max_results,
        }
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Ejecuta la fase de búsqueda completa para una query.
    pub async fn search(&self, query: &str, keywords: &[String]) -> SearchHits {
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(query) {
                debug!("Caché: acierto para la consulta.");
                return (hit.fragments, hit.sources);
            }
        }

        let mut fragments = Vec::new();
        let mut sources = Vec::new();

        for source in &self.sources {
            if fragments.len() >= self.max_results {
                break;
            }
            let (hits, labels) = source.search(query, keywords).await;
            if !hits.is_empty() {
                debug!("Fuente '{}': {} fragmentos.", source.name(), hits.len());
            }
            fragments.extend(hits);
            sources.extend(labels);
        }

        if fragments.is_empty() {
            let (hits, labels) = self.fallback.search(query, keywords).await;
            fragments = hits;
            sources = labels;
        }

        fragments.truncate(self.max_results);
        sources.truncate(self.max_results);

        if let Some(cache) = &self.cache {
            cache.set(
                query,
                &CachedSearch {
                    fragments: fragments.clone(),
                    sources: sources.clone(),
                },
            );
        }

        (fragments, sources)
    }
}
