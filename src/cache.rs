//! Caché de consultas en disco con expiración.
//!
//! Cada consulta se guarda bajo una clave derivada de su hash de contenido:
//! un fichero de payload por clave más un índice con los timestamps. Las
//! entradas expiradas se tratan como ausentes y se purgan de forma perezosa.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

/// Tiempo de vida de una entrada, en horas.
pub const CACHE_TTL_HOURS: i64 = 24;

/// Payload cacheado: el resultado combinado de la fase de búsqueda.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSearch {
    pub fragments: Vec<String>,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    query: String,
    timestamp: DateTime<Utc>,
}

/// Caché de resultados de búsqueda con expiración.
pub struct QueryCache {
    cache_dir: PathBuf,
    ttl: Duration,
    index: Mutex<BTreeMap<String, IndexEntry>>,
}

impl QueryCache {
    /// Abre (o crea) la caché en `cache_dir` y purga las entradas expiradas.
    pub fn new(cache_dir: PathBuf, ttl_hours: i64) -> Result<Self> {
        fs::create_dir_all(&cache_dir)
            .with_context(|| format!("No se pudo crear el directorio de caché {cache_dir:?}"))?;

        let cache = Self {
            index: Mutex::new(Self::load_index(&cache_dir)),
            cache_dir,
            ttl: Duration::hours(ttl_hours),
        };
        cache.clear_expired();
        Ok(cache)
    }

    fn load_index(cache_dir: &PathBuf) -> BTreeMap<String, IndexEntry> {
        let index_file = cache_dir.join("index.json");
        match fs::read_to_string(&index_file) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Índice de caché corrupto, se parte de cero: {e}");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        }
    }

    fn save_index(&self, index: &BTreeMap<String, IndexEntry>) {
        let index_file = self.cache_dir.join("index.json");
        match serde_json::to_string_pretty(index) {
            Ok(raw) => {
                if let Err(e) = fs::write(&index_file, raw) {
                    warn!("No se pudo guardar el índice de caché: {e}");
                }
            }
            Err(e) => warn!("No se pudo serializar el índice de caché: {e}"),
        }
    }

    /// Clave única para una query: hash de contenido en hexadecimal.
    fn cache_key(query: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(query.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn payload_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{key}.json"))
    }

    /// Obtiene el resultado cacheado si existe y no ha expirado.
    pub fn get(&self, query: &str) -> Option<CachedSearch> {
        let key = Self::cache_key(query);

        {
            let index = self.index.lock().unwrap();
            let entry = index.get(&key)?;
            if Utc::now() - entry.timestamp > self.ttl {
                drop(index);
                self.remove(query);
                return None;
            }
        }

        let raw = fs::read_to_string(self.payload_path(&key)).ok()?;
        serde_json::from_str(&raw).ok()
    }

    /// Guarda un resultado en caché. Los fallos de escritura se registran y
    /// se ignoran: la caché es derivable y reproducible.
    pub fn set(&self, query: &str, data: &CachedSearch) {
        let key = Self::cache_key(query);

        match serde_json::to_string_pretty(data) {
            Ok(raw) => {
                if let Err(e) = fs::write(self.payload_path(&key), raw) {
                    warn!("No se pudo escribir el payload de caché: {e}");
                    return;
                }
            }
            Err(e) => {
                warn!("No se pudo serializar el payload de caché: {e}");
                return;
            }
        }

        let mut index = self.index.lock().unwrap();
        index.insert(
            key,
            IndexEntry {
                query: query.to_string(),
                timestamp: Utc::now(),
            },
        );
        self.save_index(&index);
    }

    /// Elimina la entrada de una query concreta.
    pub fn remove(&self, query: &str) {
        let key = Self::cache_key(query);
        let mut index = self.index.lock().unwrap();
        if index.remove(&key).is_some() {
            let _ = fs::remove_file(self.payload_path(&key));
            self.save_index(&index);
        }
    }

    /// Purga todas las entradas expiradas.
    pub fn clear_expired(&self) {
        let now = Utc::now();
        let mut index = self.index.lock().unwrap();

        let expired: Vec<String> = index
            .iter()
            .filter(|(_, entry)| now - entry.timestamp > self.ttl)
            .map(|(key, _)| key.clone())
            .collect();

        if expired.is_empty() {
            return;
        }

        for key in &expired {
            let _ = fs::remove_file(self.payload_path(key));
            index.remove(key);
        }
        self.save_index(&index);
    }
}
