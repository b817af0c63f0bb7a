//! Scraper para poblar `scraped_docs.json` con texto limpio, el corpus
//! adicional que consume el entrenador del índice.

use std::time::Duration;

use anyhow::{Context, Result};
use scraper::{ElementRef, Html, Selector};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::extract::clean_html;
use crate::index::{load_scraped_docs, ScrapedDoc};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Pausa entre descargas.
const FETCH_DELAY_SECS: u64 = 1;

/// Descarga cada URL, extrae su texto limpio y lo añade al corpus scrapeado.
/// Las URLs que fallan se omiten con un aviso. Devuelve cuántos documentos
/// nuevos se añadieron.
pub async fn scrape_urls(cfg: &AppConfig, urls: &[String]) -> Result<usize> {
    std::fs::create_dir_all(&cfg.data_dir).with_context(|| {
        format!("No se pudo crear el directorio de datos {:?}", cfg.data_dir)
    })?;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(cfg.fetch_timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .context("No se pudo construir el cliente HTTP")?;

    let mut docs = load_scraped_docs(&cfg.data_dir);
    let mut added = 0;

    for url in urls {
        let html = match http.get(url).send().await {
            Ok(response) => match response.error_for_status() {
                Ok(ok) => match ok.text().await {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("No se pudo leer el cuerpo de {url}: {e}");
                        continue;
                    }
                },
                Err(e) => {
                    warn!("Estado de error en {url}: {e}");
                    continue;
                }
            },
            Err(e) => {
                warn!("Fallo de red en {url}: {e}");
                continue;
            }
        };

        let text = clean_text_from_html(&html);
        if text.is_empty() {
            warn!("Sin texto útil en {url}, se omite.");
            continue;
        }

        let title = extract_title(&html);
        docs.push(ScrapedDoc {
            id: docs.len(),
            url: url.clone(),
            title,
            text,
            source: url.clone(),
        });
        added += 1;
        info!("Scrapeado {url}.");

        tokio::time::sleep(Duration::from_secs(FETCH_DELAY_SECS)).await;
    }

    let out_path = cfg.data_dir.join("scraped_docs.json");
    let raw = serde_json::to_string_pretty(&docs).context("No se pudo serializar el corpus")?;
    std::fs::write(&out_path, raw)
        .with_context(|| format!("No se pudo escribir {out_path:?}"))?;

    Ok(added)
}

/// Texto plano del documento, excluyendo scripts, estilos y contenedores de
/// navegación, con los espacios colapsados.
pub fn clean_text_from_html(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }

    let html = clean_html(html);
    let document = Html::parse_document(&html);

    let body_selector = Selector::parse("body").expect("selector estático inválido");
    let Some(body) = document.select(&body_selector).next() else {
        return String::new();
    };

    let mut out = String::new();
    for node in body.descendants() {
        if let Some(text) = node.value().as_text() {
            let excluded = node.ancestors().filter_map(ElementRef::wrap).any(|a| {
                matches!(
                    a.value().name(),
                    "nav" | "footer" | "header" | "aside" | "noscript" | "script" | "style"
                )
            });
            if !excluded {
                out.push_str(text);
                out.push(' ');
            }
        }
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn extract_title(html: &str) -> String {
    let document = Html::parse_document(html);
    let title_selector = Selector::parse("title").expect("selector estático inválido");
    document
        .select(&title_selector)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_skips_navigation_and_scripts() {
        let html = "<html><head><title>Página</title></head><body>\
            <nav>Menú principal</nav>\
            <script>var oculto = true;</script>\
            <p>Contenido visible del artículo.</p>\
            </body></html>";
        let text = clean_text_from_html(html);
        assert!(text.contains("Contenido visible"));
        assert!(!text.contains("Menú principal"));
        assert!(!text.contains("oculto"));
    }

    #[test]
    fn title_extraction() {
        let html = "<html><head><title>  Mi Título  </title></head><body></body></html>";
        assert_eq!(extract_title(html), "Mi Título");
    }
}
