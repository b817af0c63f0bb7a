//! Extracción de contenido: convierte marcado HTML en fragmentos de texto
//! plano, filtrando ruido estructural, de navegación y anti-bot.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// Máximo de fragmentos devueltos por documento.
const MAX_FRAGMENTS: usize = 25;

/// Señales de ruido típicas (captchas, errores, navegación).
const NOISE_PATTERNS: &[&str] = &[
    "captcha", "recaptcha", "challenge", "verify", "robot",
    "javascript required", "enable javascript", "cookies required",
    "access denied", "403", "404", "error", "blocked",
];

static SCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").unwrap());
static STYLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").unwrap());
static SENTENCE_END_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+").unwrap());

/// Limpia HTML de scripts y estilos.
pub fn clean_html(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let without_scripts = SCRIPT_RE.replace_all(html, "");
    STYLE_RE.replace_all(&without_scripts, "").into_owned()
}

/// Valida si un fragmento es relevante: longitud entre 40 y 1000 caracteres,
/// sin señales de ruido y con al menos un 50% de caracteres alfabéticos.
pub fn is_valid_fragment(text: &str) -> bool {
    let char_count = text.chars().count();
    if char_count < 40 || char_count > 1000 {
        return false;
    }

    let lower = text.to_lowercase();
    if NOISE_PATTERNS.iter().any(|noise| lower.contains(noise)) {
        return false;
    }

    let alpha_count = text.chars().filter(|c| c.is_alphabetic()).count();
    if alpha_count * 2 < char_count {
        return false;
    }

    true
}

/// Extrae fragmentos de texto del HTML.
///
/// Primero intenta extracción estructurada (párrafos, listas, encabezados,
/// definiciones, artículos y secciones); si no produce nada, cae al texto del
/// body troceado por puntuación de fin de frase. Ambas rutas aplican los
/// mismos filtros de longitud y ruido.
pub fn extract_fragments(html: &str) -> Vec<String> {
    if html.is_empty() {
        return Vec::new();
    }

    let html = clean_html(html);
    let document = Html::parse_document(&html);

    let mut fragments = extract_structured(&document);

    if fragments.is_empty() {
        fragments = extract_from_body(&document);
    }

    fragments.truncate(MAX_FRAGMENTS);
    fragments
}

fn extract_structured(document: &Html) -> Vec<String> {
    let mut fragments = Vec::new();

    // (selector, límite por documento)
    let targets: &[(&str, usize)] = &[
        ("p", 20),
        ("li", 15),
        ("h1, h2, h3", 10),
        ("article", 5),
        ("section", 5),
    ];

    for (css, limit) in targets {
        let selector = Selector::parse(css).expect("selector estático inválido");
        for element in document.select(&selector).take(*limit) {
            if in_excluded_container(&element) {
                continue;
            }
            let text = collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "));
            if is_valid_fragment(&text) {
                fragments.push(text);
            }
        }
    }

    // Pares de definición dt/dd.
    let dt_selector = Selector::parse("dt").expect("selector estático inválido");
    for dt in document.select(&dt_selector).take(10) {
        if let Some(dd) = dt
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "dd")
        {
            let term = collapse_whitespace(&dt.text().collect::<Vec<_>>().join(" "));
            let definition = collapse_whitespace(&dd.text().collect::<Vec<_>>().join(" "));
            let text = format!("{term}: {definition}");
            if is_valid_fragment(&text) {
                fragments.push(text);
            }
        }
    }

    fragments
}

/// Fallback: texto del body troceado por fin de frase.
fn extract_from_body(document: &Html) -> Vec<String> {
    let body_selector = Selector::parse("body").expect("selector estático inválido");
    let Some(body) = document.select(&body_selector).next() else {
        return Vec::new();
    };

    let text = collapse_whitespace(&body.text().collect::<Vec<_>>().join(" "));
    if text.is_empty() {
        return Vec::new();
    }

    split_sentences(&text)
        .into_iter()
        .filter(|s| is_valid_fragment(s))
        .collect()
}

fn in_excluded_container(element: &ElementRef) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| matches!(a.value().name(), "nav" | "footer" | "header" | "aside"))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for boundary in SENTENCE_END_RE.find_iter(text) {
        // +1 incluye el signo de puntuación (siempre ASCII).
        let end = boundary.start() + 1;
        let sentence = text[start..end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        start = boundary.end();
    }

    if start < text.len() {
        let tail = text[start..].trim();
        if !tail.is_empty() {
            sentences.push(tail.to_string());
        }
    }

    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_paragraphs_and_list_items() {
        let html = "<html><body>\
            <p>Python es un lenguaje de programación interpretado y multipropósito.</p>\
            <li>El aprendizaje automático permite que los sistemas mejoren con la experiencia.</li>\
            </body></html>";
        let fragments = extract_fragments(html);
        assert_eq!(fragments.len(), 2);
        assert!(fragments[0].contains("Python"));
    }

    #[test]
    fn strips_scripts_and_styles() {
        let html = "<html><body>\
            <script>var x = 'este texto de script jamás debería aparecer en la salida';</script>\
            <style>.clase { color: red; } /* comentario largo para superar el filtro */</style>\
            <p>La fotosíntesis transforma la energía lumínica en energía química aprovechable.</p>\
            </body></html>";
        let fragments = extract_fragments(html);
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].contains("fotosíntesis"));
    }

    #[test]
    fn filters_noise_fragments() {
        let noise = "Please complete the following challenge to continue. \
                     reCAPTCHA verification required now.";
        assert!(!is_valid_fragment(noise));

        let html = format!("<html><body><p>{noise}</p></body></html>");
        let fragments = extract_fragments(&html);
        assert!(fragments.iter().all(|f| !f.contains("reCAPTCHA")));
    }

    #[test]
    fn filters_short_long_and_low_alpha_fragments() {
        assert!(!is_valid_fragment("demasiado corto"));
        assert!(!is_valid_fragment(&"x".repeat(1001)));
        assert!(!is_valid_fragment(
            "1234567890 1234567890 1234567890 1234567890 1234567890"
        ));
        assert!(is_valid_fragment(
            "Una oración perfectamente normal con suficiente longitud y contenido útil."
        ));
    }

    #[test]
    fn body_fallback_splits_sentences() {
        let html = "<html><body>La primera oración tiene contenido suficiente para pasar \
                    el filtro de longitud establecido. La segunda oración también aporta \
                    información relevante y bien formada para el lector.</body></html>";
        let fragments = extract_fragments(html);
        assert_eq!(fragments.len(), 2);
        assert!(fragments[0].ends_with('.'));
    }

    #[test]
    fn skips_navigation_containers() {
        let html = "<html><body>\
            <nav><p>Inicio Productos Servicios Contacto Blog Documentación Soporte Clientes</p></nav>\
            <p>El contenido principal de la página describe el producto con bastante detalle.</p>\
            </body></html>";
        let fragments = extract_fragments(html);
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].contains("contenido principal"));
    }

    #[test]
    fn empty_input_yields_no_fragments() {
        assert!(extract_fragments("").is_empty());
    }
}
