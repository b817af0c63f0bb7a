//! Composición de respuestas: diálogo condicionado por el estilo, resumen
//! corto y cuerpo de respuesta determinista cuando no hay IA disponible.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::DialogueTurn;
use crate::processor::{ProcessedQuery, Style};

static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(1[0-9]{3}|20[0-9]{2})\b").unwrap());
static MATH_SYMBOL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[∫Σ√π\^]").unwrap());
static PROMPT_FORMULA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9\s\^\*/=\+\-\(\)\.]+=[A-Za-z0-9\s\^\*/=\+\-\(\)\.]+").unwrap()
});
static OPERATOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[=+\-*/^]").unwrap());

/// Resumen corto: unión de los primeros 4 facts, o la frase fija de
/// "sin resultados".
pub fn summarize(facts: &[String]) -> String {
    if facts.is_empty() {
        "No se encontraron resultados relevantes.".to_string()
    } else {
        facts.iter().take(4).cloned().collect::<Vec<_>>().join(" ")
    }
}

/// Cuerpo de respuesta determinista, usado cuando la IA generativa no está
/// disponible o falla.
pub fn fallback_response_text(facts: &[String]) -> String {
    if facts.is_empty() {
        return "No encontré suficiente información para responder con precisión. \
                ¿Podrías reformular tu pregunta?"
            .to_string();
    }

    let body = facts.iter().take(5).cloned().collect::<Vec<_>>().join("\n\n");
    format!(
        "Basándome en la información disponible:\n\n{body}\n\n\
         ¿Te gustaría que profundice en algún aspecto específico?"
    )
}

/// Construye el diálogo multiturno según el estilo detectado.
pub fn build_dialogue(
    prompt: &str,
    processed: &ProcessedQuery,
    facts: &[String],
) -> Vec<DialogueTurn> {
    match processed.style {
        Style::News => news_dialogue(facts),
        Style::Tutor => tutor_dialogue(facts),
        Style::Technical => technical_dialogue(processed, facts),
        Style::Recommendation => recommendation_dialogue(facts),
        Style::Explain => explain_dialogue(facts),
        Style::Historical => historical_dialogue(facts),
        Style::Formula => formula_dialogue(prompt, facts),
        Style::Overview => overview_dialogue(facts),
        Style::Casual => casual_dialogue(facts),
    }
}

fn news_dialogue(facts: &[String]) -> Vec<DialogueTurn> {
    let mut dialogue = vec![DialogueTurn::assistant(
        "Aquí tienes un resumen rápido de las noticias relacionadas:",
    )];
    for fact in facts.iter().take(5) {
        dialogue.push(DialogueTurn::assistant(format!("- {fact}")));
    }
    dialogue.push(DialogueTurn::assistant(
        "¿Quieres que busque más detalles sobre alguno de estos puntos?",
    ));
    dialogue
}

fn tutor_dialogue(facts: &[String]) -> Vec<DialogueTurn> {
    let mut dialogue = vec![DialogueTurn::assistant("Perfecto, vamos paso a paso:")];
    for (i, fact) in facts.iter().take(5).enumerate() {
        dialogue.push(DialogueTurn::assistant(format!("Paso {}: {fact}", i + 1)));
    }
    dialogue.push(DialogueTurn::assistant(
        "¿Quieres que te muestre un ejemplo concreto o código de ejemplo?",
    ));
    dialogue
}

fn technical_dialogue(processed: &ProcessedQuery, facts: &[String]) -> Vec<DialogueTurn> {
    let mut dialogue = vec![DialogueTurn::assistant(
        "Te explico desde el punto de vista técnico:",
    )];
    for fact in facts.iter().take(4) {
        dialogue.push(DialogueTurn::assistant(fact.clone()));
    }

    let code_keywords = ["python", "programacion", "programación", "api", "json"];
    if processed
        .keywords
        .iter()
        .any(|k| code_keywords.contains(&k.as_str()))
    {
        dialogue.push(DialogueTurn::assistant("Ejemplo simple (pseudo-código):"));
        dialogue.push(DialogueTurn::assistant("```python\nprint('Hola mundo')\n```"));
    }

    dialogue.push(DialogueTurn::assistant(
        "¿Te gustaría ver más detalle técnico? (logs, ejemplos, comparativas)",
    ));
    dialogue
}

fn recommendation_dialogue(facts: &[String]) -> Vec<DialogueTurn> {
    let mut dialogue = vec![DialogueTurn::assistant(
        "Según lo que buscas, te recomiendo lo siguiente:",
    )];
    for fact in facts.iter().take(5) {
        dialogue.push(DialogueTurn::assistant(format!("- {fact}")));
    }
    dialogue.push(DialogueTurn::assistant(
        "¿Prefieres que compare opciones concretas (precio, características)?",
    ));
    dialogue
}

fn explain_dialogue(facts: &[String]) -> Vec<DialogueTurn> {
    let mut dialogue = vec![DialogueTurn::assistant(
        "Vale, te lo explico con palabras sencillas:",
    )];
    for fact in facts.iter().take(5) {
        dialogue.push(DialogueTurn::assistant(fact.clone()));
    }
    dialogue.push(DialogueTurn::assistant(
        "¿Quieres una versión más técnica o un resumen aún más breve?",
    ));
    dialogue
}

/// Narración histórica: los facts con año detectado van primero, en orden
/// ascendente de año; los demás se añaden después sin orden garantizado.
fn historical_dialogue(facts: &[String]) -> Vec<DialogueTurn> {
    let mut dialogue = vec![DialogueTurn::assistant(
        "Te cuento la secuencia de hechos relacionada con esto:",
    )];

    let mut dated: Vec<(u32, &String)> = Vec::new();
    let mut undated: Vec<&String> = Vec::new();
    for fact in facts {
        match extract_year(fact) {
            Some(year) => dated.push((year, fact)),
            None => undated.push(fact),
        }
    }
    dated.sort_by_key(|(year, _)| *year);

    for (year, fact) in dated {
        dialogue.push(DialogueTurn::assistant(format!("{year}: {fact}")));
    }
    for fact in undated.iter().take(6) {
        dialogue.push(DialogueTurn::assistant((*fact).clone()));
    }

    dialogue.push(DialogueTurn::assistant(
        "¿Quieres que profundice en algún año o personaje específico?",
    ));
    dialogue
}

fn formula_dialogue(prompt: &str, facts: &[String]) -> Vec<DialogueTurn> {
    let mut dialogue = vec![DialogueTurn::assistant(
        "Voy a explicar la fórmula y el razonamiento detrás:",
    )];

    // El fact con pinta matemática más largo, o la fórmula del propio prompt.
    let formula = facts
        .iter()
        .filter(|f| looks_mathematical(f))
        .max_by_key(|f| f.chars().count())
        .cloned()
        .or_else(|| {
            PROMPT_FORMULA_RE
                .find(prompt)
                .map(|m| m.as_str().trim().to_string())
        });

    match formula {
        Some(formula) => {
            dialogue.push(DialogueTurn::assistant(format!("Fórmula encontrada: {formula}")));

            let parts = split_around_operators(&formula);
            if parts.len() > 1 {
                dialogue.push(DialogueTurn::assistant("Descomposición de la fórmula:"));
                for part in parts {
                    dialogue.push(DialogueTurn::assistant(format!("- {part}")));
                }
                dialogue.push(DialogueTurn::assistant(
                    "Explicación: cada término tiene su significado; la relación se deriva \
                     mediante definiciones y operaciones algebraicas o cálculo según corresponda.",
                ));
            } else {
                dialogue.push(DialogueTurn::assistant(format!("Descripción: {formula}")));
            }
            dialogue.push(DialogueTurn::assistant(
                "¿Quieres que haga una derivación paso a paso (si aplica)?",
            ));
        }
        None => {
            dialogue.push(DialogueTurn::assistant(
                "No encontré una fórmula explícita en los resultados, pero puedo explicarte \
                 el concepto matemático relacionado:",
            ));
            for fact in facts.iter().take(5) {
                dialogue.push(DialogueTurn::assistant(fact.clone()));
            }
            dialogue.push(DialogueTurn::assistant(
                "¿Te interesa que lo desarrolle con notación matemática y pasos formales?",
            ));
        }
    }

    dialogue
}

fn overview_dialogue(facts: &[String]) -> Vec<DialogueTurn> {
    let mut dialogue = vec![DialogueTurn::assistant(
        "Aquí tienes una visión general del tema:",
    )];
    for fact in facts.iter().take(6) {
        dialogue.push(DialogueTurn::assistant(format!("- {fact}")));
    }
    dialogue.push(DialogueTurn::assistant(
        "¿Quieres que amplíe alguno de estos puntos o prefieres referencias para leer más?",
    ));
    dialogue
}

fn casual_dialogue(facts: &[String]) -> Vec<DialogueTurn> {
    let mut dialogue = vec![DialogueTurn::assistant("¡Buena pregunta! Te cuento lo esencial:")];
    for fact in facts.iter().take(4) {
        dialogue.push(DialogueTurn::assistant(fact.clone()));
    }
    dialogue.push(DialogueTurn::assistant(
        "¿Te interesa profundizar en algún punto o seguimos con otra cosa?",
    ));
    dialogue
}

fn extract_year(text: &str) -> Option<u32> {
    YEAR_RE
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
}

fn looks_mathematical(text: &str) -> bool {
    text.contains('=')
        || text.contains("integral")
        || text.contains("deriv")
        || text.contains("teorema")
        || MATH_SYMBOL_RE.is_match(text)
}

/// Trocea una fórmula conservando los operadores como partes propias.
fn split_around_operators(formula: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut start = 0;

    for m in OPERATOR_RE.find_iter(formula) {
        let segment = formula[start..m.start()].trim();
        if !segment.is_empty() {
            parts.push(segment.to_string());
        }
        parts.push(m.as_str().to_string());
        start = m.end();
    }

    let tail = formula[start..].trim();
    if !tail.is_empty() {
        parts.push(tail.to_string());
    }

    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::TextProcessor;

    fn facts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn summary_joins_first_four_facts() {
        let list = facts(&["Uno.", "Dos.", "Tres.", "Cuatro.", "Cinco."]);
        let summary = summarize(&list);
        assert!(summary.contains("Cuatro."));
        assert!(!summary.contains("Cinco."));

        assert_eq!(summarize(&[]), "No se encontraron resultados relevantes.");
    }

    #[test]
    fn fallback_text_mentions_available_information() {
        let text = fallback_response_text(&facts(&["Python es un lenguaje interpretado."]));
        assert!(text.starts_with("Basándome en la información disponible:"));
        assert!(text.contains("Python"));

        let empty = fallback_response_text(&[]);
        assert!(empty.contains("reformular"));
    }

    #[test]
    fn tutor_dialogue_numbers_steps() {
        let processed = TextProcessor::new("dame un tutorial con pasos").process();
        let dialogue = build_dialogue("dame un tutorial con pasos", &processed, &facts(&[
            "Instala las dependencias del proyecto.",
            "Configura el entorno de desarrollo.",
        ]));
        assert!(dialogue[1].text.starts_with("Paso 1:"));
        assert!(dialogue[2].text.starts_with("Paso 2:"));
    }

    #[test]
    fn historical_dialogue_sorts_dated_facts_ascending() {
        let processed = TextProcessor::new("¿qué pasó en la guerra?").process();
        let dialogue = build_dialogue("¿qué pasó en la guerra?", &processed, &facts(&[
            "El tratado se firmó en 1945 tras el final del conflicto.",
            "Un hecho sin fecha conocida sobre el período.",
            "La contienda comenzó en 1939 con la invasión.",
        ]));

        let texts: Vec<&str> = dialogue.iter().map(|t| t.text.as_str()).collect();
        let pos_1939 = texts.iter().position(|t| t.starts_with("1939:")).unwrap();
        let pos_1945 = texts.iter().position(|t| t.starts_with("1945:")).unwrap();
        let pos_undated = texts.iter().position(|t| t.contains("sin fecha")).unwrap();

        assert!(pos_1939 < pos_1945);
        assert!(pos_1945 < pos_undated);
    }

    #[test]
    fn formula_dialogue_decomposes_around_operators() {
        let processed = TextProcessor::new("explica la fórmula E=mc^2").process();
        let dialogue = build_dialogue("explica la fórmula E=mc^2", &processed, &[]);

        let texts: Vec<&str> = dialogue.iter().map(|t| t.text.as_str()).collect();
        assert!(texts.iter().any(|t| t.starts_with("Fórmula encontrada:")));
        assert!(texts.iter().any(|t| *t == "Descomposición de la fórmula:"));
        assert!(texts.iter().any(|t| *t == "- mc"));
        assert!(texts.iter().any(|t| *t == "- ="));
    }

    #[test]
    fn formula_dialogue_prefers_longest_mathematical_fact() {
        let processed = TextProcessor::new("explica el teorema").process();
        let dialogue = build_dialogue("explica el teorema", &processed, &facts(&[
            "a=b",
            "La identidad fundamental establece que a^2 + b^2 = c^2 en triángulos rectángulos.",
        ]));

        let found = dialogue
            .iter()
            .find(|t| t.text.starts_with("Fórmula encontrada:"))
            .unwrap();
        assert!(found.text.contains("identidad fundamental"));
    }

    #[test]
    fn explain_dialogue_opens_with_plain_words() {
        let processed = TextProcessor::new("¿Qué es Python?").process();
        let dialogue = build_dialogue("¿Qué es Python?", &processed, &facts(&[
            "Python es un lenguaje de programación interpretado.",
        ]));
        assert!(dialogue[0].text.contains("te lo explico"));
        assert!(dialogue[1].text.contains("Python"));
    }

    #[test]
    fn news_and_overview_use_bullets() {
        let processed = TextProcessor::new("últimas noticias de tecnología").process();
        let dialogue = build_dialogue("últimas noticias de tecnología", &processed, &facts(&[
            "Se anunció un nuevo procesador.",
        ]));
        assert!(dialogue[1].text.starts_with("- "));
    }
}
