//! Consolidación de facts: puntúa, ordena, deduplica y acota los fragmentos
//! frente a las keywords de la consulta.

use std::collections::HashSet;

/// Límite de facts por defecto.
pub const DEFAULT_FACTS_LIMIT: usize = 8;

/// Selecciona y ordena los mejores fragmentos.
///
/// Orden estable descendente por puntuación (los empates conservan el orden
/// de entrada), deduplicación por texto exacto quedándose con la primera
/// aparición tras ordenar, y truncado al límite. Entrada vacía produce salida
/// vacía, nunca un error.
pub fn consolidate(fragments: &[String], keywords: &[String], limit: usize) -> Vec<String> {
    if fragments.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(i64, &String)> = fragments
        .iter()
        .map(|f| (score_fragment(f, keywords), f))
        .collect();
    scored.sort_by_key(|(score, _)| std::cmp::Reverse(*score));

    let mut seen = HashSet::new();
    let mut facts = Vec::new();
    for (_, fragment) in scored {
        if !seen.insert(fragment.as_str()) {
            continue;
        }
        facts.push(fragment.clone());
        if facts.len() >= limit {
            break;
        }
    }

    facts
}

/// Puntuación de relevancia: 3 puntos por keyword presente (subcadena, sin
/// distinguir mayúsculas), 1 por cada dígito, y un bonus de longitud de
/// +1 por cada 100 caracteres hasta +3.
fn score_fragment(text: &str, keywords: &[String]) -> i64 {
    let mut score = 0i64;
    let lower_text = text.to_lowercase();

    for keyword in keywords {
        if lower_text.contains(&keyword.to_lowercase()) {
            score += 3;
        }
    }

    score += text.chars().filter(|c| c.is_ascii_digit()).count() as i64;
    score += (text.chars().count() / 100).min(3) as i64;

    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frags(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn kws(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(consolidate(&[], &kws(&["python"]), DEFAULT_FACTS_LIMIT).is_empty());
    }

    #[test]
    fn ranks_keyword_matches_first() {
        let fragments = frags(&[
            "Una frase genérica sin relación con nada.",
            "Python es un lenguaje interpretado muy usado.",
        ]);
        let facts = consolidate(&fragments, &kws(&["python"]), DEFAULT_FACTS_LIMIT);
        assert!(facts[0].contains("Python"));
    }

    #[test]
    fn deduplicates_exact_text() {
        let fragments = frags(&[
            "Python es un lenguaje interpretado.",
            "Python es un lenguaje interpretado.",
            "Python tiene tipado dinámico.",
        ]);
        let facts = consolidate(&fragments, &kws(&["python"]), DEFAULT_FACTS_LIMIT);
        assert_eq!(facts.len(), 2);
    }

    #[test]
    fn truncates_to_limit() {
        let fragments: Vec<String> =
            (0..20).map(|i| format!("Fragmento número {i} con texto variado.")).collect();
        let facts = consolidate(&fragments, &[], 8);
        assert_eq!(facts.len(), 8);
    }

    #[test]
    fn digits_and_length_contribute_to_score() {
        let with_digits = "Fue creado en 1991 por Guido van Rossum.".to_string();
        let plain = "Fue creado hace tiempo por Guido van Rossum.".to_string();
        assert!(score_fragment(&with_digits, &[]) > score_fragment(&plain, &[]));

        let long = "x".repeat(350);
        assert_eq!(score_fragment(&long, &[]), 3);
        let very_long = "x".repeat(900);
        assert_eq!(score_fragment(&very_long, &[]), 3);
    }

    #[test]
    fn ties_keep_input_order() {
        let fragments = frags(&[
            "Primera frase neutra de idéntica puntuación.",
            "Segunda frase neutra de idéntica puntuación!",
        ]);
        let facts = consolidate(&fragments, &[], DEFAULT_FACTS_LIMIT);
        assert!(facts[0].starts_with("Primera"));
    }
}
