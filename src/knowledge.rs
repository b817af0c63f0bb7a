//! Base de conocimiento local: temas integrados más la capa aprendida.
//!
//! La capa aprendida proviene del almacén de aprendizaje y se fusiona en el
//! momento de la consulta; una entrada aprendida con el mismo tema sombrea a
//! la integrada.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

/// Etiqueta de procedencia para coincidencias exactas de tema.
pub const KB_SOURCE_LABEL: &str = "Base de conocimiento";

/// Base de conocimiento integrada sobre tópicos comunes.
pub static KNOWLEDGE_BASE: Lazy<BTreeMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    BTreeMap::from([
        ("python", vec![
            "Python es un lenguaje de programación interpretado cuya filosofía hace hincapié en la legibilidad de su código.",
            "Se trata de un lenguaje de programación multipropósito, creado por Guido van Rossum en 1989 y que fue presentado públicamente en 1991.",
            "Python utiliza indentación para delimitar bloques de código, lo cual aumenta la legibilidad del código.",
            "Es un lenguaje flexible que soporta orientación a objetos, programación imperativa y, en menor medida, programación funcional.",
            "Python tiene tipado dinámico y gestión automática de memoria.",
            "El intérprete de Python está disponible para múltiples plataformas: Windows, Linux, Macintosh, etc.",
        ]),
        ("inteligencia artificial", vec![
            "La inteligencia artificial es la rama de la informática que se ocupa de crear máquinas inteligentes capaces de realizar tareas que normalmente requieren inteligencia humana.",
            "El aprendizaje automático es un campo de la inteligencia artificial que permite que los sistemas aprendan y mejoren a partir de la experiencia.",
            "Las redes neuronales artificiales son modelos computacionales inspirados en el funcionamiento del cerebro humano.",
            "El procesamiento del lenguaje natural permite a las máquinas comprender y generar lenguaje humano.",
            "La visión por computadora permite a las máquinas interpretar el contenido de imágenes y vídeos.",
            "Los algoritmos de IA se utilizan ampliamente en recomendaciones, reconocimiento de patrones y toma de decisiones.",
        ]),
        ("machine learning", vec![
            "El aprendizaje automático es una rama de la inteligencia artificial que permite crear sistemas que aprenden de los datos.",
            "Los algoritmos de aprendizaje supervisado requieren datos etiquetados para entrenar el modelo.",
            "El aprendizaje no supervisado busca encontrar patrones en datos sin etiquetar.",
            "La validación cruzada es una técnica para evaluar el rendimiento de un modelo usando diferentes subconjuntos de datos.",
            "El sobreajuste ocurre cuando un modelo aprende los detalles específicos de los datos de entrenamiento en lugar de patrones generales.",
            "Las métricas comunes incluyen precisión, recall, F1-score y área bajo la curva ROC.",
        ]),
        ("web", vec![
            "World Wide Web es un sistema de documentos interconectados que funciona sobre internet.",
            "HTTP es el protocolo principal utilizado para transmitir datos en la web.",
            "HTML es el lenguaje de marcado utilizado para crear páginas web.",
            "CSS se utiliza para controlar la presentación y el diseño de las páginas web.",
            "JavaScript es un lenguaje de programación que se ejecuta en los navegadores web para crear interactividad.",
            "Los navegadores web como Chrome, Firefox y Safari interpretan el código HTML, CSS y JavaScript.",
        ]),
        ("base de datos", vec![
            "Una base de datos es una colección organizada de datos que se pueden acceder, gestionar y actualizar.",
            "SQL es el lenguaje estándar para consultar bases de datos relacionales.",
            "Las bases de datos NoSQL proporcionan flexibilidad para almacenar datos no estructurados.",
            "El modelado de datos es el proceso de crear una representación abstracta de los datos.",
            "Los índices se utilizan para mejorar la velocidad de búsqueda en bases de datos grandes.",
            "La integridad referencial garantiza que las relaciones entre tablas sean consistentes.",
        ]),
        ("ciberseguridad", vec![
            "La ciberseguridad es el conjunto de herramientas y prácticas para proteger sistemas y redes contra ataques digitales.",
            "La encriptación es una técnica para convertir información legible en un formato ilegible sin la clave correcta.",
            "La autenticación de dos factores aumenta la seguridad al requerir dos métodos de verificación.",
            "Los firewalls son sistemas de seguridad que controlan el tráfico de red entrante y saliente.",
            "El phishing es una técnica de ingeniería social para obtener información confidencial mediante engaño.",
            "Los parches de seguridad se utilizan para corregir vulnerabilidades conocidas en software.",
        ]),
        ("programacion", vec![
            "La programación es el arte de crear instrucciones para que las computadoras realicen tareas específicas.",
            "Los lenguajes de programación son herramientas que permiten comunicarse con las computadoras.",
            "La lógica de programación es la base para resolver problemas mediante algoritmos.",
            "Los paradigmas de programación incluyen imperativo, declarativo, orientado a objetos y funcional.",
            "El debugging es el proceso de identificar y corregir errores en el código.",
            "La documentación del código es fundamental para el mantenimiento y la colaboración en equipo.",
        ]),
    ])
});

/// Busca en la base combinada (integrada + aprendida) por keywords.
///
/// Primero coincidencia exacta de tema; si no la hay para una keyword, se
/// prueba coincidencia parcial (keyword contenida en el nombre del tema).
/// Devuelve pares (fragmentos, etiquetas de procedencia) de igual longitud.
pub fn search_knowledge_base(
    keywords: &[String],
    learned: &BTreeMap<String, Vec<String>>,
) -> (Vec<String>, Vec<String>) {
    let mut combined: BTreeMap<String, Vec<String>> = KNOWLEDGE_BASE
        .iter()
        .map(|(topic, facts)| {
            (topic.to_string(), facts.iter().map(|f| f.to_string()).collect())
        })
        .collect();
    for (topic, facts) in learned {
        combined.insert(topic.to_lowercase(), facts.clone());
    }

    let mut fragments = Vec::new();
    let mut sources = Vec::new();

    for keyword in keywords {
        let keyword_lower = keyword.to_lowercase();

        if let Some(facts) = combined.get(&keyword_lower) {
            for fact in facts {
                fragments.push(fact.clone());
                sources.push(KB_SOURCE_LABEL.to_string());
            }
            continue;
        }

        for (topic, facts) in &combined {
            if topic.contains(&keyword_lower) {
                for fact in facts {
                    fragments.push(fact.clone());
                    sources.push(format!("KB: {topic}"));
                }
            }
        }
    }

    (fragments, sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_topic_match_returns_builtin_facts() {
        let (fragments, sources) =
            search_knowledge_base(&["python".to_string()], &BTreeMap::new());
        assert_eq!(fragments.len(), KNOWLEDGE_BASE["python"].len());
        assert!(sources.iter().all(|s| s == KB_SOURCE_LABEL));
        assert!(fragments.iter().all(|f| KNOWLEDGE_BASE["python"].contains(&f.as_str())));
    }

    #[test]
    fn partial_match_labels_with_topic() {
        let (fragments, sources) =
            search_knowledge_base(&["inteligencia".to_string()], &BTreeMap::new());
        assert!(!fragments.is_empty());
        assert!(sources.iter().any(|s| s == "KB: inteligencia artificial"));
    }

    #[test]
    fn learned_layer_shadows_builtin_topic() {
        let learned = BTreeMap::from([(
            "python".to_string(),
            vec!["Python 3.12 introdujo mejoras notables de rendimiento.".to_string()],
        )]);
        let (fragments, _) = search_knowledge_base(&["python".to_string()], &learned);
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].contains("3.12"));
    }

    #[test]
    fn unknown_keyword_yields_nothing() {
        let (fragments, sources) =
            search_knowledge_base(&["xilófono".to_string()], &BTreeMap::new());
        assert!(fragments.is_empty());
        assert!(sources.is_empty());
    }
}
