// [libs/core/redirect-tracker/src/js_patterns.rs]
/*!
 * =================================================================
 * APARATO: JS REDIRECT PATTERN LIBRARY (V5.1 - DATA NOT CODE)
 * CLASIFICACIÓN: CORE ENGINE (ESTRATO L1)
 * RESPONSABILIDAD: HEURÍSTICA DECLARATIVA DE SALTOS EMBEBIDOS
 *
 * # Logic:
 * La heurística de detección de saltos JavaScript es una tabla de
 * patrones nombrados con índice de grupo de captura, iterada de forma
 * uniforme. Evolucionar la heurística significa editar datos, no
 * lógica. La indirección por variable nombrada es el único caso de
 * dos fases y vive en su propia función.
 * =================================================================
 */

use once_cell::sync::Lazy;
use regex::Regex;

/// Entrada declarativa de la biblioteca de patrones.
pub struct JsRedirectPattern {
    /// Nombre forense del patrón (aparece en los rastros de ejecución).
    pub name: &'static str,
    /// Expresión regular con flag case-insensitive embebido.
    pub pattern: &'static str,
    /// Índice del grupo de captura que contiene la URL.
    pub capture_index: usize,
}

/// Biblioteca cerrada de patrones de salto JavaScript.
///
/// El orden importa: las formas más específicas preceden a las genéricas
/// para que el primer match gane con la captura correcta.
pub const JS_REDIRECT_LIBRARY: &[JsRedirectPattern] = &[
    JsRedirectPattern { name: "window_location_replace", pattern: r#"(?i)window\.location\.replace\(\s*['"]([^'"]+)['"]\s*\)"#, capture_index: 1 },
    JsRedirectPattern { name: "window_location_assign", pattern: r#"(?i)window\.location\.assign\(\s*['"]([^'"]+)['"]\s*\)"#, capture_index: 1 },
    JsRedirectPattern { name: "document_location_replace", pattern: r#"(?i)document\.location\.replace\(\s*['"]([^'"]+)['"]\s*\)"#, capture_index: 1 },
    JsRedirectPattern { name: "document_location_assign", pattern: r#"(?i)document\.location\.assign\(\s*['"]([^'"]+)['"]\s*\)"#, capture_index: 1 },
    JsRedirectPattern { name: "location_replace", pattern: r#"(?i)(?:^|[^.\w])location\.replace\(\s*['"]([^'"]+)['"]\s*\)"#, capture_index: 1 },
    JsRedirectPattern { name: "location_assign", pattern: r#"(?i)(?:^|[^.\w])location\.assign\(\s*['"]([^'"]+)['"]\s*\)"#, capture_index: 1 },
    JsRedirectPattern { name: "window_location_href_set", pattern: r#"(?i)window\.location\.href\s*=\s*['"]([^'"]+)['"]"#, capture_index: 1 },
    JsRedirectPattern { name: "document_location_href_set", pattern: r#"(?i)document\.location\.href\s*=\s*['"]([^'"]+)['"]"#, capture_index: 1 },
    JsRedirectPattern { name: "window_location_set", pattern: r#"(?i)window\.location\s*=\s*['"]([^'"]+)['"]"#, capture_index: 1 },
    JsRedirectPattern { name: "document_location_set", pattern: r#"(?i)document\.location\s*=\s*['"]([^'"]+)['"]"#, capture_index: 1 },
    JsRedirectPattern { name: "self_location_set", pattern: r#"(?i)self\.location\s*=\s*['"]([^'"]+)['"]"#, capture_index: 1 },
    JsRedirectPattern { name: "top_location_set", pattern: r#"(?i)top\.location\s*=\s*['"]([^'"]+)['"]"#, capture_index: 1 },
    JsRedirectPattern { name: "top_location_href_set", pattern: r#"(?i)top\.location\.href\s*=\s*['"]([^'"]+)['"]"#, capture_index: 1 },
    JsRedirectPattern { name: "parent_location_set", pattern: r#"(?i)parent\.location\s*=\s*['"]([^'"]+)['"]"#, capture_index: 1 },
    JsRedirectPattern { name: "bare_location_href_set", pattern: r#"(?i)(?:^|[^.\w])location\.href\s*=\s*['"]([^'"]+)['"]"#, capture_index: 1 },
    JsRedirectPattern { name: "bare_location_set", pattern: r#"(?i)(?:^|[^.\w])location\s*=\s*['"]([^'"]+)['"]"#, capture_index: 1 },
    JsRedirectPattern { name: "settimeout_location_href", pattern: r#"(?i)setTimeout\s*\([^)]*?location(?:\.href)?\s*=\s*['"]([^'"]+)['"]"#, capture_index: 1 },
    JsRedirectPattern { name: "settimeout_function_location", pattern: r#"(?i)setTimeout\s*\(\s*function\s*\(\s*\)\s*\{[^}]*?location(?:\.href)?\s*=\s*['"]([^'"]+)['"]"#, capture_index: 1 },
    JsRedirectPattern { name: "settimeout_arrow_location", pattern: r#"(?i)setTimeout\s*\(\s*\(\s*\)\s*=>\s*\{?[^}]*?location(?:\.href)?\s*=\s*['"]([^'"]+)['"]"#, capture_index: 1 },
    JsRedirectPattern { name: "settimeout_location_replace", pattern: r#"(?i)setTimeout\s*\([^)]*?location\.replace\(\s*['"]([^'"]+)['"]\s*\)"#, capture_index: 1 },
    JsRedirectPattern { name: "window_open_self", pattern: r#"(?i)window\.open\(\s*['"]([^'"]+)['"]\s*,\s*['"]_self['"]"#, capture_index: 1 },
    JsRedirectPattern { name: "window_navigate", pattern: r#"(?i)window\.navigate\(\s*['"]([^'"]+)['"]\s*\)"#, capture_index: 1 },
    JsRedirectPattern { name: "href_attribute_meta_anchor", pattern: r#"(?i)<a[^>]+id\s*=\s*["']redirect["'][^>]+href\s*=\s*["']([^"']+)["']"#, capture_index: 1 },
];

/// Patrón de indirección: asignación de location desde una variable nombrada.
const VARIABLE_INDIRECTION_ASSIGNMENT: &str =
    r#"(?i)(?:window\.|document\.|top\.|self\.)?location(?:\.href)?\s*=\s*([A-Za-z_$][\w$]*)\s*[;\n]"#;

/// Compilación perezosa de la biblioteca completa.
static COMPILED_LIBRARY: Lazy<Vec<(&'static str, Regex, usize)>> = Lazy::new(|| {
    JS_REDIRECT_LIBRARY
        .iter()
        .filter_map(|entry| {
            Regex::new(entry.pattern)
                .ok()
                .map(|compiled| (entry.name, compiled, entry.capture_index))
        })
        .collect()
});

static COMPILED_INDIRECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(VARIABLE_INDIRECTION_ASSIGNMENT).expect("indirection pattern is static"));

/// Patrones de meta-refresh (ambos órdenes de atributos).
static META_REFRESH_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r#"(?i)<meta[^>]*http-equiv\s*=\s*["']?refresh["']?[^>]*content\s*=\s*["']\s*[\d.]+\s*;\s*url\s*=\s*([^"']+)["']"#).expect("static"),
        Regex::new(r#"(?i)<meta[^>]*content\s*=\s*["']\s*[\d.]+\s*;\s*url\s*=\s*([^"']+)["'][^>]*http-equiv\s*=\s*["']?refresh["']?"#).expect("static"),
    ]
});

/// Descarta candidatos no navegables o auto-referentes.
///
/// # Edge cases:
/// javascript:, mailto:, tel:, data:, anclas (#) y self-loops exactos.
pub fn is_navigable_candidate(candidate: &str, current_url: &str) -> bool {
    let trimmed = candidate.trim();
    if trimmed.is_empty() || trimmed == "#" || trimmed.starts_with('#') {
        return false;
    }

    let lowered = trimmed.to_ascii_lowercase();
    let forbidden_schemes = ["javascript:", "mailto:", "tel:", "data:"];
    if forbidden_schemes.iter().any(|scheme| lowered.starts_with(scheme)) {
        return false;
    }

    trimmed != current_url
}

/// Busca una directiva meta-refresh en el cuerpo HTML.
pub fn scan_meta_refresh(html_body: &str, current_url: &str) -> Option<String> {
    for compiled in META_REFRESH_PATTERNS.iter() {
        if let Some(captures) = compiled.captures(html_body) {
            let candidate = captures.get(1)?.as_str().trim().trim_matches('\'');
            if is_navigable_candidate(candidate, current_url) {
                return Some(candidate.to_string());
            }
        }
    }
    None
}

/// Itera la biblioteca de patrones JS de forma uniforme y devuelve el
/// primer candidato navegable junto al nombre del patrón que lo produjo.
pub fn scan_javascript_jump(html_body: &str, current_url: &str) -> Option<(String, &'static str)> {
    for (pattern_name, compiled, capture_index) in COMPILED_LIBRARY.iter() {
        if let Some(captures) = compiled.captures(html_body) {
            if let Some(matched) = captures.get(*capture_index) {
                let candidate = matched.as_str().trim();
                if is_navigable_candidate(candidate, current_url) {
                    return Some((candidate.to_string(), pattern_name));
                }
            }
        }
    }

    // Fase 2: indirección por variable nombrada.
    if let Some(captures) = COMPILED_INDIRECTION.captures(html_body) {
        let variable_name = captures.get(1)?.as_str();
        // Descartamos falsos positivos sobre propiedades conocidas.
        if variable_name != "url" || html_body.contains("var url") || html_body.contains("let url") || html_body.contains("const url") {
            let declaration_pattern = format!(
                r#"(?i)(?:var|let|const)\s+{}\s*=\s*['"]([^'"]+)['"]"#,
                regex::escape(variable_name)
            );
            if let Ok(compiled_declaration) = Regex::new(&declaration_pattern) {
                if let Some(declaration) = compiled_declaration.captures(html_body) {
                    let candidate = declaration.get(1)?.as_str().trim();
                    if is_navigable_candidate(candidate, current_url) {
                        return Some((candidate.to_string(), "named_variable_indirection"));
                    }
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    /**
     * CERTIFICACIÓN: Formas canónicas de asignación de location.
     */
    #[test]
    fn certify_canonical_location_forms() {
        let samples = [
            (r#"<script>window.location.href = 'https://next.example.com/a';</script>"#, "https://next.example.com/a"),
            (r#"<script>location.replace("https://next.example.com/b")</script>"#, "https://next.example.com/b"),
            (r#"<script>document.location = 'https://next.example.com/c';</script>"#, "https://next.example.com/c"),
            (r#"<script>window.open('https://next.example.com/d', '_self')</script>"#, "https://next.example.com/d"),
        ];

        for (body, expected) in samples {
            let (candidate, pattern_name) = scan_javascript_jump(body, "https://origin.example.net/")
                .expect("pattern library failed to detect jump");
            assert_eq!(candidate, expected, "pattern {} captured wrong target", pattern_name);
        }
    }

    /**
     * CERTIFICACIÓN: Saltos envueltos en setTimeout.
     */
    #[test]
    fn certify_settimeout_wrapped_jumps() {
        let body = r#"<script>setTimeout(function() { window.location.href = 'https://delayed.example.com/x'; }, 1500);</script>"#;
        let (candidate, _) = scan_javascript_jump(body, "https://origin.example.net/").expect("settimeout jump missed");
        assert_eq!(candidate, "https://delayed.example.com/x");
    }

    /**
     * CERTIFICACIÓN: Indirección por variable nombrada.
     */
    #[test]
    fn certify_named_variable_indirection() {
        let body = r#"<script>var destino = 'https://indirect.example.com/final'; window.location.href = destino;</script>"#;
        let (candidate, pattern_name) = scan_javascript_jump(body, "https://origin.example.net/").expect("indirection missed");
        assert_eq!(candidate, "https://indirect.example.com/final");
        assert_eq!(pattern_name, "named_variable_indirection");
    }

    /**
     * CERTIFICACIÓN: Filtro de candidatos no navegables y self-loops.
     */
    #[test]
    fn certify_non_navigable_filter() {
        let current = "https://origin.example.net/page";
        assert!(!is_navigable_candidate("javascript:void(0)", current));
        assert!(!is_navigable_candidate("mailto:ops@example.com", current));
        assert!(!is_navigable_candidate("tel:+34600000000", current));
        assert!(!is_navigable_candidate("data:text/html;base64,xxx", current));
        assert!(!is_navigable_candidate("#top", current));
        assert!(!is_navigable_candidate(current, current));
        assert!(is_navigable_candidate("/relative/path", current));
    }

    /**
     * CERTIFICACIÓN: Meta-refresh en ambos órdenes de atributos.
     */
    #[test]
    fn certify_meta_refresh_attribute_orders() {
        let forward = r#"<meta http-equiv="refresh" content="0;url=/hop3">"#;
        assert_eq!(scan_meta_refresh(forward, "https://x.example.com/hop2").as_deref(), Some("/hop3"));

        let reversed = r#"<meta content="2; url=https://slow.example.com/" http-equiv="refresh">"#;
        assert_eq!(
            scan_meta_refresh(reversed, "https://x.example.com/").as_deref(),
            Some("https://slow.example.com/")
        );

        let anchored = r#"<meta http-equiv="refresh" content="0;url=#section">"#;
        assert_eq!(scan_meta_refresh(anchored, "https://x.example.com/"), None);
    }
}
