// [libs/core/redirect-tracker/src/root_domain.rs]
/*!
 * =================================================================
 * APARATO: ROOT DOMAIN EXTRACTOR (V5.0 - CLOSED TLD REGISTRY)
 * CLASIFICACIÓN: CORE ENGINE (ESTRATO L1)
 * RESPONSABILIDAD: NORMALIZACIÓN DE DOMINIOS PARA PARADA TEMPRANA
 *
 * # Logic:
 * La comparación de parada temprana opera sobre dominios raíz. El
 * extractor reconoce una lista cerrada de TLDs de segundo nivel
 * (co.uk, com.cn, ...) y en el resto toma las últimas dos etiquetas.
 * Los literales IPv4/IPv6 se devuelven intactos. El prefijo 'www.'
 * se descarta antes de comparar.
 * =================================================================
 */

/// Registro cerrado de TLDs compuestos reconocidos por el extractor.
const SECOND_LEVEL_TLDS: &[&str] = &[
    "co.uk", "org.uk", "ac.uk", "gov.uk", "me.uk", "net.uk",
    "com.cn", "net.cn", "org.cn", "gov.cn",
    "com.au", "net.au", "org.au", "edu.au",
    "co.jp", "ne.jp", "or.jp", "ac.jp",
    "com.br", "net.br", "org.br",
    "co.in", "net.in", "org.in", "firm.in",
    "com.mx", "com.ar", "com.tr", "com.tw", "com.hk", "com.sg",
    "co.kr", "co.za", "co.nz", "co.th", "co.id",
];

/// Determina si el host es un literal IPv4.
fn is_ipv4_literal(host: &str) -> bool {
    let octets: Vec<&str> = host.split('.').collect();
    octets.len() == 4 && octets.iter().all(|octet| octet.parse::<u8>().is_ok())
}

/// Extrae el dominio raíz de un host ya despojado de esquema y puerto.
///
/// # Edge cases:
/// - Literales IPv4 e IPv6 se devuelven tal cual.
/// - Hosts de una sola etiqueta (localhost) se devuelven tal cual.
pub fn extract_root_domain(raw_host: &str) -> String {
    let host = raw_host
        .trim()
        .trim_end_matches('.')
        .to_ascii_lowercase();

    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();

    // Literales IP: la noción de dominio raíz no aplica.
    if host.starts_with('[') || host.contains(':') || is_ipv4_literal(&host) {
        return host;
    }

    let labels: Vec<&str> = host.split('.').filter(|label| !label.is_empty()).collect();
    if labels.len() <= 2 {
        return labels.join(".");
    }

    // TLDs compuestos: conservamos tres etiquetas (marca + sufijo doble).
    let last_two = labels[labels.len() - 2..].join(".");
    if SECOND_LEVEL_TLDS.contains(&last_two.as_str()) {
        return labels[labels.len() - 3..].join(".");
    }

    last_two
}

/// Extrae el dominio raíz desde una URL completa o un host desnudo.
pub fn root_domain_of_url(url_or_host: &str) -> String {
    match url::Url::parse(url_or_host) {
        Ok(parsed) => parsed
            .host_str()
            .map(extract_root_domain)
            .unwrap_or_default(),
        // Entrada sin esquema: la tratamos como host desnudo con ruta opcional.
        Err(_) => {
            let bare = url_or_host
                .split('/')
                .next()
                .unwrap_or(url_or_host);
            extract_root_domain(bare)
        }
    }
}

/// Compara dos URLs/hosts por dominio raíz.
pub fn same_root_domain(left: &str, right: &str) -> bool {
    let left_root = root_domain_of_url(left);
    let right_root = root_domain_of_url(right);
    !left_root.is_empty() && left_root == right_root
}
