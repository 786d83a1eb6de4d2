//! Normalização e validação de entradas dos handlers

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").expect("regex de e-mail inválida")
});

static SUBDOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9](?:[a-z0-9\-]{1,61}[a-z0-9])?$").expect("regex de subdomínio inválida")
});

pub fn normalize_email(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

/// Subdomínios reservados pela plataforma
const RESERVED_SUBDOMAINS: &[&str] = &["www", "api", "app", "admin", "mail", "status"];

pub fn normalize_subdomain(value: &str) -> String {
    let mut sub = value
        .trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>();
    while sub.contains("--") {
        sub = sub.replace("--", "-");
    }
    sub.trim_matches('-').to_string()
}

pub fn validate_subdomain(value: &str) -> Result<String, &'static str> {
    let sub = normalize_subdomain(value);
    if sub.len() < 3 || sub.len() > 63 {
        return Err("subdomínio deve ter entre 3 e 63 caracteres");
    }
    if RESERVED_SUBDOMAINS.iter().any(|item| *item == sub) {
        return Err("subdomínio reservado");
    }
    if !SUBDOMAIN_RE.is_match(&sub) {
        return Err("subdomínio inválido");
    }
    Ok(sub)
}

/// Mantém apenas dígitos (DDI + DDD + número)
pub fn normalize_phone(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_normalization_and_validation() {
        assert_eq!(normalize_email("  Ana@Empresa.COM.BR "), "ana@empresa.com.br");
        assert!(is_valid_email("ana@empresa.com.br"));
        assert!(!is_valid_email("ana@"));
        assert!(!is_valid_email("sem-arroba.com"));
    }

    #[test]
    fn test_subdomain_validation() {
        assert_eq!(validate_subdomain("Minha Empresa").unwrap(), "minha-empresa");
        assert!(validate_subdomain("ab").is_err());
        assert!(validate_subdomain("admin").is_err());
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("+55 (11) 99999-8888"), "5511999998888");
    }
}
