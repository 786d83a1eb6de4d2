use crate::utils::{AppError, AppResult};
use bcrypt::{hash, verify, DEFAULT_COST};

/// Tamanho mínimo aceito em cadastro/reset
pub const MIN_PASSWORD_LEN: usize = 8;

pub fn hash_password(plain: &str) -> AppResult<String> {
    if plain.len() < MIN_PASSWORD_LEN {
        return Err(AppError::ValidationError(format!(
            "Senha deve ter no mínimo {} caracteres",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(hash(plain, DEFAULT_COST)?)
}

pub fn verify_password(plain: &str, password_hash: &str) -> bool {
    verify(plain, password_hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hashed = hash_password("segredo-forte").unwrap();
        assert!(verify_password("segredo-forte", &hashed));
        assert!(!verify_password("segredo-errado", &hashed));
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(hash_password("curta").is_err());
    }

    #[test]
    fn test_verify_with_garbage_hash_is_false() {
        assert!(!verify_password("qualquer", "não-é-um-hash"));
    }
}
