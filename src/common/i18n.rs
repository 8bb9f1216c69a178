// src/common/i18n.rs

use std::collections::HashMap;
use std::sync::LazyLock;

pub const DEFAULT_LANG: &str = "es";

// Catálogo de mensagens de erro: idioma -> (chave -> mensagem)
#[derive(Debug, Clone)]
pub struct I18nStore {
    messages: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

static SHARED: LazyLock<I18nStore> = LazyLock::new(I18nStore::builtin);

impl I18nStore {
    pub fn builtin() -> Self {
        let es = HashMap::from([
            ("validation_failed", "Uno o más campos son inválidos."),
            ("not_found", "Recurso no encontrado."),
            ("commission_unresolved", "No existe un tier de comisión para ese valor."),
            ("conflict", "El registro fue modificado o ya existe."),
            ("invalid_credentials", "Usuario o contraseña inválidos."),
            ("invalid_token", "Token de autenticación inválido o ausente."),
            ("forbidden", "No autorizado para realizar esta acción."),
            ("internal_error", "Ocurrió un error inesperado."),
        ]);

        let en = HashMap::from([
            ("validation_failed", "One or more fields are invalid."),
            ("not_found", "Resource not found."),
            ("commission_unresolved", "No commission tier covers that value."),
            ("conflict", "The record was modified or already exists."),
            ("invalid_credentials", "Invalid username or password."),
            ("invalid_token", "Authentication token is invalid or missing."),
            ("forbidden", "You are not allowed to perform this action."),
            ("internal_error", "An unexpected error occurred."),
        ]);

        Self { messages: HashMap::from([("es", es), ("en", en)]) }
    }

    /// Instância única usada pelo AppState e pelas rejeições de extratores.
    pub fn shared() -> &'static I18nStore {
        &SHARED
    }

    pub fn translate(&self, lang: &str, key: &str) -> String {
        self.messages
            .get(lang)
            .and_then(|m| m.get(key))
            .or_else(|| self.messages.get(DEFAULT_LANG).and_then(|m| m.get(key)))
            .map(|s| s.to_string())
            .unwrap_or_else(|| key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_language_falls_back_to_spanish() {
        let store = I18nStore::builtin();
        assert_eq!(store.translate("fr", "not_found"), "Recurso no encontrado.");
        assert_eq!(store.translate("en", "not_found"), "Resource not found.");
    }

    #[test]
    fn unknown_key_is_echoed() {
        assert_eq!(I18nStore::shared().translate("es", "nope"), "nope");
    }
}
