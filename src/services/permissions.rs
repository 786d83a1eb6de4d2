//! Resolvedor de permissões
//!
//! Função pura: perfil (`role`) + itens do grupo customizado + override por
//! usuário produzem um mapa de capacidades `resource -> action -> boolean`.
//! Ordem de mesclagem: defaults do perfil, depois itens do grupo, depois o
//! JSON do usuário — a última escrita vence por chave-folha.
//!
//! Regras de avaliação (`has_permission`):
//! - chave em dot-path (`leads.create`); chave vazia/malformada avalia `false`
//! - chave intermediária ausente ou folha não-booleana avalia `false`
//! - perfil desconhecido cai nos defaults de `user` (menor privilégio)
//!
//! O curto-circuito de owner/admin existe, mas é EXPLÍCITO: passa por
//! `is_allowed`, que audita cada bypass via log antes de conceder.

use crate::models::ResolvedGroupItem;
use crate::utils::logging::{log_permission_denied, log_superuser_bypass};
use once_cell::sync::Lazy;
use serde_json::{Map, Value};

/// Perfis embutidos. Qualquer valor fora destes é tratado como `User`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Owner,
    Admin,
    User,
}

impl Role {
    pub fn parse(value: &str) -> Self {
        match value {
            "owner" => Role::Owner,
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    /// Owner e admin respondem `true` a qualquer checagem (bypass auditado)
    pub fn is_superuser(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }
}

/// Catálogo de chaves e o default do perfil `user`.
/// Precisa espelhar o seed de `migrations/0004_seed_permissions.sql`.
pub const CATALOG: &[(&str, bool)] = &[
    ("leads.view", true),
    ("leads.create", true),
    ("leads.update", true),
    ("leads.delete", false),
    ("conversations.view", true),
    ("conversations.create", true),
    ("conversations.update", true),
    ("conversations.delete", false),
    ("tags.view", true),
    ("tags.create", false),
    ("tags.update", false),
    ("tags.delete", false),
    ("contact_fields.view", true),
    ("contact_fields.create", false),
    ("contact_fields.update", false),
    ("contact_fields.delete", false),
    ("agents.view", true),
    ("agents.create", false),
    ("agents.update", false),
    ("agents.delete", false),
    ("vector_stores.view", true),
    ("vector_stores.create", false),
    ("vector_stores.update", false),
    ("vector_stores.delete", false),
    ("connections.view", true),
    ("connections.create", false),
    ("connections.update", false),
    ("connections.delete", false),
    ("users.view", false),
    ("users.create", false),
    ("users.update", false),
    ("users.delete", false),
    ("permission_groups.view", false),
    ("permission_groups.create", false),
    ("permission_groups.update", false),
    ("permission_groups.delete", false),
    ("settings.view", false),
    ("settings.update", false),
];

static USER_DEFAULTS: Lazy<Value> = Lazy::new(|| {
    let mut map = Map::new();
    for (key, enabled) in CATALOG {
        set_dot_path(&mut map, key, *enabled);
    }
    Value::Object(map)
});

static SUPERUSER_DEFAULTS: Lazy<Value> = Lazy::new(|| {
    let mut map = Map::new();
    for (key, _) in CATALOG {
        set_dot_path(&mut map, key, true);
    }
    Value::Object(map)
});

fn set_dot_path(map: &mut Map<String, Value>, key: &str, enabled: bool) {
    let mut parts = key.split('.');
    let Some(first) = parts.next() else { return };
    let rest: Vec<&str> = parts.collect();

    if rest.is_empty() {
        map.insert(first.to_string(), Value::Bool(enabled));
        return;
    }

    let entry = map
        .entry(first.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(inner) = entry {
        let joined = rest.join(".");
        set_dot_path(inner, &joined, enabled);
    }
}

/// Defaults embutidos por perfil
pub fn role_defaults(role: Role) -> Value {
    if role.is_superuser() {
        SUPERUSER_DEFAULTS.clone()
    } else {
        USER_DEFAULTS.clone()
    }
}

/// Sobrepõe os itens de um grupo customizado nos defaults.
/// `enabled = false` revoga um default `true`; `enabled = true` concede além
/// dos defaults.
fn apply_group_items(map: &mut Value, items: &[ResolvedGroupItem]) {
    let Value::Object(root) = map else { return };
    for item in items {
        set_dot_path(root, &item.key, item.enabled);
    }
}

/// Mescla o override JSON bruto do usuário (última escrita vence).
/// Somente folhas booleanas são consideradas; qualquer outro tipo é ignorado.
fn apply_user_overrides(map: &mut Value, overrides: &Value) {
    let (Value::Object(root), Value::Object(over)) = (map, overrides) else {
        return;
    };
    merge_bool_leaves(root, over);
}

fn merge_bool_leaves(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        match value {
            Value::Bool(_) => {
                target.insert(key.clone(), value.clone());
            }
            Value::Object(inner) => {
                let entry = target
                    .entry(key.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(existing) = entry {
                    merge_bool_leaves(existing, inner);
                }
            }
            _ => {}
        }
    }
}

/// Produz o mapa efetivo de capacidades de um usuário
pub fn effective_permissions(
    role: &str,
    group_items: &[ResolvedGroupItem],
    user_overrides: Option<&Value>,
) -> Value {
    let role = Role::parse(role);
    let mut map = role_defaults(role);

    if !role.is_superuser() {
        apply_group_items(&mut map, group_items);
        if let Some(overrides) = user_overrides {
            apply_user_overrides(&mut map, overrides);
        }
    }

    map
}

/// Avalia uma chave dot-path contra o mapa. Nunca entra em pânico.
pub fn has_permission(map: &Value, key: &str) -> bool {
    if key.is_empty() {
        return false;
    }

    let mut current = map;
    for part in key.split('.') {
        if part.is_empty() {
            return false;
        }
        match current.get(part) {
            Some(next) => current = next,
            None => return false,
        }
    }

    current.as_bool().unwrap_or(false)
}

/// Decisão final de autorização, com auditoria.
///
/// Owner/admin passam pelo bypass explícito (logado); os demais avaliam o
/// mapa efetivo. Negações também são logadas.
pub fn is_allowed(user_id: &str, role: &str, map: &Value, key: &str) -> bool {
    let parsed = Role::parse(role);
    if parsed.is_superuser() {
        log_superuser_bypass(user_id, parsed.as_str(), key);
        return true;
    }

    let allowed = has_permission(map, key);
    if !allowed {
        log_permission_denied(user_id, key);
    }
    allowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(key: &str, enabled: bool) -> ResolvedGroupItem {
        ResolvedGroupItem {
            key: key.to_string(),
            enabled,
        }
    }

    #[test]
    fn test_user_defaults_fail_closed() {
        // Qualquer chave não concedida pelo perfil avalia false
        let map = effective_permissions("user", &[], None);
        assert!(has_permission(&map, "leads.view"));
        assert!(!has_permission(&map, "leads.delete"));
        assert!(!has_permission(&map, "users.create"));
        assert!(!has_permission(&map, "recurso_inexistente.acao"));
    }

    #[test]
    fn test_unknown_role_falls_back_to_user() {
        let map = effective_permissions("gerente", &[], None);
        assert!(!has_permission(&map, "users.create"));
        assert!(has_permission(&map, "leads.view"));
    }

    #[test]
    fn test_superuser_map_grants_everything() {
        let map = effective_permissions("owner", &[], None);
        for (key, _) in CATALOG {
            assert!(has_permission(&map, key), "owner deveria ter {}", key);
        }
    }

    #[test]
    fn test_group_item_revokes_default_true() {
        // Grupo "Suporte": leads.view=true, leads.delete=false
        let items = vec![item("leads.view", true), item("leads.delete", false)];
        let map = effective_permissions("user", &items, None);
        assert!(has_permission(&map, "leads.view"));
        assert!(!has_permission(&map, "leads.delete"));

        // Revogação de um default true
        let items = vec![item("leads.create", false)];
        let map = effective_permissions("user", &items, None);
        assert!(!has_permission(&map, "leads.create"));
    }

    #[test]
    fn test_group_item_grants_beyond_defaults() {
        let items = vec![item("tags.create", true), item("users.view", true)];
        let map = effective_permissions("user", &items, None);
        assert!(has_permission(&map, "tags.create"));
        assert!(has_permission(&map, "users.view"));
    }

    #[test]
    fn test_user_override_wins_last() {
        let items = vec![item("tags.create", true)];
        let overrides = json!({ "tags": { "create": false }, "leads": { "delete": true } });
        let map = effective_permissions("user", &items, Some(&overrides));
        assert!(!has_permission(&map, "tags.create"));
        assert!(has_permission(&map, "leads.delete"));
    }

    #[test]
    fn test_group_items_ignored_for_superuser() {
        let items = vec![item("leads.view", false)];
        let map = effective_permissions("admin", &items, None);
        assert!(has_permission(&map, "leads.view"));
    }

    #[test]
    fn test_malformed_keys_evaluate_false() {
        let map = effective_permissions("user", &[], None);
        assert!(!has_permission(&map, ""));
        assert!(!has_permission(&map, "."));
        assert!(!has_permission(&map, "leads."));
        assert!(!has_permission(&map, ".view"));
        // Chave intermediária (não-folha) não é booleana
        assert!(!has_permission(&map, "leads"));
        // Profundidade além da folha
        assert!(!has_permission(&map, "leads.view.extra"));
    }

    #[test]
    fn test_non_boolean_override_leaf_is_ignored() {
        let overrides = json!({ "leads": { "delete": "sim" } });
        let map = effective_permissions("user", &[], Some(&overrides));
        assert!(!has_permission(&map, "leads.delete"));
    }

    #[test]
    fn test_is_allowed_superuser_bypass() {
        let map = effective_permissions("user", &[], None);
        // Mesmo com mapa restrito, owner/admin passam pelo bypass
        assert!(is_allowed("u1", "owner", &map, "settings.update"));
        assert!(is_allowed("u1", "admin", &map, "settings.update"));
        assert!(!is_allowed("u1", "user", &map, "settings.update"));
    }

    #[test]
    fn test_random_garbage_keys_never_panic() {
        use rand::{distributions::Alphanumeric, Rng};

        let map = effective_permissions("user", &[], None);
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let len = rng.gen_range(0..24);
            let key: String = (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(len)
                .map(char::from)
                .collect();
            // Chave aleatória (sem ponto) nunca concede nada além do catálogo
            let _ = has_permission(&map, &key);
            let _ = has_permission(&map, &format!(".{}", key));
            let _ = has_permission(&map, &format!("{}.", key));
        }
    }

    #[test]
    fn test_catalog_matches_seed_count() {
        // 10 recursos, ações view/create/update/delete menos settings (2)
        assert_eq!(CATALOG.len(), 38);
    }
}
