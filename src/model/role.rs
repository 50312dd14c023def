use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Portal role carried in the access token.
///
/// Legacy slugs (`jefe`, `gerencia`, ...) parse to the same canonical variant,
/// while `as_ref()` / `to_string()` always yield the English slug.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum Role {
    #[serde(alias = "empleado")]
    #[strum(to_string = "employee", serialize = "empleado")]
    Employee,
    #[serde(alias = "tecnico")]
    #[strum(to_string = "technician", serialize = "tecnico")]
    Technician,
    #[serde(alias = "jefe", alias = "jefatura")]
    #[strum(to_string = "chief", serialize = "jefe", serialize = "jefatura")]
    Chief,
    #[serde(alias = "gerente", alias = "gerencia")]
    #[strum(to_string = "manager", serialize = "gerente", serialize = "gerencia")]
    Manager,
    #[serde(alias = "administracion")]
    #[strum(to_string = "admin", serialize = "administracion")]
    Admin,
}

impl Role {
    /// Parses a role slug, accepting legacy aliases. Unknown slugs yield `None`.
    pub fn from_slug(slug: &str) -> Option<Self> {
        slug.trim().parse().ok()
    }

    /// Canonical slug followed by every legacy alias still found in stored data.
    pub fn slugs(&self) -> &'static [&'static str] {
        match self {
            Role::Employee => &["employee", "empleado"],
            Role::Technician => &["technician", "tecnico"],
            Role::Chief => &["chief", "jefe", "jefatura"],
            Role::Manager => &["manager", "gerente", "gerencia"],
            Role::Admin => &["admin", "administracion"],
        }
    }

    /// Managers are exempt from weekly field planning.
    pub fn plans_weekly(&self) -> bool {
        !matches!(self, Role::Manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_slugs_normalize() {
        assert_eq!(Role::from_slug("gerente"), Some(Role::Manager));
        assert_eq!(Role::from_slug("gerencia"), Some(Role::Manager));
        assert_eq!(Role::from_slug("jefatura"), Some(Role::Chief));
        assert_eq!(Role::from_slug("Jefe"), Some(Role::Chief));
        assert_eq!(Role::from_slug("tecnico"), Some(Role::Technician));
        assert_eq!(Role::from_slug("administracion"), Some(Role::Admin));
        assert_eq!(Role::from_slug(" employee "), Some(Role::Employee));
    }

    #[test]
    fn unknown_slug_is_rejected() {
        assert_eq!(Role::from_slug("supervisor"), None);
        assert_eq!(Role::from_slug(""), None);
    }

    #[test]
    fn canonical_slug_is_english() {
        assert_eq!(Role::Manager.as_ref(), "manager");
        assert_eq!(Role::from_slug("jefe").map(|r| r.to_string()), Some("chief".to_string()));
    }

    #[test]
    fn every_slug_parses_back() {
        for role in [Role::Employee, Role::Technician, Role::Chief, Role::Manager, Role::Admin] {
            assert_eq!(role.slugs()[0], role.as_ref());
            for slug in role.slugs() {
                assert_eq!(Role::from_slug(slug), Some(role));
            }
        }
    }

    #[test]
    fn serde_accepts_aliases() {
        let role: Role = serde_json::from_str("\"gerencia\"").unwrap();
        assert_eq!(role, Role::Manager);
        assert_eq!(serde_json::to_string(&Role::Chief).unwrap(), "\"chief\"");
    }
}
