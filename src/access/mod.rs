use crate::utils::errors::{RegistryError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operations a role may be allowed to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Add,
    Edit,
    Delete,
    Deliver,
    Import,
    Export,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Add => "add certificates",
            Self::Edit => "edit certificates",
            Self::Delete => "delete certificates",
            Self::Deliver => "record deliveries",
            Self::Import => "import certificates",
            Self::Export => "export certificates",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions {
    pub can_add: bool,
    pub can_edit: bool,
    pub allow_delete: bool,
    pub can_deliver: bool,
    pub can_import: bool,
    pub can_export: bool,
}

impl Permissions {
    const FULL: Self = Self {
        can_add: true,
        can_edit: true,
        allow_delete: true,
        can_deliver: true,
        can_import: true,
        can_export: true,
    };

    const READ_ONLY: Self = Self {
        can_add: false,
        can_edit: false,
        allow_delete: false,
        can_deliver: false,
        can_import: false,
        can_export: true,
    };

    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::Add => self.can_add,
            Action::Edit => self.can_edit,
            Action::Delete => self.allow_delete,
            Action::Deliver => self.can_deliver,
            Action::Import => self.can_import,
            Action::Export => self.can_export,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    #[default]
    Admin,
    Viewer,
    CertificateOnly,
}

impl Role {
    pub fn permissions(&self) -> Permissions {
        match self {
            Self::Admin => Permissions::FULL,
            Self::Viewer | Self::CertificateOnly => Permissions::READ_ONLY,
        }
    }

    pub fn require(&self, action: Action) -> Result<()> {
        if self.permissions().allows(action) {
            Ok(())
        } else {
            tracing::debug!("Role {} denied: {}", self, action);
            Err(RegistryError::PermissionDenied(format!(
                "role '{self}' cannot {action}"
            )))
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "viewer" => Ok(Self::Viewer),
            "certificate-only" | "cert" => Ok(Self::CertificateOnly),
            _ => Err(format!("Invalid role: {s}")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Admin => "admin",
            Self::Viewer => "viewer",
            Self::CertificateOnly => "certificate-only",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_can_do_everything() {
        for action in [
            Action::Add,
            Action::Edit,
            Action::Delete,
            Action::Deliver,
            Action::Import,
            Action::Export,
        ] {
            assert!(Role::Admin.require(action).is_ok());
        }
    }

    #[test]
    fn test_read_only_roles_export_only() {
        for role in [Role::Viewer, Role::CertificateOnly] {
            assert!(!role.permissions().can_add);
            assert!(role.require(Action::Export).is_ok());
            assert!(matches!(
                role.require(Action::Delete),
                Err(RegistryError::PermissionDenied(_))
            ));
            assert!(role.require(Action::Deliver).is_err());
        }
    }

    #[test]
    fn test_role_names() {
        assert_eq!("certificate-only".parse::<Role>(), Ok(Role::CertificateOnly));
        assert_eq!(Role::Viewer.to_string(), "viewer");
        let yaml: Role = serde_yaml::from_str("certificate-only").unwrap();
        assert_eq!(yaml, Role::CertificateOnly);
    }
}
