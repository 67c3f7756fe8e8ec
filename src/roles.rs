use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, sync::Arc};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

/// Landing page handed out when a role cannot be resolved.
pub const FALLBACK_PATH: &str = "/dashboard";

/// Role
///
/// The closed set of platform user categories. The serialized form is the lowercase,
/// case-sensitive role identifier stored on profiles and carried through onboarding.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Paciente,
    Medico,
    Empresa,
    Administrador,
    Superusuario,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Paciente,
        Role::Medico,
        Role::Empresa,
        Role::Administrador,
        Role::Superusuario,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Paciente => "paciente",
            Role::Medico => "medico",
            Role::Empresa => "empresa",
            Role::Administrador => "administrador",
            Role::Superusuario => "superusuario",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RoleId
///
/// A raw role string after classification. Anything outside the known set is kept
/// verbatim in `Unknown` so the fallback path stays a first-class outcome.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoleId {
    Known(Role),
    Unknown(String),
}

impl RoleId {
    pub fn parse(raw: &str) -> Self {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == raw)
            .map(RoleId::Known)
            .unwrap_or_else(|| RoleId::Unknown(raw.to_string()))
    }

    pub fn known(&self) -> Option<Role> {
        match self {
            RoleId::Known(role) => Some(*role),
            RoleId::Unknown(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RoleId::Known(role) => role.as_str(),
            RoleId::Unknown(raw) => raw,
        }
    }
}

impl From<Role> for RoleId {
    fn from(role: Role) -> Self {
        RoleId::Known(role)
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feature
///
/// Dashboard capabilities gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Feature {
    Anamnesis,
    Notifications,
    RiskAnalysis,
    PatientDirectory,
    EmployerOverview,
    Administration,
}

/// RoleDefinition
///
/// One onboarding entry: how a role is labelled, where it lands after sign-in,
/// whether the landing path takes a subject segment, and which features it may use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RoleDefinition {
    pub role_id: Role,
    pub display_name: String,
    pub default_path: String,
    pub requires_subject_id: bool,
    pub features: Vec<Feature>,
}

struct RoleSeed {
    role: Role,
    display_name: &'static str,
    default_path: &'static str,
    requires_subject_id: bool,
    features: &'static [Feature],
}

const ALL_FEATURES: &[Feature] = &[
    Feature::Anamnesis,
    Feature::Notifications,
    Feature::RiskAnalysis,
    Feature::PatientDirectory,
    Feature::EmployerOverview,
    Feature::Administration,
];

const ROLE_TABLE: &[RoleSeed] = &[
    RoleSeed {
        role: Role::Paciente,
        display_name: "Paciente",
        default_path: "/dashboard/paciente",
        requires_subject_id: true,
        features: &[
            Feature::Anamnesis,
            Feature::Notifications,
            Feature::RiskAnalysis,
        ],
    },
    RoleSeed {
        role: Role::Medico,
        display_name: "Médico",
        default_path: "/dashboard/medico",
        requires_subject_id: true,
        features: &[
            Feature::Anamnesis,
            Feature::Notifications,
            Feature::RiskAnalysis,
            Feature::PatientDirectory,
        ],
    },
    RoleSeed {
        role: Role::Empresa,
        display_name: "Empresa",
        default_path: "/dashboard/empresa",
        requires_subject_id: false,
        features: &[Feature::EmployerOverview],
    },
    RoleSeed {
        role: Role::Administrador,
        display_name: "Administrador",
        default_path: "/dashboard/admin",
        requires_subject_id: false,
        features: &[
            Feature::Notifications,
            Feature::RiskAnalysis,
            Feature::PatientDirectory,
            Feature::Administration,
        ],
    },
    RoleSeed {
        role: Role::Superusuario,
        display_name: "Superusuario",
        default_path: "/dashboard/superusuario",
        requires_subject_id: false,
        features: ALL_FEATURES,
    },
];

impl From<&RoleSeed> for RoleDefinition {
    fn from(seed: &RoleSeed) -> Self {
        RoleDefinition {
            role_id: seed.role,
            display_name: seed.display_name.to_string(),
            default_path: seed.default_path.to_string(),
            requires_subject_id: seed.requires_subject_id,
            features: seed.features.to_vec(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("role `{0}` is defined more than once")]
    DuplicateRole(Role),
    #[error("role `{role}` has an invalid default path `{path}`")]
    InvalidPath { role: Role, path: String },
}

/// RoleRegistry
///
/// Immutable mapping from role to its definition. Built once at startup and shared
/// by reference; there is no API to mutate it afterwards.
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    entries: HashMap<Role, RoleDefinition>,
}

impl RoleRegistry {
    /// builtin
    ///
    /// The registry backing the onboarding configuration shipped with the portal.
    pub fn builtin() -> Self {
        let entries = ROLE_TABLE
            .iter()
            .map(|seed| (seed.role, RoleDefinition::from(seed)))
            .collect();
        Self { entries }
    }

    /// from_definitions
    ///
    /// Builds a registry from caller-supplied definitions, rejecting duplicates and
    /// default paths that are empty or not absolute.
    pub fn from_definitions(definitions: Vec<RoleDefinition>) -> Result<Self, RegistryError> {
        let mut entries = HashMap::with_capacity(definitions.len());
        for definition in definitions {
            if !definition.default_path.starts_with('/') {
                return Err(RegistryError::InvalidPath {
                    role: definition.role_id,
                    path: definition.default_path,
                });
            }
            let role = definition.role_id;
            if entries.insert(role, definition).is_some() {
                return Err(RegistryError::DuplicateRole(role));
            }
        }
        Ok(Self { entries })
    }

    pub fn get(&self, role: Role) -> Option<&RoleDefinition> {
        self.entries.get(&role)
    }

    pub fn lookup(&self, role_id: &RoleId) -> Option<&RoleDefinition> {
        role_id.known().and_then(|role| self.get(role))
    }

    /// Definitions in declaration order of `Role`.
    pub fn definitions(&self) -> Vec<&RoleDefinition> {
        let mut defs: Vec<_> = self.entries.values().collect();
        defs.sort_by_key(|def| def.role_id);
        defs
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// allows
    ///
    /// Feature gate. Unknown or unregistered roles are granted nothing.
    pub fn allows(&self, role_id: &RoleId, feature: Feature) -> bool {
        self.lookup(role_id)
            .is_some_and(|def| def.features.contains(&feature))
    }
}

/// Resolution
///
/// The outcome of mapping a role (and optional subject id) to a landing path.
/// `path` is never empty; `resolved` is false only for the generic fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Resolution {
    pub path: String,
    pub resolved: bool,
}

/// RouteDiagnostics
///
/// Sink for non-fatal routing diagnostics. Injected into the router so tests can
/// observe unknown-role fallbacks without scraping log output.
pub trait RouteDiagnostics: Send + Sync {
    fn unknown_role(&self, role_id: &str);
}

/// Emits routing diagnostics as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl RouteDiagnostics for TracingDiagnostics {
    fn unknown_role(&self, role_id: &str) {
        tracing::warn!(
            role_id = ?role_id,
            fallback = FALLBACK_PATH,
            "unknown role, using generic dashboard"
        );
    }
}

/// RoleRouter
///
/// Translates a role string into a navigable landing path. Pure over the registry
/// and the call arguments; safe to share across request handlers.
#[derive(Clone)]
pub struct RoleRouter {
    registry: Arc<RoleRegistry>,
    diagnostics: Arc<dyn RouteDiagnostics>,
}

impl fmt::Debug for RoleRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleRouter")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl RoleRouter {
    pub fn new(registry: Arc<RoleRegistry>) -> Self {
        Self::with_diagnostics(registry, Arc::new(TracingDiagnostics))
    }

    pub fn with_diagnostics(
        registry: Arc<RoleRegistry>,
        diagnostics: Arc<dyn RouteDiagnostics>,
    ) -> Self {
        Self {
            registry,
            diagnostics,
        }
    }

    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    /// resolve_path
    ///
    /// Resolves a raw role string. See [`RoleRouter::resolve`].
    pub fn resolve_path(&self, role_id: &str, subject_id: Option<&str>) -> Resolution {
        self.resolve(&RoleId::parse(role_id), subject_id)
    }

    /// resolve
    ///
    /// - unknown role: one diagnostic, `{ "/dashboard", resolved: false }`.
    /// - role without subject segment: its default path.
    /// - role with subject segment: `default_path/subject_id`, or the bare default
    ///   path when the subject id is missing or empty.
    pub fn resolve(&self, role_id: &RoleId, subject_id: Option<&str>) -> Resolution {
        let Some(definition) = self.registry.lookup(role_id) else {
            self.diagnostics.unknown_role(role_id.as_str());
            return Resolution {
                path: FALLBACK_PATH.to_string(),
                resolved: false,
            };
        };

        let path = match subject_id {
            Some(subject) if definition.requires_subject_id && !subject.is_empty() => {
                format!("{}/{}", definition.default_path, subject)
            }
            _ => definition.default_path.clone(),
        };

        Resolution {
            path,
            resolved: true,
        }
    }
}
