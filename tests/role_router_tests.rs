use salud_portal::roles::{
    FALLBACK_PATH, Feature, RegistryError, Resolution, Role, RoleDefinition, RoleId,
    RoleRegistry, RoleRouter, RouteDiagnostics,
};
use std::sync::{Arc, Mutex};

// --- Test Utilities ---

/// Captures unknown-role diagnostics instead of logging them.
#[derive(Default)]
struct RecordingDiagnostics {
    seen: Mutex<Vec<String>>,
}

impl RecordingDiagnostics {
    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl RouteDiagnostics for RecordingDiagnostics {
    fn unknown_role(&self, role_id: &str) {
        self.seen.lock().unwrap().push(role_id.to_string());
    }
}

fn recording_router() -> (RoleRouter, Arc<RecordingDiagnostics>) {
    let diagnostics = Arc::new(RecordingDiagnostics::default());
    let router = RoleRouter::with_diagnostics(
        Arc::new(RoleRegistry::builtin()),
        diagnostics.clone(),
    );
    (router, diagnostics)
}

fn resolved(path: &str) -> Resolution {
    Resolution {
        path: path.to_string(),
        resolved: true,
    }
}

// --- Landing Scenarios ---

#[test]
fn test_patient_with_subject_lands_on_personal_dashboard() {
    let (router, diagnostics) = recording_router();
    assert_eq!(
        router.resolve_path("paciente", Some("uid123")),
        resolved("/dashboard/paciente/uid123")
    );
    assert!(diagnostics.seen().is_empty());
}

#[test]
fn test_employer_lands_on_default_path() {
    let (router, _) = recording_router();
    assert_eq!(router.resolve_path("empresa", None), resolved("/dashboard/empresa"));
}

#[test]
fn test_physician_without_subject_degrades_to_default_path() {
    let (router, diagnostics) = recording_router();
    assert_eq!(router.resolve_path("medico", None), resolved("/dashboard/medico"));
    assert!(diagnostics.seen().is_empty());
}

#[test]
fn test_unknown_role_falls_back_with_one_diagnostic() {
    let (router, diagnostics) = recording_router();
    assert_eq!(
        router.resolve_path("desconocido", None),
        Resolution {
            path: "/dashboard".to_string(),
            resolved: false,
        }
    );
    assert_eq!(diagnostics.seen(), vec!["desconocido".to_string()]);
}

#[test]
fn test_administrator_lands_on_admin_dashboard() {
    let (router, _) = recording_router();
    assert_eq!(
        router.resolve_path("administrador", None),
        resolved("/dashboard/admin")
    );
}

// --- Properties Over The Registry ---

#[test]
fn test_every_role_without_subject_requirement_resolves_to_default_path() {
    let (router, _) = recording_router();
    let registry = RoleRegistry::builtin();

    for def in registry.definitions() {
        if def.requires_subject_id {
            continue;
        }
        // A subject id is ignored for roles that do not take one.
        for subject in [None, Some("ignored")] {
            assert_eq!(
                router.resolve_path(def.role_id.as_str(), subject),
                resolved(&def.default_path),
                "role {}",
                def.role_id
            );
        }
    }
}

#[test]
fn test_subject_roles_append_non_empty_subject() {
    let (router, _) = recording_router();
    let registry = RoleRegistry::builtin();

    for def in registry.definitions().into_iter().filter(|d| d.requires_subject_id) {
        for subject in ["a", "uid123", "doc-42"] {
            assert_eq!(
                router.resolve_path(def.role_id.as_str(), Some(subject)),
                resolved(&format!("{}/{}", def.default_path, subject))
            );
        }
        assert_eq!(
            router.resolve_path(def.role_id.as_str(), Some("")),
            resolved(&def.default_path)
        );
        assert_eq!(
            router.resolve_path(def.role_id.as_str(), None),
            resolved(&def.default_path)
        );
    }
}

#[test]
fn test_unregistered_strings_never_resolve() {
    let (router, diagnostics) = recording_router();
    let inputs = ["", "Paciente", "PACIENTE", " paciente", "admin", "doctor"];

    for input in inputs {
        let result = router.resolve_path(input, Some("uid123"));
        assert_eq!(result.path, FALLBACK_PATH, "input {:?}", input);
        assert!(!result.resolved);
    }
    assert_eq!(diagnostics.seen().len(), inputs.len());
}

#[test]
fn test_resolution_is_idempotent() {
    let (router, _) = recording_router();
    let first = router.resolve_path("paciente", Some("uid123"));
    for _ in 0..10 {
        assert_eq!(router.resolve_path("paciente", Some("uid123")), first);
    }
}

#[test]
fn test_role_missing_from_custom_registry_falls_back() {
    let diagnostics = Arc::new(RecordingDiagnostics::default());
    let registry = RoleRegistry::from_definitions(vec![RoleDefinition {
        role_id: Role::Empresa,
        display_name: "Empresa".to_string(),
        default_path: "/empresa".to_string(),
        requires_subject_id: false,
        features: vec![],
    }])
    .unwrap();
    let router = RoleRouter::with_diagnostics(Arc::new(registry), diagnostics.clone());

    assert_eq!(router.resolve_path("empresa", None), resolved("/empresa"));
    let result = router.resolve_path("paciente", Some("uid123"));
    assert!(!result.resolved);
    assert_eq!(diagnostics.seen(), vec!["paciente".to_string()]);
}

#[test]
fn test_router_is_shareable_across_threads() {
    let (router, diagnostics) = recording_router();
    let router = Arc::new(router);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let router = router.clone();
            std::thread::spawn(move || {
                let subject = format!("uid{}", i);
                router.resolve_path("paciente", Some(&subject))
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(
            handle.join().unwrap(),
            resolved(&format!("/dashboard/paciente/uid{}", i))
        );
    }
    assert!(diagnostics.seen().is_empty());
}

// --- Registry ---

#[test]
fn test_builtin_registry_covers_every_role() {
    let registry = RoleRegistry::builtin();
    assert_eq!(registry.len(), Role::ALL.len());

    let order: Vec<Role> = registry.definitions().iter().map(|d| d.role_id).collect();
    assert_eq!(order, Role::ALL.to_vec());

    // The shipped table passes the same validation as caller-supplied definitions.
    let copies = registry.definitions().into_iter().cloned().collect();
    assert!(RoleRegistry::from_definitions(copies).is_ok());
}

#[test]
fn test_registry_rejects_duplicates_and_relative_paths() {
    let def = |path: &str| RoleDefinition {
        role_id: Role::Medico,
        display_name: "Médico".to_string(),
        default_path: path.to_string(),
        requires_subject_id: true,
        features: vec![],
    };

    assert_eq!(
        RoleRegistry::from_definitions(vec![def("/a"), def("/b")]).unwrap_err(),
        RegistryError::DuplicateRole(Role::Medico)
    );
    assert!(matches!(
        RoleRegistry::from_definitions(vec![def("")]),
        Err(RegistryError::InvalidPath { .. })
    ));
    assert!(matches!(
        RoleRegistry::from_definitions(vec![def("dashboard")]),
        Err(RegistryError::InvalidPath { .. })
    ));
}

#[test]
fn test_feature_gates() {
    let registry = RoleRegistry::builtin();
    let role = |raw: &str| RoleId::parse(raw);

    assert!(registry.allows(&role("paciente"), Feature::Anamnesis));
    assert!(!registry.allows(&role("paciente"), Feature::PatientDirectory));
    assert!(registry.allows(&role("medico"), Feature::PatientDirectory));
    assert!(registry.allows(&role("empresa"), Feature::EmployerOverview));
    assert!(!registry.allows(&role("empresa"), Feature::Notifications));
    assert!(registry.allows(&role("administrador"), Feature::Administration));
    assert!(!registry.allows(&role("medico"), Feature::Administration));

    let superuser = role("superusuario");
    for feature in [
        Feature::Anamnesis,
        Feature::Notifications,
        Feature::RiskAnalysis,
        Feature::PatientDirectory,
        Feature::EmployerOverview,
        Feature::Administration,
    ] {
        assert!(registry.allows(&superuser, feature));
        assert!(!registry.allows(&role("desconocido"), feature));
    }
}

#[test]
fn test_role_id_parsing_is_case_sensitive() {
    assert_eq!(RoleId::parse("medico"), RoleId::Known(Role::Medico));
    assert_eq!(
        RoleId::parse("Medico"),
        RoleId::Unknown("Medico".to_string())
    );
    assert_eq!(RoleId::parse("").as_str(), "");
    for role in Role::ALL {
        assert_eq!(RoleId::parse(role.as_str()).known(), Some(role));
    }
}
