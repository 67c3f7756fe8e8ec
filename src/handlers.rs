use crate::{
    AppState,
    auth::{self, AuthUser},
    error::ApiError,
    models::{
        AdminDashboardStats, AnalysesResponse, Anamnesis, NotificationsResponse,
        OnboardingRequest, RequestAnalysisRequest, RiskAnalysis, RiskLevelCount, RolesResponse,
        SessionRequest, SubmitAnamnesisRequest, User, UserProfile,
    },
    roles::{Feature, Resolution, Role, RoleId},
    session::SessionCookie,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

// --- Query Structs ---

/// PatientQuery
///
/// `?patientId=...` for the history endpoints. Kept optional so a missing value
/// produces the `{ "error": ... }` body instead of the extractor's plain-text rejection.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase", parameter_in = Query)]
pub struct PatientQuery {
    pub patient_id: Option<String>,
}

impl PatientQuery {
    pub fn require(&self) -> Result<&str, ApiError> {
        self.patient_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(ApiError::MissingParameter("patientId"))
    }
}

/// LandingQuery
///
/// `?subjectId=...` for the landing resolver. Defaults to the caller's own id.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase", parameter_in = Query)]
pub struct LandingQuery {
    pub subject_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RoleFilter {
    pub role: Option<String>,
}

// --- Onboarding & Session ---

/// list_roles
///
/// [Public Route] The onboarding configuration: every role with its label, landing path,
/// subject requirement and features.
#[utoipa::path(
    get,
    path = "/onboarding/roles",
    responses((status = 200, description = "Onboarding roles", body = RolesResponse))
)]
pub async fn list_roles(State(state): State<AppState>) -> Json<RolesResponse> {
    let roles = state
        .roles
        .registry()
        .definitions()
        .into_iter()
        .cloned()
        .collect();
    Json(RolesResponse { roles })
}

/// onboard
///
/// [Public Route] Creates the local profile for the subject of a token issued by the
/// identity provider and returns where the new user should land. The token is read
/// like any authenticated request (Bearer header or session cookie); no profile has
/// to exist yet.
///
/// Privileged roles (administrador, superusuario) are provisioned out of band and
/// cannot be self-assigned here.
#[utoipa::path(
    post,
    path = "/onboarding",
    request_body = OnboardingRequest,
    responses(
        (status = 201, description = "Profile created", body = Resolution),
        (status = 400, description = "Invalid payload", body = crate::models::ErrorBody),
        (status = 401, description = "Missing or invalid token", body = crate::models::ErrorBody),
        (status = 403, description = "Role cannot be self-assigned", body = crate::models::ErrorBody),
        (status = 409, description = "Profile exists", body = crate::models::ErrorBody)
    )
)]
pub async fn onboard(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<OnboardingRequest>,
) -> Result<(StatusCode, Json<Resolution>), ApiError> {
    let token = auth::request_token(&headers, &state.config.session_cookie)
        .ok_or(ApiError::Unauthorized)?;
    let claims = auth::decode_token(&token, &state.config.jwt_secret)?;
    if claims.sub.is_empty() {
        return Err(ApiError::Unauthorized);
    }

    if !payload.email.contains('@') {
        return Err(ApiError::BadRequest("email is not valid".to_string()));
    }
    if matches!(payload.role, Role::Administrador | Role::Superusuario) {
        return Err(ApiError::Forbidden);
    }

    let user = User {
        id: claims.sub,
        email: payload.email,
        role: payload.role.as_str().to_string(),
    };
    let created = state
        .repo
        .create_user(user)
        .await
        .ok_or(ApiError::Conflict("profile"))?;

    tracing::info!(user_id = %created.id, role = %created.role, "profile onboarded");

    let landing = state.roles.resolve_path(&created.role, Some(&created.id));
    Ok((StatusCode::CREATED, Json(landing)))
}

/// create_session
///
/// [Public Route] Exchanges a valid token for the httpOnly session cookie. The cookie
/// lives as long as the token; the body carries the landing path for the user's role.
#[utoipa::path(
    post,
    path = "/session",
    request_body = SessionRequest,
    responses(
        (status = 200, description = "Session cookie issued", body = Resolution),
        (status = 401, description = "Invalid token or unknown profile", body = crate::models::ErrorBody)
    )
)]
pub async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<SessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = auth::decode_token(&payload.token, &state.config.jwt_secret)?;
    let user = state
        .repo
        .get_user(&claims.sub)
        .await
        .ok_or(ApiError::Unauthorized)?;

    let max_age = claims.exp as i64 - chrono::Utc::now().timestamp();
    let cookie = SessionCookie::issue(&state.config, &payload.token, max_age);
    let landing = state.roles.resolve_path(&user.role, Some(&user.id));

    tracing::info!(user_id = %user.id, landing = %landing.path, "session issued");

    Ok((
        [(header::SET_COOKIE, cookie.to_header_value())],
        Json(landing),
    ))
}

/// logout
///
/// [Public Route] Clears the session cookie. Always succeeds so a stale client can
/// log out without a valid session.
#[utoipa::path(
    post,
    path = "/session/logout",
    responses((status = 204, description = "Session cookie cleared"))
)]
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let cookie = SessionCookie::clear(&state.config);
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, cookie.to_header_value())],
    )
}

/// get_me
///
/// [Authenticated Route] Profile of the caller plus its resolved landing path.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_me(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state
        .repo
        .get_user(&auth_user.id)
        .await
        .ok_or(ApiError::NotFound("profile"))?;
    let landing = state.roles.resolve(&auth_user.role, Some(&auth_user.id));

    Ok(Json(UserProfile {
        id: user.id,
        email: user.email,
        role: user.role,
        landing,
    }))
}

/// resolve_landing
///
/// [Authenticated Route] Landing path for the caller's role. Never fails once
/// authenticated: a stored role outside the registry answers with the generic
/// dashboard and `resolved: false`.
#[utoipa::path(
    get,
    path = "/landing",
    params(LandingQuery),
    responses(
        (status = 200, description = "Landing path", body = Resolution),
        (status = 401, description = "Not authenticated", body = crate::models::ErrorBody)
    )
)]
pub async fn resolve_landing(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<LandingQuery>,
) -> Json<Resolution> {
    let subject_id = query.subject_id.as_deref().unwrap_or(&auth_user.id);
    Json(state.roles.resolve(&auth_user.role, Some(subject_id)))
}

// --- Patient History ---

/// get_notifications
///
/// [Authenticated Route] Notifications addressed to `patientId`.
#[utoipa::path(
    get,
    path = "/history/notifications",
    params(PatientQuery),
    responses(
        (status = 200, description = "Notifications", body = NotificationsResponse),
        (status = 400, description = "patientId missing", body = crate::models::ErrorBody),
        (status = 403, description = "Not allowed", body = crate::models::ErrorBody)
    )
)]
pub async fn get_notifications(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PatientQuery>,
) -> Result<Json<NotificationsResponse>, ApiError> {
    let patient_id = query.require()?;
    auth_user.require_patient(state.roles.registry(), Feature::Notifications, patient_id)?;

    let notifications = state.repo.get_notifications(patient_id).await;
    Ok(Json(NotificationsResponse { notifications }))
}

/// get_analyses
///
/// [Authenticated Route] Risk analyses stored for `patientId`, newest first.
#[utoipa::path(
    get,
    path = "/history/analyses",
    params(PatientQuery),
    responses(
        (status = 200, description = "Analyses", body = AnalysesResponse),
        (status = 400, description = "patientId missing", body = crate::models::ErrorBody),
        (status = 403, description = "Not allowed", body = crate::models::ErrorBody)
    )
)]
pub async fn get_analyses(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PatientQuery>,
) -> Result<Json<AnalysesResponse>, ApiError> {
    let patient_id = query.require()?;
    auth_user.require_patient(state.roles.registry(), Feature::RiskAnalysis, patient_id)?;

    let analyses = state.repo.get_analyses(patient_id).await;
    Ok(Json(AnalysesResponse { analyses }))
}

/// mark_notification_read
///
/// [Authenticated Route] Patients may only mark their own notifications.
#[utoipa::path(
    patch,
    path = "/notifications/{id}/read",
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Marked as read"),
        (status = 404, description = "Not found or not yours", body = crate::models::ErrorBody)
    )
)]
pub async fn mark_notification_read(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    auth_user.require(state.roles.registry(), Feature::Notifications)?;

    let owner = auth_user.is_patient().then_some(auth_user.id.as_str());
    if state.repo.mark_notification_read(id, owner).await {
        Ok(StatusCode::OK)
    } else {
        Err(ApiError::NotFound("notification"))
    }
}

// --- Anamnesis & Analysis ---

/// submit_anamnesis
///
/// [Authenticated Route] Stores an intake form. Patients may omit `patientId`; the form
/// is then filed under their own subject id.
#[utoipa::path(
    post,
    path = "/anamnesis",
    request_body = SubmitAnamnesisRequest,
    responses(
        (status = 201, description = "Stored", body = Anamnesis),
        (status = 400, description = "Invalid form", body = crate::models::ErrorBody)
    )
)]
pub async fn submit_anamnesis(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<SubmitAnamnesisRequest>,
) -> Result<(StatusCode, Json<Anamnesis>), ApiError> {
    let patient_id = match payload.patient_id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => id.to_string(),
        None if auth_user.is_patient() => auth_user.id.clone(),
        None => return Err(ApiError::MissingParameter("patientId")),
    };
    auth_user.require_patient(state.roles.registry(), Feature::Anamnesis, &patient_id)?;

    if !payload.answers.is_object() {
        return Err(ApiError::BadRequest(
            "answers must be a JSON object".to_string(),
        ));
    }

    let record = state
        .repo
        .save_anamnesis(&patient_id, payload.answers)
        .await
        .ok_or(ApiError::Storage)?;

    state
        .repo
        .add_notification(
            &patient_id,
            "anamnesis",
            "Anamnesis recibida",
            "Tu historia clínica fue registrada correctamente.",
        )
        .await;

    Ok((StatusCode::CREATED, Json(record)))
}

/// get_anamnesis
///
/// [Authenticated Route] Latest intake form for `patientId`.
#[utoipa::path(
    get,
    path = "/anamnesis",
    params(PatientQuery),
    responses(
        (status = 200, description = "Latest anamnesis", body = Anamnesis),
        (status = 400, description = "patientId missing", body = crate::models::ErrorBody),
        (status = 404, description = "No anamnesis on file", body = crate::models::ErrorBody)
    )
)]
pub async fn get_anamnesis(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PatientQuery>,
) -> Result<Json<Anamnesis>, ApiError> {
    let patient_id = query.require()?;
    auth_user.require_patient(state.roles.registry(), Feature::Anamnesis, patient_id)?;

    state
        .repo
        .latest_anamnesis(patient_id)
        .await
        .map(Json)
        .ok_or(ApiError::NotFound("anamnesis"))
}

/// request_analysis
///
/// [Authenticated Route] Forwards the patient's latest anamnesis to the risk model,
/// stores the result and notifies the patient.
#[utoipa::path(
    post,
    path = "/analyses",
    request_body = RequestAnalysisRequest,
    responses(
        (status = 201, description = "Analysis stored", body = RiskAnalysis),
        (status = 404, description = "No anamnesis on file", body = crate::models::ErrorBody),
        (status = 502, description = "Analysis service failed", body = crate::models::ErrorBody)
    )
)]
pub async fn request_analysis(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<RequestAnalysisRequest>,
) -> Result<(StatusCode, Json<RiskAnalysis>), ApiError> {
    if payload.patient_id.is_empty() {
        return Err(ApiError::MissingParameter("patientId"));
    }
    let patient_id = payload.patient_id.as_str();
    auth_user.require_patient(state.roles.registry(), Feature::RiskAnalysis, patient_id)?;

    let anamnesis = state
        .repo
        .latest_anamnesis(patient_id)
        .await
        .ok_or(ApiError::NotFound("anamnesis"))?;

    let outcome = state.analysis.analyze(&anamnesis).await?;

    let analysis = state
        .repo
        .save_analysis(patient_id, &auth_user.id, &outcome)
        .await
        .ok_or(ApiError::Storage)?;

    tracing::info!(
        patient_id = %patient_id,
        risk_level = %analysis.risk_level,
        "risk analysis stored"
    );

    state
        .repo
        .add_notification(
            patient_id,
            "analysis",
            "Análisis de riesgo disponible",
            &format!("Nivel de riesgo: {}", analysis.risk_level),
        )
        .await;

    Ok((StatusCode::CREATED, Json(analysis)))
}

// --- Role Dashboards ---

/// list_patients
///
/// [Authenticated Route] Patient directory for physicians and administrators.
#[utoipa::path(
    get,
    path = "/patients",
    responses((status = 200, description = "Patients", body = [User]))
)]
pub async fn list_patients(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, ApiError> {
    auth_user.require(state.roles.registry(), Feature::PatientDirectory)?;
    Ok(Json(state.repo.list_users(Some(Role::Paciente)).await))
}

/// employer_overview
///
/// [Authenticated Route] Aggregate risk levels only; employers never see individual records.
#[utoipa::path(
    get,
    path = "/employer/overview",
    responses((status = 200, description = "Risk levels", body = [RiskLevelCount]))
)]
pub async fn employer_overview(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<RiskLevelCount>>, ApiError> {
    auth_user.require(state.roles.registry(), Feature::EmployerOverview)?;
    Ok(Json(state.repo.risk_summary().await))
}

/// get_admin_stats
///
/// [Admin Route] Counters for the administration dashboard.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses((status = 200, description = "Stats", body = AdminDashboardStats))
)]
pub async fn get_admin_stats(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AdminDashboardStats>, ApiError> {
    auth_user.require(state.roles.registry(), Feature::Administration)?;
    Ok(Json(state.repo.get_stats().await))
}

/// list_users
///
/// [Admin Route] Every profile, optionally filtered by `?role=`.
#[utoipa::path(
    get,
    path = "/admin/users",
    params(RoleFilter),
    responses((status = 200, description = "Users", body = [User]))
)]
pub async fn list_users(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<RoleFilter>,
) -> Result<Json<Vec<User>>, ApiError> {
    auth_user.require(state.roles.registry(), Feature::Administration)?;

    let role = match query.role.as_deref() {
        None | Some("") => None,
        Some(raw) => match RoleId::parse(raw) {
            RoleId::Known(role) => Some(role),
            RoleId::Unknown(_) => {
                return Err(ApiError::BadRequest(format!("unknown role `{raw}`")));
            }
        },
    };
    Ok(Json(state.repo.list_users(role).await))
}
