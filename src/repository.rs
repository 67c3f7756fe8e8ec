use crate::analysis::AnalysisOutcome;
use crate::models::{AdminDashboardStats, Anamnesis, Notification, RiskAnalysis, RiskLevelCount, User};
use crate::roles::Role;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// HistoryRepository
///
/// Persistence contract behind the dashboards: profiles, the patient history
/// (notifications, analyses, intake forms) and the aggregate counters.
///
/// Implementations log storage failures and degrade to empty results, `None` or `false`;
/// handlers decide how each of those surfaces to the client.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    // --- Profiles ---
    async fn get_user(&self, id: &str) -> Option<User>;
    // Returns None when the id is already taken or the insert fails.
    async fn create_user(&self, user: User) -> Option<User>;
    async fn list_users(&self, role: Option<Role>) -> Vec<User>;

    // --- Notifications ---
    async fn get_notifications(&self, patient_id: &str) -> Vec<Notification>;
    async fn add_notification(
        &self,
        patient_id: &str,
        kind: &str,
        title: &str,
        message: &str,
    ) -> Option<Notification>;
    /// Marks a notification read. When `owner` is set the notification must belong to it.
    async fn mark_notification_read(&self, id: Uuid, owner: Option<&str>) -> bool;

    // --- Analyses ---
    async fn get_analyses(&self, patient_id: &str) -> Vec<RiskAnalysis>;
    async fn save_analysis(
        &self,
        patient_id: &str,
        requested_by: &str,
        outcome: &AnalysisOutcome,
    ) -> Option<RiskAnalysis>;

    // --- Anamnesis ---
    async fn save_anamnesis(&self, patient_id: &str, answers: serde_json::Value)
    -> Option<Anamnesis>;
    async fn latest_anamnesis(&self, patient_id: &str) -> Option<Anamnesis>;

    // --- Dashboards ---
    async fn get_stats(&self) -> AdminDashboardStats;
    async fn risk_summary(&self) -> Vec<RiskLevelCount>;
}

/// RepositoryState
///
/// The shared handle stored in the application state.
pub type RepositoryState = Arc<dyn HistoryRepository>;

/// PostgresRepository
///
/// `HistoryRepository` backed by Postgres. Schema lives in `migrations/`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn count(&self, query: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(query)
            .fetch_one(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("count error: {:?}", e);
                0
            })
    }
}

#[async_trait]
impl HistoryRepository for PostgresRepository {
    async fn get_user(&self, id: &str) -> Option<User> {
        sqlx::query_as::<_, User>("SELECT id, email, role FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_user error: {:?}", e);
                None
            })
    }

    /// create_user
    ///
    /// `ON CONFLICT DO NOTHING` turns a duplicate onboarding into `None` instead of an error.
    async fn create_user(&self, user: User) -> Option<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO profiles (id, email, role) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO NOTHING RETURNING id, email, role",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.role)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("create_user error: {:?}", e);
            None
        })
    }

    async fn list_users(&self, role: Option<Role>) -> Vec<User> {
        let result = match role {
            Some(role) => {
                sqlx::query_as::<_, User>(
                    "SELECT id, email, role FROM profiles WHERE role = $1 ORDER BY email",
                )
                .bind(role.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, User>("SELECT id, email, role FROM profiles ORDER BY email")
                    .fetch_all(&self.pool)
                    .await
            }
        };
        result.unwrap_or_else(|e| {
            tracing::error!("list_users error: {:?}", e);
            vec![]
        })
    }

    async fn get_notifications(&self, patient_id: &str) -> Vec<Notification> {
        sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, patient_id, title, message, kind, is_read, created_at
            FROM notifications
            WHERE patient_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(patient_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_notifications error: {:?}", e);
            vec![]
        })
    }

    async fn add_notification(
        &self,
        patient_id: &str,
        kind: &str,
        title: &str,
        message: &str,
    ) -> Option<Notification> {
        sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (id, patient_id, title, message, kind, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, false, NOW())
            RETURNING id, patient_id, title, message, kind, is_read, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(patient_id)
        .bind(title)
        .bind(message)
        .bind(kind)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| tracing::error!("add_notification error: {:?}", e))
        .ok()
    }

    async fn mark_notification_read(&self, id: Uuid, owner: Option<&str>) -> bool {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = true \
             WHERE id = $1 AND ($2::TEXT IS NULL OR patient_id = $2)",
        )
        .bind(id)
        .bind(owner)
        .execute(&self.pool)
        .await;

        match result {
            Ok(r) => r.rows_affected() > 0,
            Err(e) => {
                tracing::error!("mark_notification_read error: {:?}", e);
                false
            }
        }
    }

    async fn get_analyses(&self, patient_id: &str) -> Vec<RiskAnalysis> {
        sqlx::query_as::<_, RiskAnalysis>(
            r#"
            SELECT id, patient_id, requested_by, risk_level, summary, created_at
            FROM analyses
            WHERE patient_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(patient_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_analyses error: {:?}", e);
            vec![]
        })
    }

    async fn save_analysis(
        &self,
        patient_id: &str,
        requested_by: &str,
        outcome: &AnalysisOutcome,
    ) -> Option<RiskAnalysis> {
        sqlx::query_as::<_, RiskAnalysis>(
            r#"
            INSERT INTO analyses (id, patient_id, requested_by, risk_level, summary, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING id, patient_id, requested_by, risk_level, summary, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(patient_id)
        .bind(requested_by)
        .bind(&outcome.risk_level)
        .bind(&outcome.summary)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| tracing::error!("save_analysis error: {:?}", e))
        .ok()
    }

    async fn save_anamnesis(
        &self,
        patient_id: &str,
        answers: serde_json::Value,
    ) -> Option<Anamnesis> {
        sqlx::query_as::<_, Anamnesis>(
            r#"
            INSERT INTO anamnesis (id, patient_id, answers, submitted_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING id, patient_id, answers, submitted_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(patient_id)
        .bind(sqlx::types::Json(answers))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| tracing::error!("save_anamnesis error: {:?}", e))
        .ok()
    }

    async fn latest_anamnesis(&self, patient_id: &str) -> Option<Anamnesis> {
        sqlx::query_as::<_, Anamnesis>(
            r#"
            SELECT id, patient_id, answers, submitted_at
            FROM anamnesis
            WHERE patient_id = $1
            ORDER BY submitted_at DESC
            LIMIT 1
            "#,
        )
        .bind(patient_id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("latest_anamnesis error: {:?}", e);
            None
        })
    }

    /// get_stats
    ///
    /// All admin dashboard counters. A failing counter reads as zero.
    async fn get_stats(&self) -> AdminDashboardStats {
        AdminDashboardStats {
            total_users: self.count("SELECT COUNT(*) FROM profiles").await,
            total_patients: self
                .count("SELECT COUNT(*) FROM profiles WHERE role = 'paciente'")
                .await,
            total_analyses: self.count("SELECT COUNT(*) FROM analyses").await,
            unread_notifications: self
                .count("SELECT COUNT(*) FROM notifications WHERE is_read = false")
                .await,
        }
    }

    async fn risk_summary(&self) -> Vec<RiskLevelCount> {
        sqlx::query_as::<_, RiskLevelCount>(
            "SELECT risk_level, COUNT(*) AS total FROM analyses GROUP BY risk_level ORDER BY risk_level",
        )
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("risk_summary error: {:?}", e);
            vec![]
        })
    }
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    notifications: Vec<Notification>,
    analyses: Vec<RiskAnalysis>,
    anamnesis: Vec<Anamnesis>,
}

/// InMemoryRepository
///
/// Process-local `HistoryRepository` for local runs without `DATABASE_URL` and for tests.
/// Listing order matches the Postgres implementation (newest first).
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            tables: RwLock::new(Tables {
                users,
                ..Tables::default()
            }),
        }
    }
}

#[async_trait]
impl HistoryRepository for InMemoryRepository {
    async fn get_user(&self, id: &str) -> Option<User> {
        let tables = self.tables.read().await;
        tables.users.iter().find(|u| u.id == id).cloned()
    }

    async fn create_user(&self, user: User) -> Option<User> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.id == user.id) {
            return None;
        }
        tables.users.push(user.clone());
        Some(user)
    }

    async fn list_users(&self, role: Option<Role>) -> Vec<User> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables
            .users
            .iter()
            .filter(|u| role.is_none_or(|r| u.role == r.as_str()))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        users
    }

    async fn get_notifications(&self, patient_id: &str) -> Vec<Notification> {
        let tables = self.tables.read().await;
        let mut found: Vec<Notification> = tables
            .notifications
            .iter()
            .filter(|n| n.patient_id == patient_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found
    }

    async fn add_notification(
        &self,
        patient_id: &str,
        kind: &str,
        title: &str,
        message: &str,
    ) -> Option<Notification> {
        let notification = Notification {
            id: Uuid::new_v4(),
            patient_id: patient_id.to_string(),
            title: title.to_string(),
            message: message.to_string(),
            kind: kind.to_string(),
            is_read: false,
            created_at: Utc::now(),
        };
        self.tables
            .write()
            .await
            .notifications
            .push(notification.clone());
        Some(notification)
    }

    async fn mark_notification_read(&self, id: Uuid, owner: Option<&str>) -> bool {
        let mut tables = self.tables.write().await;
        match tables
            .notifications
            .iter_mut()
            .find(|n| n.id == id && owner.is_none_or(|o| n.patient_id == o))
        {
            Some(notification) => {
                notification.is_read = true;
                true
            }
            None => false,
        }
    }

    async fn get_analyses(&self, patient_id: &str) -> Vec<RiskAnalysis> {
        let tables = self.tables.read().await;
        let mut found: Vec<RiskAnalysis> = tables
            .analyses
            .iter()
            .filter(|a| a.patient_id == patient_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found
    }

    async fn save_analysis(
        &self,
        patient_id: &str,
        requested_by: &str,
        outcome: &AnalysisOutcome,
    ) -> Option<RiskAnalysis> {
        let analysis = RiskAnalysis {
            id: Uuid::new_v4(),
            patient_id: patient_id.to_string(),
            requested_by: requested_by.to_string(),
            risk_level: outcome.risk_level.clone(),
            summary: outcome.summary.clone(),
            created_at: Utc::now(),
        };
        self.tables.write().await.analyses.push(analysis.clone());
        Some(analysis)
    }

    async fn save_anamnesis(
        &self,
        patient_id: &str,
        answers: serde_json::Value,
    ) -> Option<Anamnesis> {
        let record = Anamnesis {
            id: Uuid::new_v4(),
            patient_id: patient_id.to_string(),
            answers,
            submitted_at: Utc::now(),
        };
        self.tables.write().await.anamnesis.push(record.clone());
        Some(record)
    }

    async fn latest_anamnesis(&self, patient_id: &str) -> Option<Anamnesis> {
        let tables = self.tables.read().await;
        // max_by_key keeps the last maximum, so later inserts win timestamp ties.
        tables
            .anamnesis
            .iter()
            .filter(|a| a.patient_id == patient_id)
            .max_by_key(|a| a.submitted_at)
            .cloned()
    }

    async fn get_stats(&self) -> AdminDashboardStats {
        let tables = self.tables.read().await;
        AdminDashboardStats {
            total_users: tables.users.len() as i64,
            total_patients: tables
                .users
                .iter()
                .filter(|u| u.role == Role::Paciente.as_str())
                .count() as i64,
            total_analyses: tables.analyses.len() as i64,
            unread_notifications: tables.notifications.iter().filter(|n| !n.is_read).count()
                as i64,
        }
    }

    async fn risk_summary(&self) -> Vec<RiskLevelCount> {
        let tables = self.tables.read().await;
        let mut counts = std::collections::BTreeMap::<&str, i64>::new();
        for analysis in &tables.analyses {
            *counts.entry(analysis.risk_level.as_str()).or_default() += 1;
        }
        counts
            .into_iter()
            .map(|(risk_level, total)| RiskLevelCount {
                risk_level: risk_level.to_string(),
                total,
            })
            .collect()
    }
}
