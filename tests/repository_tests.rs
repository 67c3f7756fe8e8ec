use salud_portal::{
    InMemoryRepository,
    analysis::AnalysisOutcome,
    models::User,
    repository::HistoryRepository,
    roles::Role,
};
use serde_json::json;
use uuid::Uuid;

fn user(id: &str, role: &str) -> User {
    User {
        id: id.to_string(),
        email: format!("{}@example.com", id),
        role: role.to_string(),
    }
}

#[tokio::test]
async fn test_create_user_rejects_duplicates() {
    let repo = InMemoryRepository::new();

    assert!(repo.create_user(user("a", "paciente")).await.is_some());
    assert!(repo.create_user(user("a", "medico")).await.is_none());
    assert_eq!(repo.get_user("a").await.unwrap().role, "paciente");
    assert!(repo.get_user("b").await.is_none());
}

#[tokio::test]
async fn test_list_users_filters_by_role() {
    let repo = InMemoryRepository::with_users(vec![
        user("b", "paciente"),
        user("a", "paciente"),
        user("c", "medico"),
    ]);

    let patients = repo.list_users(Some(Role::Paciente)).await;
    let ids: Vec<&str> = patients.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);

    assert_eq!(repo.list_users(None).await.len(), 3);
    assert!(repo.list_users(Some(Role::Empresa)).await.is_empty());
}

#[tokio::test]
async fn test_notifications_are_scoped_and_markable() {
    let repo = InMemoryRepository::new();
    let mine = repo
        .add_notification("p1", "system", "uno", "m")
        .await
        .unwrap();
    repo.add_notification("p2", "system", "dos", "m").await.unwrap();

    let list = repo.get_notifications("p1").await;
    assert_eq!(list.len(), 1);
    assert!(!list[0].is_read);

    assert!(!repo.mark_notification_read(mine.id, Some("p2")).await);
    assert!(repo.mark_notification_read(mine.id, Some("p1")).await);
    assert!(repo.get_notifications("p1").await[0].is_read);

    assert!(!repo.mark_notification_read(Uuid::new_v4(), None).await);
}

#[tokio::test]
async fn test_latest_anamnesis_wins() {
    let repo = InMemoryRepository::new();
    assert!(repo.latest_anamnesis("p1").await.is_none());

    repo.save_anamnesis("p1", json!({ "v": 1 })).await.unwrap();
    repo.save_anamnesis("p1", json!({ "v": 2 })).await.unwrap();
    repo.save_anamnesis("p2", json!({ "v": 3 })).await.unwrap();

    let latest = repo.latest_anamnesis("p1").await.unwrap();
    assert_eq!(latest.answers, json!({ "v": 2 }));
}

#[tokio::test]
async fn test_analyses_and_stats() {
    let repo = InMemoryRepository::with_users(vec![user("p1", "paciente"), user("d1", "medico")]);
    let outcome = AnalysisOutcome {
        risk_level: "high".to_string(),
        summary: "s".to_string(),
    };

    let saved = repo.save_analysis("p1", "d1", &outcome).await.unwrap();
    assert_eq!(saved.requested_by, "d1");
    assert_eq!(repo.get_analyses("p1").await, vec![saved]);
    assert!(repo.get_analyses("p2").await.is_empty());

    let stats = repo.get_stats().await;
    assert_eq!(stats.total_users, 2);
    assert_eq!(stats.total_patients, 1);
    assert_eq!(stats.total_analyses, 1);

    let summary = repo.risk_summary().await;
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].risk_level, "high");
    assert_eq!(summary[0].total, 1);
}
