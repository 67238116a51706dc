mod common;

use std::collections::HashSet;
use std::sync::Arc;

use eduflow::models::CourseInput;
use eduflow::services::Actor;
use eduflow::state::SharedState;

#[tokio::test]
async fn concurrent_creates_never_share_a_public_id() {
    let path = std::env::temp_dir().join(format!("eduflow-{}.db", uuid::Uuid::new_v4()));
    let mut config = common::test_config();
    config.general.database_path = format!("sqlite:{}?mode=rwc", path.display());

    let shared = Arc::new(SharedState::new(config).await.unwrap());
    let admin = shared
        .store
        .admin_repo()
        .find_by_username(common::ADMIN_USERNAME)
        .await
        .unwrap()
        .unwrap();

    let tasks: Vec<_> = (0..12)
        .map(|i| {
            let shared = shared.clone();
            let actor = Actor::new(admin.id, None);
            tokio::spawn(async move {
                let input = CourseInput {
                    name: Some(format!("Course {i}")),
                    ..Default::default()
                };
                shared.registry_service.create_course(&actor, input).await
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for result in futures::future::join_all(tasks).await {
        let course = result.unwrap().unwrap();
        assert!(ids.insert(course.public_id));
    }

    let expected: HashSet<String> = (1..=12).map(|n| format!("C-{n}")).collect();
    assert_eq!(ids, expected);

    drop(shared);
    let _ = std::fs::remove_file(&path);
}
