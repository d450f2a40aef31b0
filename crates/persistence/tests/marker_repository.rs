//! Integration tests for the marker repositories against in-memory SQLite.

use fake::faker::lorem::en::Sentence;
use fake::Fake;
use sqlx::SqlitePool;
use tokio_test::assert_ok;

use domain::models::Marker;
use domain::services::MarkerStore;
use persistence::db::{create_pool, run_migrations, DatabaseConfig};
use persistence::repositories::{MarkerImageRepository, MarkerRepository};

async fn setup_pool() -> SqlitePool {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        connect_timeout_secs: 5,
    };
    let pool = create_pool(&config).await.expect("create pool");
    run_migrations(&pool).await.expect("run migrations");
    pool
}

#[tokio::test]
async fn test_create_and_find_marker() {
    let pool = setup_pool().await;
    let repo = MarkerRepository::new(pool);
    let description: String = Sentence(2..6).fake();

    let created = assert_ok!(repo.create(58.01, 56.11, Some(&description)).await);
    assert!(created.id > 0);
    assert_eq!(created.description.as_deref(), Some(description.as_str()));

    let found = assert_ok!(repo.find_by_id(created.id).await).expect("marker exists");
    assert_eq!(found.latitude, 58.01);
    assert_eq!(found.longitude, 56.11);
    assert_eq!(found.created_at, created.created_at);
}

#[tokio::test]
async fn test_find_missing_marker_returns_none() {
    let pool = setup_pool().await;
    let repo = MarkerRepository::new(pool);

    let found = assert_ok!(repo.find_by_id(404).await);
    assert!(found.is_none());
}

#[tokio::test]
async fn test_list_markers_in_insertion_order() {
    let pool = setup_pool().await;
    let repo = MarkerRepository::new(pool);

    let first = repo.create(58.01, 56.11, None).await.unwrap();
    let second = repo.create(58.02, 56.12, Some("Fountain")).await.unwrap();

    let markers = assert_ok!(repo.list().await);
    let ids: Vec<i64> = markers.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);
    assert_eq!(assert_ok!(repo.count().await), 2);
}

#[tokio::test]
async fn test_update_description() {
    let pool = setup_pool().await;
    let repo = MarkerRepository::new(pool);
    let marker = repo.create(58.01, 56.11, None).await.unwrap();

    let updated = assert_ok!(repo.update_description(marker.id, "Old oak").await)
        .expect("marker exists");
    assert_eq!(updated.description.as_deref(), Some("Old oak"));

    let missing = assert_ok!(repo.update_description(marker.id + 100, "Nothing").await);
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_delete_marker_removes_images() {
    let pool = setup_pool().await;
    let markers = MarkerRepository::new(pool.clone());
    let images = MarkerImageRepository::new(pool);

    let marker = markers.create(58.01, 56.11, None).await.unwrap();
    let other = markers.create(58.03, 56.13, None).await.unwrap();
    images.create(marker.id, "file:///photos/1.jpg").await.unwrap();
    images.create(marker.id, "file:///photos/2.jpg").await.unwrap();
    images.create(other.id, "file:///photos/3.jpg").await.unwrap();

    let deleted = assert_ok!(markers.delete(marker.id).await);
    assert_eq!(deleted, 1);

    assert!(markers.find_by_id(marker.id).await.unwrap().is_none());
    assert!(images.find_by_marker_id(marker.id).await.unwrap().is_empty());
    assert_eq!(images.find_by_marker_id(other.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_missing_marker_affects_nothing() {
    let pool = setup_pool().await;
    let repo = MarkerRepository::new(pool);

    let deleted = assert_ok!(repo.delete(999).await);
    assert_eq!(deleted, 0);
}

#[tokio::test]
async fn test_image_lifecycle() {
    let pool = setup_pool().await;
    let markers = MarkerRepository::new(pool.clone());
    let images = MarkerImageRepository::new(pool);
    let marker = markers.create(58.01, 56.11, None).await.unwrap();

    let first = assert_ok!(images.create(marker.id, "file:///photos/a.jpg").await);
    let second = assert_ok!(images.create(marker.id, "file:///photos/b.jpg").await);

    let listed = images.find_by_marker_id(marker.id).await.unwrap();
    let uris: Vec<&str> = listed.iter().map(|i| i.uri.as_str()).collect();
    assert_eq!(uris, vec!["file:///photos/a.jpg", "file:///photos/b.jpg"]);

    assert_eq!(assert_ok!(images.delete(first.id).await), 1);
    assert_eq!(assert_ok!(images.delete(first.id).await), 0);

    let remaining = images.find_by_marker_id(marker.id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, second.id);
}

#[tokio::test]
async fn test_image_for_unknown_marker_is_rejected() {
    let pool = setup_pool().await;
    let images = MarkerImageRepository::new(pool);

    let result = images.create(12345, "file:///photos/orphan.jpg").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_marker_store_returns_domain_markers() {
    let pool = setup_pool().await;
    let repo = MarkerRepository::new(pool);
    repo.create(58.01, 56.11, Some("Bench")).await.unwrap();
    repo.create(58.03, 56.13, None).await.unwrap();

    let markers: Vec<Marker> = assert_ok!(repo.list_markers().await);
    assert_eq!(markers.len(), 2);
    assert_eq!(markers[0].label(), "Bench");
    assert_eq!(markers[1].label(), format!("Marker #{}", markers[1].id));
}
