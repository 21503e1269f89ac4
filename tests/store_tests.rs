//! Integration tests for the SQLite store behind the repository traits.

use chrono::NaiveDate;
use seasonarr::db::Store;
use seasonarr::domain::repository::{CatalogRepository, FeedbackRepository};
use seasonarr::domain::{AnimeId, FeedbackAction, FeedbackConfidence, RelationType};
use seasonarr::models::anime::{CatalogAnime, CatalogImport, RelationEdge};
use seasonarr::models::feedback::NewFeedback;

async fn spawn_store() -> Store {
    let db_path =
        std::env::temp_dir().join(format!("seasonarr-store-test-{}.db", uuid::Uuid::new_v4()));

    Store::new(&format!("sqlite:{}", db_path.display()))
        .await
        .expect("failed to open store")
}

fn anime(id: i32, title: &str) -> CatalogAnime {
    CatalogAnime {
        id: AnimeId::new(id),
        slug: format!("anime-{id}"),
        title: title.to_string(),
        title_english: None,
        year: Some(2020),
        anime_type: Some("TV".to_string()),
        episode_count: Some(12),
        cover_image: None,
        average_rating: Some(8.1),
        status: Some("FINISHED".to_string()),
        start_date: NaiveDate::from_ymd_opt(2020, 4, 1),
        studios: vec!["Studio A".to_string()],
    }
}

#[tokio::test]
async fn test_catalog_entry_round_trips() {
    let store = spawn_store().await;
    let entry = anime(1, "Series X");
    store.upsert_anime(&entry).await.unwrap();

    let loaded = store.find_anime(AnimeId::new(1)).await.unwrap();
    assert_eq!(loaded, Some(entry));
    assert_eq!(store.find_anime(AnimeId::new(2)).await.unwrap(), None);
}

#[tokio::test]
async fn test_upsert_replaces_existing_entry() {
    let store = spawn_store().await;
    store.upsert_anime(&anime(1, "Series X")).await.unwrap();

    let mut renamed = anime(1, "Series X (Remaster)");
    renamed.title_english = Some("Series X".to_string());
    store.upsert_anime(&renamed).await.unwrap();

    let loaded = store.find_anime(AnimeId::new(1)).await.unwrap().unwrap();
    assert_eq!(loaded.title, "Series X (Remaster)");
    assert_eq!(loaded.title_english.as_deref(), Some("Series X"));
    assert_eq!(store.anime_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_relations_are_visible_from_both_ends() {
    let store = spawn_store().await;
    store
        .import_catalog(&[anime(1, "Series X"), anime(2, "Series X Season 2")], &[])
        .await
        .unwrap();

    let edge = RelationEdge {
        anime_id: AnimeId::new(1),
        related_anime_id: AnimeId::new(2),
        relation: RelationType::Sequel,
    };
    assert!(store.add_relation(&edge).await.unwrap());
    assert!(!store.add_relation(&edge).await.unwrap());

    let from_first = store.find_relations(AnimeId::new(1)).await.unwrap();
    assert_eq!(from_first, vec![edge]);

    let from_second = store.find_relations(AnimeId::new(2)).await.unwrap();
    assert_eq!(
        from_second,
        vec![RelationEdge {
            anime_id: AnimeId::new(2),
            related_anime_id: AnimeId::new(1),
            relation: RelationType::Prequel,
        }]
    );
}

#[tokio::test]
async fn test_import_file_loads_entries_and_edges() {
    let store = spawn_store().await;
    let json = r#"{
        "anime": [
            {"id": 1, "slug": "series-x", "title": "Series X"},
            {"id": 2, "slug": "series-x-2", "title": "Series X Season 2"},
            {"id": 3, "slug": "series-x-ova", "title": "Series X OVA"}
        ],
        "relations": [
            {"anime_id": 2, "related_anime_id": 1, "relation_type": "PREQUEL"},
            {"anime_id": 1, "related_anime_id": 3, "relation_type": "side-story"}
        ]
    }"#;
    let import: CatalogImport = serde_json::from_str(json).unwrap();
    let edges: Vec<RelationEdge> = import.relations.iter().map(|r| r.to_edge()).collect();

    let (entries, new_edges) = store.import_catalog(&import.anime, &edges).await.unwrap();
    assert_eq!(entries, 3);
    assert_eq!(new_edges, 2);

    let (_, again) = store.import_catalog(&import.anime, &edges).await.unwrap();
    assert_eq!(again, 0);

    let relations = store.find_relations(AnimeId::new(1)).await.unwrap();
    let kinds: Vec<RelationType> = relations.iter().map(|e| e.relation).collect();
    assert_eq!(relations.len(), 2);
    assert!(kinds.contains(&RelationType::Sequel));
    assert!(kinds.contains(&RelationType::SideStory));
}

#[tokio::test]
async fn test_title_search_is_capped_and_matches_english() {
    let store = spawn_store().await;
    let mut entries: Vec<CatalogAnime> = (1..=5)
        .map(|i| anime(i, &format!("Series X Season {i}")))
        .collect();
    let mut localized = anime(9, "Shirizu Ekkusu");
    localized.title_english = Some("Series X Movie".to_string());
    entries.push(localized);
    entries.push(anime(10, "Unrelated"));
    store.import_catalog(&entries, &[]).await.unwrap();

    let capped = store.search_titles("series x", 3).await.unwrap();
    assert_eq!(capped.len(), 3);

    let all = store.search_titles("Series X", 50).await.unwrap();
    let ids: Vec<i32> = all.iter().map(|a| a.id.value()).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 9]);
}

#[tokio::test]
async fn test_title_search_treats_wildcards_literally() {
    let store = spawn_store().await;
    let entries = [
        anime(1, "100% Pascal"),
        anime(2, "1000 Pascal"),
        anime(3, "Kiss_Note"),
        anime(4, "KissXNote"),
        anime(5, r"Back\Slash"),
    ];
    store.import_catalog(&entries, &[]).await.unwrap();

    let ids = |found: Vec<CatalogAnime>| -> Vec<i32> {
        found.iter().map(|a| a.id.value()).collect()
    };

    assert_eq!(ids(store.search_titles("100%", 10).await.unwrap()), vec![1]);
    assert_eq!(ids(store.search_titles("kiss_", 10).await.unwrap()), vec![3]);
    assert_eq!(ids(store.search_titles(r"k\s", 10).await.unwrap()), vec![5]);
    assert_eq!(ids(store.search_titles("pascal", 10).await.unwrap()), vec![1, 2]);
}

#[tokio::test]
async fn test_feedback_is_listed_newest_first() {
    let store = spawn_store().await;

    let mut first = NewFeedback::new(AnimeId::new(1), FeedbackAction::Merge);
    first.target_group_id = Some("series-x".to_string());
    let stored = store
        .append_feedback(&first, FeedbackConfidence::High)
        .await
        .unwrap();
    assert_eq!(stored.confidence, FeedbackConfidence::High);
    assert_eq!(stored.target_group_id.as_deref(), Some("series-x"));

    let second = NewFeedback::new(AnimeId::new(2), FeedbackAction::Split);
    store
        .append_feedback(&second, FeedbackConfidence::Low)
        .await
        .unwrap();

    let all = store.list_feedback(None, 10).await.unwrap();
    let actions: Vec<FeedbackAction> = all.iter().map(|f| f.action).collect();
    assert_eq!(actions, vec![FeedbackAction::Split, FeedbackAction::Merge]);

    let only_first = store.list_feedback(Some(AnimeId::new(1)), 10).await.unwrap();
    assert_eq!(only_first.len(), 1);
    assert_eq!(only_first[0].id, stored.id);
}
