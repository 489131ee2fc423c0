//! Reorder, featured and summary scenarios across the public API.

mod common;

use std::sync::Arc;

use common::{client, letters, lettered_gallery, Behaviour, FakeVision};
use fieldjournal_core::api::ReorderRequest;
use fieldjournal_core::reconcile::Persistence;
use fieldjournal_core::store::{MemoryObjectStorage, MemoryStore};
use fieldjournal_core::summary::{SummaryFallback, SummaryGenerator};
use fieldjournal_core::{
    Config, FeaturedSelector, FieldJournal, GalleryStore, PhotoBoard, Reorderer, SummaryStyle,
};

#[tokio::test]
async fn dragging_c_to_first_position() {
    let store = Arc::new(MemoryStore::new());
    let photos = lettered_gallery(&store, &["A", "B", "C", "D"]).await;
    let gallery_id = photos[0].gallery_id;
    let board = PhotoBoard::load(store.as_ref(), gallery_id).await.unwrap();

    let outcome = Reorderer::new(store.clone())
        .move_photo(&board, 2, 0)
        .await
        .unwrap();

    let local = board.photos().await;
    assert_eq!(letters(&local), ["C", "A", "B", "D"]);
    assert_eq!(local.iter().map(|p| p.display_order).collect::<Vec<_>>(), [1, 2, 3, 4]);
    assert_eq!(outcome.persistence, Persistence::Bulk);

    let bulk = store.bulk_orders();
    assert_eq!(bulk.len(), 1);
    assert_eq!(bulk[0].len(), 4);
    assert_eq!(store.call_count("update_display_order"), 0);
}

#[tokio::test]
async fn same_reorder_request_twice_is_stable() {
    let store = Arc::new(MemoryStore::new());
    let photos = lettered_gallery(&store, &["A", "B", "C", "D", "E"]).await;
    let journal = FieldJournal::with_services(
        Config::default(),
        store.clone(),
        Arc::new(MemoryObjectStorage::new()),
        None,
    );
    let board = journal.board(photos[0].gallery_id).await.unwrap();

    let request: ReorderRequest = serde_json::from_value(serde_json::json!({
        "orders": [
            {"id": photos[4].id.to_string(), "displayOrder": 1},
            {"id": photos[2].id.to_string(), "displayOrder": 2},
            {"id": photos[0].id.to_string(), "displayOrder": 3},
            {"id": photos[3].id.to_string(), "displayOrder": 4},
            {"id": photos[1].id.to_string(), "displayOrder": 5}
        ]
    }))
    .unwrap();

    journal.reorder(&board, &request).await.unwrap();
    let once = store.list_photos(photos[0].gallery_id, false).await.unwrap();
    journal.reorder(&board, &request).await.unwrap();
    let twice = store.list_photos(photos[0].gallery_id, false).await.unwrap();

    assert_eq!(letters(&once), ["E", "C", "A", "D", "B"]);
    assert_eq!(letters(&once), letters(&twice));
    assert_eq!(
        twice.iter().map(|p| p.display_order).collect::<Vec<_>>(),
        [1, 2, 3, 4, 5]
    );
}

#[tokio::test]
async fn featured_is_exclusive() {
    let store = Arc::new(MemoryStore::new());
    let photos = lettered_gallery(&store, &["A", "B", "C"]).await;
    let gallery_id = photos[0].gallery_id;
    let board = PhotoBoard::load(store.as_ref(), gallery_id).await.unwrap();
    let selector = FeaturedSelector::new(store.clone());

    for photo in &photos {
        selector.set_featured(&board, photo.id).await.unwrap();
        let featured: Vec<_> = store
            .list_photos(gallery_id, false)
            .await
            .unwrap()
            .into_iter()
            .filter(|p| p.is_featured)
            .map(|p| p.id)
            .collect();
        assert_eq!(featured, [photo.id]);
    }
}

#[tokio::test]
async fn summary_without_text_never_calls_model() {
    let store = Arc::new(MemoryStore::new());
    let photos = lettered_gallery(&store, &["A", "B"]).await;
    let gallery = store.get_gallery(photos[0].gallery_id).await.unwrap();
    let model = FakeVision::new(Behaviour::Reply("unused".into()));

    // alt text alone does not count as story text
    let summary = SummaryGenerator::new(Some(client(model.clone())))
        .summarize(&gallery, &photos, SummaryStyle::Narrative)
        .await;

    assert_eq!(
        summary.intro,
        "This Letters collection captures the essence of the journey through a visual narrative."
    );
    assert_eq!(summary.fallback, Some(SummaryFallback::NoText));
    assert_eq!(model.calls(), 0);
}
