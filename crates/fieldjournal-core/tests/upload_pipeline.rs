//! End-to-end upload scenarios against the in-memory store.

mod common;

use std::sync::Arc;

use common::{client, jpeg, Behaviour, FakeVision, FIELD_NOTES_REPLY};
use fieldjournal_core::config::PromptVariant;
use fieldjournal_core::pipeline::{VariantGenerator, VariantOptions};
use fieldjournal_core::store::{MemoryObjectStorage, MemoryStore};
use fieldjournal_core::types::{KeywordCategory, PhotoCategory};
use fieldjournal_core::upload::UploadStage;
use fieldjournal_core::vision::parse_reply;
use fieldjournal_core::{
    Config, FieldJournal, GalleryStore, NewGallery, ObjectStorage, UploadFile, UploadProgress,
};

#[test]
fn large_jpeg_proxy_is_fit_inside_bounds() {
    let data = jpeg(6000, 4000);
    let proxy = VariantGenerator::default().create_variant(
        &data,
        VariantOptions {
            max_width: 1000,
            max_height: 1000,
            quality: 80,
        },
    );

    assert!(!proxy.degraded);
    assert_eq!(proxy.width, 1000);
    assert!((666..=667).contains(&proxy.height), "height {}", proxy.height);
    assert!(proxy.reduction_percent > 0);
    assert_eq!(&proxy.data[..2], &[0xFF, 0xD8]);
}

#[test]
fn corrupt_buffers_pass_through_unchanged() {
    let generator = VariantGenerator::default();
    for data in [vec![], vec![0xFF, 0xD8, 0xFF, 0x00, 0x13], b"GIF89a-but-not-really".to_vec()] {
        let variant = generator.create_variant(&data, generator.proxy_options());
        assert_eq!(variant.data, data);
        assert_eq!(variant.reduction_percent, 0);

        let thumbnail = generator.create_thumbnail(&data, 300, 70);
        assert_eq!(thumbnail.data, data);
        assert_eq!(thumbnail.reduction_percent, 0);
    }
}

#[test]
fn keyword_filter_drops_foreign_categories_and_bad_confidence() {
    let bundle = parse_reply(FIELD_NOTES_REPLY, PromptVariant::FieldJournal, "m");

    let values: Vec<&str> = bundle.keywords.iter().map(|k| k.value.as_str()).collect();
    assert_eq!(values, ["riverine-forest", "market-exchange"]);
    assert!(bundle
        .keywords
        .iter()
        .all(|k| (0.0..=1.0).contains(&k.confidence)));
    assert_eq!(bundle.keywords[1].category, KeywordCategory::Observational);
    assert_eq!(bundle.lighting_notes.as_deref(), Some("Low raking sun"));

    // the safari persona accepts wildlife keywords
    let safari = parse_reply(FIELD_NOTES_REPLY, PromptVariant::Safari, "m");
    assert!(safari.keywords.iter().any(|k| k.value == "lion"));
}

async fn journal(behaviour: Behaviour) -> (FieldJournal, Arc<MemoryStore>, Arc<MemoryObjectStorage>, Arc<FakeVision>) {
    let store = Arc::new(MemoryStore::new());
    let storage = Arc::new(MemoryObjectStorage::new());
    let model = FakeVision::new(behaviour);
    let journal = FieldJournal::with_services(
        Config::default(),
        store.clone(),
        storage.clone(),
        Some(client(model.clone())),
    );
    (journal, store, storage, model)
}

#[tokio::test]
async fn upload_enriches_and_saves_photo() {
    let (journal, store, storage, model) = journal(Behaviour::Reply(FIELD_NOTES_REPLY.into())).await;
    let gallery = store
        .create_gallery(&NewGallery {
            title: "River Markets".into(),
            project_context: Some("Trade routes along the Niger".into()),
            ..NewGallery::default()
        })
        .await
        .unwrap();

    let events = Arc::new(std::sync::Mutex::new(Vec::<UploadProgress>::new()));
    let sink = Arc::clone(&events);
    journal
        .uploads()
        .on_progress(Arc::new(move |p: &UploadProgress| sink.lock().unwrap().push(p.clone())));

    let target = journal.upload_target(gallery.id).await.unwrap();
    let outcome = journal
        .uploads()
        .upload_file(&target, UploadFile::new("market.jpg", "image/jpeg", jpeg(2400, 1600)))
        .await
        .unwrap();

    let photo = &outcome.photo;
    assert_eq!(model.calls(), 1);
    assert_eq!(photo.caption.as_deref(), Some("Morning market at the river crossing"));
    assert_eq!(photo.category, Some(PhotoCategory::Landscape));
    assert_eq!(photo.tags, ["riverine-forest", "market-exchange"]);
    assert_eq!(photo.display_order, 1);
    assert!(photo.image_url.starts_with("memory://objects/photos/"));
    assert!(outcome.proxy_reduction_percent.unwrap_or(0) > 0);
    assert_eq!(storage.len(), 3);

    let stored = store.list_photos(gallery.id, false).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].ai_suggestions.as_ref().unwrap().tokens_used, Some(512));

    let events = events.lock().unwrap();
    let stages: Vec<UploadStage> = events.iter().map(|e| e.stage).collect();
    assert_eq!(stages.first(), Some(&UploadStage::Pending));
    assert_eq!(stages.last(), Some(&UploadStage::Complete));
    assert!(stages.contains(&UploadStage::AnalyzingAi));
    assert!(events.windows(2).all(|w| w[0].progress <= w[1].progress));
}

#[tokio::test]
async fn batch_upload_assigns_distinct_orders() {
    let (journal, store, _, _) = journal(Behaviour::Fail(fieldjournal_core::VisionError::EmptyReply)).await;
    let gallery = store
        .create_gallery(&NewGallery {
            title: "Harbour".into(),
            ..NewGallery::default()
        })
        .await
        .unwrap();
    let target = journal.upload_target(gallery.id).await.unwrap();

    let files = (0..6)
        .map(|i| UploadFile::new(format!("{i}.jpg"), "image/jpeg", jpeg(100 + i, 80)))
        .collect();
    let results = journal.uploads().upload_batch(&target, files).await;

    assert!(results.iter().all(|r| r.as_ref().is_ok_and(|o| o.ai_degraded)));
    let mut orders: Vec<i32> = store
        .list_photos(gallery.id, false)
        .await
        .unwrap()
        .iter()
        .map(|p| p.display_order)
        .collect();
    orders.dedup();
    assert_eq!(orders, [1, 2, 3, 4, 5, 6]);
    assert_eq!(journal.uploads().queue_status().completed, 6);
    assert_eq!(target.board.photos().await.len(), 6);
}

#[tokio::test]
async fn deleting_a_duplicate_keeps_the_other_photos_objects() {
    let (journal, store, storage, _) = journal(Behaviour::Reply(FIELD_NOTES_REPLY.into())).await;
    let gallery = store
        .create_gallery(&NewGallery {
            title: "Duplicates".into(),
            ..NewGallery::default()
        })
        .await
        .unwrap();
    let target = journal.upload_target(gallery.id).await.unwrap();

    let bytes = jpeg(40, 30);
    let first = journal
        .uploads()
        .upload_file(&target, UploadFile::new("a.jpg", "image/jpeg", bytes.clone()))
        .await
        .unwrap()
        .photo;
    let second = journal
        .uploads()
        .upload_file(&target, UploadFile::new("a.jpg", "image/jpeg", bytes))
        .await
        .unwrap()
        .photo;
    assert_ne!(first.image_url, second.image_url);
    assert_ne!(first.thumbnail_url, second.thumbnail_url);

    journal.delete_photo(second.id).await.unwrap();

    assert!(store.get_photo(first.id).await.is_ok());
    for url in [Some(first.image_url.as_str()), first.thumbnail_url.as_deref()]
        .into_iter()
        .flatten()
    {
        let path = storage.path_from_url(url).unwrap();
        assert!(storage.contains(&path), "{path} was removed");
    }
}
