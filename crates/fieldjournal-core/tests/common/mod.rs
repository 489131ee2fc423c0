//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fieldjournal_core::config::VisionConfig;
use fieldjournal_core::store::MemoryStore;
use fieldjournal_core::vision::{ChatReply, ChatRequest, VisionModel};
use fieldjournal_core::{GalleryStore, NewGallery, NewPhoto, Photo, VisionClient, VisionError};
use image::{DynamicImage, ImageFormat, RgbImage};
use tokio::time::Instant;

pub const FIELD_NOTES_REPLY: &str = r#"```json
{
  "keywords": [
    {"value": "Riverine-Forest", "category": "topographical", "confidence": 0.92},
    {"value": "market-exchange", "category": "observational", "confidence": 0.81},
    {"value": "lion", "category": "wildlife", "confidence": 0.99},
    {"value": "low-angle", "category": "technical", "confidence": "high"}
  ],
  "altText": "Traders unloading sacks beside a river",
  "caption": "Morning market at the river crossing",
  "storyContext": "Goods arrive by canoe before the heat.",
  "lightingNotes": "Low raking sun"
}
```"#;

/// How the fake model answers.
#[derive(Clone)]
pub enum Behaviour {
    Reply(String),
    Fail(VisionError),
    /// Never answers; the client's deadline must fire
    Hang,
}

/// Vision model fake with a call counter and call timestamps.
pub struct FakeVision {
    behaviour: Behaviour,
    calls: AtomicU32,
    started: Mutex<Vec<Instant>>,
}

impl FakeVision {
    pub fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            calls: AtomicU32::new(0),
            started: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> Vec<Instant> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl VisionModel for FakeVision {
    fn model(&self) -> &str {
        "fake-vision"
    }

    async fn complete(&self, _request: &ChatRequest) -> Result<ChatReply, VisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.lock().unwrap().push(Instant::now());
        match &self.behaviour {
            Behaviour::Reply(text) => Ok(ChatReply {
                text: text.clone(),
                model: "fake-vision".into(),
                tokens_used: Some(512),
                latency_ms: 1,
            }),
            Behaviour::Fail(e) => Err(e.clone()),
            Behaviour::Hang => std::future::pending().await,
        }
    }
}

pub fn client(model: Arc<FakeVision>) -> VisionClient {
    VisionClient::new(model, VisionConfig::default())
}

/// Gradient JPEG of the given size.
pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128])
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Jpeg)
        .unwrap();
    buf.into_inner()
}

/// A gallery with photos titled by letter, ordered `1..=n`.
pub async fn lettered_gallery(store: &MemoryStore, letters: &[&str]) -> Vec<Photo> {
    let gallery = store
        .create_gallery(&NewGallery {
            title: "Letters".into(),
            ..NewGallery::default()
        })
        .await
        .unwrap();
    let mut photos = Vec::new();
    for (i, letter) in letters.iter().enumerate() {
        let photo = store
            .insert_photo(&NewPhoto {
                gallery_id: gallery.id,
                image_url: format!("memory://objects/{letter}.jpg"),
                alt_text: Some(letter.to_string()),
                display_order: i as i32 + 1,
                ..NewPhoto::default()
            })
            .await
            .unwrap();
        photos.push(photo);
    }
    photos
}

pub fn letters(photos: &[Photo]) -> Vec<String> {
    photos
        .iter()
        .map(|p| p.alt_text.clone().unwrap_or_default())
        .collect()
}
