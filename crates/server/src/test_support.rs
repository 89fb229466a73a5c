use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use munchbot_core::config::AppConfig;
use munchbot_core::{Business, Category, SearchResults};
use munchbot_search::{RestaurantSearch, SearchError};
use munchbot_workspace::{Messenger, MessengerError};

use crate::bootstrap::{bootstrap_with_clients, Application};

pub const WEBHOOK_SECRET: &str = "hook-secret";
pub const BOT_ID: &str = "bot-app-id";

pub fn valid_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.workspace.app_id = BOT_ID.to_string();
    config.workspace.app_secret = "app-secret".to_string().into();
    config.workspace.webhook_secret = WEBHOOK_SECRET.to_string().into();
    config.search.client_id = "yelp-id".to_string();
    config.search.client_secret = "yelp-secret".to_string().into();
    config
}

#[derive(Default)]
pub struct StubSearch {
    pub zips: Mutex<Vec<String>>,
}

#[async_trait]
impl RestaurantSearch for StubSearch {
    async fn search(&self, zip: &str) -> Result<SearchResults, SearchError> {
        self.zips.lock().expect("lock").push(zip.to_owned());
        Ok(SearchResults {
            businesses: vec![Business {
                name: "Joe's Pizza".to_string(),
                url: "https://example.com/joes".to_string(),
                categories: vec![Category { alias: "pizza".to_string(), title: "Pizza".to_string() }],
                rating: 4.5,
                review_count: None,
                price: None,
                location: None,
            }],
            total: 1,
        })
    }
}

#[derive(Default)]
pub struct RecordingMessenger {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMessenger {
    pub fn texts(&self) -> Vec<String> {
        self.sent.lock().expect("lock").iter().map(|(_, text)| text.clone()).collect()
    }

    /// Polls until `count` messages were sent; handlers run on spawned tasks.
    pub async fn wait_for(&self, count: usize) -> Vec<String> {
        for _ in 0..100 {
            let texts = self.texts();
            if texts.len() >= count {
                return texts;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.texts()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, space_id: &str, text: &str) -> Result<(), MessengerError> {
        self.sent.lock().expect("lock").push((space_id.to_owned(), text.to_owned()));
        Ok(())
    }
}

pub fn test_app() -> (Application, Arc<StubSearch>, Arc<RecordingMessenger>) {
    let search = Arc::new(StubSearch::default());
    let messenger = Arc::new(RecordingMessenger::default());
    let app = bootstrap_with_clients(valid_config(), search.clone(), messenger.clone())
        .expect("bootstrap should succeed");
    (app, search, messenger)
}
