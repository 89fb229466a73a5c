use munchbot_core::{Business, SearchResults};
use serde::Serialize;

pub const CONFIRMATION_PROMPT: &str = "Would you like to search for restaurants?";
pub const ZIP_PROMPT: &str = "Which zipcode should we search in?";
pub const CANCELLATION_NOTICE: &str = "Okay, I won't search for restaurants.";
pub const NO_RESULTS_NOTICE: &str = "No restaurants found.";
pub const FALLBACK_CATEGORY: &str = "Restaurant";

const APP_MESSAGE_VERSION: f32 = 1.0;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Annotation {
    Generic { version: f32, color: String, title: String, text: String },
}

/// Body of `POST /v1/spaces/{spaceId}/messages`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundMessage {
    AppMessage { version: f32, annotations: Vec<Annotation> },
}

impl OutboundMessage {
    pub fn generic(
        title: impl Into<String>,
        color: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::AppMessage {
            version: APP_MESSAGE_VERSION,
            annotations: vec![Annotation::Generic {
                version: APP_MESSAGE_VERSION,
                color: color.into(),
                title: title.into(),
                text: text.into(),
            }],
        }
    }
}

pub fn restaurant_bullet(business: &Business) -> String {
    let category = business.primary_category().unwrap_or(FALLBACK_CATEGORY);
    format!("* [{}]({}) - {} - {} stars", business.name, business.url, category, business.rating)
}

/// One heading line, then one bullet per business in provider order.
pub fn restaurant_list(zip: &str, results: &SearchResults) -> String {
    let mut lines = vec![format!("Here are some restaurants near {zip}:")];
    if results.is_empty() {
        lines.push(NO_RESULTS_NOTICE.to_owned());
    }
    lines.extend(results.businesses.iter().map(restaurant_bullet));
    lines.join("\n")
}
