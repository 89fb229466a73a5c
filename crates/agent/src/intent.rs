use munchbot_workspace::AnnotationEvent;
use regex::Regex;

pub const FOOD_LENS: &str = "Food";
pub const REQUEST_CATEGORY: &str = "Request";

/// Case-insensitive `ok`/`okay`/`y`/`yes`/`yeah`/`yep`/`yup` at the start of a reply.
pub const AFFIRMATIVE_PATTERN: &str = r"(?i)^\s*(?:ok(?:ay)?|y(?:es|eah|ep|up)?)\b";

/// True when the annotation tags the message as a food request.
pub fn is_restaurant_request(annotation: &AnnotationEvent) -> bool {
    annotation.focus().is_some_and(|focus| {
        focus.lens.as_deref() == Some(FOOD_LENS)
            && focus.category.as_deref() == Some(REQUEST_CATEGORY)
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reply {
    Affirmative,
    Other,
}

#[derive(Clone, Debug)]
pub struct ReplyClassifier {
    affirmative: Regex,
}

impl ReplyClassifier {
    pub fn new() -> Result<Self, regex::Error> {
        Self::with_pattern(AFFIRMATIVE_PATTERN)
    }

    pub fn with_pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self { affirmative: Regex::new(pattern)? })
    }

    pub fn classify(&self, content: &str) -> Reply {
        if self.affirmative.is_match(content) {
            Reply::Affirmative
        } else {
            Reply::Other
        }
    }
}
