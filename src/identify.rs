use tracing::{debug, warn};

use crate::fetch::Fetcher;
use crate::html::{tokenize, Token};

/// Fetch `url` and return the tag name of the first start tag whose `id` equals `target_id`.
///
/// Returns an empty string when the fetch fails or nothing matches.
pub async fn find_by_identifier<F: Fetcher>(fetcher: &F, url: &str, target_id: &str) -> String {
    let body = match fetcher.fetch(url).await {
        Ok(body) => body,
        Err(e) => {
            warn!("Fetch failed for {}: {}", url, e);
            return String::new();
        }
    };
    scan(&body, target_id).unwrap_or_default()
}

fn scan(body: &str, target_id: &str) -> Option<String> {
    for token in tokenize(body) {
        match token {
            Token::StartTag { name, attrs } => {
                if attrs.iter().any(|a| a.key == "id" && a.value == target_id) {
                    return Some(name);
                }
            }
            Token::Error(e) => {
                debug!(target_id, reason = ?e, "no element with id");
                return None;
            }
            _ => {}
        }
    }
    None
}
