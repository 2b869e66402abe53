use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, warn};

use super::target::ExtractionTarget;
use crate::fetch::Fetcher;
use crate::html::{find_attr, tokenize, Token};

/// One extracted value, tagged with the seed page it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlResult {
    pub seed: String,
    pub value: String,
}

/// Latched "inside a target element" flag.
///
/// Every start tag overwrites the flag with whether that tag is the target.
/// End tags and text never touch it, so nesting is not tracked: `<p>a<b>b</b>c`
/// attributes only `a` to the paragraph.
#[derive(Debug, Default)]
pub struct TagMatchState {
    inside: bool,
}

impl TagMatchState {
    pub fn observe(&mut self, token: &Token, target: ExtractionTarget) {
        if let Token::StartTag { name, .. } = token {
            self.inside = name == target.tag_name();
        }
    }

    pub fn inside(&self) -> bool {
        self.inside
    }
}

/// Advance `state` past `token` and return the value it yields for `seed`, if any.
pub fn extract_value(
    state: &mut TagMatchState,
    token: &Token,
    target: ExtractionTarget,
    seed: &str,
) -> Option<String> {
    state.observe(token, target);
    match token {
        Token::StartTag { name, .. } if target.is_link() && name == "a" => {
            let href = find_attr(token, "href")?;
            seed.starts_with("http").then(|| href.to_string())
        }
        Token::Text(text) if !target.is_link() && state.inside() => Some(text.clone()),
        _ => None,
    }
}

/// Sends the worker's completion signal when dropped, on every exit path.
struct Completion(mpsc::UnboundedSender<()>);

impl Drop for Completion {
    fn drop(&mut self) {
        let _ = self.0.send(());
    }
}

/// Owns one seed page for the lifetime of a scrape.
pub struct CrawlWorker {
    pub url: String,
    pub target: ExtractionTarget,
    pub results: mpsc::Sender<CrawlResult>,
    pub done: mpsc::UnboundedSender<()>,
    pub permits: Option<Arc<Semaphore>>,
}

impl CrawlWorker {
    pub async fn run<F: Fetcher>(self, fetcher: &F) {
        let CrawlWorker {
            url,
            target,
            results,
            done,
            permits,
        } = self;
        let _done = Completion(done);

        let _permit = match permits {
            Some(sem) => match sem.acquire_owned().await {
                Ok(p) => Some(p),
                Err(e) => {
                    warn!("No worker slot for {}: {}", url, e);
                    return;
                }
            },
            None => None,
        };

        let body = match fetcher.fetch(&url).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Fetch failed for {}: {}", url, e);
                return;
            }
        };

        let mut state = TagMatchState::default();
        let mut emitted = 0usize;
        for token in tokenize(&body) {
            if let Token::Error(e) = &token {
                debug!(url = %url, reason = ?e, "token stream ended");
                break;
            }
            let Some(value) = extract_value(&mut state, &token, target, &url) else {
                continue;
            };
            let result = CrawlResult {
                seed: url.clone(),
                value,
            };
            if results.send(result).await.is_err() {
                warn!("Result channel closed while crawling {}", url);
                break;
            }
            emitted += 1;
        }

        debug!(url = %url, emitted, "worker finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StaticFetcher;
    use crate::fetch::FetchError;

    struct PanickingFetcher;

    impl Fetcher for PanickingFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            panic!("fetcher blew up on {}", url)
        }
    }

    fn run_machine(tokens: &[Token], target: ExtractionTarget, seed: &str) -> Vec<String> {
        let mut state = TagMatchState::default();
        tokens
            .iter()
            .filter_map(|t| extract_value(&mut state, t, target, seed))
            .collect()
    }

    #[test]
    fn latched_flag_drops_on_any_other_start_tag() {
        let tokens = [
            Token::start("p", &[]),
            Token::text("x"),
            Token::start("div", &[]),
            Token::text("y"),
            Token::start("p", &[]),
            Token::text("z"),
        ];
        let mut state = TagMatchState::default();
        let mut flags = Vec::new();
        for t in &tokens {
            state.observe(t, ExtractionTarget::Paragraph);
            if matches!(t, Token::Text(_)) {
                flags.push(state.inside());
            }
        }
        assert_eq!(flags, vec![true, false, true]);
        assert_eq!(
            run_machine(&tokens, ExtractionTarget::Paragraph, "http://s"),
            vec!["x", "z"]
        );
    }

    #[test]
    fn end_tag_does_not_clear_flag() {
        let tokens = [
            Token::start("li", &[]),
            Token::text("Apple"),
            Token::EndTag { name: "li".into() },
            Token::text("\n"),
        ];
        assert_eq!(
            run_machine(&tokens, ExtractionTarget::ListItem, "http://s"),
            vec!["Apple", "\n"]
        );
    }

    #[test]
    fn nested_tag_steals_text() {
        let tokens = [
            Token::start("p", &[]),
            Token::text("a"),
            Token::start("b", &[]),
            Token::text("b"),
            Token::EndTag { name: "b".into() },
            Token::text("c"),
        ];
        assert_eq!(
            run_machine(&tokens, ExtractionTarget::Paragraph, "http://s"),
            vec!["a"]
        );
    }

    #[test]
    fn links_come_from_href_not_text() {
        let tokens = [
            Token::start("a", &[("href", "/x")]),
            Token::text("l1"),
            Token::start("a", &[("class", "no-href")]),
            Token::start("a", &[("href", "A"), ("href", "B")]),
        ];
        assert_eq!(
            run_machine(&tokens, ExtractionTarget::Link, "https://s"),
            vec!["/x", "B"]
        );
    }

    #[test]
    fn links_need_http_seed() {
        let tokens = [Token::start("a", &[("href", "/x")])];
        assert!(run_machine(&tokens, ExtractionTarget::Link, "ftp://s").is_empty());
        assert!(run_machine(&tokens, ExtractionTarget::Link, "example.com").is_empty());
    }

    #[test]
    fn anchors_ignored_for_text_targets() {
        let tokens = [Token::start("a", &[("href", "/x")]), Token::text("l1")];
        assert!(run_machine(&tokens, ExtractionTarget::Paragraph, "http://s").is_empty());
    }

    #[tokio::test]
    async fn worker_signals_once_after_results() {
        let fetcher = StaticFetcher::new().page("http://s", "<ul><li>Apple</li><li>Banana</li></ul>");
        let (tx, mut rx) = mpsc::channel(16);
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        CrawlWorker {
            url: "http://s".into(),
            target: ExtractionTarget::ListItem,
            results: tx,
            done: done_tx,
            permits: None,
        }
        .run(&fetcher)
        .await;

        let mut values = Vec::new();
        while let Ok(r) = rx.try_recv() {
            values.push(r.value);
        }
        assert_eq!(values, vec!["Apple", "Banana"]);
        assert!(done_rx.try_recv().is_ok());
        assert!(done_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_fetch_still_signals() {
        let fetcher = StaticFetcher::new();
        let (tx, mut rx) = mpsc::channel(1);
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        CrawlWorker {
            url: "http://down".into(),
            target: ExtractionTarget::Link,
            results: tx,
            done: done_tx,
            permits: None,
        }
        .run(&fetcher)
        .await;

        assert!(rx.try_recv().is_err());
        assert!(done_rx.try_recv().is_ok());
        assert!(done_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn panicking_worker_still_signals_once() {
        let (tx, mut rx) = mpsc::channel(1);
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let worker = CrawlWorker {
            url: "http://s".into(),
            target: ExtractionTarget::Link,
            results: tx,
            done: done_tx,
            permits: None,
        };
        let handle = tokio::spawn(async move { worker.run(&PanickingFetcher).await });

        assert!(handle.await.unwrap_err().is_panic());
        assert_eq!(done_rx.recv().await, Some(()));
        assert_eq!(done_rx.recv().await, None);
        assert!(rx.try_recv().is_err());
    }
}
