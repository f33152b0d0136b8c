use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use browserless_client::BrowserlessClient;
use release_digest_common::{RawDate, RawItem, SourceConfig};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};
use url::Url;

use super::render_template;
use crate::error::SourceError;
use crate::traits::SourceAdapter;

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".heading").expect("valid selector"));
static LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.item-link[href]").expect("valid selector"));
static ANY_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));
static CREATOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".itemsubtext").expect("valid selector"));
static GENRE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".tags").expect("valid selector"));
static RELEASE_DATE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".release-date").expect("valid selector"));

/// Scrapes the platform's discover page for a topic, rendered through
/// Browserless so client-side results are present in the DOM.
pub struct PageSource {
    client: BrowserlessClient,
    url_template: String,
    item_selector_text: String,
    item_selector: Selector,
}

impl PageSource {
    pub fn new(
        browserless_url: &str,
        token: Option<&str>,
        config: &SourceConfig,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let item_selector = Selector::parse(&config.page_item_selector)
            .map_err(|_| SourceError::InvalidSelector(config.page_item_selector.clone()))?;
        let client = BrowserlessClient::with_timeout(browserless_url, token, timeout)?
            .user_agent(&config.user_agent);

        info!(browserless_url, "Using PageSource");
        Ok(Self {
            client,
            url_template: config.page_url_template.clone(),
            item_selector_text: config.page_item_selector.clone(),
            item_selector,
        })
    }
}

#[async_trait]
impl SourceAdapter for PageSource {
    fn name(&self) -> &str {
        "page"
    }

    async fn fetch(&self, topic: &str) -> Result<Vec<RawItem>, SourceError> {
        let page_url = render_template(&self.url_template, topic);
        info!(topic, url = %page_url, "Fetching discover page");

        let html = self
            .client
            .content_when_ready(&page_url, &self.item_selector_text)
            .await?;

        debug!(topic, bytes = html.len(), "Discover page rendered");
        parse_discover_page(&html, &self.item_selector)
    }

    fn base_url(&self, topic: &str) -> Option<Url> {
        Url::parse(&render_template(&self.url_template, topic)).ok()
    }
}

/// Extract one RawItem per `item_selector` match. A page without any match
/// is an unexpected shape (layout change, bot wall, empty render).
pub fn parse_discover_page(
    html: &str,
    item_selector: &Selector,
) -> Result<Vec<RawItem>, SourceError> {
    let document = Html::parse_document(html);

    let items: Vec<RawItem> = document
        .select(item_selector)
        .map(|item| RawItem {
            url: item_link(&item),
            title: first_text(&item, &TITLE),
            creator: first_text(&item, &CREATOR),
            genre: first_text(&item, &GENRE),
            published: item
                .value()
                .attr("data-release-date")
                .map(str::to_string)
                .or_else(|| first_text(&item, &RELEASE_DATE))
                .map(RawDate::Text),
            item_count: None,
            description: None,
        })
        .collect();

    if items.is_empty() {
        return Err(SourceError::UnexpectedShape(
            "no release elements on the page".to_string(),
        ));
    }
    Ok(items)
}

/// Prefer the dedicated item link; fall back to the element itself or its
/// first anchor.
fn item_link(item: &ElementRef) -> Option<String> {
    item.select(&LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .or_else(|| (item.value().name() == "a").then(|| item.value().attr("href")).flatten())
        .or_else(|| item.select(&ANY_LINK).next().and_then(|a| a.value().attr("href")))
        .map(str::to_string)
}

fn first_text(item: &ElementRef, selector: &Selector) -> Option<String> {
    item.select(selector)
        .next()
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .filter(|text| !text.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DISCOVER_HTML: &str = r#"
        <html><body>
          <div class="discover-results">
            <div class="discover-result" data-release-date="02 Jan 2024 00:00:00 GMT">
              <a class="item-link" href="https://wolves.bandcamp.com/album/ash?from=discover_page">
                <div class="heading"> Ash </div>
              </a>
              <p class="itemsubtext">Wolves of the Pale</p>
              <p class="tags">black metal</p>
            </div>
            <div class="discover-result">
              <a class="item-link" href="/album/relative"><div class="heading">Relative</div></a>
              <span class="release-date">released January 3, 2024</span>
            </div>
            <div class="discover-result">
              <div class="heading">No Link Here</div>
            </div>
          </div>
        </body></html>
    "#;

    fn results_selector() -> Selector {
        Selector::parse(".discover-result").unwrap()
    }

    #[test]
    fn extracts_every_result() {
        let items = parse_discover_page(DISCOVER_HTML, &results_selector()).unwrap();
        assert_eq!(items.len(), 3);

        let first = &items[0];
        assert_eq!(
            first.url.as_deref(),
            Some("https://wolves.bandcamp.com/album/ash?from=discover_page")
        );
        assert_eq!(first.title.as_deref().map(str::trim), Some("Ash"));
        assert_eq!(first.creator.as_deref(), Some("Wolves of the Pale"));
        assert_eq!(first.genre.as_deref(), Some("black metal"));
        assert_eq!(
            first.published,
            Some(RawDate::Text("02 Jan 2024 00:00:00 GMT".to_string()))
        );
        assert_eq!(first.item_count, None);
    }

    #[test]
    fn release_date_text_fallback() {
        let items = parse_discover_page(DISCOVER_HTML, &results_selector()).unwrap();
        assert_eq!(items[1].url.as_deref(), Some("/album/relative"));
        assert_eq!(
            items[1].published,
            Some(RawDate::Text("released January 3, 2024".to_string()))
        );
    }

    #[test]
    fn missing_fields_left_unknown() {
        let items = parse_discover_page(DISCOVER_HTML, &results_selector()).unwrap();
        assert_eq!(items[2].url, None);
        assert_eq!(items[2].creator, None);
        assert_eq!(items[2].published, None);
    }

    #[test]
    fn page_without_results_is_unexpected_shape() {
        let result = parse_discover_page("<html><body>captcha</body></html>", &results_selector());
        assert!(matches!(result, Err(SourceError::UnexpectedShape(_))));
    }
}
