use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

const FAVICON_SERVICE: &str = "https://www.google.com/s2/favicons";

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("Failed to compile meta selector")
}

static OG_TITLE: Lazy<Selector> = Lazy::new(|| selector(r#"meta[property="og:title"]"#));
static OG_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| selector(r#"meta[property="og:description"]"#));
static OG_IMAGE: Lazy<Selector> = Lazy::new(|| selector(r#"meta[property="og:image"]"#));
static OG_SITE_NAME: Lazy<Selector> = Lazy::new(|| selector(r#"meta[property="og:site_name"]"#));

// twitter cards show up under either attribute in the wild
static TWITTER_TITLE: Lazy<Selector> = Lazy::new(|| {
    selector(r#"meta[property="twitter:title"], meta[name="twitter:title"]"#)
});
static TWITTER_DESCRIPTION: Lazy<Selector> = Lazy::new(|| {
    selector(r#"meta[property="twitter:description"], meta[name="twitter:description"]"#)
});
static TWITTER_IMAGE: Lazy<Selector> = Lazy::new(|| {
    selector(r#"meta[property="twitter:image"], meta[name="twitter:image"]"#)
});

static DESCRIPTION: Lazy<Selector> = Lazy::new(|| selector(r#"meta[name="description"]"#));
static TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));

/// Fields pulled out of a page. The caller attaches `url` and `is_fallback`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub site_name: String,
    pub favicon: String,
}

/// Host without a leading `www.`.
pub fn bare_domain(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

pub fn favicon_url(domain: &str) -> String {
    format!("{FAVICON_SERVICE}?domain={domain}&sz=32")
}

/// `content` of the first element matching `selector`, as written. Only an
/// empty value counts as missing.
fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    let element = document.select(selector).next()?;
    let value = element.value().attr("content")?;
    (!value.is_empty()).then(|| value.to_string())
}

fn document_title(document: &Html) -> Option<String> {
    let element = document.select(&TITLE).next()?;
    let text = element.text().collect::<String>();
    (!text.is_empty()).then_some(text)
}

/// Resolves a relative image reference against the page URL. Anything that
/// cannot be resolved is returned untouched.
fn resolve_image(image: String, page_url: &Url) -> String {
    let lower = image.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return image;
    }

    match page_url.join(&image) {
        Ok(resolved) => resolved.to_string(),
        Err(err) => {
            log::debug!("{page_url}: leaving image {image:?} unresolved: {err}");
            image
        }
    }
}

/// Extracts link-preview metadata from `html`, each field taking the first
/// non-empty source in its fallback chain.
pub fn extract(html: &str, page_url: &Url) -> Extracted {
    let document = Html::parse_document(html);
    let domain = bare_domain(page_url);

    let title = meta_content(&document, &OG_TITLE)
        .or_else(|| meta_content(&document, &TWITTER_TITLE))
        .or_else(|| document_title(&document))
        .unwrap_or_else(|| domain.clone());

    let description = meta_content(&document, &OG_DESCRIPTION)
        .or_else(|| meta_content(&document, &TWITTER_DESCRIPTION))
        .or_else(|| meta_content(&document, &DESCRIPTION))
        .unwrap_or_default();

    let image = meta_content(&document, &OG_IMAGE)
        .or_else(|| meta_content(&document, &TWITTER_IMAGE))
        .map(|image| resolve_image(image, page_url));

    let site_name = meta_content(&document, &OG_SITE_NAME).unwrap_or_else(|| domain.clone());

    Extracted {
        title,
        description,
        image,
        site_name,
        favicon: favicon_url(&domain),
    }
}
