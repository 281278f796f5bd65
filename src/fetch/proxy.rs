const PLACEHOLDER: &str = "{url}";

/// Routes `url` through a fallback proxy. The percent-encoded URL replaces a
/// `{url}` placeholder in `template`, or is appended when there is none.
pub fn proxy_target(template: &str, url: &str) -> String {
    let encoded = urlencoding::encode(url);
    if template.contains(PLACEHOLDER) {
        template.replacen(PLACEHOLDER, &encoded, 1)
    } else {
        format!("{template}{encoded}")
    }
}
