// src/fetch/links.rs

use anyhow::{anyhow, Context, Result};
use scraper::{Html, Selector};
use url::Url;

/// Every `href` matched by `selector` in `html`, resolved against `base`.
pub fn find_links(html: &str, selector: &str, base: &Url) -> Result<Vec<Url>> {
    let sel = Selector::parse(selector).map_err(|e| anyhow!("bad selector {selector}: {e:?}"))?;
    let doc = Html::parse_document(html);
    Ok(doc
        .select(&sel)
        .filter_map(|e| e.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .collect())
}

/// The first link matched by `selector`, or an error naming the selector.
pub fn first_link(html: &str, selector: &str, base: &Url) -> Result<Url> {
    find_links(html, selector, base)?
        .into_iter()
        .next()
        .with_context(|| format!("no link matching {selector} under {base}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <a href="/about">About</a>
          <a href="/Extract/RegPlusExtract_September_2020.zip">Download</a>
          <a href="https://cdn.example.org/Extract/other.zip">Mirror</a>
          <a href="/files/public register 01092020.xlsx">Register</a>
        </body></html>
    "#;

    #[test]
    fn resolves_relative_links() -> Result<()> {
        let base = Url::parse("https://register-of-charities.charitycommission.gov.uk")?;
        let links = find_links(PAGE, "a[href*=Extract]", &base)?;
        assert_eq!(links.len(), 2);
        assert_eq!(
            links[0].as_str(),
            "https://register-of-charities.charitycommission.gov.uk/Extract/RegPlusExtract_September_2020.zip"
        );
        assert_eq!(links[1].host_str(), Some("cdn.example.org"));
        Ok(())
    }

    #[test]
    fn spaces_are_percent_encoded() -> Result<()> {
        let base = Url::parse("http://www.charitiesregulator.ie")?;
        let link = first_link(PAGE, "a[href*=public]", &base)?;
        assert_eq!(
            link.as_str(),
            "http://www.charitiesregulator.ie/files/public%20register%2001092020.xlsx"
        );
        Ok(())
    }

    #[test]
    fn missing_link_is_an_error() {
        let base = Url::parse("https://example.org").unwrap();
        let err = first_link(PAGE, "a[href*=nothing]", &base).unwrap_err();
        assert!(err.to_string().contains("a[href*=nothing]"));
    }
}
