//! Selector-driven field extraction from item detail pages
//!
//! Every field has an ordered list of CSS selectors. Selectors are tried in
//! order and the first one that yields a value wins, so a page layout change
//! only needs a new selector appended to the chain.

use crate::config::SelectorConfig;
use crate::fetcher::Enrichment;
use crate::storage::{SpecEntry, SpecSections, VariantAttribute};
use crate::{ConfigError, ConfigResult};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Section name used when a spec table has no heading of its own
const FALLBACK_SECTION: &str = "Specifications";

/// Cells of a specification row: attribute first, value second
const CELL_SELECTOR: &str = "th, td";

/// Selector chains, compiled once per run
#[derive(Debug, Clone)]
pub struct CompiledSelectors {
    images: Vec<Selector>,
    variants: Vec<Selector>,
    variant_label: Vec<Selector>,
    variant_price: Vec<Selector>,
    quality_score: Vec<Selector>,
    reference_price: Vec<Selector>,
    spec_sections: Vec<Selector>,
    spec_title: Vec<Selector>,
    spec_rows: Vec<Selector>,
    external_links: Vec<Selector>,
    cells: Selector,
}

fn compile_chain(raw: &[String]) -> ConfigResult<Vec<Selector>> {
    raw.iter().map(|s| compile_one(s)).collect()
}

fn compile_one(raw: &str) -> ConfigResult<Selector> {
    Selector::parse(raw).map_err(|e| ConfigError::InvalidSelector(format!("'{}': {}", raw, e)))
}

impl CompiledSelectors {
    pub fn compile(config: &SelectorConfig) -> ConfigResult<Self> {
        Ok(Self {
            images: compile_chain(&config.images)?,
            variants: compile_chain(&config.variants)?,
            variant_label: compile_chain(&config.variant_label)?,
            variant_price: compile_chain(&config.variant_price)?,
            quality_score: compile_chain(&config.quality_score)?,
            reference_price: compile_chain(&config.reference_price)?,
            spec_sections: compile_chain(&config.spec_sections)?,
            spec_title: compile_chain(&config.spec_title)?,
            spec_rows: compile_chain(&config.spec_rows)?,
            external_links: compile_chain(&config.external_links)?,
            cells: compile_one(CELL_SELECTOR)?,
        })
    }
}

/// How to recognise a cross-retailer product link and pull its identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdRule {
    /// Required host (subdomains allowed); any host when `None`
    pub host: Option<String>,
    /// Path segment preceding the identifier, e.g. `/dp/`
    pub marker: String,
}

impl ExternalIdRule {
    pub fn new(host: Option<String>, marker: impl Into<String>) -> Self {
        Self {
            host: host.map(|h| strip_www(h.trim()).to_ascii_lowercase()),
            marker: marker.into(),
        }
    }

    /// Returns the identifier carried by `url`, if it is a matching link
    ///
    /// # Example
    ///
    /// ```
    /// use catalog_harvest::fetcher::ExternalIdRule;
    /// use url::Url;
    ///
    /// let rule = ExternalIdRule::new(Some("amazon.in".to_string()), "/dp/");
    /// let url = Url::parse("https://www.amazon.in/Phone-A/dp/B0TEST1234/ref=x").unwrap();
    /// assert_eq!(rule.identify(&url), Some("B0TEST1234".to_string()));
    /// ```
    pub fn identify(&self, url: &Url) -> Option<String> {
        if let Some(expected) = &self.host {
            let host = strip_www(url.host_str()?).to_ascii_lowercase();
            if host != *expected && !host.ends_with(&format!(".{}", expected)) {
                return None;
            }
        }

        let path = url.path();
        let start = path.find(&self.marker)? + self.marker.len();
        let id = path[start..].split('/').next()?.trim();

        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(id.to_string())
    }
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Normalises typographic punctuation and collapses whitespace
///
/// ```
/// use catalog_harvest::fetcher::clean_text;
///
/// assert_eq!(clean_text("  6.1\u{2033}  \u{201c}Super\u{201d}\u{00a0}Retina "), "6.1\" \"Super\" Retina");
/// ```
pub fn clean_text(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{2032}' => '\'',
            '\u{201c}' | '\u{201d}' | '\u{2033}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            '\u{00a0}' => ' ',
            other => other,
        })
        .collect();

    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses a detail page and extracts every enrichment field
///
/// Fields whose selector chains all come up empty are left empty; a page
/// with nothing recognisable still yields a (blank) enrichment.
pub fn extract_enrichment(
    html: &str,
    base: &Url,
    selectors: &CompiledSelectors,
    external: &ExternalIdRule,
) -> Enrichment {
    let document = Html::parse_document(html);
    let root = document.root_element();

    Enrichment {
        reference_price: first_text(root, &selectors.reference_price),
        media_refs: extract_images(root, &selectors.images, base),
        variant_attributes: extract_variants(root, selectors),
        quality_score: first_text(root, &selectors.quality_score),
        spec_sections: extract_spec_sections(root, selectors),
        external_id: extract_external_id(root, &selectors.external_links, base, external),
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

fn first_text(scope: ElementRef<'_>, chain: &[Selector]) -> Option<String> {
    chain.iter().find_map(|selector| {
        scope
            .select(selector)
            .map(element_text)
            .find(|text| !text.is_empty())
    })
}

/// Resolves an href against the page URL, keeping only http(s) targets
fn resolve_url(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with("data:") || href.starts_with("javascript:") {
        return None;
    }

    let url = base.join(href).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

fn extract_images(scope: ElementRef<'_>, chain: &[Selector], base: &Url) -> Vec<String> {
    for selector in chain {
        let mut seen = HashSet::new();
        let images: Vec<String> = scope
            .select(selector)
            .filter_map(|img| {
                // Lazy-loaded images keep the real source in data-src
                let value = img.value();
                value.attr("data-src").or_else(|| value.attr("src"))
            })
            .filter_map(|src| resolve_url(src, base))
            .map(|url| url.to_string())
            .filter(|url| seen.insert(url.clone()))
            .collect();

        if !images.is_empty() {
            return images;
        }
    }
    Vec::new()
}

fn extract_variants(scope: ElementRef<'_>, selectors: &CompiledSelectors) -> Vec<VariantAttribute> {
    for selector in &selectors.variants {
        let variants: Vec<VariantAttribute> = scope
            .select(selector)
            .filter_map(|option| {
                let label = first_text(option, &selectors.variant_label).or_else(|| {
                    let text = element_text(option);
                    (!text.is_empty()).then_some(text)
                });
                let price = first_text(option, &selectors.variant_price);

                (label.is_some() || price.is_some()).then_some(VariantAttribute { label, price })
            })
            .collect();

        if !variants.is_empty() {
            return variants;
        }
    }
    Vec::new()
}

fn extract_spec_rows(scope: ElementRef<'_>, selectors: &CompiledSelectors) -> Vec<SpecEntry> {
    for selector in &selectors.spec_rows {
        let rows: Vec<SpecEntry> = scope
            .select(selector)
            .filter_map(|row| {
                let mut cells = row
                    .select(&selectors.cells)
                    .map(element_text)
                    .filter(|text| !text.is_empty());
                let attribute = cells.next()?;
                let value = cells.next()?;
                Some(SpecEntry { attribute, value })
            })
            .collect();

        if !rows.is_empty() {
            return rows;
        }
    }
    Vec::new()
}

fn extract_spec_sections(
    scope: ElementRef<'_>,
    selectors: &CompiledSelectors,
) -> SpecSections {
    let mut sections = SpecSections::new();

    if selectors.spec_sections.is_empty() {
        let rows = extract_spec_rows(scope, selectors);
        if !rows.is_empty() {
            sections.insert(FALLBACK_SECTION.to_string(), rows);
        }
        return sections;
    }

    for selector in &selectors.spec_sections {
        for section in scope.select(selector) {
            let rows = extract_spec_rows(section, selectors);
            if rows.is_empty() {
                continue;
            }
            let title = first_text(section, &selectors.spec_title)
                .unwrap_or_else(|| FALLBACK_SECTION.to_string());
            sections.entry(title).or_default().extend(rows);
        }

        if !sections.is_empty() {
            break;
        }
    }
    sections
}

fn extract_external_id(
    scope: ElementRef<'_>,
    chain: &[Selector],
    base: &Url,
    rule: &ExternalIdRule,
) -> Option<String> {
    chain.iter().find_map(|selector| {
        scope
            .select(selector)
            .filter_map(|link| link.value().attr("href"))
            .filter_map(|href| resolve_url(href, base))
            .find_map(|url| rule.identify(&url))
    })
}
