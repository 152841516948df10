//! Driver seam between the harvester and a live browser

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::DriverResult;

/// How to find a control on the page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum Locator {
    Id(String),
    Name(String),
    XPath(String),
    LinkText(String),
    ClassName(String),
    Css(String),
}

impl Locator {
    pub fn id(value: impl Into<String>) -> Self {
        Locator::Id(value.into())
    }

    pub fn name(value: impl Into<String>) -> Self {
        Locator::Name(value.into())
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Locator::XPath(value.into())
    }

    pub fn link_text(value: impl Into<String>) -> Self {
        Locator::LinkText(value.into())
    }

    pub fn class_name(value: impl Into<String>) -> Self {
        Locator::ClassName(value.into())
    }

    pub fn css(value: impl Into<String>) -> Self {
        Locator::Css(value.into())
    }

    /// `<option>` element carrying a given value, anywhere on the page
    pub fn option_with_value(value: &str) -> Self {
        Locator::XPath(format!("//option[@value={}]", xpath_literal(value)))
    }
}

/// CSS selector matching an exact `name` attribute
pub fn name_selector(name: &str) -> String {
    format!("[name={}]", css_string(name))
}

/// CSS selector requiring every space-separated class in `classes`
pub fn class_selector(classes: &str) -> String {
    classes
        .split_whitespace()
        .map(|class| format!("[class~={}]", css_string(class)))
        .collect()
}

fn css_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\a "),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// XPath 1.0 has no escapes inside literals; a value holding both quote
/// kinds has to be spliced together with `concat()`.
fn xpath_literal(value: &str) -> String {
    if !value.contains('"') {
        return format!("\"{}\"", value);
    }
    if !value.contains('\'') {
        return format!("'{}'", value);
    }
    let parts: Vec<String> = value.split('"').map(|part| format!("\"{}\"", part)).collect();
    format!("concat({})", parts.join(", '\"', "))
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Id(v) => write!(f, "id={}", v),
            Locator::Name(v) => write!(f, "name={}", v),
            Locator::XPath(v) => write!(f, "xpath={}", v),
            Locator::LinkText(v) => write!(f, "link={}", v),
            Locator::ClassName(v) => write!(f, "class={}", v),
            Locator::Css(v) => write!(f, "css={}", v),
        }
    }
}

/// Primitive UI operations the harvester is built on.
///
/// Element handles are only valid until the next page reload; callers
/// re-resolve through a `wait_*` call instead of caching them.
#[async_trait]
pub trait FormDriver: Send + Sync {
    type Element: Send + Sync;

    /// Navigate to a URL
    async fn open(&self, url: &str) -> DriverResult<()>;

    /// Whether the document finished loading
    async fn page_ready(&self) -> DriverResult<bool>;

    /// Wait until a control exists in the DOM
    async fn wait_present(&self, locator: &Locator, timeout: Duration) -> DriverResult<Self::Element>;

    /// Wait until a control is visible and enabled
    async fn wait_clickable(&self, locator: &Locator, timeout: Duration) -> DriverResult<Self::Element>;

    /// Wait until a control is hidden or gone
    async fn wait_invisible(&self, locator: &Locator, timeout: Duration) -> DriverResult<()>;

    async fn click(&self, element: &Self::Element) -> DriverResult<()>;

    /// Programmatic click, used when the direct click is rejected
    async fn force_click(&self, element: &Self::Element) -> DriverResult<()>;

    async fn scroll_into_view(&self, element: &Self::Element) -> DriverResult<()>;

    async fn type_text(&self, element: &Self::Element, text: &str) -> DriverResult<()>;

    async fn read_attribute(&self, element: &Self::Element, name: &str) -> DriverResult<Option<String>>;

    async fn is_displayed(&self, element: &Self::Element) -> DriverResult<bool>;

    async fn reload_page(&self) -> DriverResult<()>;
}
