//! Prioritized selector resolution.
//!
//! Every DOM lookup goes through [`resolve`]: an ordered list of CSS
//! candidates in, one visible element out. The winner is tagged with a
//! `data-partdesk-ref` attribute so later input targets the same node even
//! if the candidate selector would now match something else.

use {serde::Deserialize, tracing::debug};

use crate::{
    driver::{PageDriver, js_string},
    error::BrowserError,
    types::Rect,
};

/// Attribute used to tag resolved elements.
pub const REF_ATTRIBUTE: &str = "data-partdesk-ref";

/// Which visible match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    /// First visible element of the first candidate that has one.
    First,
    /// Bottom-most visible element across all candidates.
    Lowest,
}

impl Pick {
    fn as_js(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Lowest => "lowest",
        }
    }
}

/// A resolved, tagged element.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ElementRef {
    #[serde(rename = "ref")]
    pub ref_: u32,
    /// Candidate selector that produced the match.
    pub selector: String,
    pub bounds: Rect,
}

impl ElementRef {
    /// CSS selector addressing this element by its tag.
    pub fn css(&self) -> String {
        ref_selector(self.ref_)
    }
}

pub fn ref_selector(ref_: u32) -> String {
    format!("[{REF_ATTRIBUTE}=\"{ref_}\"]")
}

const RESOLVE_JS: &str = r#"((candidates, pick) => {
    const visible = (el) => {
        const r = el.getBoundingClientRect();
        if (r.width <= 0 || r.height <= 0) return false;
        const s = window.getComputedStyle(el);
        return s.visibility !== 'hidden' && s.display !== 'none';
    };
    let best = null;
    for (const selector of candidates) {
        let nodes;
        try { nodes = document.querySelectorAll(selector); } catch (e) { continue; }
        for (const el of nodes) {
            if (!visible(el)) continue;
            const r = el.getBoundingClientRect();
            if (pick === 'first') { best = { el, selector, r }; break; }
            if (!best || r.bottom > best.r.bottom) best = { el, selector, r };
        }
        if (best && pick === 'first') break;
    }
    if (!best) return null;
    window.__partdeskRefSeq = (window.__partdeskRefSeq || 0) + 1;
    const ref = window.__partdeskRefSeq;
    best.el.setAttribute('data-partdesk-ref', String(ref));
    return {
        ref,
        selector: best.selector,
        bounds: { x: best.r.x, y: best.r.y, width: best.r.width, height: best.r.height },
    };
})"#;

fn resolve_script(candidates: &[&str], pick: Pick) -> Result<String, BrowserError> {
    let list = serde_json::to_string(candidates)
        .map_err(|e| BrowserError::InvalidAction(e.to_string()))?;
    Ok(format!("{RESOLVE_JS}({list}, '{}')", pick.as_js()))
}

/// Resolve the first visible match among `candidates`, in priority order.
pub async fn resolve(
    driver: &PageDriver,
    candidates: &[&str],
    pick: Pick,
) -> Result<Option<ElementRef>, BrowserError> {
    let js = resolve_script(candidates, pick)?;
    let found: Option<ElementRef> = driver.evaluate(&js).await?;
    if let Some(ref el) = found {
        debug!(selector = %el.selector, ref_ = el.ref_, "resolved element");
    }
    Ok(found)
}

/// Run `body` (which sees the tagged element as `el`) and return its result.
async fn with_element<T: serde::de::DeserializeOwned>(
    driver: &PageDriver,
    ref_: u32,
    body: &str,
) -> Result<T, BrowserError> {
    let js = format!(
        "(() => {{ const el = document.querySelector({}); if (!el) return null; {body} }})()",
        js_string(&ref_selector(ref_))?
    );
    driver.evaluate(&js).await
}

/// Scroll a tagged element into view and return its fresh bounding box.
pub async fn scroll_into_view(driver: &PageDriver, ref_: u32) -> Result<Rect, BrowserError> {
    let rect: Option<Rect> = with_element(
        driver,
        ref_,
        "el.scrollIntoView({ behavior: 'instant', block: 'center' }); \
         const r = el.getBoundingClientRect(); \
         return { x: r.x, y: r.y, width: r.width, height: r.height };",
    )
    .await?;
    rect.ok_or_else(|| BrowserError::ElementNotFound(ref_selector(ref_)))
}

/// Current bounding box of a tagged element.
pub async fn bounds(driver: &PageDriver, ref_: u32) -> Result<Rect, BrowserError> {
    let rect: Option<Rect> = with_element(
        driver,
        ref_,
        "const r = el.getBoundingClientRect(); \
         return { x: r.x, y: r.y, width: r.width, height: r.height };",
    )
    .await?;
    rect.ok_or_else(|| BrowserError::ElementNotFound(ref_selector(ref_)))
}

/// Focus a tagged element.
pub async fn focus(driver: &PageDriver, ref_: u32) -> Result<(), BrowserError> {
    let ok: Option<bool> = with_element(driver, ref_, "el.focus(); return true;").await?;
    ok.map(|_| ())
        .ok_or_else(|| BrowserError::ElementNotFound(ref_selector(ref_)))
}

/// Call `el.click()` on a tagged element, ignoring anything drawn over it.
pub async fn js_click(driver: &PageDriver, ref_: u32) -> Result<(), BrowserError> {
    let ok: Option<bool> = with_element(driver, ref_, "el.click(); return true;").await?;
    ok.map(|_| ())
        .ok_or_else(|| BrowserError::ElementNotFound(ref_selector(ref_)))
}

/// Dispatch a synthetic pointer/mouse event sequence on a tagged element.
pub async fn dispatch_click(driver: &PageDriver, ref_: u32) -> Result<(), BrowserError> {
    let ok: Option<bool> = with_element(
        driver,
        ref_,
        "const r = el.getBoundingClientRect(); \
         const opts = { bubbles: true, cancelable: true, view: window, button: 0, \
                        clientX: r.x + r.width / 2, clientY: r.y + r.height / 2 }; \
         for (const t of ['pointerdown', 'mousedown', 'pointerup', 'mouseup', 'click']) { \
             const E = t.startsWith('pointer') ? PointerEvent : MouseEvent; \
             el.dispatchEvent(new E(t, opts)); \
         } \
         return true;",
    )
    .await?;
    ok.map(|_| ())
        .ok_or_else(|| BrowserError::ElementNotFound(ref_selector(ref_)))
}

/// Dispatch a `contextmenu` event on a tagged element.
pub async fn context_menu(driver: &PageDriver, ref_: u32) -> Result<(), BrowserError> {
    let ok: Option<bool> = with_element(
        driver,
        ref_,
        "const r = el.getBoundingClientRect(); \
         el.dispatchEvent(new MouseEvent('contextmenu', { bubbles: true, cancelable: true, \
             view: window, button: 2, clientX: r.x + r.width / 2, clientY: r.y + r.height / 2 })); \
         return true;",
    )
    .await?;
    ok.map(|_| ())
        .ok_or_else(|| BrowserError::ElementNotFound(ref_selector(ref_)))
}
