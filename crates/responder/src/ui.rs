//! Selectors and page scripts for the messaging web client.
//!
//! The client's markup is not a stable contract, so every lookup is an
//! ordered candidate list and every script tolerates missing nodes.

use {
    partdesk_browser::selectors::{REF_ATTRIBUTE, ref_selector},
    serde::Deserialize,
};

use crate::error::{Error, Result};

pub const CHAT_LIST: &[&str] = &[
    "[role='grid'][aria-label*='Chat list' i]",
    "[role='grid'][aria-label*='فهرست گفتگو' i]",
    "#pane-side [role='grid']",
    "#pane-side",
];

pub const AUTH_CHALLENGE: &[&str] = &[
    "[data-testid='qrcode']",
    "canvas[aria-label*='Scan' i]",
    "div[data-ref] canvas",
];

pub const HEADER_TITLE: &[&str] = &[
    "[data-testid='conversation-info-header-chat-title']",
    "#main header [title]",
    "#main header h1",
    "#main header span[dir='auto']",
    "#main header span[title]",
];

/// Bottom-most visible match wins; the search box also matches the
/// generic textbox selectors but sits above the composer.
pub const COMPOSER: &[&str] = &[
    "footer div[contenteditable='true']",
    "div[contenteditable='true'][role='textbox']:not([aria-label*='Search' i])",
    "div[contenteditable='true'][data-lexical-editor='true']:not([aria-label*='Search' i])",
    "div[aria-label*='Type a message' i]",
    "div[aria-placeholder*='Type a message' i]",
];

pub const SEND_BUTTON: &[&str] = &[
    "[data-testid='compose-btn-send']",
    "button[aria-label*='send' i]",
    "span[data-icon='send']",
];

pub const SEARCH_BOX: &[&str] = &[
    "[data-testid='chat-list-search']",
    "div[contenteditable='true'][role='textbox'][aria-label*='Search' i]",
    "div[contenteditable='true'][role='textbox'][aria-label*='جستجو' i]",
];

/// Message bubbles carry the sender and timestamp in this attribute.
pub const MESSAGE_NODE: &str = "[data-pre-plain-text]";
pub const OUTGOING_BUBBLE: &str = "div.message-out";
pub const BLOCKING_OVERLAY: &str = "[role='dialog'], [data-testid='drawer-right']";

/// Composer fallback click, as fractions of the viewport.
pub const COMPOSER_FALLBACK: (f64, f64) = (0.72, 0.92);

const UNREAD_MARKERS: &str = "span[aria-label*='unread' i], span[aria-label*='خوانده نشده'], \
     [data-testid*='unread'], [data-icon='notification'], [data-testid='notification'], \
     svg[aria-label*='unread' i]";

const MUTED_PATTERN: &str = r"(^|[^a-z])(muted?|icon-mute|notifications?-?off|bell-slash|silent)([^a-z]|$)|بی.?صدا";

const TYPING_PATTERN: &str = r"typing|در حال نوشتن|درحال نوشتن";

const MARK_UNREAD_PATTERN: &str = r"mark.*unread|خوانده.?نشده";

const ROW_MENU_BUTTON: &str = "[aria-label='Open chat context menu'], \
     [aria-label='Open the chat context menu'], [data-testid='menu'], [aria-label='Menu']";

const ROW_TITLE: &str = "span[title], span[dir='auto']";

/// One chat-list row, tagged for later interaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RowInfo {
    #[serde(rename = "ref")]
    pub ref_: u32,
    pub title: String,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub typing: bool,
}

/// One message bubble as read from the page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawMessage {
    pub text: String,
    pub outgoing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

fn json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Shared JS helpers prepended to every row script.
fn row_prelude() -> Result<String> {
    Ok(format!(
        r#"const chatList = (() => {{
            for (const s of {list}) {{
                try {{ const el = document.querySelector(s); if (el) return el; }} catch (e) {{}}
            }}
            return null;
        }})();
        const rowsOf = (list) => list ? Array.from(list.querySelectorAll("[role='row']")) : [];
        const titleOf = (row) => {{
            for (const n of row.querySelectorAll({title})) {{
                const t = (n.getAttribute('title') || n.innerText || '').trim();
                if (t) return t;
            }}
            return '';
        }};
        const labelsOf = (row) => Array.from(row.querySelectorAll('[aria-label],[data-testid],[data-icon],[title]'))
            .slice(0, 150)
            .map(n => ['aria-label', 'data-testid', 'data-icon', 'title']
                .map(a => n.getAttribute(a) || '').join(' ').toLowerCase());
        const isUnread = (row) => row.querySelector({markers}) !== null
            || labelsOf(row).some(l => l.includes('unread'));
        const tag = (el) => {{
            window.__partdeskRefSeq = (window.__partdeskRefSeq || 0) + 1;
            el.setAttribute({attr}, String(window.__partdeskRefSeq));
            return window.__partdeskRefSeq;
        }};"#,
        list = json(CHAT_LIST)?,
        title = json(ROW_TITLE)?,
        markers = json(UNREAD_MARKERS)?,
        attr = json(REF_ATTRIBUTE)?,
    ))
}

/// Script returning every unread row as `[RowInfo]`, in list order.
pub fn unread_rows_script() -> Result<String> {
    Ok(format!(
        r#"(() => {{
            {prelude}
            const muted = new RegExp({muted}, 'i');
            const typing = new RegExp({typing}, 'i');
            const seen = new Set();
            const out = [];
            for (const row of rowsOf(chatList)) {{
                if (!isUnread(row)) continue;
                const title = titleOf(row);
                const key = title || row.innerText.slice(0, 80);
                if (seen.has(key)) continue;
                seen.add(key);
                const labels = labelsOf(row);
                out.push({{
                    ref: tag(row),
                    title,
                    muted: labels.some(l => muted.test(l)),
                    typing: typing.test(row.innerText || ''),
                }});
            }}
            return out;
        }})()"#,
        prelude = row_prelude()?,
        muted = json(MUTED_PATTERN)?,
        typing = json(TYPING_PATTERN)?,
    ))
}

/// Script tagging the chat-list row whose title equals `title`.
pub fn row_for_title_script(title: &str) -> Result<String> {
    Ok(format!(
        r#"(() => {{
            {prelude}
            const wanted = {title};
            const row = rowsOf(chatList).find(r => titleOf(r) === wanted)
                || rowsOf(chatList).find(r => (r.innerText || '').includes(wanted));
            return row ? tag(row) : null;
        }})()"#,
        prelude = row_prelude()?,
        title = json(title)?,
    ))
}

/// Script telling whether the tagged row shows an unread marker.
pub fn row_unread_script(ref_: u32) -> Result<String> {
    Ok(format!(
        r#"(() => {{
            {prelude}
            const row = document.querySelector({sel});
            return row ? isUnread(row) : false;
        }})()"#,
        prelude = row_prelude()?,
        sel = json(&ref_selector(ref_))?,
    ))
}

/// Script clicking the hover menu button inside the tagged row.
pub fn row_menu_button_script(ref_: u32) -> Result<String> {
    Ok(format!(
        r#"(() => {{
            const row = document.querySelector({sel});
            if (!row) return false;
            const btn = row.querySelector({menu});
            if (!btn) return false;
            btn.click();
            return true;
        }})()"#,
        sel = json(&ref_selector(ref_))?,
        menu = json(ROW_MENU_BUTTON)?,
    ))
}

/// Script clicking the "mark as unread" item of an open menu.
pub fn click_mark_unread_script() -> Result<String> {
    Ok(format!(
        r#"(() => {{
            const re = new RegExp({pattern}, 'i');
            const items = document.querySelectorAll("[role='menuitem'], [role='application'] li, li[role='button']");
            for (const el of items) {{
                const label = (el.getAttribute('aria-label') || el.innerText || '').trim();
                if (re.test(label)) {{ el.click(); return true; }}
            }}
            return false;
        }})()"#,
        pattern = json(MARK_UNREAD_PATTERN)?,
    ))
}

/// Script returning up to `limit` messages of the open conversation as
/// `[RawMessage]`, oldest first.
pub fn messages_script(limit: usize) -> Result<String> {
    Ok(format!(
        r#"(() => {{
            const nodes = Array.from(document.querySelectorAll({node}));
            const slice = nodes.slice(Math.max(0, nodes.length - {limit}));
            return slice.map(el => {{
                const pre = el.getAttribute('data-pre-plain-text') || '';
                const outgoing = pre.includes('You:') || pre.includes('You\u200f:') || pre.includes('You :')
                    || el.closest({outgoing}) !== null;
                const parts = el.querySelectorAll('.selectable-text.copyable-text');
                let text = '';
                if (parts.length) {{
                    parts.forEach(p => {{ text += (p.innerText || p.textContent || ''); }});
                }} else {{
                    text = el.innerText || el.textContent || '';
                }}
                return {{ text: text.trim(), outgoing }};
            }});
        }})()"#,
        node = json(MESSAGE_NODE)?,
        outgoing = json(OUTGOING_BUBBLE)?,
    ))
}

/// Script returning the first non-empty header title, or `null`.
pub fn header_title_script() -> Result<String> {
    Ok(format!(
        r#"(() => {{
            for (const s of {candidates}) {{
                let el;
                try {{ el = document.querySelector(s); }} catch (e) {{ continue; }}
                if (!el) continue;
                const t = (el.innerText || el.getAttribute('title') || '').trim();
                if (t) return t;
            }}
            return null;
        }})()"#,
        candidates = json(HEADER_TITLE)?,
    ))
}

pub fn outgoing_count_script() -> Result<String> {
    Ok(format!(
        "document.querySelectorAll({}).length",
        json(OUTGOING_BUBBLE)?
    ))
}

/// Script telling whether a modal or side drawer covers the conversation.
pub fn overlay_script() -> Result<String> {
    Ok(format!(
        "document.querySelector({}) !== null",
        json(BLOCKING_OVERLAY)?
    ))
}

pub const VIEWPORT_SCRIPT: &str = "({ width: window.innerWidth, height: window.innerHeight })";

/// `(x, y)` for the composer fallback click.
pub fn composer_fallback_point(viewport: Viewport) -> Result<(f64, f64)> {
    if viewport.width <= 0.0 || viewport.height <= 0.0 {
        return Err(Error::message("viewport has no size"));
    }
    Ok((
        viewport.width * COMPOSER_FALLBACK.0,
        viewport.height * COMPOSER_FALLBACK.1,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn scripts_embed_selectors_as_json() {
        let js = unread_rows_script().unwrap();
        assert!(js.contains(r#"["[role='grid'][aria-label*='Chat list' i]""#));
        assert!(js.contains(r#""data-partdesk-ref""#));
    }

    #[test]
    fn titles_with_quotes_are_escaped() {
        let js = row_for_title_script(r#"Ali "Parts" Co"#).unwrap();
        assert!(js.contains(r#"const wanted = "Ali \"Parts\" Co";"#));
    }

    #[test]
    fn messages_script_limits_from_the_end() {
        let js = messages_script(500).unwrap();
        assert!(js.contains("nodes.length - 500"));
        assert!(js.contains(r#""div.message-out""#));
    }

    #[test]
    fn raw_rows_deserialize_with_defaults() {
        let rows: Vec<RowInfo> = serde_json::from_str(r#"[{"ref": 3, "title": "Ali"}]"#).unwrap();
        assert_eq!(rows, vec![RowInfo {
            ref_: 3,
            title: "Ali".into(),
            muted: false,
            typing: false,
        }]);
    }

    #[test]
    fn fallback_point_scales_viewport() {
        let (x, y) = composer_fallback_point(Viewport {
            width: 1000.0,
            height: 800.0,
        })
        .unwrap();
        assert!((x - 720.0).abs() < 1e-9);
        assert!((y - 736.0).abs() < 1e-9);
        assert!(
            composer_fallback_point(Viewport {
                width: 0.0,
                height: 800.0
            })
            .is_err()
        );
    }

    #[test]
    fn muted_pattern_is_a_valid_js_regex_source() {
        let re = regex::Regex::new(&format!("(?i){MUTED_PATTERN}")).unwrap();
        assert!(re.is_match("muted"));
        assert!(re.is_match("icon-mute"));
        assert!(!re.is_match("community"));
        let mark = regex::Regex::new(&format!("(?i){MARK_UNREAD_PATTERN}")).unwrap();
        assert!(mark.is_match("Mark as unread"));
        assert!(mark.is_match("علامت‌گذاری به عنوان خوانده نشده"));
    }
}
