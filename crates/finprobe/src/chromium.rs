//! Chromium driver over the DevTools protocol.
//!
//! Snapshots are taken by one script that tags each element with a
//! `data-fp-id` attribute and reports its role, accessible name, text and
//! state. Actions address elements by that attribute.

use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, CaptureScreenshotFormat, CaptureScreenshotParams,
    EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::driver::{DriverConfig, ElementSnapshot, PageDriver};
use crate::result::{ProbeError, ProbeResult};
use crate::session::{Cookie, OriginState, StorageState};
use crate::wait::LoadState;

const SNAPSHOT_JS: &str = r"(() => {
  const TAGS = { button: 'button', h1: 'heading', h2: 'heading', h3: 'heading', h4: 'heading',
    h5: 'heading', h6: 'heading', p: 'paragraph', select: 'combobox', textarea: 'textbox',
    option: 'option', img: 'img', nav: 'navigation', main: 'main', ul: 'list', ol: 'list',
    li: 'listitem', dialog: 'dialog', table: 'table', tr: 'row', td: 'cell' };
  const NAMED_BY_TEXT = ['button', 'link', 'heading', 'option', 'tab', 'listitem', 'cell'];
  const FIELDS = ['textbox', 'spinbutton', 'combobox', 'searchbox'];
  const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
  window.__fpNext = window.__fpNext || 1;
  const idOf = (el) => {
    if (!el.dataset.fpId) el.dataset.fpId = String(window.__fpNext++);
    return el.dataset.fpId;
  };
  const implicitRole = (el, tag) => {
    if (tag === 'input') {
      const type = (el.getAttribute('type') || 'text').toLowerCase();
      if (type === 'number') return 'spinbutton';
      if (type === 'checkbox' || type === 'radio') return type;
      if (['submit', 'button', 'reset'].includes(type)) return 'button';
      return type === 'hidden' ? 'generic' : 'textbox';
    }
    if (tag === 'a') return el.hasAttribute('href') ? 'link' : 'generic';
    return TAGS[tag] || 'generic';
  };
  const labelOf = (el) => {
    const aria = el.getAttribute('aria-label');
    if (aria) return norm(aria);
    const by = el.getAttribute('aria-labelledby');
    if (by) {
      const text = norm(by.split(/\s+/).map((id) => document.getElementById(id))
        .filter(Boolean).map((e) => e.textContent).join(' '));
      if (text) return text;
    }
    if (el.labels && el.labels.length) {
      return norm(Array.from(el.labels).map((l) => l.textContent).join(' '));
    }
    return '';
  };
  const isVisible = (el) => {
    const style = getComputedStyle(el);
    if (style.display === 'none' || style.visibility === 'hidden' || style.opacity === '0') return false;
    const rect = el.getBoundingClientRect();
    return rect.width > 0 && rect.height > 0;
  };
  const out = [];
  if (!document.body) return out;
  for (const el of document.body.querySelectorAll('*')) {
    const tag = el.tagName.toLowerCase();
    if (['script', 'style', 'noscript', 'template'].includes(tag)) continue;
    const role = el.getAttribute('role') || implicitRole(el, tag);
    const label = labelOf(el);
    const text = norm(el.innerText !== undefined ? el.innerText : el.textContent);
    let name = label;
    if (!name && FIELDS.includes(role)) name = norm(el.getAttribute('placeholder'));
    if (!name && NAMED_BY_TEXT.includes(role)) {
      name = text || norm(el.getAttribute('title')) || (tag === 'input' ? norm(el.value) : '');
    }
    const hasValue = ['input', 'textarea', 'select'].includes(tag);
    out.push({
      id: idOf(el), tag, role, name, text, label,
      value: hasValue ? String(el.value) : '',
      visible: isVisible(el),
      enabled: !el.disabled && el.getAttribute('aria-disabled') !== 'true',
      checked: !!el.checked,
      classes: Array.from(el.classList),
      parent: el.parentElement ? idOf(el.parentElement) : null,
      nextSibling: el.nextElementSibling ? idOf(el.nextElementSibling) : null,
      options: tag === 'select'
        ? Array.from(el.options).map((o) => ({ value: o.value, label: norm(o.label || o.textContent) }))
        : [],
    });
  }
  return out;
})()";

const SET_VALUE_JS: &str = r"((id, value) => {
  const el = document.querySelector(`[data-fp-id='${id}']`);
  if (!el) return false;
  el.focus();
  const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype
    : el instanceof HTMLSelectElement ? HTMLSelectElement.prototype
    : HTMLInputElement.prototype;
  Object.getOwnPropertyDescriptor(proto, 'value').set.call(el, value);
  el.dispatchEvent(new Event('input', { bubbles: true }));
  el.dispatchEvent(new Event('change', { bubbles: true }));
  return true;
})";

/// Counts in-flight fetch/XHR requests so network idleness can be observed
const NETWORK_TRACKER_JS: &str = r"(() => {
  if (window.__fpNet) return;
  const net = window.__fpNet = { inflight: 0, last: performance.now() };
  const start = () => { net.inflight++; net.last = performance.now(); };
  const done = () => { net.inflight = Math.max(0, net.inflight - 1); net.last = performance.now(); };
  const fetch = window.fetch;
  if (fetch) {
    window.fetch = function (...args) {
      start();
      return fetch.apply(this, args).finally(done);
    };
  }
  const send = XMLHttpRequest.prototype.send;
  XMLHttpRequest.prototype.send = function (...args) {
    start();
    this.addEventListener('loadend', done, { once: true });
    return send.apply(this, args);
  };
})()";

const NETWORK_IDLE_JS: &str = r"(() => {
  if (document.readyState !== 'complete') return false;
  const net = window.__fpNet;
  const now = performance.now();
  const resources = performance.getEntriesByType('resource');
  const lastResource = resources.reduce((m, e) => Math.max(m, e.responseEnd), 0);
  const quietSince = Math.max(lastResource, net ? net.last : 0);
  return (!net || net.inflight === 0) && now - quietSince >= 500;
})()";

const LOCAL_STORAGE_JS: &str = r"(() => ({
  origin: location.origin,
  localStorage: Object.keys(localStorage).map((name) => ({ name, value: localStorage.getItem(name) })),
}))()";

fn cdp_err(e: impl Display) -> ProbeError {
    ProbeError::driver(e.to_string())
}

fn js_arg(value: &str) -> ProbeResult<String> {
    Ok(serde_json::to_string(value)?)
}

fn element_selector(id: &str) -> String {
    format!("[data-fp-id='{id}']")
}

fn to_cookie_param(cookie: &Cookie) -> ProbeResult<CookieParam> {
    let mut value = serde_json::to_value(cookie)?;
    if let Some(map) = value.as_object_mut() {
        if cookie.expires < 0.0 {
            map.remove("expires");
        }
        if cookie.same_site.is_none() {
            map.remove("sameSite");
        }
    }
    Ok(serde_json::from_value(value)?)
}

/// Script seeding local storage once per tab for one origin
fn seed_script(origin: &OriginState) -> ProbeResult<String> {
    let entries = serde_json::to_string(&origin.local_storage)?;
    Ok(format!(
        "(() => {{ if (location.origin !== {origin} || sessionStorage.getItem('__fpSeeded')) return; \
         for (const e of {entries}) localStorage.setItem(e.name, e.value); \
         sessionStorage.setItem('__fpSeeded', '1'); }})()",
        origin = js_arg(&origin.origin)?,
    ))
}

/// One Chromium browser with a single page
#[derive(Debug)]
pub struct ChromiumDriver {
    config: DriverConfig,
    browser: Arc<Mutex<CdpBrowser>>,
    page: Arc<Mutex<CdpPage>>,
    dialogs_armed: AtomicBool,
    handle: JoinHandle<()>,
}

impl ChromiumDriver {
    /// Launch Chromium and open a blank page
    pub async fn launch(config: DriverConfig) -> ProbeResult<Self> {
        let mut builder = CdpConfig::builder().window_size(config.viewport_width, config.viewport_height);
        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = config.chromium_path {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder
            .build()
            .map_err(|e| ProbeError::BrowserLaunch {
                message: e.to_string(),
            })?;

        let (browser, mut handler) =
            CdpBrowser::launch(cdp_config)
                .await
                .map_err(|e| ProbeError::BrowserLaunch {
                    message: e.to_string(),
                })?;

        let handle = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await.map_err(cdp_err)?;
        page.evaluate_on_new_document(AddScriptToEvaluateOnNewDocumentParams::new(
            NETWORK_TRACKER_JS,
        ))
        .await
        .map_err(cdp_err)?;
        info!(headless = config.headless, "chromium launched");

        Ok(Self {
            config,
            browser: Arc::new(Mutex::new(browser)),
            page: Arc::new(Mutex::new(page)),
            dialogs_armed: AtomicBool::new(false),
            handle,
        })
    }

    async fn eval<T: serde::de::DeserializeOwned>(&self, expr: impl Into<String>) -> ProbeResult<T> {
        let page = self.page.lock().await;
        page.evaluate(expr.into())
            .await
            .map_err(cdp_err)?
            .into_value()
            .map_err(cdp_err)
    }

    async fn set_value(&self, id: &str, value: &str) -> ProbeResult<()> {
        let expr = format!("{SET_VALUE_JS}({}, {})", js_arg(id)?, js_arg(value)?);
        if self.eval::<bool>(expr).await? {
            Ok(())
        } else {
            Err(ProbeError::ElementNotFound {
                selector: element_selector(id),
            })
        }
    }
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn goto(&self, url: &str) -> ProbeResult<()> {
        let page = self.page.lock().await;
        let timeout = self.config.navigation_timeout;
        match tokio::time::timeout(timeout, page.goto(url)).await {
            Ok(result) => result.map(|_| ()).map_err(|e| ProbeError::driver(format!("goto {url}: {e}"))),
            Err(_) => Err(ProbeError::Timeout {
                what: format!("navigation to {url}"),
                ms: timeout.as_millis() as u64,
            }),
        }
    }

    async fn current_url(&self) -> ProbeResult<String> {
        let page = self.page.lock().await;
        Ok(page
            .url()
            .await
            .map_err(cdp_err)?
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn snapshot(&self) -> ProbeResult<Vec<ElementSnapshot>> {
        self.eval(SNAPSHOT_JS).await
    }

    async fn click(&self, id: &str) -> ProbeResult<()> {
        let page = self.page.lock().await;
        let element = page
            .find_element(element_selector(id))
            .await
            .map_err(|_| ProbeError::ElementNotFound {
                selector: element_selector(id),
            })?;
        element.click().await.map_err(cdp_err)?;
        Ok(())
    }

    async fn fill(&self, id: &str, value: &str) -> ProbeResult<()> {
        self.set_value(id, value).await
    }

    async fn select_option(&self, id: &str, value: &str) -> ProbeResult<()> {
        let snapshot = self.snapshot().await?;
        let chosen = snapshot
            .iter()
            .find(|el| el.id == id)
            .and_then(|el| el.find_option(value))
            .map_or_else(|| value.to_string(), |o| o.value.clone());
        self.set_value(id, &chosen).await
    }

    async fn load_state_reached(&self, state: LoadState) -> ProbeResult<bool> {
        let expr = match state {
            LoadState::Load => "document.readyState === 'complete'",
            LoadState::DomContentLoaded => "document.readyState !== 'loading'",
            LoadState::NetworkIdle => NETWORK_IDLE_JS,
        };
        self.eval(expr).await
    }

    async fn storage_state(&self) -> ProbeResult<StorageState> {
        let cookies = {
            let page = self.page.lock().await;
            page.get_cookies().await.map_err(cdp_err)?
        };
        let cookies = cookies
            .iter()
            .map(|c| serde_json::to_value(c).and_then(serde_json::from_value::<Cookie>))
            .collect::<Result<Vec<_>, _>>()?;
        let origin: OriginState = self.eval(LOCAL_STORAGE_JS).await?;
        let origins = if origin.origin == "null" || origin.local_storage.is_empty() {
            Vec::new()
        } else {
            vec![origin]
        };
        Ok(StorageState { cookies, origins })
    }

    async fn restore_storage_state(&self, state: &StorageState) -> ProbeResult<()> {
        let params = state
            .cookies
            .iter()
            .map(to_cookie_param)
            .collect::<ProbeResult<Vec<_>>>()?;
        let page = self.page.lock().await;
        if !params.is_empty() {
            page.set_cookies(params).await.map_err(cdp_err)?;
        }
        for origin in &state.origins {
            page.evaluate_on_new_document(AddScriptToEvaluateOnNewDocumentParams::new(
                seed_script(origin)?,
            ))
            .await
            .map_err(cdp_err)?;
        }
        debug!(
            cookies = state.cookies.len(),
            origins = state.origins.len(),
            "storage state restored"
        );
        Ok(())
    }

    async fn screenshot(&self) -> ProbeResult<Vec<u8>> {
        let page = self.page.lock().await;
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let screenshot = page.execute(params).await.map_err(cdp_err)?;
        base64::engine::general_purpose::STANDARD
            .decode(&screenshot.data)
            .map_err(cdp_err)
    }

    async fn accept_dialogs(&self) -> ProbeResult<()> {
        if self.dialogs_armed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let page = self.page.lock().await.clone();
        let mut dialogs = page
            .event_listener::<EventJavascriptDialogOpening>()
            .await
            .map_err(cdp_err)?;
        tokio::spawn(async move {
            while let Some(dialog) = dialogs.next().await {
                debug!(message = %dialog.message, "accepting dialog");
                if let Err(e) = page.execute(HandleJavaScriptDialogParams::new(true)).await {
                    warn!(error = %e, "dialog could not be accepted");
                }
            }
        });
        Ok(())
    }

    async fn close(&self) -> ProbeResult<()> {
        let mut browser = self.browser.lock().await;
        browser.close().await.map_err(cdp_err)?;
        self.handle.abort();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_drops_expiry() {
        let cookie = Cookie {
            name: "sid".into(),
            value: "1".into(),
            domain: "app.test".into(),
            path: "/".into(),
            expires: -1.0,
            ..Cookie::default()
        };
        let param = to_cookie_param(&cookie).unwrap();
        assert!(param.expires.is_none());
        assert_eq!(param.domain.as_deref(), Some("app.test"));
    }

    #[test]
    fn test_seed_script_escapes_values() {
        let origin = OriginState {
            origin: "https://app.test".into(),
            local_storage: vec![crate::session::StorageEntry {
                name: "note".into(),
                value: "it's \"quoted\"".into(),
            }],
        };
        let script = seed_script(&origin).unwrap();
        assert!(script.contains(r#"location.origin !== "https://app.test""#));
        assert!(script.contains(r#"it's \"quoted\""#));
    }

    #[test]
    fn test_js_arg_quotes() {
        assert_eq!(js_arg("a'b").unwrap(), r#""a'b""#);
    }
}
