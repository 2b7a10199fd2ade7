//! Interstitial login-wall detection and best-effort dismissal.
//!
//! Search pages usually render for logged-out sessions; when the host
//! decides otherwise it swaps in a login interstitial. We sniff the rendered
//! HTML for known wall signatures and, when credentials are configured,
//! drive the two-step login form through scripted fills. Everything here is
//! best-effort: a failed login skips the page, it never aborts the run.

use crate::core::config::Credentials;
use crate::scraping::navigator::Navigator;
use anyhow::Result;
use std::time::Duration;
use tracing::{info, warn};

/// Signatures of the login interstitial in rendered HTML.
const LOGIN_WALL_SIGNS: &[&str] = &[
    "Sign in to X",
    "Log in to X",
    "Sign in to Twitter",
    "data-testid=\"LoginForm",
    "data-testid=\"loginButton\"",
];

pub fn looks_like_login_wall(html: &str) -> bool {
    LOGIN_WALL_SIGNS.iter().any(|sig| html.contains(sig))
}

/// Fill one visible input and fire the framework-visible `input` event.
/// `value` must be a JSON-encoded string literal.
fn fill_script(selector: &str, value_literal: &str) -> String {
    format!(
        r#"() => {{
    const el = document.querySelector('{selector}');
    if (!el) return "missing";
    const setter = Object.getOwnPropertyDescriptor(window.HTMLInputElement.prototype, 'value').set;
    setter.call(el, {value_literal});
    el.dispatchEvent(new Event('input', {{bubbles: true}}));
    return "ok";
}}"#
    )
}

/// Click the first button whose visible text matches.
fn click_button_script(label: &str) -> String {
    format!(
        r#"() => {{
    const buttons = Array.from(document.querySelectorAll('button, div[role="button"]'));
    const target = buttons.find(b => (b.innerText || '').trim() === '{label}');
    if (!target) return "missing";
    target.click();
    return "ok";
}}"#
    )
}

async fn eval_step(nav: &Navigator, script: String, step: &str) -> Result<bool> {
    let result: Option<String> = nav
        .page()
        .evaluate(script)
        .await
        .ok()
        .and_then(|v| v.into_value::<String>().ok());
    match result.as_deref() {
        Some("ok") => Ok(true),
        other => {
            warn!("login: step '{}' did not apply ({:?})", step, other);
            Ok(false)
        }
    }
}

/// Attempt the two-step username/password flow. Returns `true` when the
/// wall is gone afterwards. Credentials are never logged.
pub async fn try_login(nav: &mut Navigator, creds: &Credentials) -> Result<bool> {
    info!("login wall detected; attempting scripted sign-in");

    let username = serde_json::to_string(&creds.username)?;
    let password = serde_json::to_string(&creds.password)?;

    if !eval_step(nav, fill_script("input[autocomplete=\"username\"]", &username), "username").await? {
        return Ok(false);
    }
    eval_step(nav, click_button_script("Next"), "next").await?;
    tokio::time::sleep(Duration::from_secs(2)).await;

    if !eval_step(nav, fill_script("input[name=\"password\"]", &password), "password").await? {
        return Ok(false);
    }
    eval_step(nav, click_button_script("Log in"), "log in").await?;
    tokio::time::sleep(Duration::from_secs(3)).await;

    // Scripted interaction bypassed the navigator's memoization.
    nav.forget();

    let html = nav.content().await?;
    Ok(!looks_like_login_wall(&html))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wall_signatures_match_rendered_markup() {
        assert!(looks_like_login_wall(
            "<html><body><span>Sign in to X</span></body></html>"
        ));
        assert!(looks_like_login_wall(
            r#"<div data-testid="LoginForm_Login_Button">Log in</div>"#
        ));
        assert!(!looks_like_login_wall(
            "<html><body><article>a timeline</article></body></html>"
        ));
    }
}
