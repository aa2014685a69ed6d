//! Page rendering: the display layout and refresh directives.

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::Serialize;

use actionbuf::core::{Frame, View};
use actionbuf::io::config::ActionConfig;

const DISPLAY_TEMPLATE: &str = include_str!("templates/display.html");

/// Layout values derived from one polled frame.
#[derive(Debug, Clone, Serialize)]
struct DisplayContext<'a> {
    results: &'a str,
    polling: &'static str,
    poll_count: u32,
    generation: u64,
}

/// Template engine wrapper around minijinja.
pub struct PageRenderer {
    env: Environment<'static>,
}

impl PageRenderer {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("display.html", DISPLAY_TEMPLATE)
            .context("load display template")?;
        Ok(Self { env })
    }

    /// Render the display page for `frame`.
    ///
    /// Action output is HTML-escaped by the `.html` template's auto-escaping.
    pub fn render_display(&self, frame: &Frame, config: &ActionConfig) -> Result<String> {
        let display = DisplayContext {
            results: &frame.output,
            polling: frame.view.polling_label(),
            poll_count: frame.view.poll_count,
            generation: frame.generation.get(),
        };
        let template = self.env.get_template("display.html")?;
        let rendered = template
            .render(context! {
                app_name => &config.app_name,
                controller_name => &config.controller_name,
                refresh => refresh_meta(&frame.view, &config.display_url).unwrap_or_default(),
                page => display,
            })
            .context("render display template")?;
        Ok(rendered)
    }
}

/// `<meta http-equiv="Refresh">` tag for a running view, `None` when idle.
pub fn refresh_meta(view: &View, display_url: &str) -> Option<String> {
    let secs = view.refresh_after()?.as_secs();
    Some(format!(
        r#"<meta http-equiv="Refresh" content="{secs}; URL={display_url}"/>"#
    ))
}

/// Value for the `Refresh` response header for a running view, `None` when idle.
pub fn refresh_header(view: &View, display_url: &str) -> Option<String> {
    let secs = view.refresh_after()?.as_secs();
    Some(format!("{secs}; url={display_url}"))
}

/// Minimal page that immediately sends the client to `display_url`.
pub fn redirect_page(display_url: &str) -> String {
    format!(r#"<head><meta http-equiv="Refresh" content="0; URL={display_url}"/></head>"#)
}
