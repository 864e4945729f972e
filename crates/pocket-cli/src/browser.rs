use std::env;

use crate::error::CliError;

/// Open a URL with `$BROWSER` when set, else the platform default handler.
pub fn open_in_browser(url: &str) -> Result<(), CliError> {
    let result = match preferred_browser() {
        Some(browser) => open::with(url, &browser).map_err(|error| (browser, error)),
        None => open::that(url).map_err(|error| ("the default browser".to_string(), error)),
    };

    result.map_err(|(browser, error)| {
        CliError::BrowserFailed(format!("could not launch {browser}: {error}"))
    })
}

fn preferred_browser() -> Option<String> {
    browser_override(env::var("BROWSER").ok())
}

/// A blank `$BROWSER` counts as unset.
pub fn browser_override(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
