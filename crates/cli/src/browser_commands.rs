//! `partdesk detect-browser`.

use {
    anyhow::Result,
    partdesk_browser::{DetectionResult, DetectionSource, detect_browser},
    partdesk_config::PartdeskConfig,
};

fn source_label(source: DetectionSource) -> &'static str {
    match source {
        DetectionSource::Config => "config (browser.chrome_path)",
        DetectionSource::Environment => "CHROME environment variable",
        DetectionSource::Platform => "platform install location",
        DetectionSource::Path => "PATH",
    }
}

fn render(result: &DetectionResult) -> String {
    match (&result.path, result.source) {
        (Some(path), Some(source)) => format!(
            "Browser found:\n  path:   {}\n  source: {}",
            path.display(),
            source_label(source)
        ),
        (Some(path), None) => format!("Browser found:\n  path:   {}", path.display()),
        (None, _) => result.install_hint.clone(),
    }
}

pub fn handle_detect(config: &PartdeskConfig, json: bool) -> Result<()> {
    let result = detect_browser(config.browser.chrome_path.as_deref());
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if result.found() {
        println!("{}", render(&result));
    } else {
        eprintln!("{}", render(&result));
    }

    if !result.found() {
        std::process::exit(1);
    }
    Ok(())
}
