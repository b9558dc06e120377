//! Browser detection and install guidance.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Chromium-based executable names looked up on `PATH`.
const CHROMIUM_EXECUTABLES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chrome",
    "chromium",
    "chromium-browser",
    "msedge",
    "microsoft-edge",
    "microsoft-edge-stable",
    "brave",
    "brave-browser",
];

#[cfg(target_os = "macos")]
const PLATFORM_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
    "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
];

#[cfg(target_os = "windows")]
const PLATFORM_PATHS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
];

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const PLATFORM_PATHS: &[&str] = &[];

/// Where a detected browser came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSource {
    Config,
    Environment,
    Platform,
    Path,
}

/// Result of browser detection.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionResult {
    pub path: Option<PathBuf>,
    pub source: Option<DetectionSource>,
    /// Install instructions, empty when a browser was found.
    pub install_hint: String,
}

impl DetectionResult {
    pub fn found(&self) -> bool {
        self.path.is_some()
    }

    fn hit(path: PathBuf, source: DetectionSource) -> Self {
        Self {
            path: Some(path),
            source: Some(source),
            install_hint: String::new(),
        }
    }
}

/// Detect a Chromium-based browser.
///
/// Checks, in order: the configured path, the `CHROME` environment
/// variable, platform install locations, then known executables on `PATH`.
pub fn detect_browser(custom_path: Option<&str>) -> DetectionResult {
    detect_with(custom_path, std::env::var("CHROME").ok().as_deref())
}

fn detect_with(custom_path: Option<&str>, env_path: Option<&str>) -> DetectionResult {
    if let Some(p) = custom_path.map(PathBuf::from).filter(|p| p.exists()) {
        return DetectionResult::hit(p, DetectionSource::Config);
    }

    if let Some(p) = env_path.map(PathBuf::from).filter(|p| p.exists()) {
        return DetectionResult::hit(p, DetectionSource::Environment);
    }

    // Platform bundles first: PATH may hold broken wrapper scripts.
    if let Some(p) = PLATFORM_PATHS.iter().map(Path::new).find(|p| p.exists()) {
        return DetectionResult::hit(p.to_path_buf(), DetectionSource::Platform);
    }

    if let Some(p) = CHROMIUM_EXECUTABLES
        .iter()
        .find_map(|name| which::which(name).ok())
    {
        return DetectionResult::hit(p, DetectionSource::Path);
    }

    DetectionResult {
        path: None,
        source: None,
        install_hint: install_instructions(),
    }
}

/// Platform-specific install instructions.
pub fn install_instructions() -> String {
    let instructions = if cfg!(target_os = "macos") {
        "  brew install --cask google-chrome"
    } else if cfg!(target_os = "linux") {
        "  Debian/Ubuntu: sudo apt install chromium\n  \
         Fedora:        sudo dnf install chromium\n  \
         Arch:          sudo pacman -S chromium"
    } else if cfg!(target_os = "windows") {
        "  winget install Google.Chrome"
    } else {
        "  Download from https://www.google.com/chrome/"
    };

    format!(
        "No Chromium-based browser found. Install one:\n\n\
         {instructions}\n\n\
         Or set the path manually in partdesk.toml:\n  \
         [browser]\n  \
         chrome_path = \"/path/to/browser\"\n\n\
         Or set the CHROME environment variable."
    )
}
