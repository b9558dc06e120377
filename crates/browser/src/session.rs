//! The single long-lived browser session.

use {
    chromiumoxide::{
        Browser, BrowserConfig as CdpBrowserConfig, handler::viewport::Viewport,
    },
    futures::StreamExt,
    tokio::{sync::Mutex, task::JoinHandle},
    tracing::{debug, info, warn},
};

use crate::{
    detect::{detect_browser, install_instructions},
    driver::PageDriver,
    error::BrowserError,
    types::{BrowserConfig, validate_url},
};

/// One Chromium process with a persistent profile and one page.
pub struct BrowserSession {
    browser: Mutex<Option<Browser>>,
    handler: Mutex<Option<JoinHandle<()>>>,
    driver: PageDriver,
}

impl BrowserSession {
    /// Launch the browser, open the start URL, and return the session.
    pub async fn launch(config: &BrowserConfig) -> Result<Self, BrowserError> {
        validate_url(&config.start_url)?;

        let detection = detect_browser(config.chrome_path.as_deref());
        let Some(executable) = detection.path else {
            return Err(BrowserError::LaunchFailed(format!(
                "Chrome/Chromium not found. {}",
                detection.install_hint
            )));
        };

        std::fs::create_dir_all(&config.profile_dir).map_err(|e| {
            BrowserError::LaunchFailed(format!(
                "cannot create profile dir {}: {e}",
                config.profile_dir.display()
            ))
        })?;

        let mut builder = CdpBrowserConfig::builder();
        // chromiumoxide defaults to headless
        if !config.headless {
            builder = builder.with_head();
        }

        builder = builder
            .viewport(Viewport {
                width: config.viewport_width,
                height: config.viewport_height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: true,
                has_touch: false,
            })
            .request_timeout(config.navigation_timeout)
            .user_data_dir(&config.profile_dir)
            .chrome_executable(&executable)
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check");

        if let Some(ref ua) = config.user_agent {
            builder = builder.arg(format!("--user-agent={ua}"));
        }
        for arg in &config.chrome_args {
            builder = builder.arg(arg);
        }

        let cdp_config = builder.build().map_err(|e| {
            BrowserError::LaunchFailed(format!("failed to build browser config: {e}"))
        })?;

        let (browser, mut handler) = Browser::launch(cdp_config).await.map_err(|e| {
            BrowserError::LaunchFailed(format!(
                "browser launch failed: {e}\n\n{}",
                install_instructions()
            ))
        })?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "browser event error");
                }
            }
            debug!("browser event handler exited");
        });

        let page = match browser.new_page(config.start_url.as_str()).await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                return Err(BrowserError::NavigationFailed(e.to_string()));
            },
        };
        if let Err(e) = page.wait_for_navigation().await {
            debug!(error = %e, url = %config.start_url, "initial navigation did not settle");
        }

        info!(
            executable = %executable.display(),
            profile = %config.profile_dir.display(),
            headless = config.headless,
            url = %config.start_url,
            "browser session launched"
        );

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            handler: Mutex::new(Some(handler_task)),
            driver: PageDriver::new(page, config.slow_mo),
        })
    }

    pub fn driver(&self) -> &PageDriver {
        &self.driver
    }

    /// Close the browser and stop the event handler. Safe to call repeatedly.
    pub async fn close(&self) {
        let Some(mut browser) = self.browser.lock().await.take() else {
            return;
        };
        if let Err(e) = browser.close().await {
            warn!(error = %e, "browser close failed");
        }
        if let Err(e) = browser.wait().await {
            debug!(error = %e, "browser process wait failed");
        }
        if let Some(task) = self.handler.lock().await.take() {
            task.abort();
        }
        info!("browser session closed");
    }
}
