use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig, HeadlessMode};
use futures::StreamExt;
use settle_core::{BrowserConfig, HarnessError};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::page::ChromiumPage;

/// Throwaway browser profile directory, removed on drop.
#[derive(Debug)]
pub struct ProfileDir {
    path: PathBuf,
}

impl ProfileDir {
    pub fn create() -> Result<Self, HarnessError> {
        // A fresh profile per instance avoids SingletonLock conflicts between parallel launches
        let path = std::env::temp_dir().join(format!("settle-chromium-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&path).map_err(|e| {
            HarnessError::browser_error(format!("Failed to create profile dir: {}", e))
        })?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ProfileDir {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!(profile = %self.path.display(), "profile dir removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(profile = %self.path.display(), error = %e, "failed to remove profile dir"),
        }
    }
}

/// A running browser together with the profile directory it owns.
pub struct LaunchedBrowser {
    // Declared before `profile` so the process is gone before its directory is removed.
    browser: Browser,
    profile: ProfileDir,
}

impl LaunchedBrowser {
    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    pub fn profile_dir(&self) -> &Path {
        self.profile.path()
    }

    /// Close the browser, wait for the process to exit, then remove its profile.
    pub async fn close(mut self) -> Result<(), HarnessError> {
        self.browser
            .close()
            .await
            .map_err(|e| HarnessError::browser_error(format!("Close failed: {}", e)))?;
        self.browser
            .wait()
            .await
            .map_err(|e| HarnessError::browser_error(format!("Wait for exit failed: {}", e)))?;
        info!(profile = %self.profile.path().display(), "browser closed");
        Ok(())
    }
}

/// Launch Chromium with a throwaway profile directory and drive its CDP handler.
pub async fn launch(config: &BrowserConfig) -> Result<LaunchedBrowser, HarnessError> {
    let profile = ProfileDir::create()?;

    let mut builder = ChromeConfig::builder()
        .headless_mode(if config.headless { HeadlessMode::True } else { HeadlessMode::False })
        .user_data_dir(profile.path())
        .args(config.args.clone());

    if let (Some(w), Some(h)) = (config.viewport_width, config.viewport_height) {
        builder = builder.window_size(w, h);
    }

    let chrome_cfg = builder
        .build()
        .map_err(|e| HarnessError::browser_error(format!("Config failed: {}", e)))?;

    let (browser, mut handler) = Browser::launch(chrome_cfg)
        .await
        .map_err(|e| HarnessError::browser_error(format!("Launch failed: {}", e)))?;

    tokio::spawn(async move {
        while handler.next().await.is_some() {}
        debug!("browser handler finished");
    });

    info!(headless = config.headless, profile = %profile.path().display(), "browser launched");
    Ok(LaunchedBrowser { browser, profile })
}

pub async fn open_page(browser: &Browser, url: &str) -> Result<ChromiumPage, HarnessError> {
    let page = browser
        .new_page(url)
        .await
        .map_err(|e| HarnessError::browser_error(format!("New page failed: {}", e)))?;
    Ok(ChromiumPage::new(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_dir_is_removed_on_drop() {
        let profile = ProfileDir::create().unwrap();
        let path = profile.path().to_path_buf();
        std::fs::write(path.join("Local State"), "{}").unwrap();
        assert!(path.is_dir());

        drop(profile);

        assert!(!path.exists());
    }

    #[test]
    fn profile_dirs_are_unique() {
        let a = ProfileDir::create().unwrap();
        let b = ProfileDir::create().unwrap();
        assert_ne!(a.path(), b.path());
    }
}
