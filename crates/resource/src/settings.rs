//! Settings applied to every freshly built session

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tether_config::ConfigResolver;

/// Window geometry requested for new sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowSize {
    /// Leave the driver's default
    #[default]
    Default,
    /// Maximize the window
    Maximized,
    /// Resize to a fixed size
    Fixed {
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },
}

/// Timeouts and window settings shared by all sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonSettings {
    /// Implicit element wait
    pub implicit_wait: Duration,
    /// Page load timeout
    pub page_load_timeout: Duration,
    /// Script execution timeout
    pub script_timeout: Duration,
    /// Window geometry
    pub window: WindowSize,
}

impl Default for CommonSettings {
    fn default() -> Self {
        Self {
            implicit_wait: Duration::from_secs(10),
            page_load_timeout: Duration::from_secs(30),
            script_timeout: Duration::from_secs(30),
            window: WindowSize::Default,
        }
    }
}

impl CommonSettings {
    /// Read settings from `web.timeouts.*` and `web.window.*`.
    ///
    /// Override keys are the last path segment (`implicitWait`,
    /// `window.maximize`, ...). Negative values fall back to the defaults.
    pub fn from_resolver(resolver: &ConfigResolver) -> Self {
        let defaults = Self::default();
        let secs = |key: &str, path: &str, default: Duration| {
            let raw = resolver.get_int(key, path, secs_i64(default));
            u64::try_from(raw).map_or(default, Duration::from_secs)
        };

        let window = if resolver.get_bool("window.maximize", "web.window.maximize", false) {
            WindowSize::Maximized
        } else {
            let width = resolver.get_int("window.width", "web.window.width", 0);
            let height = resolver.get_int("window.height", "web.window.height", 0);
            match (u32::try_from(width), u32::try_from(height)) {
                (Ok(width), Ok(height)) if width > 0 && height > 0 => {
                    WindowSize::Fixed { width, height }
                }
                _ => WindowSize::Default,
            }
        };

        Self {
            implicit_wait: secs(
                "implicitWait",
                "web.timeouts.implicitWait",
                defaults.implicit_wait,
            ),
            page_load_timeout: secs(
                "pageLoadTimeout",
                "web.timeouts.pageLoad",
                defaults.page_load_timeout,
            ),
            script_timeout: secs("scriptTimeout", "web.timeouts.script", defaults.script_timeout),
            window,
        }
    }
}

fn secs_i64(d: Duration) -> i64 {
    i64::try_from(d.as_secs()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tether_config::{ConfigDocument, Overrides};

    fn resolver(web: serde_json::Value, overrides: Overrides) -> ConfigResolver {
        let doc = ConfigDocument::from_value("config/web.json", web).unwrap();
        ConfigResolver::from_documents([("web", doc)], overrides)
    }

    #[test]
    fn reads_timeouts_and_window() {
        let r = resolver(
            json!({
                "timeouts": {"implicitWait": 5, "pageLoad": 60},
                "window": {"width": 1280, "height": 720}
            }),
            Overrides::new(),
        );
        let settings = CommonSettings::from_resolver(&r);
        assert_eq!(settings.implicit_wait, Duration::from_secs(5));
        assert_eq!(settings.page_load_timeout, Duration::from_secs(60));
        assert_eq!(settings.script_timeout, Duration::from_secs(30));
        assert_eq!(
            settings.window,
            WindowSize::Fixed {
                width: 1280,
                height: 720
            }
        );
    }

    #[test]
    fn maximize_wins_and_negatives_use_defaults() {
        let overrides = Overrides::from_args(["window.maximize=true", "implicitWait=-3"]);
        let r = resolver(json!({"window": {"width": 800, "height": 600}}), overrides);
        let settings = CommonSettings::from_resolver(&r);
        assert_eq!(settings.window, WindowSize::Maximized);
        assert_eq!(settings.implicit_wait, Duration::from_secs(10));
    }
}
