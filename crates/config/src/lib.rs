//! # tether-config
//!
//! Cached JSON configuration documents and layered property resolution.
//!
//! - [`ConfigLoader`] resolves a requested path against a [`SearchPath`],
//!   parses and validates the document, and caches it until the file's
//!   modification time moves forward.
//! - [`ConfigResolver`] answers typed lookups from runtime [`Overrides`], then
//!   the named documents, then a caller default.
//!
//! ```no_run
//! use tether_config::{ConfigLoader, ConfigResolver, DocumentSpec, Overrides, SearchPath};
//!
//! # async fn demo() -> tether_config::ConfigResult<()> {
//! let loader = ConfigLoader::new(SearchPath::default());
//! let resolver = ConfigResolver::load_lenient(
//!     &loader,
//!     DocumentSpec::defaults(),
//!     Overrides::from_env("TETHER"),
//! )
//! .await?;
//!
//! let browser = resolver.get_string("browser", "run.browser", "chrome");
//! let wait = resolver.get_int("implicitWait", "web.timeouts.implicitWait", 10);
//! # let _ = (browser, wait);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod core;
pub mod loader;
pub mod resolver;

pub use crate::core::{ConfigDocument, ConfigError, ConfigResult, json_type_name};
pub use loader::{ConfigLoader, SearchPath};
pub use resolver::{ConfigResolver, DocumentSpec, Overrides, Resolved};

/// Common imports
pub mod prelude {
    pub use crate::{
        ConfigDocument, ConfigError, ConfigLoader, ConfigResolver, ConfigResult, DocumentSpec,
        Overrides, SearchPath,
    };
}
