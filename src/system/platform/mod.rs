//! Concrete providers. Both compile on every target so their parsers stay
//! tested everywhere; only the native selection below is target-specific.

use std::sync::Arc;

use crate::system::provider::{Provider, ProviderKind};

pub mod darwin;
pub mod linux;

pub use darwin::DarwinProvider;
pub use linux::LinuxProvider;

#[cfg(target_os = "macos")]
pub fn native_kind() -> ProviderKind {
    ProviderKind::Darwin
}

#[cfg(not(target_os = "macos"))]
pub fn native_kind() -> ProviderKind {
    ProviderKind::Linux
}

pub fn provider_for(kind: ProviderKind) -> Arc<dyn Provider> {
    match kind {
        ProviderKind::Linux => Arc::new(LinuxProvider::new()),
        ProviderKind::Darwin => Arc::new(DarwinProvider::new()),
    }
}

/// Resolves a config/CLI provider name; `"auto"` or anything unknown picks
/// the build target's provider.
pub fn resolve(name: &str) -> ProviderKind {
    ProviderKind::from_config_str(name).unwrap_or_else(native_kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_falls_back_to_native() {
        assert_eq!(resolve("auto"), native_kind());
        assert_eq!(resolve("LINUX"), ProviderKind::Linux);
        assert_eq!(resolve("macos"), ProviderKind::Darwin);
    }

    #[test]
    fn providers_report_their_kind() {
        assert_eq!(provider_for(ProviderKind::Linux).name(), "linux");
        assert_eq!(provider_for(ProviderKind::Darwin).name(), "darwin");
    }
}
