//! Enhanced networking flag resolution.

/// SR-IOV setting that enables enhanced networking.
pub const SIMPLE_SRIOV_NET_SUPPORT: &str = "simple";

/// Resolve the networking flag for the new image.
///
/// Forcing overrides the source value with `simple`; otherwise the source
/// value is copied as is. Forcing can turn the feature on, never off.
pub fn resolve_sriov_net_support(force: bool, source: Option<&str>) -> Option<String> {
    if force {
        Some(SIMPLE_SRIOV_NET_SUPPORT.to_string())
    } else {
        source.map(str::to_string)
    }
}
