//! Administrative settings read at dispatch time

/// Site-wide messaging switches
///
/// Implementations must return the current value on every call; the
/// dispatcher never caches it.
pub trait MessagingSettings: Send + Sync {
    /// Whether user-to-user messaging is enabled site-wide
    fn messaging_enabled(&self) -> bool;
}
