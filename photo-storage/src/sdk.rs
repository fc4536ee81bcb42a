/// Android 10, the first release with mandatory scoped storage
pub const SDK_Q: u32 = 29;

/// Runs `on_sdk29` only on API level 29 and up
pub fn sdk29_and_up<T>(sdk_int: u32, on_sdk29: impl FnOnce() -> T) -> Option<T> {
    if sdk_int >= SDK_Q {
        Some(on_sdk29())
    } else {
        None
    }
}

/// API level of the running device
///
/// Reads `Build.VERSION.SDK_INT` on Android and falls back to `configured`
/// everywhere else or if the lookup fails.
pub fn current_sdk_int(configured: u32) -> u32 {
    #[cfg(target_os = "android")]
    {
        match crate::platform::sdk_int() {
            Ok(sdk) => return sdk,
            Err(e) => log::warn!("Could not read SDK_INT, using {}: {}", configured, e),
        }
    }
    configured
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sdk29_and_up() {
        assert_eq!(sdk29_and_up(29, || "q"), Some("q"));
        assert_eq!(sdk29_and_up(34, || 1), Some(1));
        assert_eq!(sdk29_and_up(28, || 1), None);
    }

    #[test]
    fn test_lazy_on_old_sdk() {
        let mut called = false;
        sdk29_and_up(21, || called = true);
        assert!(!called);
    }

    #[cfg(not(target_os = "android"))]
    #[test]
    fn test_current_sdk_int_uses_configured() {
        assert_eq!(current_sdk_int(30), 30);
    }
}
