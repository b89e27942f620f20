//! Optional eviction/expiry delegate hooks.

/// Advisory and authoritative hooks a cache owner can attach to influence
/// expiry decisions. Every method has a conservative default so
/// implementors only override what they need.
///
/// Both hooks are invoked with the cache's internal lock released (for
/// [`SharedBoundedCache`](crate::cache::shared::SharedBoundedCache)), so a
/// delegate is free to call back into the cache without deadlocking.
pub trait CacheDelegate<K, V>: Send + Sync {
    /// Advisory hook fired at most once per entry per lifetime, the first
    /// time the entry is touched after crossing the halfway point of its
    /// lifetime. Has no effect on the value returned to the caller.
    fn may_refresh(&self, value: &V, key: &K, lifetime_seconds: u64, remaining_seconds: u64) {
        let _ = (value, key, lifetime_seconds, remaining_seconds);
    }

    /// Authoritative veto fired when `get` finds an expired entry. Returning
    /// `true` resets the entry's birth to now (so it lives another full
    /// lifetime) and the lookup still returns the value; returning `false`
    /// (the default) lets the entry be removed as a miss.
    fn should_keep(&self, value: &V, key: &K, lifetime_seconds: u64, expired_seconds_ago: u64) -> bool {
        let _ = (value, key, lifetime_seconds, expired_seconds_ago);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysKeep;
    impl CacheDelegate<&'static str, i32> for AlwaysKeep {
        fn should_keep(&self, _value: &i32, _key: &&'static str, _lifetime_seconds: u64, _expired_seconds_ago: u64) -> bool {
            true
        }
    }

    struct Default_;
    impl CacheDelegate<&'static str, i32> for Default_ {}

    #[test]
    fn default_should_keep_is_false() {
        let d = Default_;
        assert!(!d.should_keep(&1, &"k", 10, 5));
    }

    #[test]
    fn overridden_should_keep_is_honored() {
        let d = AlwaysKeep;
        assert!(d.should_keep(&1, &"k", 10, 5));
    }
}
