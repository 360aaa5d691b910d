use std::sync::OnceLock;

fn env_true(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|val| {
        let trimmed = val.trim();
        !trimmed.is_empty() && !matches!(trimmed, "0" | "false" | "FALSE" | "False")
    })
}

fn bool_from_env(key: &str) -> bool {
    env_true(key).unwrap_or(false)
}

/// Diagnostic mode: lowering failures abort the process instead of being
/// returned to the caller.
pub fn panic_on_error() -> bool {
    static PANIC: OnceLock<bool> = OnceLock::new();
    *PANIC.get_or_init(|| bool_from_env("GOLOWER_PANIC_ON_ERROR"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_true_rejects_falsey_spellings() {
        std::env::set_var("GOLOWER_TEST_FLAG_OFF", "false");
        std::env::set_var("GOLOWER_TEST_FLAG_ZERO", " 0 ");
        std::env::set_var("GOLOWER_TEST_FLAG_ON", "yes");
        assert_eq!(env_true("GOLOWER_TEST_FLAG_OFF"), Some(false));
        assert_eq!(env_true("GOLOWER_TEST_FLAG_ZERO"), Some(false));
        assert_eq!(env_true("GOLOWER_TEST_FLAG_ON"), Some(true));
        assert!(!bool_from_env("GOLOWER_TEST_FLAG_MISSING"));
    }
}
