//! Owner check for the Telegram adapter.
//!
//! Deny-by-default: an unset owner id (`0`) means no one is allowed.

/// Returns `true` when `user_id` is the configured operator.
pub fn is_owner(owner_id: u64, user_id: u64) -> bool {
    owner_id != 0 && owner_id == user_id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_owner_denies_all() {
        assert!(!is_owner(0, 0));
        assert!(!is_owner(0, 111));
    }

    #[test]
    fn only_exact_id_matches() {
        assert!(is_owner(123456789, 123456789));
        assert!(!is_owner(123456789, 987654321));
    }
}
