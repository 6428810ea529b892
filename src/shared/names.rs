pub const MAX_USERNAME_LENGTH: usize = 20;
pub const MIN_USERNAME_LENGTH: usize = 2;

pub fn sanitize_username(name: &str) -> String {
    let cleaned = name.split_whitespace().collect::<Vec<_>>().join(" ");
    cleaned.chars().take(MAX_USERNAME_LENGTH).collect()
}

pub fn is_valid_username(name: &str) -> bool {
    let len = name.chars().count();
    (MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&len)
        && name
            .chars()
            .all(|ch| ch.is_alphanumeric() || ch == '-' || ch == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_collapses_whitespace_and_truncates() {
        assert_eq!(sanitize_username("  snake   master  "), "snake master");
        let long = "x".repeat(40);
        assert_eq!(sanitize_username(&long).chars().count(), MAX_USERNAME_LENGTH);
    }

    #[test]
    fn validates_character_set_and_length() {
        assert!(is_valid_username("player-7"));
        assert!(is_valid_username("Bee_01"));
        assert!(!is_valid_username("a"));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username("semi;colon"));
    }
}
