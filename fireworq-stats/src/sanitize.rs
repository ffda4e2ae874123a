/// Map a queue name to the character set allowed in metric names, `[A-Za-z0-9_-]`.
/// Every other character is replaced by a single '-'.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_invalid_characters() {
        assert_eq!(sanitize("my.queue#1"), "my-queue-1");
        assert_eq!(sanitize("a b/c"), "a-b-c");
        assert_eq!(sanitize("キュー"), "---");
    }

    #[test]
    fn test_sanitize_keeps_valid_names() {
        for name in ["default", "queue_1", "Queue-2", "0", "-_-"] {
            assert_eq!(sanitize(name), name);
        }
    }

    #[test]
    fn test_sanitize_empty_name() {
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        for name in ["my.queue#1", "", "ok", "ünïcödé queue", "a..b", "\t\n"] {
            let once = sanitize(name);
            assert_eq!(sanitize(&once), once);
        }
    }
}
