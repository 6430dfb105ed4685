/// Extracts a user id from a raw id or a mention (`<@123>` / `<@!123>`).
pub fn parse_user_id(token: &str) -> Option<String> {
    let token = token.trim();
    let inner = token
        .strip_prefix("<@")
        .and_then(|t| t.strip_suffix('>'))
        .map(|t| t.strip_prefix('!').unwrap_or(t))
        .unwrap_or(token);
    if !inner.is_empty() && inner.chars().all(|c| c.is_ascii_digit()) {
        Some(inner.to_string())
    } else {
        None
    }
}

/// Extracts every user id from free-form text mixing mentions and raw ids,
/// preserving first-seen order and dropping duplicates.
pub fn parse_user_ids(input: &str) -> Vec<String> {
    let spaced = input.replace("<@", " <@").replace('>', "> ");
    let mut ids = Vec::new();
    for token in spaced.split_whitespace() {
        if let Some(id) = parse_user_id(token) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_mentions_and_raw_ids() {
        assert_eq!(parse_user_id("<@123>").as_deref(), Some("123"));
        assert_eq!(parse_user_id("<@!123>").as_deref(), Some("123"));
        assert_eq!(parse_user_id("123").as_deref(), Some("123"));
        assert_eq!(parse_user_id("abc"), None);
        assert_eq!(parse_user_id("<@abc>"), None);
    }

    #[test]
    fn splits_cramped_mentions_and_dedups() {
        let ids = parse_user_ids("<@1><@2> 3 <@!1> words 2");
        assert_eq!(ids, vec!["1", "2", "3"]);
    }
}
