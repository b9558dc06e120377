/// Replace `${ENV_VAR}` placeholders in raw config text.
///
/// `${VAR:-fallback}` uses `fallback` when `VAR` is unset or empty.
/// Unresolvable placeholders without a fallback are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            // Unterminated: keep the remainder verbatim.
            out.push_str(&rest[start..]);
            return out;
        };

        let body = &after[..end];
        let (name, fallback) = match body.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (body, None),
        };

        let value = lookup(name).filter(|v| !v.is_empty() || fallback.is_none());
        match (value, fallback) {
            (Some(v), _) if !name.is_empty() => out.push_str(&v),
            (None, Some(fb)) if !name.is_empty() => out.push_str(fb),
            _ => {
                out.push_str("${");
                out.push_str(body);
                out.push('}');
            },
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "PARTDESK_TOKEN" => Some("123:abc".to_string()),
            "PARTDESK_EMPTY" => Some(String::new()),
            _ => None,
        }
    }

    #[test]
    fn substitutes_known_var() {
        assert_eq!(
            substitute_env_with("token = \"${PARTDESK_TOKEN}\"", lookup),
            "token = \"123:abc\""
        );
    }

    #[test]
    fn leaves_unknown_var() {
        assert_eq!(
            substitute_env_with("${PARTDESK_MISSING}", lookup),
            "${PARTDESK_MISSING}"
        );
    }

    #[test]
    fn fallback_applies_to_missing_and_empty() {
        assert_eq!(substitute_env_with("${PARTDESK_MISSING:-x}", lookup), "x");
        assert_eq!(substitute_env_with("${PARTDESK_EMPTY:-y}", lookup), "y");
        assert_eq!(substitute_env_with("${PARTDESK_TOKEN:-z}", lookup), "123:abc");
    }

    #[test]
    fn unterminated_placeholder_is_literal() {
        assert_eq!(substitute_env_with("a ${OPEN", lookup), "a ${OPEN");
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_env("plain text"), "plain text");
    }
}
