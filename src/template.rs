//! `$name` / `${name}` placeholder substitution for file templates.
//!
//! Unknown placeholders are left in place and `$$` renders a literal `$`,
//! so shell fragments inside templates survive expansion.

use regex_lite::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$(?:(\$)|([A-Za-z_][A-Za-z0-9_]*)|\{([A-Za-z_][A-Za-z0-9_]*)\})")
            .expect("placeholder pattern is valid")
    })
}

/// Expand placeholders in `template` from `vars`.
pub fn substitute(template: &str, vars: &HashMap<&str, String>) -> String {
    placeholder_re()
        .replace_all(template, |caps: &Captures<'_>| {
            if caps.get(1).is_some() {
                return "$".to_string();
            }
            let name = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str());
            match name.and_then(|n| vars.get(n)) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> HashMap<&'static str, String> {
        HashMap::from([
            ("architecture", "amd64".to_string()),
            ("release", "bookworm".to_string()),
        ])
    }

    #[test]
    fn test_both_placeholder_forms() {
        let out = substitute(
            "deb [arch=$architecture] https://repo.example.com ${release} stable",
            &vars(),
        );
        assert_eq!(out, "deb [arch=amd64] https://repo.example.com bookworm stable");
    }

    #[test]
    fn test_unknown_placeholders_survive() {
        assert_eq!(substitute("$HOME/${unknown}", &vars()), "$HOME/${unknown}");
    }

    #[test]
    fn test_dollar_escape() {
        assert_eq!(substitute("cost: $$5 on $release", &vars()), "cost: $5 on bookworm");
    }
}
