use crate::rules::{normalize_keyword, ReactionRule};

/// Collects the reaction markers triggered by `text`.
///
/// The text is lowercased once and each rule's normalized keyword is tested
/// as a plain substring, in the rule collection's iteration order. Matches
/// are a union across rules, deduplicated by exact marker string with
/// first-seen order winning. Pure function: no I/O, inputs untouched.
pub fn matched_reactions(text: &str, rules: &[ReactionRule]) -> Vec<String> {
    let haystack = text.to_lowercase();
    let mut matched: Vec<String> = Vec::new();

    for rule in rules {
        let keyword = normalize_keyword(&rule.keyword);
        if keyword.is_empty() || !haystack.contains(&keyword) {
            continue;
        }
        for reaction in &rule.reactions {
            if !matched.iter().any(|seen| seen == reaction) {
                matched.push(reaction.clone());
            }
        }
    }

    matched
}

#[cfg(test)]
mod tests {
    use super::matched_reactions;
    use crate::rules::ReactionRule;

    fn rule(keyword: &str, reactions: &[&str]) -> ReactionRule {
        ReactionRule {
            keyword: keyword.to_owned(),
            reactions: reactions.iter().map(|value| (*value).to_owned()).collect(),
        }
    }

    #[test]
    fn matches_keyword_case_insensitively() {
        let rules = vec![rule("hello", &[":wave:"])];
        assert_eq!(matched_reactions("Hello World", &rules), vec![":wave:".to_owned()]);
    }

    #[test]
    fn keyword_matches_as_substring_inside_longer_text() {
        let rules = vec![rule("deploy", &[":rocket:"])];
        assert_eq!(
            matched_reactions("redeploying the staging cluster", &rules),
            vec![":rocket:".to_owned()]
        );
    }

    #[test]
    fn unions_reactions_across_rules_in_first_seen_order() {
        let rules = vec![
            rule("hello", &[":wave:", ":sunny:"]),
            rule("world", &[":sunny:", ":earth_americas:"]),
        ];

        assert_eq!(
            matched_reactions("hello world", &rules),
            vec![":wave:".to_owned(), ":sunny:".to_owned(), ":earth_americas:".to_owned()]
        );
    }

    #[test]
    fn duplicate_markers_within_one_rule_appear_once() {
        let rules = vec![rule("ship", &[":boat:", ":boat:"])];
        assert_eq!(matched_reactions("ship it", &rules), vec![":boat:".to_owned()]);
    }

    #[test]
    fn non_matching_text_yields_empty_result() {
        let rules = vec![rule("hello", &[":wave:"])];
        assert!(matched_reactions("goodbye", &rules).is_empty());
    }

    #[test]
    fn empty_keyword_never_matches() {
        let rules = vec![rule("   ", &[":ghost:"])];
        assert!(matched_reactions("anything", &rules).is_empty());
    }
}
