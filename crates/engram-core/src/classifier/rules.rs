//! Fast rule stage - deterministic discard patterns.
//!
//! The first funnel stage handles unambiguous low-value input (laughter,
//! filler, bare acknowledgements, farewells) without invoking any external
//! capability. Patterns only ever decide "discard"; anything they do not
//! match escalates.

use once_cell::sync::Lazy;
use regex::Regex;

struct DiscardRule {
    pattern: Regex,
    label: &'static str,
}

fn rule(pattern: &str, label: &'static str) -> DiscardRule {
    DiscardRule {
        pattern: Regex::new(pattern).expect("invalid discard pattern"),
        label,
    }
}

static DISCARD_RULES: Lazy<Vec<DiscardRule>> = Lazy::new(|| {
    vec![
        rule(r"^(哈{2,}|呵{2,}|嘿{2,})", "laughter"),
        rule(r"(?i)^((ha){2,}h?|(he){2,}h?|lo+l)$", "laughter"),
        rule(r"^(嗯{1,3}|额{1,3}|呃{1,3})$", "filler particle"),
        rule(r"(?i)^(u+h+|u+m+|h+m+)$", "filler particle"),
        rule(r"^(好的{1,2}|知道了|收到|明白了?)$", "acknowledgement"),
        rule(
            r"(?i)^(ok(ay)?|got it|sounds good|sure|understood|will do)[.!]?$",
            "acknowledgement",
        ),
        rule(
            r"(?i)^(all good|no (problem|issues?|worries)|nothing else)[,.!]?\s*(thanks|thank you)?[.!]?$",
            "acknowledgement",
        ),
        rule(r"^[!！。.，,、？?]{1,5}$", "bare punctuation"),
        rule(r"^(再见|拜拜|88|下次见)$", "farewell"),
        rule(r"(?i)^(bye|goodbye|see you( later)?|later)[.!]?$", "farewell"),
        rule(r"^(谢谢|谢了)$", "bare thanks"),
        rule(r"(?i)^(thanks|thank you|thx|ty)[.!]?$", "bare thanks"),
        rule(r"^.{1,3}$", "ultra-short content"),
    ]
});

/// Small-talk openers that discard unless the input is about work.
static SMALLTALK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"天气|吃饭了吗|在吗|忙吗").expect("invalid smalltalk pattern"));
static WORK_CONTEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)工作|项目|work|project").expect("invalid work pattern"));

/// Match `content` against the fixed discard rule set.
///
/// Returns a short label describing the matched rule, or None if the input
/// must escalate to the scoring stages.
pub fn matches_discard(content: &str) -> Option<&'static str> {
    let content = content.trim();
    if content.is_empty() {
        return Some("empty input");
    }

    for rule in DISCARD_RULES.iter() {
        if rule.pattern.is_match(content) {
            return Some(rule.label);
        }
    }

    if SMALLTALK.is_match(content) && !WORK_CONTEXT.is_match(content) {
        return Some("small talk");
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_laughter_discarded() {
        assert_eq!(matches_discard("哈哈哈"), Some("laughter"));
        assert_eq!(matches_discard("hahaha"), Some("laughter"));
        assert_eq!(matches_discard("呵呵呵呵"), Some("laughter"));
    }

    #[test]
    fn test_acknowledgements_discarded() {
        assert!(matches_discard("好的").is_some());
        assert!(matches_discard("收到").is_some());
        assert!(matches_discard("okay").is_some());
        assert!(matches_discard("got it").is_some());
        assert!(matches_discard("no issues, thanks").is_some());
    }

    #[test]
    fn test_thanks_and_farewells_discarded() {
        assert!(matches_discard("谢谢").is_some());
        assert!(matches_discard("thanks!").is_some());
        assert!(matches_discard("再见").is_some());
        assert!(matches_discard("bye").is_some());
    }

    #[test]
    fn test_punctuation_and_short_content_discarded() {
        assert!(matches_discard("！！！").is_some());
        assert!(matches_discard("ok!").is_some());
        assert!(matches_discard("").is_some());
        assert!(matches_discard("   ").is_some());
    }

    #[test]
    fn test_smalltalk_without_work_context() {
        assert_eq!(matches_discard("今天天气怎么样"), Some("small talk"));
        // Work-related content escapes the small-talk rule
        assert!(matches_discard("明天天气影响项目交付吗").is_none());
    }

    #[test]
    fn test_substantive_input_escalates() {
        assert!(matches_discard("I prefer concise answers").is_none());
        assert!(matches_discard("明天董事会会议讨论AI战略规划").is_none());
        assert!(matches_discard("请解释一下微服务架构的原理").is_none());
        assert!(matches_discard("how do I configure the cluster?").is_none());
    }
}
