//! Reply adaptation: phrase substitution on a drafted reply plus a style
//! directive for the generation prompt.
//!
//! No table output matches any table input, so `adapt(adapt(x)) == adapt(x)`
//! and text without matches passes through unchanged.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::analyzer::ToneAnalysis;
use super::profiles::Tone;

struct Substitution {
    pattern: Regex,
    replacement: &'static str,
}

fn table(pairs: &[(&str, &'static str)]) -> Vec<Substitution> {
    pairs
        .iter()
        .map(|&(from, to)| Substitution {
            pattern: Regex::new(&format!(r"(?i)\b{}\b", regex::escape(from)))
                .unwrap_or_else(|e| panic!("invalid substitution {:?}: {}", from, e)),
            replacement: to,
        })
        .collect()
}

/// Casual phrasing → formal phrasing
static TO_FORMAL: Lazy<Vec<Substitution>> = Lazy::new(|| {
    table(&[
        ("hey", "hello"),
        ("hi", "hello"),
        ("thanks", "thank you"),
        ("yeah", "yes"),
        ("yep", "yes"),
        ("gonna", "going to"),
        ("wanna", "want to"),
        ("no worries", "you are welcome"),
        ("انت", "حضرتك"),
        ("عايز", "تحب"),
        ("اوكي", "حاضر"),
        ("ماشي", "حاضر"),
    ])
});

/// Formal phrasing → casual phrasing
static TO_CASUAL: Lazy<Vec<Substitution>> = Lazy::new(|| {
    table(&[
        ("hello", "hi"),
        ("thank you", "thanks"),
        ("certainly", "sure"),
        ("kindly", "please"),
        ("we regret to inform you", "sorry,"),
        ("حضرتك", "انت"),
        ("سيادتك", "انت"),
        ("برجاء", "ياريت"),
        ("يرجى", "ياريت"),
    ])
});

fn substitutions_for(tone: Tone) -> &'static [Substitution] {
    match tone {
        Tone::Formal | Tone::Professional => TO_FORMAL.as_slice(),
        Tone::Casual | Tone::Slang => TO_CASUAL.as_slice(),
        Tone::Neutral => &[],
    }
}

/// Keep a leading capital when the matched phrase had one
fn match_case(matched: &str, replacement: &str) -> String {
    let starts_upper = matched.chars().next().map(char::is_uppercase).unwrap_or(false);
    if !starts_upper {
        return replacement.to_string();
    }
    let mut chars = replacement.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Rewrite `draft` toward `tone` using the deterministic phrase tables
pub fn adapt_reply(draft: &str, tone: Tone) -> String {
    substitutions_for(tone)
        .iter()
        .fold(draft.to_string(), |text, sub| {
            sub.pattern
                .replace_all(&text, |caps: &Captures| match_case(&caps[0], sub.replacement))
                .into_owned()
        })
}

/// Instruction injected into the generation prompt
pub fn style_directive(tone: Tone) -> &'static str {
    match tone {
        Tone::Formal => {
            "Reply formally and courteously. Address the customer respectfully \
             (حضرتك in Arabic) and avoid slang."
        }
        Tone::Casual => {
            "Reply in a friendly, relaxed way, like a helpful shop assistant. \
             Use everyday Egyptian Arabic when the customer writes in Arabic."
        }
        Tone::Slang => {
            "Match the customer's street register lightly: keep it warm and short, \
             mirror their address forms, but never be rude or vulgar."
        }
        Tone::Professional => {
            "Reply concisely and precisely. Lead with figures, references and \
             delivery terms; skip small talk."
        }
        Tone::Neutral => "Reply in a clear, polite and balanced register.",
    }
}

/// Adapted reply plus directive for an analysis result
pub struct Adaptation {
    pub tone: Tone,
    pub directive: &'static str,
    pub reply: String,
}

pub fn adapt(draft: &str, analysis: &ToneAnalysis) -> Adaptation {
    let tone = analysis.dominant_tone;
    Adaptation {
        tone,
        directive: style_directive(tone),
        reply: adapt_reply(draft, tone),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formal_swaps() {
        assert_eq!(
            adapt_reply("Hey, thanks! Yeah we're gonna ship today.", Tone::Formal),
            "Hello, thank you! Yes we're going to ship today."
        );
    }

    #[test]
    fn test_casual_swaps_arabic() {
        assert_eq!(adapt_reply("برجاء تأكيد العنوان يا حضرتك", Tone::Casual), "ياريت تأكيد العنوان يا انت");
    }

    #[test]
    fn test_no_match_is_identity() {
        let draft = "Your order ships tomorrow.";
        for tone in [Tone::Formal, Tone::Casual, Tone::Slang, Tone::Professional, Tone::Neutral] {
            assert_eq!(adapt_reply(draft, tone), draft);
        }
    }

    #[test]
    fn test_adaptation_is_idempotent() {
        let drafts = [
            "hey there, thanks a lot, yeah it's in stock",
            "Hello, thank you for waiting. Certainly, kindly check your email.",
            "انت عايز المقاس الكبير؟ اوكي",
        ];
        for tone in [Tone::Formal, Tone::Casual] {
            for draft in drafts {
                let once = adapt_reply(draft, tone);
                assert_eq!(adapt_reply(&once, tone), once, "tone {} draft {:?}", tone, draft);
            }
        }
    }

    #[test]
    fn test_word_boundaries() {
        // "hi" inside "this" and "shipping" stays put
        assert_eq!(adapt_reply("this shipping", Tone::Formal), "this shipping");
    }

    #[test]
    fn test_directive_for_every_tone() {
        for tone in [Tone::Formal, Tone::Casual, Tone::Slang, Tone::Professional, Tone::Neutral] {
            assert!(!style_directive(tone).is_empty());
        }
    }
}
