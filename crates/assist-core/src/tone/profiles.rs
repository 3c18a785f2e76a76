//! Lexical tone profiles (Egyptian Arabic + English).
//!
//! Keywords score 2 per hit, patterns 5 per match. Patterns capture
//! constructions a bare word list misses: vocative address forms, greeting
//! formulas, "would you" requests.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const KEYWORD_WEIGHT: u32 = 2;
pub const PATTERN_WEIGHT: u32 = 5;

/// Customer register
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Formal,
    Casual,
    Slang,
    Professional,
    /// Balanced register used when no category wins clearly
    Neutral,
}

impl Tone {
    /// Categories that are actually scored
    pub const SCORED: [Tone; 4] = [Tone::Formal, Tone::Casual, Tone::Slang, Tone::Professional];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Formal => "formal",
            Tone::Casual => "casual",
            Tone::Slang => "slang",
            Tone::Professional => "professional",
            Tone::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "formal" => Ok(Tone::Formal),
            "casual" => Ok(Tone::Casual),
            "slang" => Ok(Tone::Slang),
            "professional" => Ok(Tone::Professional),
            "neutral" => Ok(Tone::Neutral),
            other => Err(format!("unknown tone: {}", other)),
        }
    }
}

/// Keyword list and pattern list for one category
pub struct ToneProfile {
    pub tone: Tone,
    keywords: Regex,
    patterns: Vec<Regex>,
}

impl ToneProfile {
    fn build(tone: Tone, keywords: &[&str], patterns: &[&str]) -> Self {
        let alternation = keywords
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");
        Self {
            tone,
            keywords: compile(&format!(r"(?i)\b(?:{})\b", alternation)),
            patterns: patterns.iter().map(|p| compile(p)).collect(),
        }
    }

    pub fn keyword_hits(&self, text: &str) -> u32 {
        self.keywords.find_iter(text).count() as u32
    }

    pub fn pattern_matches(&self, text: &str) -> u32 {
        self.patterns
            .iter()
            .map(|p| p.find_iter(text).count() as u32)
            .sum()
    }

    /// `keyword hits × 2 + pattern matches × 5`
    pub fn score(&self, text: &str) -> u32 {
        self.keyword_hits(text) * KEYWORD_WEIGHT + self.pattern_matches(text) * PATTERN_WEIGHT
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid tone pattern {:?}: {}", pattern, e))
}

pub static PROFILES: Lazy<Vec<ToneProfile>> = Lazy::new(|| {
    vec![
        ToneProfile::build(
            Tone::Formal,
            &[
                "حضرتك", "سيادتك", "برجاء", "يرجى", "نرجو", "تفضل", "تفضلوا", "شكرا جزيلا",
                "please", "kindly", "regards", "sincerely", "sir", "madam", "dear",
                "appreciate",
            ],
            &[
                r"(?i)\b(?:could|would) you\b",
                r"(?i)\bi would like\b",
                r"(?i)\bgood (?:morning|afternoon|evening)\b",
                r"\b(?:السلام عليكم|صباح الخير|مساء الخير)\b",
                r"\bلو سمحت(?:ي)?\b",
            ],
        ),
        ToneProfile::build(
            Tone::Casual,
            &[
                "ازيك", "ازيكم", "عايز", "عاوز", "عايزة", "ايه", "كده", "دلوقتي", "تمام",
                "اوكي", "ماشي", "hey", "hi", "thanks", "ok", "okay", "yeah", "yep", "gonna",
                "wanna", "cool",
            ],
            &[
                r"\b(?:ازيك|ازيكم|عامل ايه|اخبارك ايه)\b",
                r"\b(?:عايز|عاوز|عايزة)\s+\w+",
                r"(?i)\b(?:hey|hi) there\b",
                r"[!?]{2,}",
            ],
        ),
        ToneProfile::build(
            Tone::Slang,
            &[
                "معلم", "يسطا", "اسطى", "باشا", "برنس", "جامد", "فشخ", "اشطة", "بيئة", "bro",
                "dude", "lol", "lmao", "lit", "yo", "bruh", "sus",
            ],
            &[
                r"\bيا\s+(?:معلم|باشا|برنس|كبير|عم|اسطى|ريس)\b",
                r"(?i)\b(?:omg|wtf|af)\b",
                r"(?:ه{3,}|😂|🔥)",
            ],
        ),
        ToneProfile::build(
            Tone::Professional,
            &[
                "فاتورة", "الفاتورة", "عرض سعر", "توريد", "بالجملة", "عقد", "ضريبة",
                "invoice", "quotation", "purchase order", "wholesale", "bulk", "sku", "vat",
                "contract", "tracking number",
            ],
            &[
                r"(?i)\b(?:po|order|invoice|ref)\s*(?:#|no\.?|number)\s*\w+",
                r"(?i)\b\d+\s*(?:units|pcs|pieces|cartons)\b",
                r"\b\d+\s*(?:قطعة|كرتونة)\b",
            ],
        ),
    ]
});

pub fn profile(tone: Tone) -> Option<&'static ToneProfile> {
    PROFILES.iter().find(|p| p.tone == tone)
}
