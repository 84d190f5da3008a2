//! Token estimation for budget planning
//!
//! The default estimator is a conservative heuristic: CJK, Kana and Hangul
//! characters cost 2.5 tokens each, every other word-like run costs 1.3 tokens,
//! and the total is rounded up. Weights are kept in tenths of a token so the
//! rounding is exact.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tiktoken_rs::{cl100k_base, CoreBPE};

static WORD_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("static regex"));

/// Token estimator trait for different tokenization strategies
pub trait TokenEstimator: Send + Sync {
    /// Estimate the number of tokens in the given text
    fn estimate(&self, text: &str) -> usize;

    /// Estimate tokens for multiple texts
    fn estimate_batch(&self, texts: &[&str]) -> Vec<usize> {
        texts.iter().map(|t| self.estimate(t)).collect()
    }
}

/// Returns true for characters in the CJK ideograph, Kana and Hangul blocks
pub fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30FF}'   // Hiragana, Katakana
        | '\u{3100}'..='\u{312F}' // Bopomofo
        | '\u{31F0}'..='\u{31FF}' // Katakana phonetic extensions
        | '\u{3400}'..='\u{4DBF}' // CJK extension A
        | '\u{4E00}'..='\u{9FFF}' // CJK unified ideographs
        | '\u{1100}'..='\u{11FF}' // Hangul jamo
        | '\u{3130}'..='\u{318F}' // Hangul compatibility jamo
        | '\u{AC00}'..='\u{D7AF}' // Hangul syllables
        | '\u{F900}'..='\u{FAFF}' // CJK compatibility ideographs
        | '\u{20000}'..='\u{2A6DF}'
    )
}

/// Character/word heuristic estimator (never underestimates by rounding)
#[derive(Debug, Clone, Copy)]
pub struct HeuristicEstimator {
    /// Tokens per CJK character, in tenths
    cjk_tenths: usize,
    /// Tokens per word-like run, in tenths
    word_tenths: usize,
}

impl HeuristicEstimator {
    pub fn new(cjk_tenths: usize, word_tenths: usize) -> Self {
        Self {
            cjk_tenths,
            word_tenths,
        }
    }

    /// Count CJK characters and the word-like runs left once they are removed
    pub fn counts(text: &str) -> (usize, usize) {
        let mut cjk = 0;
        let mut rest = String::with_capacity(text.len());
        for c in text.chars() {
            if is_cjk(c) {
                cjk += 1;
                rest.push(' ');
            } else {
                rest.push(c);
            }
        }
        let words = WORD_RUN.find_iter(&rest).count();
        (cjk, words)
    }
}

impl Default for HeuristicEstimator {
    fn default() -> Self {
        Self::new(25, 13)
    }
}

impl TokenEstimator for HeuristicEstimator {
    fn estimate(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        let (cjk, words) = Self::counts(text);
        let tenths = cjk * self.cjk_tenths + words * self.word_tenths;
        tenths.div_ceil(10)
    }
}

/// Tiktoken-based token estimator using cl100k_base
pub struct TiktokenEstimator {
    bpe: Arc<CoreBPE>,
}

impl TiktokenEstimator {
    /// Create a new tiktoken estimator with cl100k_base encoding
    pub fn new() -> Result<Self, anyhow::Error> {
        let bpe = cl100k_base()?;
        Ok(Self { bpe: Arc::new(bpe) })
    }
}

impl TokenEstimator for TiktokenEstimator {
    fn estimate(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}
