//! Ticker extraction from natural-language queries
//!
//! Only the *shape* of a symbol is checked here: an uppercase alphabetic run
//! of one to five letters that is not a common word. Whether the symbol is
//! actually listed is left to the agents.

use crate::models::TickerSet;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static SYMBOL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^[A-Z]{1,5}$").unwrap()
});

/// Uppercase words that look like tickers but almost never are in a query
pub const STOPLIST: &[&str] = &[
    // Articles, pronouns, conjunctions, prepositions
    "A", "I", "AN", "THE", "AND", "OR", "BUT", "NOR", "FOR", "OF", "TO", "IN", "ON", "AT", "BY",
    "UP", "OUT", "OFF", "WITH", "FROM", "INTO", "OVER", "VS", "VIA", "PER", "ME", "MY", "WE",
    "US", "OUR", "YOU", "HE", "SHE", "IT", "ITS", "THEY", "THEM", "THIS", "THAT", "THESE",
    // Verbs and question words
    "AM", "IS", "ARE", "WAS", "BE", "BEEN", "DO", "DOES", "DID", "HAS", "HAVE", "HAD", "CAN",
    "WILL", "MAY", "GET", "GOT", "SHOW", "TELL", "GIVE", "WHAT", "WHEN", "WHY", "HOW", "WHO",
    "WHICH", "WHERE", "IF", "SO", "NOT", "NO", "YES", "OK",
    // Adjectives and adverbs common in research prompts
    "ALL", "ANY", "BEST", "TOP", "NEW", "OLD", "BIG", "HIGH", "LOW", "MORE", "MOST", "LESS",
    "GOOD", "BAD", "NOW", "THEN", "THAN", "VERY", "JUST", "ALSO", "ONLY", "NEXT", "LAST",
    // Trading vocabulary
    "BUY", "SELL", "HOLD", "LONG", "SHORT", "CALL", "PUT", "RISK",
    // Finance and business acronyms
    "AI", "ML", "CEO", "CFO", "CTO", "COO", "IPO", "ETF", "SEC", "FED", "GDP", "CPI", "EPS",
    "PE", "ROI", "ROE", "ESG", "YTD", "YOY", "QOQ", "EOD", "ATH", "USD", "EUR", "USA", "UK",
    "EU", "API", "FAQ", "NYSE", "LLC", "INC", "LTD", "CORP", "TV", "PC", "EV", "AR", "VR",
];

/// Extracts candidate ticker symbols from free text
#[derive(Debug, Clone)]
pub struct TickerExtractor {
    stoplist: HashSet<String>,
}

impl Default for TickerExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TickerExtractor {
    /// Create an extractor with the built-in stoplist
    pub fn new() -> Self {
        Self {
            stoplist: STOPLIST.iter().map(|w| (*w).to_string()).collect(),
        }
    }

    /// Add an extra word that must never be treated as a ticker
    pub fn with_stopword(mut self, word: impl AsRef<str>) -> Self {
        self.stoplist.insert(word.as_ref().to_ascii_uppercase());
        self
    }

    /// Whether `word` is excluded regardless of its case
    pub fn is_stopword(&self, word: &str) -> bool {
        self.stoplist.contains(&word.to_ascii_uppercase())
    }

    /// Whether a single token has the shape of a ticker and is not stoplisted
    pub fn is_candidate(&self, token: &str) -> bool {
        SYMBOL_SHAPE.is_match(token) && !self.is_stopword(token)
    }

    /// Extract the set of candidate tickers from a query
    ///
    /// Tokens are split on every non-alphanumeric character, so `"NVDA,"`
    /// and `"AAPL's"` both yield their symbol. Lowercase words never match.
    /// An empty set is not an error at this layer.
    pub fn extract(&self, query: &str) -> TickerSet {
        let tickers: TickerSet = query
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| self.is_candidate(token))
            .map(str::to_string)
            .collect();

        tracing::debug!(?tickers, "Extracted tickers from query");
        tickers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> TickerSet {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_basic_extraction() {
        let extractor = TickerExtractor::new();
        assert_eq!(
            extractor.extract("Analyze AAPL and MSFT for growth potential"),
            set(&["AAPL", "MSFT"])
        );
    }

    #[test]
    fn test_ai_is_filtered() {
        let extractor = TickerExtractor::new();
        assert_eq!(
            extractor.extract("Compare NVDA, AMD, and TSM for AI datacenter demand"),
            set(&["NVDA", "AMD", "TSM"])
        );
    }

    #[test]
    fn test_no_tickers() {
        let extractor = TickerExtractor::new();
        assert!(extractor.extract("What is the market outlook?").is_empty());
        assert!(extractor.extract("").is_empty());
    }

    #[test]
    fn test_common_words_filtered() {
        let extractor = TickerExtractor::new();
        let tickers = extractor.extract("Analyze THE BEST stocks FOR investment");
        for word in ["THE", "BEST", "FOR"] {
            assert!(!tickers.contains(word), "{word} leaked into {tickers:?}");
        }
        assert!(tickers.is_empty());
    }

    #[test]
    fn test_shape_rules() {
        let extractor = TickerExtractor::new();
        // Too long, mixed case, digits
        assert!(extractor.extract("GOOGLE Apple Q3 BRK2").is_empty());
        // Punctuation boundaries and possessives
        assert_eq!(extractor.extract("(TSLA) AAPL's; F."), set(&["AAPL", "F", "TSLA"]));
    }

    #[test]
    fn test_duplicates_collapse() {
        let extractor = TickerExtractor::new();
        assert_eq!(extractor.extract("AMZN vs AMZN vs AMZN"), set(&["AMZN"]));
    }

    #[test]
    fn test_every_shaped_token_survives() {
        let extractor = TickerExtractor::new();
        let tokens = ["X", "GE", "IBM", "ASML", "GOOGL", "PLTR", "SNOW"];
        let query = tokens.join(" ");
        assert_eq!(extractor.extract(&query), set(&tokens));
    }

    #[test]
    fn test_stoplist_never_survives() {
        let extractor = TickerExtractor::new();
        let query = STOPLIST.join(" ");
        assert!(extractor.extract(&query).is_empty());
        assert!(extractor.is_stopword("ceo"));
    }

    #[test]
    fn test_extra_stopword() {
        let extractor = TickerExtractor::new().with_stopword("moat");
        assert!(extractor.extract("Does MSFT have a MOAT").eq(&set(&["MSFT"])));
    }
}
