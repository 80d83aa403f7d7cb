//! Tokenizer normalization and splitting.

use anyhow::Result;
use ironbow::tokenizer::{DEFAULT_SEPARATOR, Tokenizer, tokenize};
use regex::Regex;

#[test]
fn lowercases_and_strips_punctuation() {
    let t = Tokenizer::default();
    assert_eq!(
        t.tokens("This is the first document."),
        vec!["this", "is", "the", "first", "document"]
    );
    assert_eq!(
        t.tokens("Is this the first document?"),
        vec!["is", "this", "the", "first", "document"]
    );
}

#[test]
fn apostrophes_periods_and_slashes_split_words() {
    let t = Tokenizer::default();
    assert_eq!(t.tokens("don't"), vec!["don", "t"]);
    assert_eq!(t.tokens("it\u{2019}s"), vec!["it", "s"]);
    assert_eq!(t.tokens("and/or e.g"), vec!["and", "or", "e", "g"]);
}

#[test]
fn digits_and_symbols_are_dropped() {
    let t = Tokenizer::default();
    assert_eq!(t.tokens("r2d2 #hash 100%"), vec!["rd", "hash"]);
    assert!(t.tokens("1234 !!! ---").is_empty());
}

#[test]
fn never_yields_empty_tokens() {
    let t = Tokenizer::default();
    for text in ["", "   ", "\t\na  b\t", ". . .", "  leading", "trailing  "] {
        assert!(t.tokens(text).iter().all(|tok| !tok.is_empty()), "{text:?}");
    }
    assert_eq!(t.tokens("\t\na  b\t"), vec!["a", "b"]);
}

#[test]
fn raw_tokenize_may_contain_empty_fragments() -> Result<()> {
    let sep = Regex::new(DEFAULT_SEPARATOR)?;
    let raw = tokenize(" a b ", false, &sep);
    assert!(raw.iter().any(String::is_empty));
    assert_eq!(
        raw.into_iter().filter(|t| !t.is_empty()).collect::<Vec<_>>(),
        vec!["a", "b"]
    );
    Ok(())
}

#[test]
fn case_sensitive_mode_keeps_case() -> Result<()> {
    let t = Tokenizer::new(true, DEFAULT_SEPARATOR)?;
    assert_eq!(t.tokens("Hello hello"), vec!["Hello", "hello"]);
    assert_eq!(t.count(Some("Hello hello")).len(), 2);

    let folded = Tokenizer::default();
    assert_eq!(folded.count(Some("Hello hello")).get("hello"), Some(&2));
    Ok(())
}

#[test]
fn retokenizing_joined_tokens_is_stable() {
    let t = Tokenizer::default();
    for text in [
        "This document is the second document.",
        "Mixed CASE, digits 42 and s/l/a/s/h/e/s",
        "  l'été  à   Zürich's   ",
        "ünïcödé letters stay",
        "",
    ] {
        let tokens = t.tokens(text);
        assert_eq!(t.tokens(&tokens.join(" ")), tokens, "{text:?}");
    }
}

#[test]
fn non_ascii_letters_are_case_folded() {
    let t = Tokenizer::default();
    assert_eq!(t.tokens("Ünïcödé ünïcödé"), vec!["ünïcödé", "ünïcödé"]);
    assert_eq!(t.tokens("ΣΟΦΙΑ"), vec!["σοφια"]);
    // dotted capital I lowercases to i plus a combining dot; the mark is dropped
    assert_eq!(t.tokens("İstanbul"), vec!["istanbul"]);

    let sensitive = Tokenizer::new(true, r"\s+").unwrap();
    assert_eq!(sensitive.tokens("Ünïcödé"), vec!["Ünïcödé"]);
}

#[test]
fn letter_numerals_are_dropped() {
    let t = Tokenizer::default();
    assert_eq!(t.tokens("chapter Ⅻ begins"), vec!["chapter", "begins"]);
    assert_eq!(t.tokens("ⅫⅫ"), Vec::<String>::new());
}

#[test]
fn absent_cell_has_no_tokens() {
    let t = Tokenizer::default();
    assert!(t.cell_tokens(None).is_empty());
    assert!(t.count(None).is_empty());
    assert!(t.distinct(None).is_empty());
}

#[test]
fn distinct_keeps_first_occurrence_order() {
    let t = Tokenizer::default();
    assert_eq!(
        t.distinct(Some("This document is the second document.")),
        vec!["this", "document", "is", "the", "second"]
    );
    let counts = t.count(Some("This document is the second document."));
    assert_eq!(counts.get("document"), Some(&2));
    assert_eq!(counts.len(), 5);
}

#[test]
fn custom_separator() -> Result<()> {
    let t = Tokenizer::new(false, "[ ]+")?;
    assert_eq!(t.separator(), "[ ]+");
    assert_eq!(t.tokens("a  b c"), vec!["a", "b", "c"]);
    assert!(Tokenizer::new(false, "(").is_err());
    Ok(())
}
