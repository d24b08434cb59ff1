use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for ISO language code handling
///
/// This module provides functions for validating and normalizing ISO 639-1
/// (2-letter) and ISO 639-2 (3-letter) codes, and for mapping them to the
/// codes the DeepL API expects.
/// Language code type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-2/T (3-letter) code
    Part2T,
    /// ISO 639-2/B (3-letter) code
    Part2B,
}

/// ISO 639-2/B codes that differ from their 639-2/T form
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

fn bibliographic_to_terminology(code: &str) -> Option<&'static str> {
    BIBLIOGRAPHIC_CODES
        .iter()
        .find(|(b, _)| *b == code)
        .map(|(_, t)| *t)
}

fn lookup(code: &str) -> Option<Language> {
    let normalized = code.trim().to_lowercase();
    match normalized.len() {
        2 => Language::from_639_1(&normalized),
        3 => Language::from_639_3(bibliographic_to_terminology(&normalized).unwrap_or(&normalized)),
        _ => None,
    }
}

/// Validate if a language code is a valid ISO 639-1 or ISO 639-2 code
pub fn validate_language_code(code: &str) -> Result<LanguageCodeType> {
    let normalized_code = code.trim().to_lowercase();

    if normalized_code.len() == 2 && Language::from_639_1(&normalized_code).is_some() {
        return Ok(LanguageCodeType::Part1);
    }
    if normalized_code.len() == 3 {
        if Language::from_639_3(&normalized_code).is_some() {
            return Ok(LanguageCodeType::Part2T);
        }
        if bibliographic_to_terminology(&normalized_code).is_some() {
            return Ok(LanguageCodeType::Part2B);
        }
    }

    Err(anyhow!("Invalid language code: {}", code))
}

/// Normalize a language code to ISO 639-1 (2-letter) format if possible
/// Falls back to ISO 639-2/T if no ISO 639-1 code exists
pub fn normalize_to_part1_or_part2t(code: &str) -> Result<String> {
    let lang = lookup(code).ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))?;
    Ok(lang
        .to_639_1()
        .map(str::to_string)
        .unwrap_or_else(|| lang.to_639_3().to_string()))
}

/// Check if two language codes match (represent the same language)
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (lookup(code1), lookup(code2)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Get the language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let lang = lookup(code).ok_or_else(|| anyhow!("Failed to get language from code: {}", code))?;
    Ok(lang.to_name().to_string())
}

/// Code DeepL expects for `code`.
///
/// Targets that DeepL only accepts with a regional variant get a default one;
/// an explicit variant (`pt-br`) is passed through uppercased.
pub fn deepl_language_code(code: &str, as_target: bool) -> Result<String> {
    let trimmed = code.trim();
    if let Some((base, region)) = trimmed.split_once(['-', '_']) {
        lookup(base).ok_or_else(|| anyhow!("Invalid language code: {}", code))?;
        if !as_target {
            return Ok(base.to_uppercase());
        }
        return Ok(format!("{}-{}", base.to_uppercase(), region.to_uppercase()));
    }

    let part1 = normalize_to_part1_or_part2t(trimmed)?;
    if part1.len() != 2 {
        return Err(anyhow!("Language has no two-letter code usable with DeepL: {}", code));
    }
    let upper = part1.to_uppercase();
    if as_target {
        match upper.as_str() {
            "EN" => return Ok("EN-US".to_string()),
            "PT" => return Ok("PT-PT".to_string()),
            _ => {}
        }
    }
    Ok(upper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validateLanguageCode_shouldClassifyCodes() {
        assert_eq!(validate_language_code("sv").unwrap(), LanguageCodeType::Part1);
        assert_eq!(validate_language_code("swe").unwrap(), LanguageCodeType::Part2T);
        assert_eq!(validate_language_code("ger").unwrap(), LanguageCodeType::Part2B);
        assert!(validate_language_code("xx").is_err());
        assert!(validate_language_code("english").is_err());
    }

    #[test]
    fn test_normalize_shouldPreferTwoLetterCodes() {
        assert_eq!(normalize_to_part1_or_part2t("SWE").unwrap(), "sv");
        assert_eq!(normalize_to_part1_or_part2t("fre").unwrap(), "fr");
        assert_eq!(normalize_to_part1_or_part2t(" en ").unwrap(), "en");
    }

    #[test]
    fn test_languageCodesMatch_shouldCompareAcrossForms() {
        assert!(language_codes_match("de", "ger"));
        assert!(language_codes_match("sv", "swe"));
        assert!(!language_codes_match("sv", "nb"));
        assert!(!language_codes_match("sv", "zz"));
    }

    #[test]
    fn test_getLanguageName_shouldReturnEnglishName() {
        assert_eq!(get_language_name("sv").unwrap(), "Swedish");
    }

    #[test]
    fn test_deeplLanguageCode_shouldMapTargetsWithVariants() {
        assert_eq!(deepl_language_code("en", false).unwrap(), "EN");
        assert_eq!(deepl_language_code("en", true).unwrap(), "EN-US");
        assert_eq!(deepl_language_code("sv", true).unwrap(), "SV");
        assert_eq!(deepl_language_code("pt-br", true).unwrap(), "PT-BR");
        assert_eq!(deepl_language_code("pt-br", false).unwrap(), "PT");
        assert_eq!(deepl_language_code("swe", true).unwrap(), "SV");
        assert!(deepl_language_code("zz", true).is_err());
    }
}
