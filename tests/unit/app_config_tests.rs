/*!
 * Tests for loading and validating conf.json
 */

use anyhow::Result;
use docshield::app_config::{Config, LogLevel, TranslationProvider};
use docshield::shield::MissingPlaceholderPolicy;
use log::LevelFilter;

#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteLoadableDefault() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("conf.json");

    let created = Config::load_or_create(&path)?;
    let text = std::fs::read_to_string(&path)?;
    assert!(text.contains("\"provider\": \"deepl\""));
    assert!(text.contains("\"missing_placeholder_policy\": \"segment_end\""));

    let loaded = Config::load_or_create(&path)?;
    assert_eq!(loaded.source_language, created.source_language);
    assert_eq!(loaded.translation.provider, TranslationProvider::DeepL);
    Ok(())
}

#[test]
fn test_loadOrCreate_withInvalidJson_shouldFail() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("conf.json");
    std::fs::write(&path, "{ not json")?;
    assert!(Config::load_or_create(&path).is_err());
    Ok(())
}

#[test]
fn test_config_fromJson_shouldMapShieldOptions() -> Result<()> {
    let json = r#"{
        "source_language": "en",
        "target_language": "fr",
        "shield": {
            "missing_placeholder_policy": "sentence_boundary",
            "decode_html_entities": false
        },
        "translation": {
            "provider": "deepl",
            "available_providers": [
                { "type": "deepl", "api_key": "secret:fx", "formality": "less" }
            ],
            "common": { "retry_count": 5 }
        },
        "log_level": "debug"
    }"#;
    let config: Config = serde_json::from_str(json)?;
    config.validate_for_translation()?;

    let options = config.shield.restore_options();
    assert_eq!(options.missing_policy, MissingPlaceholderPolicy::SentenceBoundary);
    assert!(!options.decode_entities);
    assert!(options.fix_spacing);
    assert_eq!(config.translation.get_formality().as_deref(), Some("less"));
    assert_eq!(config.translation.common.retry_count, 5);
    assert_eq!(config.translation.common.retry_backoff_ms, 1000);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.log_level.to_level_filter(), LevelFilter::Debug);
    Ok(())
}

#[test]
fn test_validate_withUnknownFormality_shouldFail() {
    let mut config = Config::default();
    config.translation.available_providers[0].formality = Some("casual".to_string());
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withInvalidLanguage_shouldFail() {
    let mut config = Config::default();
    config.target_language = "zz".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_providerFromStr_shouldBeCaseInsensitive() {
    assert_eq!("DeepL".parse::<TranslationProvider>().ok(), Some(TranslationProvider::DeepL));
    assert!("openai".parse::<TranslationProvider>().is_err());
}
