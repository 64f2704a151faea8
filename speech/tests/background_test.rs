/// Tests for the ElevenLabs TTS background and its registration
mod common;

use common::RecordingFactory;
use om1_core::{singleton, Background, BackgroundConfig, BackgroundManager, BackgroundRegistry};
use om1_speech::{
    register_backgrounds, ElevenLabsTts, ElevenLabsTtsConfig, ElevenLabsTtsProvider, TtsSettings,
    DEFAULT_MODEL_ID, DEFAULT_OUTPUT_FORMAT, DEFAULT_VOICE_ID, ELEVENLABS_TTS_BACKGROUND,
};
use std::sync::Arc;

fn config_from_toml(src: &str) -> ElevenLabsTtsConfig {
    BackgroundConfig::from_toml_str(src).unwrap().parse().unwrap()
}

#[test]
fn test_background_starts_once_and_configure_is_noop() {
    let factory = RecordingFactory::new();
    let settings = config_from_toml(
        r#"
        api_key = "om_key"
        elevenlabs_api_key = "el_key"
        "#,
    )
    .resolve();
    let provider = Arc::new(ElevenLabsTtsProvider::with_factory(
        settings.clone(),
        Arc::new(factory.clone()),
    ));

    let bg = ElevenLabsTts::with_provider(settings.clone(), Arc::clone(&provider)).unwrap();

    assert!(bg.provider().is_running());
    assert_eq!(factory.counters.opens(), 1);
    assert_eq!(factory.counters.closes(), 0);

    let opened = factory.counters.last_opened().unwrap();
    assert_eq!(opened.voice_id, DEFAULT_VOICE_ID);
    assert_eq!(opened.model_id, DEFAULT_MODEL_ID);
    assert_eq!(opened.output_format, DEFAULT_OUTPUT_FORMAT);
    assert_eq!(opened.api_key.as_deref(), Some("om_key"));
    assert_eq!(opened.provider_api_key.as_deref(), Some("el_key"));
}

#[test]
fn test_background_reconciles_existing_provider() {
    // A provider created earlier with other settings gets restarted once
    let factory = RecordingFactory::new();
    let provider = Arc::new(ElevenLabsTtsProvider::with_factory(
        TtsSettings::default().with_voice_id("stale_voice"),
        Arc::new(factory.clone()),
    ));

    let wanted = config_from_toml(r#"voice_id = "fresh_voice""#).resolve();
    ElevenLabsTts::with_provider(wanted.clone(), Arc::clone(&provider)).unwrap();

    assert_eq!(factory.counters.opens(), 2);
    assert_eq!(factory.counters.closes(), 1);
    assert_eq!(provider.settings(), wanted);
    assert_eq!(
        factory.counters.last_opened().unwrap().voice_id,
        "fresh_voice"
    );
}

#[test]
fn test_background_start_failure_propagates() {
    let provider = Arc::new(ElevenLabsTtsProvider::with_factory(
        TtsSettings::default(),
        Arc::new(RecordingFactory::failing()),
    ));
    assert!(ElevenLabsTts::with_provider(TtsSettings::default(), provider).is_err());
}

#[tokio::test]
async fn test_manager_shutdown_stops_provider() {
    let factory = RecordingFactory::new();
    let provider = Arc::new(ElevenLabsTtsProvider::with_factory(
        TtsSettings::default(),
        Arc::new(factory.clone()),
    ));
    let bg = ElevenLabsTts::with_provider(TtsSettings::default(), Arc::clone(&provider)).unwrap();

    let manager = BackgroundManager::new();
    manager.register(Box::new(bg)).await.unwrap();
    assert!(manager.check_health(ELEVENLABS_TTS_BACKGROUND).await.unwrap());

    manager.shutdown().await.unwrap();
    assert!(!provider.is_running());
    assert_eq!(factory.counters.closes(), 1);
    assert!(manager.is_empty());
}

#[tokio::test]
async fn test_second_background_on_shared_provider_is_rejected() {
    let factory = RecordingFactory::new();
    let provider = Arc::new(ElevenLabsTtsProvider::with_factory(
        TtsSettings::default(),
        Arc::new(factory.clone()),
    ));
    let manager = BackgroundManager::new();

    let first = ElevenLabsTts::with_provider(TtsSettings::default(), Arc::clone(&provider)).unwrap();
    manager.register(Box::new(first)).await.unwrap();

    let second = ElevenLabsTts::with_provider(
        TtsSettings::default().with_voice_id("v2"),
        Arc::clone(&provider),
    )
    .unwrap();
    assert!(manager.register(Box::new(second)).await.is_err());

    // The registered background still drives a live provider
    assert!(manager.check_health(ELEVENLABS_TTS_BACKGROUND).await.unwrap());
    assert!(provider.is_running());
    assert_eq!(provider.settings().voice_id, "v2");
    provider.add_pending_message("still speaking").unwrap();

    manager.shutdown().await.unwrap();
    assert!(!provider.is_running());
}

#[tokio::test]
async fn test_registry_builds_shared_provider() {
    singleton::reset();

    let registry = BackgroundRegistry::new();
    register_backgrounds(&registry);
    assert!(registry.contains(ELEVENLABS_TTS_BACKGROUND));

    let config = BackgroundConfig::new()
        .with("url", "http://127.0.0.1:9/tts")
        .with("voice_id", "registry_voice");
    let mut bg = registry
        .create(ELEVENLABS_TTS_BACKGROUND, config)
        .unwrap();
    assert_eq!(bg.name(), ELEVENLABS_TTS_BACKGROUND);
    assert!(bg.health().await.unwrap());

    let shared = singleton::get::<ElevenLabsTtsProvider>().expect("provider registered");
    assert!(shared.is_running());
    assert_eq!(shared.settings().voice_id, "registry_voice");

    // Same instance handed to later callers
    let again = ElevenLabsTtsProvider::shared(TtsSettings::default());
    assert!(Arc::ptr_eq(&shared, &again));
    assert_eq!(again.settings().voice_id, "registry_voice");

    bg.shutdown().await.unwrap();
    assert!(!shared.is_running());

    drop(shared);
    drop(again);
    singleton::reset();
}
