mod config;
use config::AgentConfig;
use om1_core::{singleton, BackgroundManager, BackgroundRegistry};
use om1_speech::{register_backgrounds, ElevenLabsTtsProvider};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging / tracing
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,om1_core=info,om1_speech=info,tts_agent=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let cfg = AgentConfig::load();
    info!(target = "tts_agent", agent = %cfg.name, "Starting TTS agent: stdin → ElevenLabs TTS");

    let registry = BackgroundRegistry::new();
    register_backgrounds(&registry);

    let manager = BackgroundManager::new();
    for entry in &cfg.backgrounds {
        let background = registry.create(&entry.kind, entry.config.clone())?;
        if let Err(e) = manager.register(background).await {
            warn!(target = "tts_agent", kind = %entry.kind, error = %e, "Skipping background");
        }
    }

    let Some(tts) = singleton::get::<ElevenLabsTtsProvider>() else {
        warn!(target = "tts_agent", "No TTS background configured; nothing to speak with");
        manager.shutdown().await?;
        return Ok(());
    };

    tts.register_tts_state_callback(|state| {
        info!(target = "tts_agent", state = state.as_str(), "TTS state");
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!(target = "tts_agent", "Type a line and press Enter to speak it (Ctrl+D to quit)");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(text)) => {
                        if let Err(e) = tts.add_pending_message(&text) {
                            error!(target = "tts_agent", error = %e, "Failed to queue TTS message");
                        }
                    }
                    Ok(None) => {
                        // Let queued lines play out before closing the stream
                        while tts.pending_message_count() > 0 {
                            tokio::time::sleep(Duration::from_millis(100)).await;
                        }
                        break;
                    }
                    Err(e) => {
                        error!(target = "tts_agent", error = %e, "Failed to read stdin");
                        break;
                    }
                }
            }
            _ = signal::ctrl_c() => {
                info!(target = "tts_agent", "Shutting down...");
                break;
            }
        }
    }

    manager.shutdown().await?;
    Ok(())
}
