use std::sync::Arc;

use shared::models::{ChatMessage, ChatRequest, RetrievalResult, WeatherPayload, WeatherResponse};
use tracing::{info, warn};

use crate::cli::{ChatMode, CliOptions};
use crate::gateway::Gateway;

#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptEntry {
    User(String),
    Assistant(String),
    Rag {
        answer: String,
        sources: Vec<RetrievalResult>,
    },
    Weather(String),
    /// A failed gateway call, tagged with the mode that issued it.
    Failure { mode: ChatMode, text: String },
}

impl TranscriptEntry {
    /// The text revealed for a bot entry.
    pub fn text(&self) -> &str {
        match self {
            Self::User(text)
            | Self::Assistant(text)
            | Self::Weather(text)
            | Self::Failure { text, .. } => text,
            Self::Rag { answer, .. } => answer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSettings {
    pub mode: ChatMode,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl From<&CliOptions> for SessionSettings {
    fn from(options: &CliOptions) -> Self {
        Self {
            mode: options.mode,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        }
    }
}

/// One user's conversation with the gateway, kept for the process lifetime.
pub struct ChatSession {
    gateway: Arc<dyn Gateway>,
    settings: SessionSettings,
    transcript: Vec<TranscriptEntry>,
}

impl ChatSession {
    pub fn new(gateway: Arc<dyn Gateway>, settings: SessionSettings) -> Self {
        Self {
            gateway,
            settings,
            transcript: Vec::new(),
        }
    }

    pub fn mode(&self) -> ChatMode {
        self.settings.mode
    }

    pub fn set_mode(&mut self, mode: ChatMode) {
        self.settings.mode = mode;
    }

    pub fn set_temperature(&mut self, temperature: f64) {
        self.settings.temperature = temperature;
    }

    pub fn set_max_tokens(&mut self, max_tokens: u32) {
        self.settings.max_tokens = max_tokens;
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn clear(&mut self) {
        self.transcript.clear();
    }

    /// Records `input`, calls the gateway for the current mode, and records
    /// the reply. Gateway failures become `Failure` entries.
    pub async fn submit(&mut self, input: &str) -> TranscriptEntry {
        self.transcript.push(TranscriptEntry::User(input.to_string()));

        let mode = self.settings.mode;
        let reply = match mode {
            ChatMode::Chat => self.send_chat().await,
            ChatMode::Rag => self.send_rag(input).await,
            ChatMode::Weather => self.send_weather(input).await,
        };

        info!(
            mode = mode.as_str(),
            transcript_len = self.transcript.len() + 1,
            "gateway reply recorded"
        );
        self.transcript.push(reply.clone());
        reply
    }

    async fn send_chat(&self) -> TranscriptEntry {
        let request = ChatRequest {
            messages: format_messages_for_backend(&self.transcript),
            system: None,
            temperature: Some(self.settings.temperature),
            max_tokens: Some(self.settings.max_tokens),
        };

        match self.gateway.chat(request).await {
            Ok(response) => TranscriptEntry::Assistant(response.response),
            Err(err) => {
                warn!(error = %err, "chat call failed");
                TranscriptEntry::Failure {
                    mode: ChatMode::Chat,
                    text: err.describe(ChatMode::Chat.failure_kind()),
                }
            }
        }
    }

    async fn send_rag(&self, query: &str) -> TranscriptEntry {
        match self.gateway.rag_query(query).await {
            Ok(response) => TranscriptEntry::Rag {
                answer: response.answer,
                sources: response.sources,
            },
            Err(err) => {
                warn!(error = %err, "rag call failed");
                TranscriptEntry::Failure {
                    mode: ChatMode::Rag,
                    text: err.describe(ChatMode::Rag.failure_kind()),
                }
            }
        }
    }

    async fn send_weather(&self, location: &str) -> TranscriptEntry {
        match self.gateway.weather(location).await {
            Ok(response) => TranscriptEntry::Weather(weather_report(&response)),
            Err(err) => {
                warn!(error = %err, "weather call failed");
                TranscriptEntry::Failure {
                    mode: ChatMode::Weather,
                    text: err.describe(ChatMode::Weather.failure_kind()),
                }
            }
        }
    }
}

/// Maps the transcript to gateway chat messages. Text-valued bot entries are
/// sent as assistant turns. RAG answers and RAG failures are left out.
pub fn format_messages_for_backend(transcript: &[TranscriptEntry]) -> Vec<ChatMessage> {
    transcript
        .iter()
        .filter_map(|entry| match entry {
            TranscriptEntry::User(text) => Some(ChatMessage::user(text.clone())),
            TranscriptEntry::Rag { .. }
            | TranscriptEntry::Failure {
                mode: ChatMode::Rag,
                ..
            } => None,
            TranscriptEntry::Assistant(text)
            | TranscriptEntry::Weather(text)
            | TranscriptEntry::Failure { text, .. } => Some(ChatMessage::assistant(text.clone())),
        })
        .collect()
}

pub fn weather_report(response: &WeatherResponse) -> String {
    let location = &response.location;
    match &response.weather {
        WeatherPayload::Snapshot(snapshot) => format!(
            "Weather in {location}:\n\
             Temperature: {}°C\n\
             Description: {}\n\
             Humidity: {}%\n\
             Wind Speed: {} km/h",
            snapshot.temperature, snapshot.description, snapshot.humidity, snapshot.wind_speed
        ),
        WeatherPayload::Unavailable(message) => format!("Weather data for {location}: {message}"),
    }
}
