use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8000";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_REVEAL_DELAY_MS: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMode {
    Chat,
    Rag,
    Weather,
}

impl ChatMode {
    pub const ALL: [ChatMode; 3] = [Self::Chat, Self::Rag, Self::Weather];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Rag => "rag",
            Self::Weather => "weather",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Chat => "Direct Chat",
            Self::Rag => "Knowledge Base RAG",
            Self::Weather => "Weather",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Chat => "Chat directly with the model",
            Self::Rag => "Query the knowledge base with context-aware responses",
            Self::Weather => "Get current weather information for any location",
        }
    }

    /// Prefix naming the failing call in transcript failure entries.
    pub const fn failure_kind(self) -> &'static str {
        match self {
            Self::Chat => "",
            Self::Rag => "RAG",
            Self::Weather => "Weather",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CliOptions {
    pub gateway_url: String,
    pub mode: ChatMode,
    pub temperature: f64,
    pub max_tokens: u32,
    pub use_color: bool,
    pub reveal_delay: Duration,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("unknown argument: {0}")]
    UnknownArgument(String),
    #[error("missing value for argument: {0}")]
    MissingValue(String),
    #[error("invalid --mode value: {0} (expected chat, rag, or weather)")]
    InvalidMode(String),
    #[error("invalid --temperature value: {0} (expected a number between 0.0 and 1.0)")]
    InvalidTemperature(String),
    #[error("invalid --max-tokens value: {0} (expected a positive integer)")]
    InvalidMaxTokens(String),
    #[error("invalid --reveal-delay-ms value: {0}")]
    InvalidRevealDelay(String),
    #[error("help requested")]
    HelpRequested,
}

impl CliOptions {
    /// Parses process arguments (without the program name). `env_gateway_url`
    /// is the value of `CHAT_GATEWAY_URL`, overridden by `--gateway-url`.
    pub fn parse<I>(args: I, env_gateway_url: Option<String>) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut gateway_url = env_gateway_url
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string());
        let mut mode = ChatMode::Chat;
        let mut temperature = DEFAULT_TEMPERATURE;
        let mut max_tokens = DEFAULT_MAX_TOKENS;
        let mut use_color = true;
        let mut reveal_delay = Duration::from_millis(DEFAULT_REVEAL_DELAY_MS);

        let mut iter = args.into_iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--help" | "-h" => return Err(CliError::HelpRequested),
                "--gateway-url" => {
                    gateway_url = iter.next().ok_or(CliError::MissingValue(arg.clone()))?;
                }
                "--mode" => {
                    let value = iter.next().ok_or(CliError::MissingValue(arg.clone()))?;
                    mode = parse_mode(&value).ok_or(CliError::InvalidMode(value))?;
                }
                "--temperature" => {
                    let value = iter.next().ok_or(CliError::MissingValue(arg.clone()))?;
                    temperature =
                        parse_temperature(&value).ok_or(CliError::InvalidTemperature(value))?;
                }
                "--max-tokens" => {
                    let value = iter.next().ok_or(CliError::MissingValue(arg.clone()))?;
                    max_tokens =
                        parse_max_tokens(&value).ok_or(CliError::InvalidMaxTokens(value))?;
                }
                "--reveal-delay-ms" => {
                    let value = iter.next().ok_or(CliError::MissingValue(arg.clone()))?;
                    let millis = value
                        .trim()
                        .parse::<u64>()
                        .map_err(|_| CliError::InvalidRevealDelay(value.clone()))?;
                    reveal_delay = Duration::from_millis(millis);
                }
                "--no-color" => use_color = false,
                unknown => return Err(CliError::UnknownArgument(unknown.to_string())),
            }
        }

        Ok(Self {
            gateway_url,
            mode,
            temperature,
            max_tokens,
            use_color,
            reveal_delay,
        })
    }
}

pub fn parse_mode(value: &str) -> Option<ChatMode> {
    match value.trim().to_ascii_lowercase().as_str() {
        "chat" | "direct" => Some(ChatMode::Chat),
        "rag" | "kb" => Some(ChatMode::Rag),
        "weather" => Some(ChatMode::Weather),
        _ => None,
    }
}

pub fn parse_temperature(value: &str) -> Option<f64> {
    let parsed = value.trim().parse::<f64>().ok()?;
    (parsed.is_finite() && (0.0..=1.0).contains(&parsed)).then_some(parsed)
}

pub fn parse_max_tokens(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok().filter(|tokens| *tokens > 0)
}

pub fn usage_text() -> &'static str {
    r#"Usage: chat-client [OPTIONS]

Options:
  --gateway-url <url>       Gateway base URL (default http://localhost:8000, env CHAT_GATEWAY_URL)
  --mode <chat|rag|weather> Starting mode (default chat)
  --temperature <v>         Sampling temperature 0.0-1.0 for chat mode (default 0.7)
  --max-tokens <n>          Response token budget for chat mode (default 1024)
  --reveal-delay-ms <ms>    Delay between revealed words (default 50)
  --no-color                Disable colored output
  -h, --help                Show this help"#
}
