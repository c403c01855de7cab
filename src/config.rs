use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Which hosted completion backend the service talks to. Picked once at
/// startup; there is no runtime capability probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    OpenAi,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    pub provider: ProviderKind,
    /// Empty means "not configured": analysis endpoints answer 503.
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub ai: AiConfig,
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "symptom-triage".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "symptom-triage-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };

        let provider = match std::env::var("AI_PROVIDER").as_deref() {
            Ok("openai") => ProviderKind::OpenAi,
            _ => ProviderKind::Gemini,
        };
        let ai = AiConfig {
            provider,
            api_key: std::env::var("AI_API_KEY")
                .or_else(|_| std::env::var("GEMINI_API_KEY"))
                .unwrap_or_default()
                .trim()
                .to_string(),
            model: std::env::var("AI_MODEL").unwrap_or_else(|_| match provider {
                ProviderKind::Gemini => "gemini-pro".into(),
                ProviderKind::OpenAi => "gpt-4o-mini".into(),
            }),
            base_url: std::env::var("AI_BASE_URL").unwrap_or_else(|_| match provider {
                ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta".into(),
                ProviderKind::OpenAi => "https://api.openai.com/v1".into(),
            }),
            timeout_secs: std::env::var("AI_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
        };

        let rate_limit = RateLimitConfig {
            max_requests: std::env::var("RATE_LIMIT_PER_MINUTE")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(10),
            window_secs: std::env::var("RATE_LIMIT_WINDOW_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60),
        };

        Ok(Self {
            database_url,
            jwt,
            ai,
            rate_limit,
        })
    }
}
