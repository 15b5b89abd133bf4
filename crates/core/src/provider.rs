use serde::{Deserialize, Serialize};

use crate::error::{DashguardError, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenRouter,
    Gemini,
}

pub struct ProviderConfig {
    pub api_url: &'static str,
    pub model: &'static str,
    pub env_var: &'static str,
}

impl Provider {
    pub fn config(&self) -> ProviderConfig {
        match self {
            Provider::OpenRouter => ProviderConfig {
                api_url: "https://openrouter.ai/api/v1/chat/completions",
                model: "google/gemini-3-flash-preview",
                env_var: "OPENROUTER_API_KEY",
            },
            Provider::Gemini => ProviderConfig {
                api_url: "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions",
                model: "gemini-2.5-flash",
                env_var: "GEMINI_API_KEY",
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenRouter => "OpenRouter",
            Provider::Gemini => "Gemini",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Provider::OpenRouter => "openrouter",
            Provider::Gemini => "gemini",
        }
    }

    /// Validate that the API key is set for this provider
    pub fn validate_api_key(&self) -> Result<String> {
        let config = self.config();
        match std::env::var(config.env_var) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(DashguardError::MissingApiKey {
                env_var: config.env_var.to_string(),
            }),
        }
    }
}

/// Resolved endpoint, model and credentials for the oracle.
#[derive(Clone, Debug)]
pub struct OracleSettings {
    pub api_url: String,
    pub model: String,
    pub api_key: String,
}

impl OracleSettings {
    /// Resolve settings for `provider`, reading its API key from the environment.
    pub fn resolve(
        provider: Provider,
        api_url: Option<String>,
        model: Option<String>,
    ) -> Result<Self> {
        let api_key = provider.validate_api_key()?;
        Self::new(provider, api_key, api_url, model)
    }

    pub fn new(
        provider: Provider,
        api_key: String,
        api_url: Option<String>,
        model: Option<String>,
    ) -> Result<Self> {
        let config = provider.config();
        let settings = Self {
            api_url: api_url.unwrap_or_else(|| config.api_url.to_string()),
            model: model.unwrap_or_else(|| config.model.to_string()),
            api_key,
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        let url = self.api_url.trim();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(DashguardError::invalid_config(format!(
                "endpoint must be an http(s) URL, got '{}'",
                self.api_url
            )));
        }
        if self.model.trim().is_empty() {
            return Err(DashguardError::invalid_config("model name is empty"));
        }
        if self.api_key.trim().is_empty() {
            return Err(DashguardError::invalid_config("API key is empty"));
        }
        Ok(())
    }
}
