use async_trait::async_trait;
use sppg_application::TokenProvider;
use tokio::sync::RwLock;

/// Token provider holding one access token in memory.
#[derive(Debug, Default)]
pub struct StaticTokenProvider {
    token: RwLock<Option<String>>,
}

impl StaticTokenProvider {
    /// Creates a provider; blank tokens count as signed out.
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(normalize(token)),
        }
    }

    /// Replaces the held token.
    pub async fn set_token(&self, token: impl Into<String>) {
        *self.token.write().await = normalize(Some(token.into()));
    }

    /// Forgets the held token.
    pub async fn clear(&self) {
        *self.token.write().await = None;
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn get_token(&self) -> Option<String> {
        self.token.read().await.clone()
    }
}

fn normalize(token: Option<String>) -> Option<String> {
    token
        .map(|token| token.trim().to_owned())
        .filter(|token| !token.is_empty())
}
