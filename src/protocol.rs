//! Typed request/response envelopes. One JSON encoding per message, one
//! message per WebSocket binary frame.

use crate::game::types::{GameConfig, GameSnapshot};
use crate::store::leaderboard::{LeaderboardEntry, WinRateEntry};
use crate::store::users::User;
use serde::{Deserialize, Serialize};

/// Everything a client can say. `action` selects the verb; the optional
/// fields only accompany specific verbs (credentials, feedback text, agent
/// mode for `auto`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientEnvelope {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerMessageKind {
    Config,
    State,
    Leaderboard,
    UpdateCounts,
    AuthSuccess,
    AuthError,
    Error,
    Pong,
}

/// Server-to-client envelope. Absent fields are omitted on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerEnvelope {
    #[serde(rename = "type")]
    pub kind: ServerMessageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<GameConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<GameSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leaderboard: Option<Vec<LeaderboardEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub win_rates: Option<Vec<WinRateEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_count: Option<usize>,
}

impl ServerEnvelope {
    fn new(kind: ServerMessageKind) -> Self {
        Self {
            kind,
            config: None,
            state: None,
            leaderboard: None,
            win_rates: None,
            user: None,
            error: None,
            success: None,
            session_count: None,
        }
    }

    pub fn config(config: GameConfig) -> Self {
        Self {
            config: Some(config),
            ..Self::new(ServerMessageKind::Config)
        }
    }

    pub fn state(state: GameSnapshot) -> Self {
        Self {
            state: Some(state),
            ..Self::new(ServerMessageKind::State)
        }
    }

    pub fn leaderboard(entries: Vec<LeaderboardEntry>, win_rates: Vec<WinRateEntry>) -> Self {
        Self {
            leaderboard: Some(entries),
            win_rates: Some(win_rates),
            ..Self::new(ServerMessageKind::Leaderboard)
        }
    }

    pub fn update_counts(count: usize) -> Self {
        Self {
            session_count: Some(count),
            ..Self::new(ServerMessageKind::UpdateCounts)
        }
    }

    pub fn auth_success(user: User) -> Self {
        Self {
            user: Some(user),
            ..Self::new(ServerMessageKind::AuthSuccess)
        }
    }

    pub fn auth_success_message(message: impl Into<String>) -> Self {
        Self {
            success: Some(message.into()),
            ..Self::new(ServerMessageKind::AuthSuccess)
        }
    }

    pub fn auth_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::new(ServerMessageKind::AuthError)
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::new(ServerMessageKind::Error)
        }
    }

    pub fn pong() -> Self {
        Self::new(ServerMessageKind::Pong)
    }

    /// Bare acknowledgement riding a state-typed envelope, matching the wire
    /// behavior older clients expect for feedback submissions.
    pub fn state_ack(message: impl Into<String>) -> Self {
        Self {
            success: Some(message.into()),
            ..Self::new(ServerMessageKind::State)
        }
    }

    pub fn with_user(mut self, user: Option<User>) -> Self {
        self.user = user;
        self
    }

    pub fn with_leaderboard(
        mut self,
        entries: Option<Vec<LeaderboardEntry>>,
        win_rates: Option<Vec<WinRateEntry>>,
    ) -> Self {
        self.leaderboard = entries;
        self.win_rates = win_rates;
        self
    }

    pub fn with_success(mut self, message: impl Into<String>) -> Self {
        self.success = Some(message.into());
        self
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Decodes one client frame. Malformed frames yield None and are dropped by
/// the caller without tearing the connection down.
pub fn decode_client_envelope(data: &[u8]) -> Option<ClientEnvelope> {
    serde_json::from_slice(data).ok()
}
