//! Production backend: reqwest against the chat service's REST surface.

use reqwest::StatusCode;

use spotline_core::{ChatUser, MessageId, Room, RoomId, RoomMode};
use spotline_proto::HistoryRecord;

use crate::backend::{Backend, BackendError};

/// REST backend rooted at one service base URL.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Backend with a fresh HTTP client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }
}

impl Backend for HttpBackend {
    fn current_user(
        &self,
    ) -> impl std::future::Future<Output = Result<ChatUser, BackendError>> + Send {
        async move {
            let response = self
                .client
                .get(self.url("/api/users/me"))
                .send()
                .await
                .map_err(BackendError::unavailable)?;
            classify(response)?
                .json::<ChatUser>()
                .await
                .map_err(BackendError::unavailable)
        }
    }

    fn fetch_room(
        &self,
        mode: RoomMode,
        room_id: RoomId,
    ) -> impl std::future::Future<Output = Result<Room, BackendError>> + Send {
        async move {
            let path = format!("/api/{}/rooms/{room_id}", scope(mode));
            let response = self
                .client
                .get(self.url(&path))
                .send()
                .await
                .map_err(BackendError::unavailable)?;
            classify(response)?
                .json::<Room>()
                .await
                .map_err(BackendError::unavailable)
        }
    }

    fn fetch_history(
        &self,
        mode: RoomMode,
        room_id: RoomId,
    ) -> impl std::future::Future<Output = Result<Vec<HistoryRecord>, BackendError>> + Send {
        async move {
            let path = format!("/api/{}/rooms/{room_id}/messages", scope(mode));
            let response = self
                .client
                .get(self.url(&path))
                .send()
                .await
                .map_err(BackendError::unavailable)?;
            classify(response)?
                .json::<Vec<HistoryRecord>>()
                .await
                .map_err(BackendError::unavailable)
        }
    }

    fn edit_message(
        &self,
        mode: RoomMode,
        room_id: RoomId,
        message_id: MessageId,
        content: String,
    ) -> impl std::future::Future<Output = Result<(), BackendError>> + Send {
        async move {
            let path = format!("/api/{}/rooms/{room_id}/messages/{message_id}", scope(mode));
            let response = self
                .client
                .put(self.url(&path))
                .json(&serde_json::json!({ "message": content }))
                .send()
                .await
                .map_err(BackendError::unavailable)?;
            classify(response).map(|_| ())
        }
    }

    fn delete_message(
        &self,
        mode: RoomMode,
        room_id: RoomId,
        message_id: MessageId,
    ) -> impl std::future::Future<Output = Result<(), BackendError>> + Send {
        async move {
            let path = format!("/api/{}/rooms/{room_id}/messages/{message_id}", scope(mode));
            let response = self
                .client
                .delete(self.url(&path))
                .send()
                .await
                .map_err(BackendError::unavailable)?;
            classify(response).map(|_| ())
        }
    }

    fn auto_delete_check(
        &self,
        room_id: RoomId,
    ) -> impl std::future::Future<Output = Result<(), BackendError>> + Send {
        async move {
            let path = format!("/api/chat/rooms/{room_id}/disposal-check");
            let response = self
                .client
                .post(self.url(&path))
                .send()
                .await
                .map_err(BackendError::unavailable)?;
            classify(response).map(|_| ())
        }
    }
}

fn scope(mode: RoomMode) -> &'static str {
    match mode {
        RoomMode::Direct => "chat",
        RoomMode::Group => "group-chat",
    }
}

fn classify(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    match response.status() {
        StatusCode::NOT_FOUND => Err(BackendError::NotFound),
        StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => Err(BackendError::Forbidden),
        status if status.is_success() => Ok(response),
        status => Err(BackendError::Unavailable {
            reason: format!("unexpected status {status}"),
        }),
    }
}
