//! `chatforge chat`: a line-based REPL against a running gateway.

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::terminal_output::{bot_prefix, note_error, note_info};

pub struct ChatClient {
    http: Client,
    base_url: String,
    user_id: String,
}

#[derive(Deserialize)]
struct ChatReply {
    response: String,
}

#[derive(Deserialize)]
struct ResetReply {
    message: String,
}

impl ChatClient {
    pub fn new(base_url: &str, user_id: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id: user_id.to_string(),
        }
    }

    pub async fn send(&self, message: &str) -> Result<String> {
        let body = json!({ "user_id": self.user_id, "message": message });
        let reply: ChatReply = self.post("/chat", body).await?;
        Ok(reply.response)
    }

    pub async fn reset(&self) -> Result<String> {
        let body = json!({ "user_id": self.user_id });
        let reply: ResetReply = self.post("/reset", body).await?;
        Ok(reply.message)
    }

    async fn post<T: serde::de::DeserializeOwned>(&self, path: &str, body: Value) -> Result<T> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Request to {path} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let detail: Value = response.json().await.unwrap_or(Value::Null);
            let error = detail["error"].as_str().unwrap_or("unknown error");
            bail!("{status}: {error}");
        }
        response
            .json()
            .await
            .with_context(|| format!("Unexpected response from {path}"))
    }
}

/// Read lines from stdin until EOF or `:quit`. `:reset` clears the conversation.
pub async fn run(base_url: &str, user_id: &str) -> Result<()> {
    let client = ChatClient::new(base_url, user_id);
    note_info(&format!(
        "Chatting as '{user_id}' with {base_url}. Type :reset to start over, :quit to leave."
    ));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let result = match line {
            "" => continue,
            ":quit" | ":exit" => break,
            ":reset" => client.reset().await,
            message => client.send(message).await,
        };
        match result {
            Ok(text) => println!("{} {text}", bot_prefix()),
            Err(e) => note_error(&format!("{e:#}")),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn send_posts_user_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(body_json(json!({ "user_id": "u1", "message": "hello" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "response": "hi there", "user_id": "u1" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = ChatClient::new(&server.uri(), "u1");
        assert_eq!(client.send("hello").await.unwrap(), "hi there");
    }

    #[tokio::test]
    async fn reset_returns_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/reset"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "Conversation history for u1 has been reset"
            })))
            .mount(&server)
            .await;

        let client = ChatClient::new(&server.uri(), "u1");
        let message = client.reset().await.unwrap();
        assert!(message.contains("has been reset"));
    }

    #[tokio::test]
    async fn server_error_surfaces_error_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "error": "Message is required" })),
            )
            .mount(&server)
            .await;

        let client = ChatClient::new(&server.uri(), "u1");
        let err = client.send("x").await.unwrap_err();
        assert!(err.to_string().contains("Message is required"));
    }
}
