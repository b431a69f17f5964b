//! Integration tests for the chatterbox client.
//! These tests drive the real HTTP client against a scripted local server.

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use chatterbox::config::DEFAULT_APOLOGY;
    use chatterbox::{ChatClient, ChatConfig, Conversation, SendOutcome, Turn};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;
    use tokio::time::{sleep, timeout};

    const STREAM_PATH: &str = "/chat-stream";
    const ONESHOT_PATH: &str = "/chat";

    #[derive(Clone)]
    struct ResponseChunk {
        delay_ms: u64,
        bytes: Vec<u8>,
    }

    #[derive(Clone)]
    enum ScriptedResponse {
        Respond {
            status: u16,
            content_type: &'static str,
            chunks: Vec<ResponseChunk>,
        },
        NoContent,
        Reset,
    }

    #[derive(Default)]
    struct ServerState {
        scripts: HashMap<String, VecDeque<ScriptedResponse>>,
        requests: Vec<(String, serde_json::Value)>,
    }

    struct ScriptedServer {
        base_url: String,
        state: Arc<Mutex<ServerState>>,
        handle: JoinHandle<()>,
    }

    impl ScriptedServer {
        async fn new(scripts: Vec<(&str, ScriptedResponse)>) -> Self {
            let mut state = ServerState::default();
            for (path, response) in scripts {
                state
                    .scripts
                    .entry(path.to_string())
                    .or_default()
                    .push_back(response);
            }
            let state = Arc::new(Mutex::new(state));
            let listener = TcpListener::bind("127.0.0.1:0")
                .await
                .expect("local TCP listener should bind");
            let addr = listener
                .local_addr()
                .expect("resolved local listener address");
            let base_url = format!("http://{addr}");

            let handle = tokio::spawn({
                let state = Arc::clone(&state);
                async move {
                    loop {
                        let (socket, _) = match listener.accept().await {
                            Ok(pair) => pair,
                            Err(_) => break,
                        };
                        let state = Arc::clone(&state);
                        tokio::spawn(async move {
                            serve_one(socket, state).await;
                        });
                    }
                }
            });

            Self {
                base_url,
                state,
                handle,
            }
        }

        fn conversation(&self) -> Conversation {
            let client = ChatClient::with_options(
                Some(self.base_url.clone()),
                Some(Duration::from_secs(5)),
                Some(Duration::from_secs(5)),
            )
            .expect("client");
            Conversation::new(Arc::new(client), ChatConfig::new())
        }

        fn requests_to(&self, path: &str) -> Vec<serde_json::Value> {
            self.state
                .lock()
                .unwrap()
                .requests
                .iter()
                .filter(|(p, _)| p == path)
                .map(|(_, body)| body.clone())
                .collect()
        }

        fn shutdown(&self) {
            self.handle.abort();
        }
    }

    fn text_stream(chunks: &[&[u8]]) -> ScriptedResponse {
        ScriptedResponse::Respond {
            status: 200,
            content_type: "text/plain; charset=utf-8",
            chunks: chunks
                .iter()
                .map(|bytes| ResponseChunk {
                    delay_ms: 0,
                    bytes: bytes.to_vec(),
                })
                .collect(),
        }
    }

    fn response_json(status: u16, body: &str) -> ScriptedResponse {
        ScriptedResponse::Respond {
            status,
            content_type: "application/json",
            chunks: vec![ResponseChunk {
                delay_ms: 0,
                bytes: body.as_bytes().to_vec(),
            }],
        }
    }

    fn last_turn(conversation: &Conversation) -> Turn {
        conversation
            .active()
            .and_then(|s| s.last_turn().cloned())
            .expect("active session has turns")
    }

    #[tokio::test]
    async fn stream_integration_successful_completion() {
        let thai = "สวัสดีครับ".as_bytes();
        let server = ScriptedServer::new(vec![(
            STREAM_PATH,
            text_stream(&[b"Hello ", &thai[..4], &thai[4..11], &thai[11..]]),
        )])
        .await;
        let conversation = server.conversation();

        let outcome = conversation.submit("greet me in Thai").await;
        assert_eq!(outcome, SendOutcome::Completed);
        let turn = last_turn(&conversation);
        assert_eq!(turn.text, "Hello สวัสดีครับ");
        assert!(!turn.is_pending());

        let bodies = server.requests_to(STREAM_PATH);
        assert_eq!(bodies.len(), 1);
        assert_eq!(
            bodies[0],
            serde_json::json!({
                "question": "greet me in Thai",
                "history": [
                    {"sender": "bot", "text": "Hello! How can I help you today?"},
                    {"sender": "user", "text": "greet me in Thai"},
                ],
            })
        );
        assert!(server.requests_to(ONESHOT_PATH).is_empty());
        server.shutdown();
    }

    #[tokio::test]
    async fn stream_error_status_falls_back_once() {
        let server = ScriptedServer::new(vec![
            (STREAM_PATH, response_json(500, r#"{"detail":"boom"}"#)),
            (ONESHOT_PATH, response_json(200, r#"{"response":"from fallback"}"#)),
        ])
        .await;
        let conversation = server.conversation();

        let outcome = conversation.submit("hello").await;
        assert_eq!(outcome, SendOutcome::FallbackCompleted);
        assert_eq!(last_turn(&conversation).text, "from fallback");

        let stream_bodies = server.requests_to(STREAM_PATH);
        let oneshot_bodies = server.requests_to(ONESHOT_PATH);
        assert_eq!(oneshot_bodies.len(), 1);
        assert_eq!(stream_bodies, oneshot_bodies);
        server.shutdown();
    }

    #[tokio::test]
    async fn missing_body_falls_back() {
        let server = ScriptedServer::new(vec![
            (STREAM_PATH, ScriptedResponse::NoContent),
            (ONESHOT_PATH, response_json(200, r#"{"response":"plain reply"}"#)),
        ])
        .await;
        let conversation = server.conversation();

        assert_eq!(
            conversation.submit("hello").await,
            SendOutcome::FallbackCompleted
        );
        assert_eq!(last_turn(&conversation).text, "plain reply");
        server.shutdown();
    }

    #[tokio::test]
    async fn dropped_connection_falls_back() {
        let server = ScriptedServer::new(vec![
            (STREAM_PATH, ScriptedResponse::Reset),
            (ONESHOT_PATH, response_json(200, r#"{"response":"recovered"}"#)),
        ])
        .await;
        let conversation = server.conversation();

        assert_eq!(
            conversation.submit("hello").await,
            SendOutcome::FallbackCompleted
        );
        assert_eq!(last_turn(&conversation).text, "recovered");
        server.shutdown();
    }

    #[tokio::test]
    async fn fallback_without_response_field_uses_placeholder() {
        let server = ScriptedServer::new(vec![
            (STREAM_PATH, response_json(502, "bad gateway")),
            (ONESHOT_PATH, response_json(200, r#"{"answer":"wrong field"}"#)),
        ])
        .await;
        let conversation = server.conversation();

        assert_eq!(
            conversation.submit("hello").await,
            SendOutcome::FallbackCompleted
        );
        assert_eq!(last_turn(&conversation).text, "…");
        server.shutdown();
    }

    #[tokio::test]
    async fn fallback_failure_writes_apology() {
        let server = ScriptedServer::new(vec![
            (STREAM_PATH, response_json(500, "stream down")),
            (ONESHOT_PATH, response_json(503, "everything down")),
        ])
        .await;
        let conversation = server.conversation();

        assert_eq!(
            conversation.submit("hello").await,
            SendOutcome::FallbackFailed
        );
        let turn = last_turn(&conversation);
        assert_eq!(turn.text, DEFAULT_APOLOGY);
        assert!(!turn.is_pending());
        assert_eq!(server.requests_to(ONESHOT_PATH).len(), 1);
        server.shutdown();
    }

    #[tokio::test]
    async fn unreachable_service_writes_apology() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ChatClient::with_options(
            Some(format!("http://{addr}")),
            Some(Duration::from_secs(5)),
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        let conversation = Conversation::new(Arc::new(client), ChatConfig::new());
        assert_eq!(
            conversation.submit("anyone there?").await,
            SendOutcome::FallbackFailed
        );
        assert_eq!(last_turn(&conversation).text, DEFAULT_APOLOGY);
    }

    #[tokio::test]
    async fn cancel_mid_stream_keeps_partial_text() {
        let server = ScriptedServer::new(vec![(
            STREAM_PATH,
            ScriptedResponse::Respond {
                status: 200,
                content_type: "text/plain",
                chunks: vec![
                    ResponseChunk {
                        delay_ms: 0,
                        bytes: b"first ".to_vec(),
                    },
                    ResponseChunk {
                        delay_ms: 20,
                        bytes: b"second".to_vec(),
                    },
                    ResponseChunk {
                        delay_ms: 60_000,
                        bytes: b" never".to_vec(),
                    },
                ],
            },
        )])
        .await;
        let conversation = server.conversation();
        let task = {
            let conversation = conversation.clone();
            tokio::spawn(async move { conversation.submit("tell me more").await })
        };

        for _ in 0..500 {
            if last_turn(&conversation).text == "first second" {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(last_turn(&conversation).text, "first second");

        conversation.cancel_active();
        let outcome = timeout(Duration::from_secs(5), task)
            .await
            .expect("cancellation unblocks the read")
            .unwrap();
        assert_eq!(outcome, SendOutcome::Cancelled);

        let turn = last_turn(&conversation);
        assert_eq!(turn.text, "first second");
        assert!(!turn.is_pending());
        assert!(server.requests_to(ONESHOT_PATH).is_empty());
        assert!(!conversation.is_busy());
        server.shutdown();
    }

    async fn serve_one(mut socket: TcpStream, state: Arc<Mutex<ServerState>>) {
        let Ok(Some((path, body))) = read_request(&mut socket).await else {
            return;
        };

        let response = {
            let mut state = state.lock().unwrap();
            let body = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
            state.requests.push((path.clone(), body));
            state
                .scripts
                .get_mut(&path)
                .and_then(|queue| queue.pop_front())
                .unwrap_or_else(|| response_json(404, r#"{"detail":"unexpected request"}"#))
        };

        match response {
            ScriptedResponse::Reset => {}
            ScriptedResponse::NoContent => {
                let _ = socket
                    .write_all(b"HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n")
                    .await;
                let _ = socket.shutdown().await;
            }
            ScriptedResponse::Respond {
                status,
                content_type,
                chunks,
            } => {
                let headers = format!(
                    "HTTP/1.1 {status} {}\r\nContent-Type: {}\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
                    status_reason(status),
                    content_type,
                );

                if socket.write_all(headers.as_bytes()).await.is_err() {
                    return;
                }

                for chunk in chunks {
                    if chunk.delay_ms > 0 {
                        sleep(Duration::from_millis(chunk.delay_ms)).await;
                    }
                    let prefix = format!("{:X}\r\n", chunk.bytes.len());
                    if socket.write_all(prefix.as_bytes()).await.is_err() {
                        return;
                    }
                    if socket.write_all(&chunk.bytes).await.is_err() {
                        return;
                    }
                    if socket.write_all(b"\r\n").await.is_err() {
                        return;
                    }
                    if socket.flush().await.is_err() {
                        return;
                    }
                }

                let _ = socket.write_all(b"0\r\n\r\n").await;
                let _ = socket.shutdown().await;
            }
        }
    }

    /// Reads one request and returns its path and body.
    async fn read_request(socket: &mut TcpStream) -> std::io::Result<Option<(String, Vec<u8>)>> {
        let mut request = Vec::new();
        let mut buffer = [0_u8; 2048];

        let header_end = loop {
            let n = socket.read(&mut buffer).await?;
            if n == 0 {
                return Ok(None);
            }
            request.extend_from_slice(&buffer[..n]);
            if let Some(pos) = request.windows(4).position(|window| window == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&request[..header_end]).to_string();
        let mut lines = head.split("\r\n");
        let path = lines
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .unwrap_or("/")
            .to_string();
        let content_length = lines
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);

        let mut body = request[header_end..].to_vec();
        while body.len() < content_length {
            let n = socket.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&buffer[..n]);
        }
        Ok(Some((path, body)))
    }

    fn status_reason(status: u16) -> &'static str {
        match status {
            200 => "OK",
            404 => "Not Found",
            500 => "Internal Server Error",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            _ => "Unknown",
        }
    }
}
