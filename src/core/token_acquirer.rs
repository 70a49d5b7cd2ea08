//! 互動式 OAuth2 authorization-code 流程
//!
//! 每次取得 token 都會建立一個獨立的本機 callback listener，
//! 收到第一個 callback 或逾時後即關閉。

use crate::core::oauth::OAuthClient;
use crate::domain::model::Token;
use crate::domain::ports::CredentialSource;
use crate::utils::error::{NotifierError, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use url::Url;

pub const CALLBACK_PATH: &str = "/callback";
pub const DEFAULT_CALLBACK_ADDR: &str = "127.0.0.1:8085";
pub const DEFAULT_STATE_TOKEN: &str = "state-token";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

const SUCCESS_PAGE: &str =
    "<html><body>Authorization successful! You can close this window.</body></html>";
const DENIED_PAGE: &str =
    "<html><body>Authorization failed. Return to the terminal for details.</body></html>";
const EXCHANGE_FAILED_PAGE: &str =
    "<html><body>Authorization code could not be exchanged. Return to the terminal for details.</body></html>";
const ALREADY_HANDLED_PAGE: &str =
    "<html><body>This authorization request was already handled.</body></html>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionState {
    Idle,
    ListenerStarted,
    AwaitingCode,
    Exchanged,
    Failed,
}

impl AcquisitionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Exchanged | Self::Failed)
    }
}

#[derive(Debug, Clone)]
pub struct AcquirerSettings {
    pub callback_addr: SocketAddr,
    pub timeout: Duration,
    pub state_token: String,
}

impl Default for AcquirerSettings {
    fn default() -> Self {
        Self {
            callback_addr: SocketAddr::from(([127, 0, 0, 1], 8085)),
            timeout: DEFAULT_TIMEOUT,
            state_token: DEFAULT_STATE_TOKEN.to_string(),
        }
    }
}

impl AcquirerSettings {
    pub fn with_callback_addr(mut self, addr: SocketAddr) -> Self {
        self.callback_addr = addr;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug)]
struct StateTracker {
    transitions: Mutex<Vec<AcquisitionState>>,
}

impl StateTracker {
    fn new() -> Self {
        Self {
            transitions: Mutex::new(vec![AcquisitionState::Idle]),
        }
    }

    fn current(&self) -> AcquisitionState {
        let transitions = self.transitions.lock().unwrap_or_else(|e| e.into_inner());
        transitions
            .last()
            .copied()
            .unwrap_or(AcquisitionState::Idle)
    }

    fn history(&self) -> Vec<AcquisitionState> {
        self.transitions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn transition(&self, next: AcquisitionState) {
        let mut transitions = self.transitions.lock().unwrap_or_else(|e| e.into_inner());
        let previous = transitions.last().copied().unwrap_or(AcquisitionState::Idle);
        tracing::debug!("Authorization flow: {:?} -> {:?}", previous, next);
        transitions.push(next);
    }

    fn reset(&self) {
        let mut transitions = self.transitions.lock().unwrap_or_else(|e| e.into_inner());
        transitions.clear();
        transitions.push(AcquisitionState::Idle);
    }
}

enum CallbackEvent {
    Code {
        code: String,
        reply: oneshot::Sender<bool>,
    },
    Denied {
        reason: String,
    },
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

struct CallbackState {
    // 只接受第一個 callback
    sender: Mutex<Option<oneshot::Sender<CallbackEvent>>>,
    expected_state: String,
}

fn authorization_code(params: CallbackParams, expected_state: &str) -> std::result::Result<String, String> {
    if let Some(error) = params.error {
        return Err(format!("authorization server returned '{}'", error));
    }
    if params
        .state
        .as_deref()
        .is_some_and(|received| received != expected_state)
    {
        return Err("state parameter does not match".to_string());
    }
    params
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| "no authorization code provided".to_string())
}

async fn handle_callback(
    State(state): State<Arc<CallbackState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let sender = state
        .sender
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .take();
    let Some(sender) = sender else {
        tracing::warn!("Ignoring repeated OAuth callback");
        return (StatusCode::CONFLICT, Html(ALREADY_HANDLED_PAGE)).into_response();
    };

    let code = match authorization_code(params, &state.expected_state) {
        Ok(code) => code,
        Err(reason) => {
            tracing::warn!("OAuth callback rejected: {}", reason);
            let _ = sender.send(CallbackEvent::Denied { reason });
            return (StatusCode::BAD_REQUEST, Html(DENIED_PAGE)).into_response();
        }
    };

    tracing::info!("Received OAuth callback with an authorization code");
    let (reply, exchanged) = oneshot::channel();
    if sender.send(CallbackEvent::Code { code, reply }).is_err() {
        return (StatusCode::GONE, Html(EXCHANGE_FAILED_PAGE)).into_response();
    }

    match exchanged.await {
        Ok(true) => (StatusCode::OK, Html(SUCCESS_PAGE)).into_response(),
        _ => (StatusCode::BAD_GATEWAY, Html(EXCHANGE_FAILED_PAGE)).into_response(),
    }
}

/// 取得 token 的狀態機：Idle → ListenerStarted → AwaitingCode → Exchanged / Failed
pub struct TokenAcquirer {
    oauth: OAuthClient,
    settings: AcquirerSettings,
    tracker: Arc<StateTracker>,
}

impl TokenAcquirer {
    pub fn new(oauth: OAuthClient, settings: AcquirerSettings) -> Self {
        Self {
            oauth,
            settings,
            tracker: Arc::new(StateTracker::new()),
        }
    }

    pub fn settings(&self) -> &AcquirerSettings {
        &self.settings
    }

    pub fn state(&self) -> AcquisitionState {
        self.tracker.current()
    }

    pub fn transitions(&self) -> Vec<AcquisitionState> {
        self.tracker.history()
    }

    /// 開啟 callback listener 並產生授權網址
    pub async fn start(&self) -> Result<PendingAuthorization> {
        match self.state() {
            AcquisitionState::Idle => {}
            state if state.is_terminal() => self.tracker.reset(),
            _ => {
                return Err(NotifierError::config(
                    "an authorization flow is already in progress",
                ))
            }
        }

        let listener = TcpListener::bind(self.settings.callback_addr)
            .await
            .map_err(|e| {
                NotifierError::config(format!(
                    "unable to start OAuth callback listener on {}: {}",
                    self.settings.callback_addr, e
                ))
            })?;
        let local_addr = listener.local_addr()?;
        let redirect_uri = format!("http://localhost:{}{}", local_addr.port(), CALLBACK_PATH);
        let authorization_url = self
            .oauth
            .authorization_url(&redirect_uri, &self.settings.state_token)?;

        let (event_tx, event_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let callback_state = Arc::new(CallbackState {
            sender: Mutex::new(Some(event_tx)),
            expected_state: self.settings.state_token.clone(),
        });
        let app = Router::new()
            .route(CALLBACK_PATH, get(handle_callback))
            .with_state(callback_state);

        let server = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!("OAuth callback listener failed: {}", e);
            }
        });

        tracing::info!("Starting OAuth callback server on {}", local_addr);
        self.tracker.transition(AcquisitionState::ListenerStarted);
        tracing::info!("Generated OAuth URL: {}", authorization_url);

        Ok(PendingAuthorization {
            oauth: self.oauth.clone(),
            tracker: Arc::clone(&self.tracker),
            timeout: self.settings.timeout,
            local_addr,
            redirect_uri,
            authorization_url,
            events: event_rx,
            shutdown: Some(shutdown_tx),
            _server: server,
        })
    }

    /// 完整流程：開 listener、等待使用者授權、換取 token 並寫回來源
    pub async fn acquire(&self, source: &dyn CredentialSource) -> Result<Token> {
        let pending = self.start().await?;
        println!(
            "Go to the following URL in your browser to authorize: {}",
            pending.authorization_url()
        );

        let token = pending.wait().await?;
        if let Err(e) = source.save_token(&token).await {
            tracing::warn!(
                "New token could not be persisted to {}: {}",
                source.describe(),
                e
            );
        }
        Ok(token)
    }
}

/// 已開啟 listener、等待 callback 的授權流程
pub struct PendingAuthorization {
    oauth: OAuthClient,
    tracker: Arc<StateTracker>,
    timeout: Duration,
    local_addr: SocketAddr,
    redirect_uri: String,
    authorization_url: Url,
    events: oneshot::Receiver<CallbackEvent>,
    shutdown: Option<oneshot::Sender<()>>,
    _server: JoinHandle<()>,
}

impl PendingAuthorization {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn authorization_url(&self) -> &Url {
        &self.authorization_url
    }

    pub async fn wait(mut self) -> Result<Token> {
        self.tracker.transition(AcquisitionState::AwaitingCode);

        let outcome = tokio::time::timeout(self.timeout, &mut self.events).await;
        let result = match outcome {
            Err(_) => {
                tracing::error!("OAuth flow timed out after {:?}", self.timeout);
                Err(NotifierError::AuthorizationTimeoutError {
                    timeout: self.timeout,
                })
            }
            Ok(Err(_)) => Err(NotifierError::AuthorizationDeniedError {
                reason: "callback listener stopped before a code arrived".to_string(),
            }),
            Ok(Ok(CallbackEvent::Denied { reason })) => {
                Err(NotifierError::AuthorizationDeniedError { reason })
            }
            Ok(Ok(CallbackEvent::Code { code, reply })) => {
                let exchanged = self.oauth.exchange_code(&code, &self.redirect_uri).await;
                let _ = reply.send(exchanged.is_ok());
                exchanged
            }
        };

        match &result {
            Ok(_) => {
                tracing::info!("Token exchanged successfully");
                self.tracker.transition(AcquisitionState::Exchanged);
            }
            Err(e) => {
                tracing::error!("Error during OAuth flow: {}", e);
                self.tracker.transition(AcquisitionState::Failed);
            }
        }

        self.stop_listener();
        result
    }

    fn stop_listener(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

impl Drop for PendingAuthorization {
    fn drop(&mut self) {
        self.stop_listener();
        // 未完成就被丟棄 (例如外層 future 被取消)，讓下一次 start() 能重新開始
        if !self.tracker.current().is_terminal() {
            tracing::warn!("Authorization attempt abandoned before completion");
            self.tracker.transition(AcquisitionState::Failed);
        }
    }
}
