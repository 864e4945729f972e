//! One-route local server that receives the browser redirect after login.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};

use crate::error::CliError;

pub const CALLBACK_HOST: &str = "localhost";
pub const CALLBACK_PATH: &str = "/callback";
pub const SUCCESS_MESSAGE: &str = "Authentication successful. You can close this tab now.";

/// How long a finished login waits for the success page to be delivered
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

type CallbackSignal = Arc<Mutex<Option<oneshot::Sender<()>>>>;

pub struct CallbackListener {
    listener: TcpListener,
}

impl CallbackListener {
    /// Listen on the same host the redirect URI names; port 0 picks a free one.
    pub async fn bind(port: u16) -> Result<Self, CliError> {
        let listener = TcpListener::bind((CALLBACK_HOST, port))
            .await
            .map_err(|error| {
                CliError::Auth(format!(
                    "could not listen for the login callback on port {port}: {error}"
                ))
            })?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, CliError> {
        Ok(self.listener.local_addr()?)
    }

    /// Redirect URI to hand to Pocket, using the port actually bound.
    pub fn redirect_uri(&self) -> Result<String, CliError> {
        Ok(format!(
            "http://{CALLBACK_HOST}:{}{CALLBACK_PATH}",
            self.local_addr()?.port()
        ))
    }

    /// Serve until the browser hits the callback path or the timeout passes.
    ///
    /// Any other path (e.g. `/favicon.ico`) gets a 404.
    pub async fn wait_for_callback(self, timeout: Duration) -> Result<(), CliError> {
        let (callback_sender, callback_receiver) = oneshot::channel();
        let signal: CallbackSignal = Arc::new(Mutex::new(Some(callback_sender)));
        let router = Router::new()
            .route(CALLBACK_PATH, get(receive_callback))
            .route(&format!("{CALLBACK_PATH}/"), get(receive_callback))
            .with_state(signal);

        let (shutdown_sender, shutdown_receiver) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(self.listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_receiver.await;
                })
                .await
        });

        let outcome = tokio::time::timeout(timeout, callback_receiver).await;
        let _ = shutdown_sender.send(());
        if tokio::time::timeout(SHUTDOWN_GRACE, server).await.is_err() {
            tracing::debug!("Callback server did not stop in time");
        }

        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(CliError::Auth(
                "the login callback server stopped unexpectedly".to_string(),
            )),
            Err(_) => Err(CliError::Auth(format!(
                "timed out after {}s waiting for the browser authorization",
                timeout.as_secs()
            ))),
        }
    }
}

async fn receive_callback(State(signal): State<CallbackSignal>) -> &'static str {
    if let Some(sender) = signal.lock().await.take() {
        let _ = sender.send(());
        tracing::debug!("Received login callback");
    }
    SUCCESS_MESSAGE
}
