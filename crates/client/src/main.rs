//! RandomTalk client - demo composition root.
//!
//! Connects to the chat server, asks for a chat session once the connection
//! opens and logs every notification until Ctrl-C.
//!
//! Usage: `randomtalk-client [nickname] [interests]`

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use randomtalk_client::websocket::{ChannelObserver, ClientConfig, TransportEvent};
use randomtalk_client::context::request_chat_session;
use randomtalk_client::AppContext;
use randomtalk_shared::CreateChatSessionPayload;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv_from_repo_root();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "randomtalk_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting RandomTalk client");

    let config = ClientConfig::from_env()?;
    let mut args = std::env::args().skip(1);
    let nickname = args.next().unwrap_or_else(|| "anonymous".into());
    let interests = args.next().unwrap_or_default();

    let (observer, mut events) = ChannelObserver::channel();
    let context = AppContext::mount(config, Vec::new(), Arc::new(observer));
    let dispatcher = context.dispatcher();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    TransportEvent::Opened => {
                        let payload = CreateChatSessionPayload::new(
                            nickname.clone(),
                            interests.clone(),
                            18,
                            "unspecified",
                        );
                        if let Err(e) = request_chat_session(dispatcher.as_ref(), payload).await {
                            tracing::error!(error = %e, "Failed to request a chat session");
                        }
                    }
                    TransportEvent::Notification(notification) => match notification.as_structured() {
                        Some(value) => tracing::info!(%value, "Notification received"),
                        None => tracing::info!(?notification, "Unstructured notification received"),
                    },
                    TransportEvent::Closed(event) => {
                        tracing::info!(code = event.code, state = ?context.connection_state(), "Disconnected");
                    }
                    TransportEvent::Error(error) => {
                        tracing::warn!(error = %error, "Transport error");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    context.unmount();
    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Local overrides first; dotenvy never overwrites a variable already set.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
