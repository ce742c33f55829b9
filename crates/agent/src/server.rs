// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local IPC server.
//!
//! Serves the `wayru-agent` RPC surface on a unix socket. Connections
//! are handled on spawned tasks so the scheduler loop never blocks on
//! socket I/O. A periodic health probe pings the socket and performs a
//! full reinit (rebind, fresh accept loop) when it stops answering.

use crate::access_token::SharedToken;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinHandle;
use wayru_core::{Clock, DeviceInfo, Registration, Scheduler, SystemClock};
use wayru_ipc::{
    read_message, write_message, AccessTokenReply, DeviceInfoReply, IpcClient, RegistrationReply,
    Request, Response, StatusReply, SERVICE_NAME,
};

pub struct IpcServer {
    socket_path: PathBuf,
    state: Arc<ServerState>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

struct ServerState {
    token: SharedToken,
    info: Arc<DeviceInfo>,
    registration: Arc<Registration>,
    clock: SystemClock,
}

impl IpcServer {
    pub fn new(
        socket_path: PathBuf,
        token: SharedToken,
        info: Arc<DeviceInfo>,
        registration: Arc<Registration>,
    ) -> Arc<Self> {
        Arc::new(Self {
            socket_path,
            state: Arc::new(ServerState { token, info, registration, clock: SystemClock }),
            accept_task: Mutex::new(None),
        })
    }

    /// Bind the socket and spawn the accept loop.
    pub fn start(self: &Arc<Self>) -> std::io::Result<()> {
        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Remove a stale socket from a previous run
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }
        let listener = UnixListener::bind(&self.socket_path)?;
        tracing::info!(path = %self.socket_path.display(), "IPC server listening");

        let state = Arc::clone(&self.state);
        let handle = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _)) => {
                        let state = Arc::clone(&state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, state).await {
                                tracing::debug!(error = %e, "IPC connection error");
                            }
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "IPC accept error"),
                }
            }
        });

        *self.accept_task.lock() = Some(handle);
        Ok(())
    }

    /// Full reinit: kill the accept loop, rebind, re-register.
    pub fn reinit(self: &Arc<Self>) -> std::io::Result<()> {
        tracing::warn!("IPC server unhealthy, reinitializing");
        if let Some(handle) = self.accept_task.lock().take() {
            handle.abort();
        }
        self.start()
    }

    pub fn stop(&self) {
        if let Some(handle) = self.accept_task.lock().take() {
            handle.abort();
        }
        let _ = std::fs::remove_file(&self.socket_path);
        tracing::info!("IPC server stopped");
    }

    pub fn socket_path(&self) -> &PathBuf {
        &self.socket_path
    }
}

async fn handle_connection(
    mut stream: UnixStream,
    state: Arc<ServerState>,
) -> Result<(), wayru_ipc::ProtocolError> {
    while let Some(request) = read_message::<_, Request>(&mut stream).await? {
        let response = respond(&state, request);
        write_message(&mut stream, &response).await?;
    }
    Ok(())
}

fn respond(state: &ServerState, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong,
        Request::GetAccessToken => {
            let token = state.token.lock();
            if token.token.is_empty() {
                return Response::Error { error: "access token not available".into(), code: -1 };
            }
            let valid = u8::from(token.is_valid(state.clock.epoch_secs()));
            Response::AccessToken(AccessTokenReply {
                token: token.token.clone(),
                issued_at: token.issued_at_seconds,
                expires_at: token.expires_at_seconds,
                valid,
            })
        }
        Request::GetDeviceInfo => Response::DeviceInfo(DeviceInfoReply::from(&*state.info)),
        Request::GetRegistration => Response::Registration(RegistrationReply {
            wayru_device_id: state.registration.wayru_device_id.clone(),
            access_key: state.registration.access_key.clone(),
        }),
        Request::GetStatus => {
            let token_available = !state.token.lock().token.is_empty();
            Response::Status(StatusReply {
                service: SERVICE_NAME.into(),
                running: 1,
                access_token_available: u8::from(token_available),
                device_info_available: 1,
                registration_available: 1,
            })
        }
    }
}

/// Periodic connection-health probe; a failed ping reinitializes the
/// server.
pub fn start_health_task(
    scheduler: &Scheduler,
    server: Arc<IpcServer>,
    interval: Duration,
) -> Option<wayru_core::TaskId> {
    scheduler.schedule_repeating(interval, interval, move || {
        let server = Arc::clone(&server);
        Box::pin(async move {
            let client = IpcClient::new(server.socket_path().clone());
            if !client.ping().await {
                if let Err(e) = server.reinit() {
                    tracing::error!(error = %e, "IPC server reinit failed");
                }
            }
        })
    })
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
