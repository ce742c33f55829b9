// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client side of the agent IPC surface.

use crate::request::Request;
use crate::response::{AccessTokenReply, DeviceInfoReply, RegistrationReply, Response, StatusReply};
use crate::wire::{read_message, write_message, ProtocolError};
use std::path::PathBuf;
use tokio::net::UnixStream;

/// One connection per call; the agent serves each request and the stream
/// is dropped. Paths are cheap to clone around task contexts.
#[derive(Debug, Clone)]
pub struct IpcClient {
    socket_path: PathBuf,
}

impl IpcClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self { socket_path: socket_path.into() }
    }

    pub async fn call(&self, request: Request) -> Result<Response, ProtocolError> {
        let mut stream = UnixStream::connect(&self.socket_path).await?;
        write_message(&mut stream, &request).await?;
        match read_message(&mut stream).await? {
            Some(Response::Error { error, code }) => Err(ProtocolError::Remote { error, code }),
            Some(response) => Ok(response),
            None => Err(ProtocolError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed before response",
            ))),
        }
    }

    /// Connect probe; true when the agent answers a ping.
    pub async fn ping(&self) -> bool {
        matches!(self.call(Request::Ping).await, Ok(Response::Pong))
    }

    pub async fn get_access_token(&self) -> Result<AccessTokenReply, ProtocolError> {
        match self.call(Request::GetAccessToken).await? {
            Response::AccessToken(reply) => Ok(reply),
            _ => Err(ProtocolError::UnexpectedResponse),
        }
    }

    pub async fn get_device_info(&self) -> Result<DeviceInfoReply, ProtocolError> {
        match self.call(Request::GetDeviceInfo).await? {
            Response::DeviceInfo(reply) => Ok(reply),
            _ => Err(ProtocolError::UnexpectedResponse),
        }
    }

    pub async fn get_registration(&self) -> Result<RegistrationReply, ProtocolError> {
        match self.call(Request::GetRegistration).await? {
            Response::Registration(reply) => Ok(reply),
            _ => Err(ProtocolError::UnexpectedResponse),
        }
    }

    pub async fn get_status(&self) -> Result<StatusReply, ProtocolError> {
        match self.call(Request::GetStatus).await? {
            Response::Status(reply) => Ok(reply),
            _ => Err(ProtocolError::UnexpectedResponse),
        }
    }
}
