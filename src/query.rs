// src/query.rs
use std::fmt;
use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;
use tokio::net::UdpSocket;

use crate::models::server::{Player, StatusSnapshot};

#[derive(Debug)]
pub enum QueryError {
    QueryFailed(String),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueryFailed(reason) => write!(f, "query failed: {}", reason),
        }
    }
}

impl std::error::Error for QueryError {}

#[async_trait]
pub trait QueryClient: Send + Sync {
    async fn query(&self, host: &str, port: u16) -> Result<StatusSnapshot, QueryError>;
}

const PACKET_PREFIX: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];
const INFO_REQUEST: u8 = 0x54;
const INFO_RESPONSE: u8 = 0x49;
const PLAYER_REQUEST: u8 = 0x55;
const PLAYER_RESPONSE: u8 = 0x44;
const CHALLENGE_RESPONSE: u8 = 0x41;
const INFO_PAYLOAD: &[u8] = b"Source Engine Query\0";

// A2S over UDP: one INFO query for the name, one PLAYER query for the
// session durations. The server may answer either with a challenge number
// that has to be echoed back; that costs one extra round trip, never more.
pub struct A2sClient {
    timeout: Duration,
}

impl A2sClient {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn exchange(&self, socket: &UdpSocket, request: &[u8]) -> Result<Vec<u8>, QueryError> {
        socket
            .send(request)
            .await
            .map_err(|e| QueryError::QueryFailed(format!("send failed: {}", e)))?;

        let mut buffer = [0u8; 4096];
        let len = match tokio::time::timeout(self.timeout, socket.recv(&mut buffer)).await {
            Ok(Ok(len)) => len,
            Ok(Err(e)) => {
                return Err(QueryError::QueryFailed(format!("recv failed: {}", e)));
            }
            Err(_) => {
                return Err(QueryError::QueryFailed("timed out waiting for response".to_string()));
            }
        };
        Ok(buffer[..len].to_vec())
    }

    async fn query_info(&self, socket: &UdpSocket) -> Result<String, QueryError> {
        let mut response = self.exchange(socket, &build_info_request(None)).await?;
        if let Some(challenge) = extract_challenge(&response)? {
            response = self
                .exchange(socket, &build_info_request(Some(&challenge)))
                .await?;
        }
        let (header, payload) = split_packet(&response)?;
        if header != INFO_RESPONSE {
            return Err(QueryError::QueryFailed(format!(
                "unexpected info response header 0x{:02X}",
                header
            )));
        }
        parse_info(payload)
    }

    async fn query_players(&self, socket: &UdpSocket) -> Result<Vec<Player>, QueryError> {
        let mut response = self
            .exchange(socket, &build_player_request(&[0xFF, 0xFF, 0xFF, 0xFF]))
            .await?;
        if let Some(challenge) = extract_challenge(&response)? {
            response = self
                .exchange(socket, &build_player_request(&challenge))
                .await?;
        }
        let (header, payload) = split_packet(&response)?;
        if header != PLAYER_RESPONSE {
            return Err(QueryError::QueryFailed(format!(
                "unexpected player response header 0x{:02X}",
                header
            )));
        }
        parse_players(payload)
    }
}

impl Default for A2sClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryClient for A2sClient {
    async fn query(&self, host: &str, port: u16) -> Result<StatusSnapshot, QueryError> {
        let address = format!("{}:{}", host, port);
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| QueryError::QueryFailed(format!("could not bind udp socket: {}", e)))?;
        socket
            .connect(&address)
            .await
            .map_err(|e| QueryError::QueryFailed(format!("connect to {} failed: {}", address, e)))?;

        let server_name = self.query_info(&socket).await?;
        let players = self.query_players(&socket).await?;
        debug!(
            "queried {}: name={:?}, {} players",
            address,
            server_name,
            players.len()
        );
        Ok(StatusSnapshot::new(&server_name, players))
    }
}

fn build_info_request(challenge: Option<&[u8]>) -> Vec<u8> {
    let mut request = Vec::with_capacity(29);
    request.extend_from_slice(&PACKET_PREFIX);
    request.push(INFO_REQUEST);
    request.extend_from_slice(INFO_PAYLOAD);
    if let Some(challenge) = challenge {
        request.extend_from_slice(challenge);
    }
    request
}

fn build_player_request(challenge: &[u8]) -> Vec<u8> {
    let mut request = Vec::with_capacity(9);
    request.extend_from_slice(&PACKET_PREFIX);
    request.push(PLAYER_REQUEST);
    request.extend_from_slice(challenge);
    request
}

fn split_packet(data: &[u8]) -> Result<(u8, &[u8]), QueryError> {
    if data.len() < 5 || data[..4] != PACKET_PREFIX {
        return Err(QueryError::QueryFailed("malformed response packet".to_string()));
    }
    Ok((data[4], &data[5..]))
}

fn extract_challenge(response: &[u8]) -> Result<Option<Vec<u8>>, QueryError> {
    let (header, payload) = split_packet(response)?;
    if header != CHALLENGE_RESPONSE {
        return Ok(None);
    }
    if payload.len() < 4 {
        return Err(QueryError::QueryFailed("short challenge response".to_string()));
    }
    Ok(Some(payload[..4].to_vec()))
}

fn parse_info(payload: &[u8]) -> Result<String, QueryError> {
    let mut cursor = Cursor::new(payload);
    // protocol version byte, then the server name
    cursor
        .read_u8()
        .map_err(|_| QueryError::QueryFailed("truncated info response".to_string()))?;
    read_cstring(&mut cursor)
}

fn parse_players(payload: &[u8]) -> Result<Vec<Player>, QueryError> {
    let mut cursor = Cursor::new(payload);
    let count = cursor
        .read_u8()
        .map_err(|_| QueryError::QueryFailed("truncated player response".to_string()))?;

    let mut players = Vec::with_capacity(count as usize);
    for _ in 0..count {
        cursor
            .read_u8()
            .map_err(|_| QueryError::QueryFailed("truncated player entry".to_string()))?;
        let name = read_cstring(&mut cursor)?;
        cursor
            .read_i32::<LittleEndian>()
            .map_err(|_| QueryError::QueryFailed("truncated player entry".to_string()))?;
        let duration = cursor
            .read_f32::<LittleEndian>()
            .map_err(|_| QueryError::QueryFailed("truncated player entry".to_string()))?;
        players.push(Player {
            name,
            duration: duration.max(0.0) as u64,
        });
    }
    Ok(players)
}

fn read_cstring(cursor: &mut Cursor<&[u8]>) -> Result<String, QueryError> {
    let mut bytes = Vec::new();
    loop {
        let b = cursor
            .read_u8()
            .map_err(|_| QueryError::QueryFailed("unterminated string in response".to_string()))?;
        if b == 0 {
            break;
        }
        bytes.push(b);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
