use crate::error::RpcError;
use crate::paxos::messages::*;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait PeerTransport<V: Value>: Send + Sync {
    async fn prepare(&self, to: PeerId, args: PrepareArgs) -> Result<PrepareReply<V>, RpcError>;
    async fn accept(&self, to: PeerId, args: AcceptArgs<V>) -> Result<AcceptReply, RpcError>;
    async fn decide(&self, to: PeerId, args: DecideArgs<V>) -> Result<DecideReply, RpcError>;
}

#[derive(Clone)]
pub struct HttpTransport {
    peers: Vec<String>,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(peers: Vec<String>, timeout: Duration) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { peers, client })
    }

    async fn send_rpc<Req, Resp>(&self, to: PeerId, path: &str, req: &Req) -> Result<Resp, RpcError>
    where
        Req: serde::Serialize + Sync,
        Resp: serde::de::DeserializeOwned,
    {
        let addr = self
            .peers
            .get(to)
            .ok_or_else(|| RpcError::Unreachable(format!("#{}", to)))?;
        let url = format!("http://{}/paxos/{}", addr, path);

        let response = self.client.post(&url).json(req).send().await.map_err(|e| {
            if e.is_timeout() {
                RpcError::Timeout
            } else if e.is_connect() {
                RpcError::Unreachable(addr.clone())
            } else {
                RpcError::Http(e)
            }
        })?;

        if !response.status().is_success() {
            return Err(RpcError::Status(response.status().as_u16()));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl<V: Value> PeerTransport<V> for HttpTransport {
    async fn prepare(&self, to: PeerId, args: PrepareArgs) -> Result<PrepareReply<V>, RpcError> {
        self.send_rpc(to, "prepare", &args).await
    }

    async fn accept(&self, to: PeerId, args: AcceptArgs<V>) -> Result<AcceptReply, RpcError> {
        self.send_rpc(to, "accept", &args).await
    }

    async fn decide(&self, to: PeerId, args: DecideArgs<V>) -> Result<DecideReply, RpcError> {
        self.send_rpc(to, "decide", &args).await
    }
}
