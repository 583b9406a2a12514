use crate::config::ClientSettings;
use crate::error::RpcError;
use crate::kv::server::KvServer;
use crate::kv::{GetArgs, GetReply, PutArgs, PutReply};
use crate::replicator::RequestId;
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait KvEndpoint: Send + Sync {
    async fn get(&self, args: &GetArgs) -> Result<GetReply, RpcError>;
    async fn put(&self, args: &PutArgs) -> Result<PutReply, RpcError>;
}

#[async_trait]
impl KvEndpoint for Arc<KvServer> {
    async fn get(&self, args: &GetArgs) -> Result<GetReply, RpcError> {
        if self.is_dead() {
            return Err(RpcError::Shutdown);
        }
        Ok(KvServer::get(self, args.clone()).await?)
    }

    async fn put(&self, args: &PutArgs) -> Result<PutReply, RpcError> {
        if self.is_dead() {
            return Err(RpcError::Shutdown);
        }
        Ok(KvServer::put(self, args.clone()).await?)
    }
}

#[derive(Clone)]
pub struct HttpKvEndpoint {
    addr: String,
    client: reqwest::Client,
}

impl HttpKvEndpoint {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            addr: addr.into(),
            client,
        })
    }

    async fn send<Req, Resp>(&self, path: &str, req: &Req) -> Result<Resp, RpcError>
    where
        Req: serde::Serialize + Sync,
        Resp: serde::de::DeserializeOwned,
    {
        let url = format!("http://{}{}", self.addr, path);
        let response = self.client.post(&url).json(req).send().await.map_err(|e| {
            if e.is_timeout() {
                RpcError::Timeout
            } else if e.is_connect() {
                RpcError::Unreachable(self.addr.clone())
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
impl KvEndpoint for HttpKvEndpoint {
    async fn get(&self, args: &GetArgs) -> Result<GetReply, RpcError> {
        self.send("/kv/get", args).await
    }

    async fn put(&self, args: &PutArgs) -> Result<PutReply, RpcError> {
        self.send("/kv/put", args).await
    }
}

enum Request {
    Get(GetArgs),
    Put(PutArgs),
}

pub struct Clerk<E: KvEndpoint> {
    servers: Vec<E>,
    retry_delay: Duration,
    request_timeout: Duration,
    done_id: RequestId,
}

impl<E: KvEndpoint> Clerk<E> {
    pub fn new(servers: Vec<E>, settings: &ClientSettings) -> anyhow::Result<Self> {
        anyhow::ensure!(!servers.is_empty(), "clerk needs at least one server");
        Ok(Self {
            servers,
            retry_delay: settings.retry_delay(),
            request_timeout: settings.request_timeout(),
            done_id: 0,
        })
    }

    pub async fn get(&mut self, key: &str) -> String {
        let args = GetArgs {
            key: key.to_string(),
            request_id: next_request_id(),
            done_id: self.done_id,
        };
        self.call(Request::Get(args)).await
    }

    pub async fn put(&mut self, key: &str, value: &str) -> String {
        self.put_ext(key, value, false).await
    }

    pub async fn put_hash(&mut self, key: &str, value: &str) -> String {
        self.put_ext(key, value, true).await
    }

    async fn put_ext(&mut self, key: &str, value: &str, hash: bool) -> String {
        let args = PutArgs {
            key: key.to_string(),
            value: value.to_string(),
            hash,
            request_id: next_request_id(),
            done_id: self.done_id,
        };
        self.call(Request::Put(args)).await
    }

    async fn call(&mut self, request: Request) -> String {
        let request_id = match &request {
            Request::Get(args) => args.request_id,
            Request::Put(args) => args.request_id,
        };

        loop {
            let index = rand::thread_rng().gen_range(0..self.servers.len());
            let server = &self.servers[index];
            let attempt = async {
                match &request {
                    Request::Get(args) => server.get(args).await.map(|r| r.value),
                    Request::Put(args) => server.put(args).await.map(|r| r.previous),
                }
            };
            // A replica stuck in a minority partition never answers.
            let result = tokio::time::timeout(self.request_timeout, attempt)
                .await
                .unwrap_or(Err(RpcError::Timeout));

            match result {
                Ok(output) => {
                    self.done_id = request_id;
                    return output;
                }
                Err(e) => {
                    debug!(server = index, request_id, error = %e, "request failed, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }
}

pub fn next_request_id() -> RequestId {
    rand::thread_rng().gen_range(1..(1u64 << 62))
}
