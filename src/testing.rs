//! In-memory wallet and gateway doubles for unit tests.

use crate::error::WaveError;
use crate::gateway::{Confirmation, LedgerGateway, Subscription, TransactionHandle, UnsubscribeHandle};
use crate::types::{Account, WaveRecord};
use crate::wallet::{SendOptions, WalletCapability};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use ethers::providers::{Http, Provider};
use ethers::types::{Address, TxHash};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};

pub fn account(n: u8) -> Account {
    Account(Address::repeat_byte(n))
}

pub fn wave(author: u8, timestamp: i64, message: &str) -> WaveRecord {
    let timestamp = Utc.timestamp_opt(timestamp, 0).single().unwrap();
    WaveRecord::new(account(author), timestamp, message)
}

// ==================== MockWallet ====================

pub struct MockWallet {
    authorized: Mutex<Result<Vec<Account>, WaveError>>,
    authorization: Mutex<Result<Vec<Account>, WaveError>>,
    list_calls: AtomicUsize,
    request_calls: AtomicUsize,
    send_calls: AtomicUsize,
}

impl MockWallet {
    fn new(authorized: Result<Vec<Account>, WaveError>, authorization: Result<Vec<Account>, WaveError>) -> Self {
        Self {
            authorized: Mutex::new(authorized),
            authorization: Mutex::new(authorization),
            list_calls: AtomicUsize::new(0),
            request_calls: AtomicUsize::new(0),
            send_calls: AtomicUsize::new(0),
        }
    }

    /// Already authorized for `accounts`; connecting returns them too.
    pub fn with_accounts(accounts: Vec<Account>) -> Self {
        Self::new(Ok(accounts.clone()), Ok(accounts))
    }

    /// No wallet endpoint at all.
    pub fn unavailable() -> Self {
        let err = WaveError::WalletUnavailable("no wallet endpoint".to_string());
        Self::new(Err(err.clone()), Err(err))
    }

    /// Nothing authorized yet and the user rejects every prompt.
    pub fn denying() -> Self {
        Self::new(Ok(Vec::new()), Err(WaveError::AuthorizationDenied))
    }

    pub fn set_authorization(&self, result: Result<Vec<Account>, WaveError>) {
        *self.authorization.lock().unwrap() = result;
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn request_calls(&self) -> usize {
        self.request_calls.load(Ordering::SeqCst)
    }

    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletCapability for MockWallet {
    async fn list_authorized_accounts(&self) -> Result<Vec<Account>, WaveError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.authorized.lock().unwrap().clone()
    }

    async fn request_authorization(&self) -> Result<Vec<Account>, WaveError> {
        self.request_calls.fetch_add(1, Ordering::SeqCst);
        let result = self.authorization.lock().unwrap().clone();
        if let Ok(accounts) = &result {
            *self.authorized.lock().unwrap() = Ok(accounts.clone());
        }
        result
    }

    async fn sign_and_send(
        &self,
        _from: Account,
        _contract: Address,
        _calldata: Vec<u8>,
        _options: SendOptions,
    ) -> Result<TxHash, WaveError> {
        let n = self.send_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TxHash::from_low_u64_be(n as u64))
    }
}

// ==================== MockGateway ====================

/// How handles returned by `MockGateway::submit_write` resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmMode {
    /// Confirm right away.
    Succeed,
    /// Wait for `MockGateway::confirm_next`.
    Manual,
    /// Never resolve.
    Hang,
}

pub struct MockGateway {
    history: Mutex<Result<Vec<WaveRecord>, WaveError>>,
    subscribe_error: Mutex<Option<WaveError>>,
    submit_error: Mutex<Option<WaveError>>,
    confirm_mode: ConfirmMode,
    senders: Mutex<Vec<mpsc::UnboundedSender<WaveRecord>>>,
    confirmations: Mutex<VecDeque<oneshot::Sender<Result<(), WaveError>>>>,
    submitted: Mutex<Vec<String>>,
    history_calls: AtomicUsize,
    subscribe_calls: AtomicUsize,
    unsubscribe_calls: Arc<AtomicUsize>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::with_history(Vec::new())
    }
}

impl MockGateway {
    pub fn with_history(history: Vec<WaveRecord>) -> Self {
        Self {
            history: Mutex::new(Ok(history)),
            subscribe_error: Mutex::new(None),
            submit_error: Mutex::new(None),
            confirm_mode: ConfirmMode::Succeed,
            senders: Mutex::new(Vec::new()),
            confirmations: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
            history_calls: AtomicUsize::new(0),
            subscribe_calls: AtomicUsize::new(0),
            unsubscribe_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn confirming(mut self, mode: ConfirmMode) -> Self {
        self.confirm_mode = mode;
        self
    }

    pub fn set_history(&self, history: Vec<WaveRecord>) {
        *self.history.lock().unwrap() = Ok(history);
    }

    pub fn fail_history(&self, err: WaveError) {
        *self.history.lock().unwrap() = Err(err);
    }

    pub fn fail_subscribe(&self, err: WaveError) {
        *self.subscribe_error.lock().unwrap() = Some(err);
    }

    pub fn fail_submit(&self, err: WaveError) {
        *self.submit_error.lock().unwrap() = Some(err);
    }

    /// Push a live record onto the most recent subscription.
    pub fn deliver(&self, record: WaveRecord) {
        if let Some(sender) = self.senders.lock().unwrap().last() {
            let _ = sender.send(record);
        }
    }

    /// Push a live record onto the `index`-th subscription ever created.
    pub fn deliver_on(&self, index: usize, record: WaveRecord) {
        if let Some(sender) = self.senders.lock().unwrap().get(index) {
            let _ = sender.send(record);
        }
    }

    /// End every live stream from the transport side.
    pub fn close_streams(&self) {
        self.senders.lock().unwrap().clear();
    }

    /// Resolve the oldest write waiting in `ConfirmMode::Manual`.
    pub fn confirm_next(&self, result: Result<(), WaveError>) {
        if let Some(sender) = self.confirmations.lock().unwrap().pop_front() {
            let _ = sender.send(result);
        }
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn unsubscribe_calls(&self) -> usize {
        self.unsubscribe_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    pub fn submitted_messages(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerGateway for MockGateway {
    async fn fetch_all_records(&self) -> Result<Vec<WaveRecord>, WaveError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        self.history.lock().unwrap().clone()
    }

    async fn total_records(&self) -> Result<u64, WaveError> {
        self.history
            .lock()
            .unwrap()
            .as_ref()
            .map(|records| records.len() as u64)
            .map_err(Clone::clone)
    }

    async fn submit_write(
        &self,
        _from: Account,
        message: &str,
    ) -> Result<Box<dyn TransactionHandle>, WaveError> {
        let n = {
            let mut submitted = self.submitted.lock().unwrap();
            submitted.push(message.to_string());
            submitted.len()
        };
        if let Some(err) = self.submit_error.lock().unwrap().clone() {
            return Err(err);
        }

        let tx_hash = TxHash::from_low_u64_be(n as u64);
        let resolution = match self.confirm_mode {
            ConfirmMode::Succeed => Resolution::Immediate,
            ConfirmMode::Hang => Resolution::Never,
            ConfirmMode::Manual => {
                let (tx, rx) = oneshot::channel();
                self.confirmations.lock().unwrap().push_back(tx);
                Resolution::Manual(Mutex::new(Some(rx)))
            }
        };
        Ok(Box::new(MockTransaction { tx_hash, resolution }))
    }

    async fn subscribe(&self) -> Result<Subscription, WaveError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.subscribe_error.lock().unwrap().clone() {
            return Err(err);
        }
        let (tx, records) = mpsc::unbounded_channel();
        self.senders.lock().unwrap().push(tx);
        let unsubscribes = self.unsubscribe_calls.clone();
        Ok(Subscription {
            records,
            handle: UnsubscribeHandle::new(move || {
                unsubscribes.fetch_add(1, Ordering::SeqCst);
            }),
        })
    }
}

enum Resolution {
    Immediate,
    Never,
    Manual(Mutex<Option<oneshot::Receiver<Result<(), WaveError>>>>),
}

struct MockTransaction {
    tx_hash: TxHash,
    resolution: Resolution,
}

impl MockTransaction {
    fn confirmation(&self) -> Confirmation {
        Confirmation {
            tx_hash: self.tx_hash,
            block_number: Some(1),
            gas_used: 21_000,
        }
    }
}

#[async_trait]
impl TransactionHandle for MockTransaction {
    fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    async fn await_confirmation(&self) -> Result<Confirmation, WaveError> {
        match &self.resolution {
            Resolution::Immediate => Ok(self.confirmation()),
            Resolution::Never => futures::future::pending().await,
            Resolution::Manual(slot) => {
                let rx = slot.lock().unwrap().take();
                match rx {
                    Some(rx) => match rx.await {
                        Ok(Ok(())) => Ok(self.confirmation()),
                        Ok(Err(e)) => Err(e),
                        Err(_) => Err(WaveError::RemoteError("confirmation dropped".to_string())),
                    },
                    None => Err(WaveError::RemoteError("already awaited".to_string())),
                }
            }
        }
    }
}

// ==================== MockRpcNode ====================

/// Result or `(code, message)` JSON-RPC error for one request.
pub type RpcReply = Result<Value, (i64, String)>;

type RpcRoute = Arc<dyn Fn(&str, &Value) -> RpcReply + Send + Sync>;

/// JSON-RPC node on a loopback HTTP port, answering through `route`.
pub struct MockRpcNode {
    url: String,
    methods: Arc<Mutex<Vec<String>>>,
    server: tokio::task::JoinHandle<()>,
}

impl MockRpcNode {
    pub async fn start(route: impl Fn(&str, &Value) -> RpcReply + Send + Sync + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let methods = Arc::new(Mutex::new(Vec::new()));
        let route: RpcRoute = Arc::new(route);
        let log = methods.clone();
        let server = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(serve_rpc_connection(socket, route.clone(), log.clone()));
            }
        });
        Self { url, methods, server }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Provider pointed at this node, polling every 10ms.
    pub fn provider(&self) -> Arc<Provider<Http>> {
        let provider = Provider::<Http>::try_from(self.url.as_str())
            .unwrap()
            .interval(Duration::from_millis(10));
        Arc::new(provider)
    }

    /// Every method received so far, in arrival order.
    pub fn methods(&self) -> Vec<String> {
        self.methods.lock().unwrap().clone()
    }

    pub fn calls(&self, method: &str) -> usize {
        self.methods.lock().unwrap().iter().filter(|m| *m == method).count()
    }
}

impl Drop for MockRpcNode {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn serve_rpc_connection(socket: TcpStream, route: RpcRoute, log: Arc<Mutex<Vec<String>>>) {
    let (read, mut write) = socket.into_split();
    let mut reader = BufReader::new(read);
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
            return;
        }
        let mut content_length = 0;
        loop {
            line.clear();
            if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                return;
            }
            let header = line.trim_end();
            if header.is_empty() {
                break;
            }
            if let Some((name, value)) = header.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }
        }

        let mut body = vec![0u8; content_length];
        if reader.read_exact(&mut body).await.is_err() {
            return;
        }
        let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        let method = request["method"].as_str().unwrap_or_default().to_string();
        log.lock().unwrap().push(method.clone());

        let response = match route(&method, &request["params"]) {
            Ok(result) => json!({ "jsonrpc": "2.0", "id": request["id"], "result": result }),
            Err((code, message)) => json!({
                "jsonrpc": "2.0",
                "id": request["id"],
                "error": { "code": code, "message": message },
            }),
        }
        .to_string();
        let head = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n",
            response.len()
        );
        if write.write_all(head.as_bytes()).await.is_err() || write.write_all(response.as_bytes()).await.is_err() {
            return;
        }
    }
}
