//! Integration tests for the remoting receiver against a scripted host.
//!
//! The host end of a `DuplexChannelTransport` pair decodes what the client
//! sends and answers with hand-built protocol messages.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::bail;
use remora::ClientConfig;
use remora::ClientContext;
use remora::InvocationError;
use remora::Locator;
use remora::Method;
use remora::ModuleId;
use remora::Outcome;
use remora::ParamType;
use remora::Proxy;
use remora::RemotingReceiver;
use remora::ReturnType;
use remora::Value;
use remora::ViewKind;
use remora::codec::PackCodec;
use remora::mock_transport::DuplexChannelTransport;
use remora::transaction::Vote;
use remora::transaction::XaErrorCode;
use remora::transport::Transport;
use remorpc::AsyncMethodNotification;
use remorpc::AttachmentKey;
use remorpc::Attachments;
use remorpc::FailureKind;
use remorpc::InvocationFailure;
use remorpc::InvocationRequest;
use remorpc::InvocationResponse;
use remorpc::Message;
use remorpc::ModuleAvailability;
use remorpc::ModuleTriple;
use remorpc::SessionId;
use remorpc::SessionOpenResponse;
use remorpc::TransactionId;
use remorpc::TxKind;
use remorpc::TxRequest;
use remorpc::TxResponse;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

fn calc_module() -> ModuleId {
    ModuleId::new(Some("app"), "calc", None).expect("valid module")
}

fn calc_proxy() -> Proxy {
    Proxy::new(Locator::stateless(calc_module(), "Calculator", "CalcRemote"), ViewKind::Business)
}

fn add() -> Method {
    Method::new("add", vec![ParamType::named("int"), ParamType::named("int")], ReturnType::Value)
}

/// The host end of the channel.
struct Host {
    transport: DuplexChannelTransport,
}

impl Host {
    async fn send(&self, message: Vec<u8>) -> anyhow::Result<()> {
        self.transport.send(&message).await?;
        Ok(())
    }

    async fn next(&self) -> anyhow::Result<Message> {
        let bytes = tokio::time::timeout(Duration::from_secs(2), self.transport.recv())
            .await??
            .ok_or_else(|| anyhow::anyhow!("client closed the channel"))?;
        Ok(Message::decode(&bytes)?)
    }

    async fn expect_invocation(&self) -> anyhow::Result<InvocationRequest> {
        match self.next().await? {
            Message::InvocationRequest(request) => Ok(request),
            other => bail!("expected invocation request, got {:?}", other.header()),
        }
    }

    async fn expect_tx(&self) -> anyhow::Result<TxRequest> {
        match self.next().await? {
            Message::TxRequest(request) => Ok(request),
            other => bail!("expected transaction request, got {:?}", other.header()),
        }
    }

    async fn reply(&self, invocation_id: u16, value: &Value) -> anyhow::Result<()> {
        let payload = PackCodec.encode_result(value)?;
        let response = InvocationResponse { invocation_id, payload, attachments: Attachments::new() };
        self.send(response.encode()?).await
    }

    async fn announce(&self, available: bool, module: &str) -> anyhow::Result<()> {
        let announcement = ModuleAvailability { available, modules: vec![ModuleTriple::new("app", module, "")] };
        self.send(announcement.encode()?).await
    }
}

async fn wait_until(mut check: impl FnMut() -> bool) -> anyhow::Result<()> {
    for _ in 0..400 {
        if check() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    bail!("condition not reached in time")
}

/// A client with one remoting receiver whose host announced `app/calc`.
async fn connect(config: ClientConfig) -> anyhow::Result<(Arc<ClientContext>, Arc<RemotingReceiver>, Host)> {
    init_tracing();
    let (client_side, host_side) = DuplexChannelTransport::pair();
    let client = ClientContext::new(config);
    let receiver = RemotingReceiver::new("node-1", Box::new(client_side), client.config());
    client.register_receiver(receiver.clone());

    let host = Host { transport: host_side };
    host.announce(true, "calc").await?;
    let watched = receiver.clone();
    wait_until(move || {
        watched
            .association()
            .receiver_context()
            .is_some_and(|ctx| ctx.accepts(&calc_module()))
    })
    .await?;
    Ok((client, receiver, host))
}

fn spawn_call(
    client: &Arc<ClientContext>,
    proxy: Proxy,
    method: Method,
    args: Vec<Value>,
) -> JoinHandle<Result<Outcome, InvocationError>> {
    tokio::spawn(client.clone().scope(async move { proxy.invoke(&method, args).await }))
}

// --- Invocations ---

#[tokio::test]
async fn sync_invocation_round_trip() -> anyhow::Result<()> {
    let (client, _receiver, host) = connect(ClientConfig::default()).await?;
    let call = spawn_call(&client, calc_proxy(), add(), vec![Value::Int(2), Value::Int(3)]);

    let request = host.expect_invocation().await?;
    assert_eq!(request.module, ModuleTriple::new("app", "calc", ""));
    assert_eq!(request.bean, "Calculator");
    assert_eq!(request.view, "CalcRemote");
    assert_eq!(request.method, "add");
    assert_eq!(request.signature, vec!["int".to_owned(), "int".to_owned()]);
    assert_eq!(request.session, None);
    assert_eq!(request.attachments.get(AttachmentKey::SessionAffinity), Some(&b"node-1"[..]));

    let args = PackCodec.decode_arguments(&request.payload)?;
    let sum = args.iter().map(|a| if let Value::Int(v) = a { *v } else { 0 }).sum::<i32>();
    host.reply(request.invocation_id, &Value::Int(sum)).await?;

    let outcome = call.await??;
    assert_eq!(outcome.into_value(), Some(Value::Int(5)));
    Ok(())
}

#[tokio::test]
async fn async_invocation_yields_future() -> anyhow::Result<()> {
    let (client, receiver, host) = connect(ClientConfig::default()).await?;
    let outcome = spawn_call(&client, calc_proxy().as_async(), add(), vec![Value::Int(1), Value::Int(1)]).await??;
    let mut future = outcome.into_future().expect("pending outcome");

    let request = host.expect_invocation().await?;
    assert_eq!(request.invocation_id, future.correlation_id());
    assert_eq!(receiver.association().table().pending_count(), 1);

    host.reply(request.invocation_id, &Value::Int(2)).await?;
    assert_eq!(future.get().await?, Value::Int(2));
    Ok(())
}

#[tokio::test]
async fn async_void_result_is_discarded() -> anyhow::Result<()> {
    let (client, receiver, host) = connect(ClientConfig::default()).await?;
    let log = Method::new("log", vec![ParamType::named("string")], ReturnType::Unit);
    let outcome = spawn_call(&client, calc_proxy().as_async(), log, vec!["hello".into()]).await??;
    assert!(matches!(outcome, Outcome::Discarded));

    let request = host.expect_invocation().await?;
    host.reply(request.invocation_id, &Value::Unit).await?;

    let table = receiver.association().table().clone();
    wait_until(move || table.stats().discarded.load(Ordering::Relaxed) == 1).await?;
    assert_eq!(receiver.association().table().pending_count(), 0);
    Ok(())
}

#[tokio::test]
async fn host_can_release_a_sync_caller() -> anyhow::Result<()> {
    let (client, _receiver, host) = connect(ClientConfig::default()).await?;
    let call = spawn_call(&client, calc_proxy(), add(), vec![Value::Int(4), Value::Int(4)]);

    let request = host.expect_invocation().await?;
    host.send(AsyncMethodNotification { invocation_id: request.invocation_id }.encode()).await?;

    let mut future = call.await??.into_future().expect("released into a future");
    host.reply(request.invocation_id, &Value::Int(8)).await?;
    assert_eq!(future.get().await?, Value::Int(8));
    Ok(())
}

#[tokio::test]
async fn application_exception_reaches_caller() -> anyhow::Result<()> {
    let (client, _receiver, host) = connect(ClientConfig::default()).await?;
    let call = spawn_call(&client, calc_proxy(), add(), vec![]);

    let request = host.expect_invocation().await?;
    let failure = InvocationFailure {
        kind: FailureKind::ApplicationException,
        invocation_id: request.invocation_id,
        message: "division by zero".into(),
        attachments: Attachments::new(),
    };
    host.send(failure.encode()?).await?;

    let err = call.await?.err().expect("remote failure");
    assert!(matches!(
        err,
        InvocationError::Remote { kind: FailureKind::ApplicationException, ref message } if message == "division by zero"
    ));
    Ok(())
}

#[tokio::test]
async fn late_response_for_unknown_id_is_counted() -> anyhow::Result<()> {
    let (_client, receiver, host) = connect(ClientConfig::default()).await?;
    host.reply(999, &Value::Int(1)).await?;

    let table = receiver.association().table().clone();
    wait_until(move || table.stats().anomalies.load(Ordering::Relaxed) == 1).await?;
    Ok(())
}

#[tokio::test]
async fn cancel_is_sent_but_never_confirmed() -> anyhow::Result<()> {
    let (client, _receiver, host) = connect(ClientConfig::default()).await?;
    let outcome = spawn_call(&client, calc_proxy().as_async(), add(), vec![]).await??;
    let mut future = outcome.into_future().expect("pending outcome");
    let request = host.expect_invocation().await?;

    assert!(!future.cancel());
    match host.next().await? {
        Message::Cancel(cancel) => {
            assert_eq!(cancel.invocation_id, request.invocation_id);
            assert!(cancel.may_interrupt);
        }
        other => bail!("expected cancel, got {:?}", other.header()),
    }

    // The host ran the call anyway; the result still arrives.
    host.reply(request.invocation_id, &Value::Int(0)).await?;
    assert_eq!(future.get().await?, Value::Int(0));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_calls_answered_in_reverse_order() -> anyhow::Result<()> {
    let (client, receiver, host) = connect(ClientConfig::default()).await?;
    let calls: Vec<_> = (0..32)
        .map(|n| spawn_call(&client, calc_proxy(), add(), vec![Value::Int(n), Value::Int(1000)]))
        .collect();

    let mut requests = Vec::new();
    for _ in 0..32 {
        requests.push(host.expect_invocation().await?);
    }
    for request in requests.iter().rev() {
        let args = PackCodec.decode_arguments(&request.payload)?;
        let Some(Value::Int(n)) = args.first() else {
            bail!("missing first argument");
        };
        host.reply(request.invocation_id, &Value::Int(n + 1000)).await?;
    }

    for (n, call) in calls.into_iter().enumerate() {
        let outcome = call.await??;
        assert_eq!(outcome.into_value(), Some(Value::Int(n as i32 + 1000)));
    }
    assert_eq!(receiver.association().table().pending_count(), 0);
    assert_eq!(receiver.association().table().stats().anomalies.load(Ordering::Relaxed), 0);
    Ok(())
}

// --- Sessions and module availability ---

#[tokio::test]
async fn session_id_travels_with_stateful_calls() -> anyhow::Result<()> {
    let (client, _receiver, host) = connect(ClientConfig::default()).await?;
    let session = SessionId::new(vec![0x5A; 12]);

    let opener = client.clone();
    let open = tokio::spawn(async move { opener.create_session(&calc_module(), "Cart", "CartRemote").await });
    let request = match host.next().await? {
        Message::SessionOpenRequest(request) => request,
        other => bail!("expected session open request, got {:?}", other.header()),
    };
    assert_eq!(request.bean, "Cart");
    let response = SessionOpenResponse {
        invocation_id: request.invocation_id,
        session: session.clone(),
        attachments: Attachments::new(),
    };
    host.send(response.encode()?).await?;

    let locator = open.await??;
    assert_eq!(locator.session(), Some(&session));

    let proxy = Proxy::new(locator, ViewKind::Business);
    let checkout = Method::new("checkout", vec![], ReturnType::Value);
    let call = spawn_call(&client, proxy, checkout, vec![]);
    let invocation = host.expect_invocation().await?;
    assert_eq!(invocation.session, Some(session));

    host.reply(invocation.invocation_id, &Value::Bool(true)).await?;
    assert_eq!(call.await??.into_value(), Some(Value::Bool(true)));
    Ok(())
}

#[tokio::test]
async fn withdrawn_module_is_no_longer_routed() -> anyhow::Result<()> {
    let (client, receiver, host) = connect(ClientConfig::default()).await?;
    host.announce(false, "calc").await?;
    let watched = receiver.clone();
    wait_until(move || {
        watched
            .association()
            .receiver_context()
            .is_some_and(|ctx| !ctx.accepts(&calc_module()))
    })
    .await?;

    let err = spawn_call(&client, calc_proxy(), add(), vec![]).await?.err().expect("no receiver");
    assert!(matches!(err, InvocationError::NoSuchReceiver(_)));
    assert_eq!(receiver.association().table().stats().registered.load(Ordering::Relaxed), 0);
    Ok(())
}

// --- Channel loss ---

#[tokio::test]
async fn closed_channel_fails_pending_and_new_calls() -> anyhow::Result<()> {
    let (client, receiver, host) = connect(ClientConfig::default()).await?;
    let call = spawn_call(&client, calc_proxy(), add(), vec![]);
    host.expect_invocation().await?;
    drop(host);

    let err = call.await?.err().expect("channel closed");
    assert!(matches!(err, InvocationError::ChannelClosed(_)));
    assert!(receiver.association().is_closed());

    let err = spawn_call(&client, calc_proxy(), add(), vec![]).await?.err().expect("channel closed");
    assert!(matches!(err, InvocationError::ChannelClosed(_)));
    assert_eq!(receiver.association().table().pending_count(), 0);
    Ok(())
}

// --- Transactions ---

#[tokio::test]
async fn two_phase_commit_over_channel() -> anyhow::Result<()> {
    let (client, _receiver, host) = connect(ClientConfig::default()).await?;
    let resource = client.transaction_resource(&calc_module())?;
    let tx = TransactionId::new(*b"gtrid-1");

    let preparer = resource.clone();
    let branch = tx.clone();
    let prepare = tokio::spawn(async move { preparer.prepare(&branch).await });
    let request = host.expect_tx().await?;
    assert_eq!(request.kind, TxKind::Prepare);
    assert_eq!(request.transaction, tx);
    host.send(TxResponse { invocation_id: request.invocation_id, value: Some(0) }.encode()).await?;
    assert_eq!(prepare.await??, Vote::Ok);

    let committer = resource.clone();
    let branch = tx.clone();
    let commit = tokio::spawn(async move { committer.commit(&branch, false).await });
    let request = host.expect_tx().await?;
    assert_eq!(request.kind, TxKind::Commit { one_phase: false });
    host.send(TxResponse { invocation_id: request.invocation_id, value: None }.encode()).await?;
    commit.await??;
    Ok(())
}

#[tokio::test]
async fn read_only_vote_and_bad_votes() -> anyhow::Result<()> {
    let (client, _receiver, host) = connect(ClientConfig::default()).await?;
    let resource = client.transaction_resource(&calc_module())?;

    for (answer, expected) in [(Some(3), Ok(Vote::ReadOnly)), (Some(42), Err(XaErrorCode::Proto))] {
        let preparer = resource.clone();
        let prepare = tokio::spawn(async move { preparer.prepare(&TransactionId::new(vec![1])).await });
        let request = host.expect_tx().await?;
        host.send(TxResponse { invocation_id: request.invocation_id, value: answer }.encode()).await?;
        assert_eq!(prepare.await?.map_err(|e| e.code), expected);
    }
    Ok(())
}

#[tokio::test]
async fn unanswered_transaction_times_out() -> anyhow::Result<()> {
    let config = ClientConfig::builder().transaction_timeout(Duration::from_millis(30)).build();
    let (client, _receiver, host) = connect(config).await?;
    let resource = client.transaction_resource(&calc_module())?;

    let rollback = tokio::spawn(async move { resource.rollback(&TransactionId::new(vec![2])).await });
    let request = host.expect_tx().await?;
    assert_eq!(request.kind, TxKind::Rollback);

    let err = rollback.await?.expect_err("no answer");
    assert_eq!(err.code, XaErrorCode::RbTimeout);
    assert_eq!(err.operation, "rollback");
    Ok(())
}
