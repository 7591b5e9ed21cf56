//! # Remoting Receiver
//!
//! A receiver that talks to one component host over a `Transport`.
//!
//! Two background tasks serve the channel:
//!
//! - the **writer** drains an unbounded queue into the transport, so callers
//!   never wait on the network and messages leave in the order they were
//!   queued;
//! - the **pump** reads inbound messages and hands them to the
//!   `ChannelAssociation`, which routes each to its protocol handler.
//!
//! When either task loses the transport, the channel is closed and every
//! pending invocation fails with `ChannelClosed`.

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use remorpc::AttachmentKey;
use remorpc::Attachments;
use remorpc::CancelRequest;
use remorpc::InvocationRequest;
use remorpc::SessionId;
use remorpc::SessionOpenRequest;
use remorpc::TransactionId;
use remorpc::TxKind;
use remorpc::TxRequest;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::codec::PackCodec;
use crate::codec::ValueCodec;
use crate::config::ClientConfig;
use crate::correlation::CorrelationId;
use crate::correlation::CorrelationTable;
use crate::correlation::PendingSlot;
use crate::error::InvocationError;
use crate::invocation::InvocationContext;
use crate::module_id::ModuleId;
use crate::receiver::Receiver;
use crate::receiver::ReceiverContext;
use crate::transaction::TransactionBridge;
use crate::transaction::Vote;
use crate::transaction::XaError;
use crate::transaction::XaErrorCode;
use crate::transport::Transport;
use crate::value::Value;

mod association;

pub use association::ChannelAssociation;

pub struct RemotingReceiver {
    name: String,
    association: Arc<ChannelAssociation>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    codec: Arc<dyn ValueCodec>,
    config: ClientConfig,
}

impl RemotingReceiver {
    /// Creates a receiver using `PackCodec` and spawns its channel tasks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(name: impl Into<String>, transport: Box<dyn Transport>, config: &ClientConfig) -> Arc<Self> {
        Self::with_codec(name, transport, config, Arc::new(PackCodec))
    }

    pub fn with_codec(
        name: impl Into<String>,
        transport: Box<dyn Transport>,
        config: &ClientConfig,
        codec: Arc<dyn ValueCodec>,
    ) -> Arc<Self> {
        let name = name.into();
        let transport: Arc<dyn Transport> = Arc::from(transport);
        let table = CorrelationTable::new(config.max_outstanding);
        let association = Arc::new(ChannelAssociation::new(name.clone(), table, codec.clone()));
        let (outbound, queue) = mpsc::unbounded_channel();

        tokio::spawn(Self::write_loop(transport.clone(), queue, association.clone()));
        tokio::spawn(Self::pump(transport, association.clone()));

        Arc::new(Self {
            name,
            association,
            outbound,
            codec,
            config: config.clone(),
        })
    }

    pub fn association(&self) -> &Arc<ChannelAssociation> {
        &self.association
    }

    async fn write_loop(
        transport: Arc<dyn Transport>,
        mut queue: mpsc::UnboundedReceiver<Vec<u8>>,
        association: Arc<ChannelAssociation>,
    ) {
        while let Some(message) = queue.recv().await {
            if let Err(e) = transport.send(&message).await {
                error!(channel = association.name(), error = %e, "Transport send failed");
                association.close(&format!("send failed: {}", e));
                return;
            }
        }
        debug!(channel = association.name(), "Outbound queue closed");
    }

    async fn pump(transport: Arc<dyn Transport>, association: Arc<ChannelAssociation>) {
        let reason = loop {
            match transport.recv().await {
                Ok(Some(message)) => {
                    if let Err(e) = association.process_message(Box::new(Cursor::new(message))) {
                        warn!(channel = association.name(), error = %e, "Dropped inbound message");
                    }
                }
                Ok(None) => break "stream closed".to_owned(),
                Err(e) => {
                    error!(channel = association.name(), error = %e, "Transport receive failed");
                    break e.to_string();
                }
            }
        };
        association.close(&reason);
    }

    fn enqueue(&self, message: Vec<u8>) -> Result<(), InvocationError> {
        if self.association.is_closed() {
            return Err(InvocationError::ChannelClosed(format!("channel {} is closed", self.name)));
        }
        self.outbound
            .send(message)
            .map_err(|_| InvocationError::ChannelClosed(format!("channel {} writer stopped", self.name)))
    }

    /// Sends one transaction message and waits for its answer.
    async fn exchange(&self, kind: TxKind, transaction: &TransactionId) -> Result<Value, InvocationError> {
        let mut slot = self.association.table().register()?;
        let request = TxRequest { invocation_id: slot.id(), kind, transaction: transaction.clone() };
        self.enqueue(request.encode()?)?;
        let producer = slot.wait(self.config.transaction_timeout).await?;
        producer.get_result()
    }

    async fn transaction_step(
        &self,
        kind: TxKind,
        transaction: &TransactionId,
        operation: &'static str,
    ) -> Result<Option<i64>, XaError> {
        match self.exchange(kind, transaction).await {
            Ok(Value::Unit) => Ok(None),
            Ok(Value::Long(v)) => Ok(Some(v)),
            Ok(other) => {
                warn!(channel = %self.name, operation, found = other.type_name(), "Unexpected transaction answer");
                Err(XaError::new(XaErrorCode::Proto, operation))
            }
            Err(e) => {
                warn!(channel = %self.name, operation, transaction = %transaction, error = %e, "Transaction message failed");
                Err(XaError::new(xa_code(&e), operation))
            }
        }
    }
}

fn xa_code(e: &InvocationError) -> XaErrorCode {
    match e {
        InvocationError::Transaction(xa) => xa.code,
        InvocationError::Timeout(_) => XaErrorCode::RbTimeout,
        InvocationError::ChannelClosed(_) => XaErrorCode::RmFail,
        InvocationError::Protocol(_) | InvocationError::Codec(_) => XaErrorCode::Proto,
        _ => XaErrorCode::RmErr,
    }
}

#[async_trait]
impl Receiver for RemotingReceiver {
    fn name(&self) -> &str {
        &self.name
    }

    fn associate(&self, context: ReceiverContext) {
        self.association.associate(context);
    }

    async fn process_invocation(
        &self,
        invocation: &mut InvocationContext,
        _context: &ReceiverContext,
    ) -> Result<PendingSlot, InvocationError> {
        let slot = self.association.table().register()?;
        invocation.set_correlation_id(slot.id());

        let payload = self.codec.encode_arguments(&invocation.take_arguments())?;
        let locator = invocation.locator();
        let method = invocation.method();
        let request = InvocationRequest {
            invocation_id: slot.id(),
            module: locator.module().to_triple(),
            bean: locator.bean().to_owned(),
            view: locator.view().to_owned(),
            method: method.name().to_owned(),
            signature: method.signature(),
            session: locator.session().cloned(),
            payload,
            attachments: invocation.attachments().clone(),
        };

        self.enqueue(request.encode()?)?;
        Ok(slot)
    }

    /// Forwards the cancellation to the host. The host never confirms that an
    /// invocation did not run, so this always answers false.
    fn cancel_invocation(&self, _context: &ReceiverContext, correlation_id: CorrelationId) -> bool {
        let request = CancelRequest { invocation_id: correlation_id, may_interrupt: true };
        if let Err(e) = self.enqueue(request.encode()) {
            debug!(channel = %self.name, correlation_id, error = %e, "Cancel request not sent");
        }
        false
    }

    async fn open_session(
        &self,
        _context: &ReceiverContext,
        module: &ModuleId,
        bean: &str,
    ) -> Result<SessionId, InvocationError> {
        let mut slot = self.association.table().register()?;
        let request = SessionOpenRequest {
            invocation_id: slot.id(),
            module: module.to_triple(),
            bean: bean.to_owned(),
            attachments: self.create_receiver_specific(),
        };
        self.enqueue(request.encode()?)?;

        let producer = slot.wait(self.config.session_open_timeout).await?;
        match producer.get_result()? {
            Value::Session(session) => Ok(session),
            other => Err(InvocationError::UnexpectedResult { expected: "session", found: other }),
        }
    }

    async fn verify(&self, module: &ModuleId, _bean: &str) -> Result<(), InvocationError> {
        match self.association.receiver_context() {
            Some(context) if context.accepts(module) => Ok(()),
            _ => Err(InvocationError::NoSuchReceiver(module.clone())),
        }
    }

    fn create_receiver_specific(&self) -> Attachments {
        let mut attachments = Attachments::new();
        attachments.insert(AttachmentKey::SessionAffinity, self.name.as_bytes());
        attachments
    }
}

#[async_trait]
impl TransactionBridge for RemotingReceiver {
    async fn send_prepare(&self, _context: &ReceiverContext, transaction: &TransactionId) -> Result<Vote, XaError> {
        let answer = self.transaction_step(TxKind::Prepare, transaction, "prepare").await?;
        answer
            .and_then(|code| i32::try_from(code).ok())
            .and_then(Vote::from_code)
            .ok_or(XaError::new(XaErrorCode::Proto, "prepare"))
    }

    async fn send_commit(
        &self,
        _context: &ReceiverContext,
        transaction: &TransactionId,
        one_phase: bool,
    ) -> Result<(), XaError> {
        self.transaction_step(TxKind::Commit { one_phase }, transaction, "commit").await?;
        Ok(())
    }

    async fn send_rollback(&self, _context: &ReceiverContext, transaction: &TransactionId) -> Result<(), XaError> {
        self.transaction_step(TxKind::Rollback, transaction, "rollback").await?;
        Ok(())
    }

    async fn send_forget(&self, _context: &ReceiverContext, transaction: &TransactionId) -> Result<(), XaError> {
        self.transaction_step(TxKind::Forget, transaction, "forget").await?;
        Ok(())
    }

    /// Returns once the host reports that every participant it reaches has run
    /// its before-completion hook.
    async fn before_completion(&self, _context: &ReceiverContext, transaction: &TransactionId) -> Result<(), XaError> {
        self.transaction_step(TxKind::BeforeCompletion, transaction, "before_completion").await?;
        Ok(())
    }
}
