use std::sync::Arc;

use async_trait::async_trait;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};

use crate::domain::{MarketCommand, MarketError, Request, RequestId};
use crate::service::OrderService;

/// Messages that can be sent to a RequestActor
pub enum RequestActorMessage {
    Execute(MarketCommand, RpcReplyPort<Result<Request, MarketError>>),
}

impl ractor::Message for RequestActorMessage {}

pub struct RequestActorArguments {
    pub request_id: RequestId,
    pub service: Arc<OrderService>,
}

pub struct RequestActorState {
    pub request_id: RequestId,
    pub service: Arc<OrderService>,
}

/// RequestActor serializes all commands against a single commission request.
///
/// The mailbox processes one message at a time, so two callers racing to
/// accept the same request are ordered here: the first wins, the second hits
/// the status guard and gets a state conflict instead of a second debit.
pub struct RequestActor;

#[async_trait]
impl Actor for RequestActor {
    type Msg = RequestActorMessage;
    type State = RequestActorState;
    type Arguments = RequestActorArguments;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::debug!(request = %args.request_id, "RequestActor starting");

        Ok(RequestActorState {
            request_id: args.request_id,
            service: args.service,
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            RequestActorMessage::Execute(command, reply) => {
                let result = state.service.execute(command).await;
                if let Err(e) = &result {
                    tracing::debug!(request = %state.request_id, error = %e, "command rejected");
                }
                let _ = reply.send(result);
            }
        }

        Ok(())
    }
}

/// Type alias for RequestActor reference
pub type RequestActorRef = ActorRef<RequestActorMessage>;
