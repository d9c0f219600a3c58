use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use ractor::{rpc::CallResult, Actor, ActorRef};

use crate::adapter::{RequestActor, RequestActorArguments, RequestActorMessage};
use crate::domain::{InfraError, MarketCommand, MarketError, Request, RequestId};
use crate::service::OrderService;

type RequestActorRef = ActorRef<RequestActorMessage>;

/// RequestRegistry uses ractor's global registry for actor lookup.
///
/// Named actors are singletons in the registry, so two concurrent commands
/// for the same request always land on the same mailbox and are serialized
/// there. Routing through a local map would lose that guarantee.
#[derive(Clone)]
pub struct RequestRegistry {
    /// Requests routed through this registry (for shutdown only, not routing)
    processed: Arc<Mutex<HashSet<RequestId>>>,
    service: Arc<OrderService>,
    /// Namespace prefix for actor names (for test isolation)
    namespace: String,
}

impl RequestRegistry {
    pub fn new(service: Arc<OrderService>) -> Self {
        Self {
            processed: Arc::new(Mutex::new(HashSet::new())),
            service,
            namespace: String::new(),
        }
    }

    /// Create a registry with a custom namespace for test isolation.
    ///
    /// ## Warning: This is NOT MEANT FOR PRODUCTION USE. Only for testing purposes.
    pub fn with_namespace(service: Arc<OrderService>, namespace: String) -> Self {
        Self {
            processed: Arc::new(Mutex::new(HashSet::new())),
            service,
            namespace,
        }
    }

    fn actor_name(&self, request_id: &RequestId) -> String {
        if self.namespace.is_empty() {
            format!("request-{}", request_id)
        } else {
            format!("{}-request-{}", self.namespace, request_id)
        }
    }

    /// Get or spawn the actor for one request using ractor's global registry.
    pub async fn get_or_spawn(&self, request_id: &RequestId) -> Result<RequestActorRef, MarketError> {
        let actor_name = self.actor_name(request_id);

        // Fast path: check ractor's global registry
        if let Some(actor_ref) = ActorRef::<RequestActorMessage>::where_is(actor_name.clone()) {
            return Ok(actor_ref);
        }

        // Slow path: spawn with the global name. Losing the spawn race is
        // fine, only one actor with this name can exist.
        let args = RequestActorArguments {
            request_id: request_id.clone(),
            service: self.service.clone(),
        };

        match Actor::spawn(Some(actor_name.clone()), RequestActor, args).await {
            Ok((actor_ref, _handle)) => Ok(actor_ref),
            Err(e) => {
                // Spawn failed, maybe someone else just spawned it.
                // Try lookup one more time before giving up
                if let Some(actor_ref) = ActorRef::<RequestActorMessage>::where_is(actor_name) {
                    Ok(actor_ref)
                } else {
                    Err(InfraError::Transient(format!(
                        "Failed to spawn or find request actor: {:?}",
                        e
                    ))
                    .into())
                }
            }
        }
    }

    /// Route one command to its request's actor and wait for the outcome.
    pub async fn process_command(
        &self,
        command: MarketCommand,
    ) -> Result<Request, MarketError> {
        let request_id = command.request_id().clone();
        self.processed.lock().unwrap().insert(request_id.clone());

        let actor_ref = self.get_or_spawn(&request_id).await?;

        match actor_ref
            .call(
                |reply| RequestActorMessage::Execute(command, reply),
                Some(std::time::Duration::from_millis(500)),
            )
            .await
        {
            Ok(CallResult::Success(result)) => result,
            Ok(CallResult::Timeout) => {
                Err(InfraError::Transient("Actor call timeout".to_string()).into())
            }
            Ok(CallResult::SenderError) => {
                Err(InfraError::Transient("Actor sender error".to_string()).into())
            }
            Err(e) => Err(InfraError::Transient(format!(
                "Failed to send command to request actor: {:?}",
                e
            ))
            .into()),
        }
    }

    /// Stop every actor this registry has routed to.
    pub async fn shutdown_all(&self) {
        let request_ids: Vec<RequestId> = {
            let processed = self.processed.lock().unwrap();
            processed.iter().cloned().collect()
        };

        for request_id in request_ids {
            let actor_name = self.actor_name(&request_id);
            if let Some(actor_ref) = ActorRef::<RequestActorMessage>::where_is(actor_name) {
                actor_ref.stop(None);
            }
        }

        self.processed.lock().unwrap().clear();
    }
}
