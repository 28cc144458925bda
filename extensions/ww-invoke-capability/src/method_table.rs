use crate::{CallResults, Capability, CapabilityError, CapabilityMethod, method_id_hash};
use futures::future::BoxFuture;
use std::collections::{HashMap, hash_map::Entry};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use ww_invoke::call::MethodCall;

type HandlerFuture = BoxFuture<'static, Result<CallResults, CapabilityError>>;

pub type MethodHandler = Arc<dyn Fn(MethodCall) -> HandlerFuture + Send + Sync>;

/// A capability assembled from one handler per method.
///
/// Handlers are keyed by [`method_id_hash`] of the method name. The table
/// lock is only held to look a handler up, never while it runs, so calls to
/// different (or the same) methods proceed concurrently.
#[derive(Clone, Default)]
pub struct MethodTable {
    handlers: Arc<Mutex<HashMap<u64, MethodHandler>>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodTableError {
    /// A handler is already registered under this name (or its hash).
    AlreadyRegistered(String),
}

impl fmt::Display for MethodTableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodTableError::AlreadyRegistered(method) => {
                write!(f, "a handler for method {method:?} is already registered")
            }
        }
    }
}

impl std::error::Error for MethodTableError {}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an untyped handler receiving the whole method call.
    pub async fn register<F, Fut>(&self, method: &str, handler: F) -> Result<(), MethodTableError>
    where
        F: Fn(MethodCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CallResults, CapabilityError>> + Send + 'static,
    {
        let wrapped = move |params: MethodCall| Box::pin(handler(params)) as HandlerFuture;
        self.insert(method, method_id_hash(method), Arc::new(wrapped))
            .await
    }

    /// Registers a handler for a typed method definition.
    ///
    /// Arguments that fail to decode are answered with
    /// `CapabilityError::InvalidArguments` without running the handler.
    pub async fn register_method<M, F, Fut>(&self, handler: F) -> Result<(), MethodTableError>
    where
        M: CapabilityMethod + 'static,
        M::Input: Send + 'static,
        M::Output: Send + 'static,
        F: Fn(M::Input) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<M::Output, CapabilityError>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let wrapped = move |params: MethodCall| {
            let handler = handler.clone();
            Box::pin(async move {
                let input = M::decode_request(params)
                    .map_err(|e| CapabilityError::InvalidArguments(e.to_string()))?;
                let output = handler(input).await?;
                M::encode_response(output).map_err(|e| CapabilityError::Internal(e.to_string()))
            }) as HandlerFuture
        };
        self.insert(M::METHOD_NAME, M::METHOD_ID, Arc::new(wrapped))
            .await
    }

    /// Removes the handler for `method`. Returns whether one was registered.
    pub async fn unregister(&self, method: &str) -> bool {
        self.handlers
            .lock()
            .await
            .remove(&method_id_hash(method))
            .is_some()
    }

    pub async fn contains(&self, method: &str) -> bool {
        self.handlers
            .lock()
            .await
            .contains_key(&method_id_hash(method))
    }

    async fn insert(
        &self,
        method: &str,
        method_id: u64,
        handler: MethodHandler,
    ) -> Result<(), MethodTableError> {
        match self.handlers.lock().await.entry(method_id) {
            Entry::Occupied(_) => Err(MethodTableError::AlreadyRegistered(method.to_string())),
            Entry::Vacant(entry) => {
                tracing::debug!("Registered method {:?} ({:#018x})", method, method_id);
                entry.insert(handler);
                Ok(())
            }
        }
    }
}

#[async_trait::async_trait]
impl Capability for MethodTable {
    async fn call(&self, params: MethodCall) -> Result<CallResults, CapabilityError> {
        let method_id = method_id_hash(params.method());
        let handler = self.handlers.lock().await.get(&method_id).cloned();

        match handler {
            Some(handler) => handler(params).await,
            None => Err(CapabilityError::MethodNotFound(params.method().to_string())),
        }
    }
}
