//! Shared, ordered interceptor chains.
//!
//! An [`InterceptorRegistry`] holds the request and response chains of one
//! client. Every [`ScopedClient`](crate::ScopedClient) created from that client
//! registers into the same registry. Registration returns a [`RemoveHandle`]
//! that removes exactly that entry.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::config::{RequestInterceptor, ResponseInterceptor};

type RequestEntry = (u64, Arc<dyn RequestInterceptor>);
type ResponseEntry = (u64, Arc<dyn ResponseInterceptor>);

#[derive(Default)]
struct Chains {
    next_id: u64,
    request: Vec<RequestEntry>,
    response: Vec<ResponseEntry>,
}

impl Chains {
    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// Ordered request and response interceptor chains.
///
/// Cloning is cheap; clones share the same chains. Interceptors run in
/// insertion order. Each call takes a snapshot of the chain it is about to
/// run, so registrations made while a call is in flight apply to later calls.
#[derive(Clone, Default)]
pub struct InterceptorRegistry {
    inner: Arc<Mutex<Chains>>,
}

impl std::fmt::Debug for InterceptorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let chains = self.lock();
        f.debug_struct("InterceptorRegistry")
            .field("request", &chains.request.len())
            .field("response", &chains.response.len())
            .finish()
    }
}

impl InterceptorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Chains> {
        // Interceptors never run under the lock, so a poisoned guard still
        // holds consistent lists.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a request interceptor to the end of the chain.
    pub fn add_request_interceptor<I: RequestInterceptor>(&self, interceptor: I) -> RemoveHandle {
        let mut chains = self.lock();
        let id = chains.next_id();
        chains.request.push((id, Arc::new(interceptor)));
        self.handle(id, ChainKind::Request)
    }

    /// Append a response interceptor to the end of the chain.
    pub fn add_response_interceptor<I: ResponseInterceptor>(&self, interceptor: I) -> RemoveHandle {
        let mut chains = self.lock();
        let id = chains.next_id();
        chains.response.push((id, Arc::new(interceptor)));
        self.handle(id, ChainKind::Response)
    }

    fn handle(&self, id: u64, kind: ChainKind) -> RemoveHandle {
        RemoveHandle {
            registry: Arc::downgrade(&self.inner),
            id,
            kind,
        }
    }

    /// Snapshot of the request chain in execution order.
    pub fn request_chain(&self) -> Vec<Arc<dyn RequestInterceptor>> {
        self.lock().request.iter().map(|(_, i)| i.clone()).collect()
    }

    /// Snapshot of the response chain in execution order.
    pub fn response_chain(&self) -> Vec<Arc<dyn ResponseInterceptor>> {
        self.lock().response.iter().map(|(_, i)| i.clone()).collect()
    }

    /// Number of registered request interceptors.
    pub fn request_len(&self) -> usize {
        self.lock().request.len()
    }

    /// Number of registered response interceptors.
    pub fn response_len(&self) -> usize {
        self.lock().response.len()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ChainKind {
    Request,
    Response,
}

/// Removes one registered interceptor.
///
/// Removal is idempotent: calling [`remove`](RemoveHandle::remove) again, or
/// after the registry is gone, does nothing. Dropping the handle does not
/// remove the interceptor.
#[derive(Clone, Debug)]
pub struct RemoveHandle {
    registry: Weak<Mutex<Chains>>,
    id: u64,
    kind: ChainKind,
}

impl RemoveHandle {
    /// Remove the interceptor if it is still registered.
    ///
    /// Returns `true` if this call removed it.
    pub fn remove(&self) -> bool {
        let Some(inner) = self.registry.upgrade() else {
            return false;
        };
        let mut chains = inner.lock().unwrap_or_else(PoisonError::into_inner);
        match self.kind {
            ChainKind::Request => remove_entry(&mut chains.request, self.id),
            ChainKind::Response => remove_entry(&mut chains.response, self.id),
        }
    }
}

fn remove_entry<T>(entries: &mut Vec<(u64, T)>, id: u64) -> bool {
    match entries.iter().position(|(entry_id, _)| *entry_id == id) {
        Some(index) => {
            entries.remove(index);
            true
        }
        None => false,
    }
}
