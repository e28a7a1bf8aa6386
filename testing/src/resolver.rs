//! Account resolvers for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use chronos_bulk_core::{AccountResolver, CalendarClient, ResolveError};

/// Resolver serving a fixed default client, with optional named accounts.
#[derive(Debug)]
pub struct StaticResolver<C: CalendarClient> {
    default_client: Arc<C>,
    accounts: HashMap<String, Arc<C>>,
}

impl<C: CalendarClient> StaticResolver<C> {
    pub fn new(default_client: Arc<C>) -> Self {
        Self {
            default_client,
            accounts: HashMap::new(),
        }
    }

    /// Register a client under an account alias.
    pub fn with_account(mut self, alias: impl Into<String>, client: Arc<C>) -> Self {
        self.accounts.insert(alias.into(), client);
        self
    }
}

#[async_trait]
impl<C: CalendarClient> AccountResolver for StaticResolver<C> {
    type Client = C;

    async fn resolve(&self, alias: Option<&str>) -> Result<Arc<C>, ResolveError> {
        match alias {
            None => Ok(Arc::clone(&self.default_client)),
            Some(alias) => self
                .accounts
                .get(alias)
                .map(Arc::clone)
                .ok_or_else(|| ResolveError::UnknownAccount(alias.to_string())),
        }
    }
}

/// Resolver that always fails, for exercising connection-failure paths.
#[derive(Debug)]
pub struct FailingResolver<C: CalendarClient> {
    message: String,
    _marker: std::marker::PhantomData<fn() -> C>,
}

impl<C: CalendarClient> FailingResolver<C> {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            _marker: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<C: CalendarClient> AccountResolver for FailingResolver<C> {
    type Client = C;

    async fn resolve(&self, _alias: Option<&str>) -> Result<Arc<C>, ResolveError> {
        Err(ResolveError::Connection(self.message.clone()))
    }
}
