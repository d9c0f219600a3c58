use std::fmt::{Display, Formatter};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ProductId, RequestId, RequestStatus, UserId};

#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum WalletError {
    #[error("Insufficient funds: needed {needed}, available {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },
    #[error("Invalid amount (must be positive)")]
    InvalidAmount,
    #[error("Wallet not found for user {0}")]
    NotFound(UserId),
}

#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum RequestError {
    #[error("Request {0} not found")]
    NotFound(RequestId),
    #[error("Request {0} already exists")]
    AlreadyExists(RequestId),
    #[error("Product {0} not found")]
    ProductNotFound(ProductId),
    #[error("Request {id} is {actual}, expected {expected}")]
    StateConflict {
        id: RequestId,
        expected: RequestStatus,
        actual: RequestStatus,
    },
    #[error("User {caller} is not entitled to act on request {id}")]
    Unauthorized { id: RequestId, caller: UserId },
    #[error("Request {0} is not past its expected delivery date")]
    NotYetDue(RequestId),
    #[error("Request {0} was modified concurrently")]
    ConcurrentUpdate(RequestId),
}

#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum InfraError {
    #[error("Transient infrastructure error: {0}")]
    Transient(String),
    #[error("Validation trigger publish failed: {0}")]
    PublishFailure(String),
}

#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum MarketError {
    Wallet(WalletError),
    Request(RequestError),
    Infra(InfraError),
}

impl Display for MarketError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MarketError::Wallet(e) => e.fmt(f),
            MarketError::Request(e) => e.fmt(f),
            MarketError::Infra(e) => e.fmt(f),
        }
    }
}

impl From<WalletError> for MarketError {
    fn from(error: WalletError) -> Self {
        MarketError::Wallet(error)
    }
}

impl From<RequestError> for MarketError {
    fn from(error: RequestError) -> Self {
        MarketError::Request(error)
    }
}

impl From<InfraError> for MarketError {
    fn from(error: InfraError) -> Self {
        MarketError::Infra(error)
    }
}

impl MarketError {
    /// Transient errors are the only ones worth retrying automatically.
    pub fn is_transient(&self) -> bool {
        matches!(self, MarketError::Infra(InfraError::Transient(_)))
    }
}
