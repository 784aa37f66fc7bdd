use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use mkp_engine::{CatalogError, OrderFlowError, StockError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Invalid request. {0}")]
    ValidationError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The request conflicts with the current state. {0}")]
    Conflict(String),
    #[error("{0}")]
    InsufficientStock(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
                AuthError::CouldNotIssueToken(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InsufficientStock(_) => StatusCode::GONE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No access token was provided.")]
    MissingToken,
    #[error("Access token is invalid. {0}")]
    ValidationError(String),
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Could not issue an access token. {0}")]
    CouldNotIssueToken(String),
}

impl From<CatalogError> for ServerError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            CatalogError::InvalidName(_) | CatalogError::InvalidSku(_) | CatalogError::InvalidQuery(_) => {
                Self::ValidationError(e.to_string())
            },
            CatalogError::DuplicateSku(_) => Self::Conflict(e.to_string()),
            CatalogError::OrganizationNotFound(_) => Self::NoRecordFound(e.to_string()),
        }
    }
}

impl From<StockError> for ServerError {
    fn from(e: StockError) -> Self {
        match e {
            StockError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            StockError::InvalidQuantity(_) |
            StockError::InvalidAmount(_) |
            StockError::InvalidPrice(_) |
            StockError::ProductMismatch { .. } |
            StockError::InvalidQuery(_) => Self::ValidationError(e.to_string()),
            StockError::OfferNotFound(_) |
            StockError::ProductNotFound(_) |
            StockError::WarehouseNotFound(_) |
            StockError::ReservationNotFound(_) |
            StockError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            StockError::WarehouseNotOwned { .. } => Self::InsufficientPermissions(e.to_string()),
            StockError::OfferHasReservations(_) | StockError::OrderClosed { .. } => Self::Conflict(e.to_string()),
            StockError::InsufficientStock { .. } => Self::InsufficientStock(e.to_string()),
        }
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            OrderFlowError::EmptyOrder | OrderFlowError::MixedSellers | OrderFlowError::TotalOverflow => {
                Self::ValidationError(e.to_string())
            },
            OrderFlowError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            OrderFlowError::OrderModificationForbidden { .. } |
            OrderFlowError::OrderModificationNoOp |
            OrderFlowError::OrderExpired(_) |
            OrderFlowError::OfferWithdrawn { .. } => Self::Conflict(e.to_string()),
            OrderFlowError::Stock(e) => e.into(),
        }
    }
}
