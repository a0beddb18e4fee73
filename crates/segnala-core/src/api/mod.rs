//! Backend access: the gateway and its error taxonomy.

pub mod error;
pub mod gateway;

pub use error::GatewayError;
pub use gateway::ApiGateway;
