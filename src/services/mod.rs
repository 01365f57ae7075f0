pub mod conversation_service;
pub mod gateway;
pub mod health_service;
pub mod rate_limit_service;
pub mod relay;
