pub mod conversations;
pub mod gateway;
pub mod health;
