pub mod budget_thuis;
mod error;
pub mod home_assistant;
pub mod nutsservices;
mod transport;

pub use self::{
    error::Error,
    transport::{RetryPolicy, Transport},
};
