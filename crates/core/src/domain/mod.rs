pub mod equipment;
pub mod session;
