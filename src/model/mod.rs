pub mod employee;
pub mod notification;
pub mod planning;
pub mod request;
pub mod role;
