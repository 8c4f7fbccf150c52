pub mod draft;
pub mod student;
pub mod transport;
