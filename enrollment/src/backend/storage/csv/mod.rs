//! CSV/YAML file backend

pub mod connection;
pub mod media_repository;
pub mod student_repository;
pub mod transport_repository;

pub use connection::CsvConnection;
pub use media_repository::MediaRepository;
pub use student_repository::StudentRepository;
pub use transport_repository::TransportRepository;
