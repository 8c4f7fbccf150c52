pub mod student_mapper;
pub mod transport_mapper;
