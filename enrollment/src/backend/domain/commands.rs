//! Domain-level command types.
//! Services take these instead of the public DTOs from the `shared` crate;
//! the REST layer maps requests onto them.

pub mod students {
    use shared::StudentProfile;

    /// Input for creating a student record
    #[derive(Debug, Clone)]
    pub struct CreateStudentCommand {
        /// Identifier proposed by the client; derived on the server when absent
        pub student_id: Option<String>,
        pub profile: StudentProfile,
    }

    #[derive(Debug, Clone)]
    pub struct UpdateStudentCommand {
        pub id: String,
        pub profile: StudentProfile,
    }
}

pub mod transport {
    use shared::Stop;

    #[derive(Debug, Clone)]
    pub struct RegisterVehicleCommand {
        pub label: String,
        pub route_ref: String,
    }

    /// Replace the itinerary of a route
    #[derive(Debug, Clone)]
    pub struct RegisterRouteCommand {
        pub route_ref: String,
        pub stops: Vec<Stop>,
    }
}

pub mod media {
    #[derive(Debug, Clone)]
    pub struct UploadImageCommand {
        pub content_type: String,
        pub bytes: Vec<u8>,
    }
}
