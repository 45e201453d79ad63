pub mod ids;

pub use ids::generate_execution_id;
