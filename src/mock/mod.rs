pub mod mock_gauge;
pub mod mock_subsystem;
