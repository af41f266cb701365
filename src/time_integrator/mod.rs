pub mod driver;
pub mod lax_friedrichs;
