pub mod calendar_client;
pub mod conflict;
pub mod planner;
pub mod slots;
pub mod vocabulary;
