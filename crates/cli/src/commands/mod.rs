pub mod chat;
pub mod convert;
pub mod doctor;
pub mod onboard;
pub mod personas;
