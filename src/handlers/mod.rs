pub mod admin;
pub mod agents;
pub mod auth;
pub mod connections;
pub mod contact_fields;
pub mod conversations;
pub mod health;
pub mod leads;
pub mod permission_groups;
pub mod settings;
pub mod tags;
pub mod users;
pub mod vector_stores;
