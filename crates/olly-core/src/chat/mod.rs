pub mod exporters;
pub mod models;
pub mod rendering;
pub mod repositories;
pub mod services;
