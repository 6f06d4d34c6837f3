pub mod definition;
pub mod jobs;
pub mod wsgi;
