pub mod applemidi;
pub mod midir_backend;
pub mod unsupported;
