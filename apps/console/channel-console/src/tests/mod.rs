mod error;
mod logger;
mod settings;
