mod error;
mod helpers;
mod manager;
