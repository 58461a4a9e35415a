//! Yerba core library — configuration, hosted-service clients, and the
//! WhatsApp webhook pipeline used by the CLI.

pub mod config;
pub mod init;
pub mod media;
pub mod services;
pub mod webhook;
