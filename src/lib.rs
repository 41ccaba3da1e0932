//! Collaborative notepad relay.
//!
//! The server half keeps documents in a [`db::DocumentStore`], tracks which
//! connection edits which document in a [`websocket::registry::SessionRegistry`]
//! and relays whole-document updates between participants, last writer wins.
//! The [`client`] half is the agent an editor embeds to talk to it.

pub mod app;
pub mod client;
pub mod clients;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod state;
pub mod websocket;
