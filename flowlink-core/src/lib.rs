//! Flowlink Core
//!
//! Core types shared by the broker client and the worker framework.
//!
//! This crate contains:
//! - Domain types: entities received from the broker (activated jobs, topology, deployments)
//! - DTOs: request payloads for the commands issued back to the broker

pub mod domain;
pub mod dto;

/// Variable document carried by jobs and commands
pub type Variables = serde_json::Map<String, serde_json::Value>;
