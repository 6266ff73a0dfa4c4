//! Domain core for the health-sector cybersecurity self-assessment and
//! approval platform: the organizational hierarchy, role-scoped access
//! policy, deterministic scoring, the approval state machine, resilient
//! evidence synchronization, and hierarchical report aggregation.
//!
//! Session issuance, the relational store, and blob storage are external
//! collaborators reached through the traits in [`assessment`], [`budget`],
//! and [`evidence`].

pub mod access;
pub mod assessment;
pub mod budget;
pub mod config;
pub mod error;
pub mod evidence;
pub mod hierarchy;
pub mod reporting;
pub mod telemetry;
