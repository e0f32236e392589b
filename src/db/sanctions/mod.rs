//! Sanction registry: moderation actions, community bans, platform suspensions.

mod models;
mod queries;
