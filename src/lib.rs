#![allow(async_fn_in_trait)]

pub mod afk;
pub mod commands;
pub mod context;
pub mod events;
pub mod invites;
pub mod leaderboard;
pub mod leveling;
pub mod session;
