// entlim: Entity-Scoped Admission Control
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Library root.
//!
//! # Crate Architecture
//!
//! ```text
//!                        main.rs
//!                           |
//!                +----------+----------+
//!                v                     v
//!             cli (clap)          cmd (handlers)
//!                |            submit / alter / usage
//!                +----------+----------+
//!                           v
//!              ,---------------------------,
//!              |          config           |
//!              |   TOML, layered settings  |
//!              '-------------+-------------'
//!                            v
//!                  admission  --->  render
//!             engine, gate, Decision
//!                 |         |
//!                 v         v
//!              usage     resolve
//!          UsageIndex   specific > generic
//!                 |         |
//!                 v         v
//!              store      limits
//!          JobStore seam  rule mini-language
//!
//!   +-----------------------------------------+
//!   |  foundation   job, error, logging       |
//!   +-----------------------------------------+
//! ```

pub mod admission;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod job;
pub mod limits;
pub mod logging;
pub mod render;
pub mod resolve;
pub mod store;
pub mod usage;
