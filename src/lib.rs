// Copyright 2026 The Chat Relay Project
// SPDX-License-Identifier: Apache-2.0

pub mod client;
pub mod config;
pub mod message;
pub mod server;
pub mod stream;
pub mod upstream;
pub mod wire;
