// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod fs;
pub mod hashing;

pub use fs::write_atomic;
pub use hashing::sha256_hex;
