// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-based tests

mod address_properties;
mod assembly_properties;
