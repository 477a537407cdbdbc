//! The loopback module provides a simulated instrument bus for testing purposes.
//!
//! A [`LoopbackResourceManager`] holds [`LoopbackDevice`]s under resource addresses. Each device
//! answers the queries it was configured with, and records what was written to it, how often it
//! was opened, and how often it was closed. The recording is shared between the device and all
//! sessions opened to it, so you can keep a clone of the device in your test and inspect it after
//! the resource manager or a plug took ownership of the sessions.
//!
//! Check out the [`LoopbackResourceManager`] for an example.

mod loopback_device;
mod loopback_resource_manager;

pub use loopback_device::*;
pub use loopback_resource_manager::*;
