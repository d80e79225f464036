//! Linux namespace management for process isolation.
//!
//! Only the PID namespace is used: the launched command sees itself as
//! PID 1 and cannot observe processes outside its namespace.

pub mod pid;
