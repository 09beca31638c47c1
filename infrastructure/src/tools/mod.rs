//! **Default toolkits** - in-process tools grouped by
//! [`Toolkit`](chatflow_domain::Toolkit)
//!
//! | Toolkit | Tools | Key Dependency |
//! |---------|-------|----------------|
//! | `visualization` | `create_{bar,line,pie}_chart`, `create_table` | none |
//! | `http` | `fetch_url` | `reqwest` + `scraper` |
//! | `clock` | `current_time`, `shift_time` | `chrono` |
//!
//! Visualization tools are progressive producers: they report `pending`
//! and `partial` states through the call's progress sink before returning
//! the final artifact payload.

pub mod clock;
pub mod http;
mod source;
pub mod visualization;

pub use source::DefaultToolkitSource;
