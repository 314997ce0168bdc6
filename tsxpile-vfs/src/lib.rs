//! tsxpile Virtual File System
//!
//! An in-memory substitute for a filesystem: absolute virtual paths mapped
//! to text content, scoped to one compile cycle, plus the path math used to
//! resolve relative specifiers against a base file.
//!
//! # Usage
//! ```
//! use tsxpile_vfs::VirtualFileMap;
//!
//! let mut files = VirtualFileMap::new();
//! files.insert("/index.js", "export default 1;");
//! assert_eq!(files.read("/index.js"), Some("export default 1;"));
//! ```

mod map;
mod path;

pub use map::VirtualFileMap;
pub use path::normalize_path;
